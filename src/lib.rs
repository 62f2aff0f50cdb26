//! # Cheetah Hull
//!
//! Convex hulls for point sets in 2D and 3D.
//!
//! The 3D hull is built incrementally with Quickhull on a half-edge mesh. Points are added one
//! at a time, faces visible from each new point are replaced by a cone of new faces, and
//! neighboring faces that are coplanar or concave within a tolerance are merged into convex
//! polygons. Lower-dimensional input (empty, coincident, collinear or coplanar point sets) is
//! detected up front and resolved into a single degenerate face.
//!
//! The 2D hull is a recursive Quickhull over index sets. It is also used to resolve coplanar
//! 3D input.
//!
//! Construction emits [`tracing`] events: `debug` for summaries and degenerate input, `trace`
//! for every point added and every pair of merged faces.
//!
//! ## References
//!
//! - C. Bradford Barber et al. 1996. [The Quickhull Algorithm for Convex Hulls](https://www.cise.ufl.edu/~ungor/courses/fall06/papers/QuickHull.pdf) (the original paper)
//! - Dirk Gregorius. GDC 2014. [Physics for Game Programmers: Implementing Quickhull](https://archive.org/details/GDC2014Gregorius)
//! - John E. Lloyd. [QuickHull3D](https://www.cs.ubc.ca/~lloyd/java/quickhull3d.html), for the face merging scheme

#![warn(missing_docs)]

mod dim2;
mod dim3;
mod fixed_hasher;
pub mod io;

pub use dim2::ConvexHull2d;
pub use dim3::{
    ConvexHull3d, ConvexHull3dConfig, ConvexHull3dError, DegenerateInput, DEFAULT_EPSILON,
};
