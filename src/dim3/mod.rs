// The construction follows the classic incremental Quickhull on a half-edge mesh, as in
// C. Bradford Barber et al. 1996 and John Lloyd's QuickHull3D.

mod aabb;
mod conflict_graph;
mod horizon;
mod initial_hull;
mod merge;
mod mesh;
mod validation;

use crate::{
    dim3::{
        conflict_graph::ConflictGraph,
        horizon::compute_horizon,
        initial_hull::{init_tetrahedron, BasePlane, InitialConvexHull3d},
        merge::{FaceMerger, MergeStats},
        mesh::{FaceId, HalfEdgeMesh, PointId},
    },
    fixed_hasher::{FixedHashMap, FixedHasher},
};
use glam::DVec3;
use thiserror::Error;

/// The default distance tolerance used for visibility, merging and degeneracy decisions.
pub const DEFAULT_EPSILON: f64 = 1e-12;

/// An error returned during [`ConvexHull3d`] construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvexHull3dError {
    /// An input point has a NaN or infinite coordinate.
    #[error("point {index} has a non-finite coordinate")]
    NonFinitePoint {
        /// The index of the offending point.
        index: usize,
    },
    /// The distance tolerance is not a finite positive number.
    #[error("tolerance must be finite and positive, got {0}")]
    InvalidEpsilon(f64),
}

/// The kind of lower-dimensional input that was resolved without running Quickhull.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DegenerateInput {
    /// There were no input points.
    Empty,
    /// There were only one or two input points, which form a single face as given.
    Trivial,
    /// All points lie within the tolerance of a single point.
    Coincident,
    /// All points lie within the tolerance of a line. The hull is its two extreme points.
    Collinear,
    /// All points lie within the tolerance of a plane. The hull is a single convex polygon.
    ///
    /// This is also reported for slabs only a few tolerances thick, whose faces would have to
    /// be merged across both sides.
    Coplanar,
}

/// Configuration for [`ConvexHull3d`] construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConvexHull3dConfig {
    /// The distance below which a point counts as lying on a plane, line or point.
    ///
    /// Default: [`DEFAULT_EPSILON`]
    pub epsilon: f64,
    /// The maximum number of points to add to the hull. If `None`, the algorithm runs until
    /// every point is inside the hull.
    ///
    /// Default: `None`
    pub max_iter: Option<usize>,
    /// Whether to merge coplanar and non-convex neighboring faces into polygons.
    /// If `false`, the hull is left triangulated.
    ///
    /// Default: `true`
    pub merge_faces: bool,
}

impl Default for ConvexHull3dConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            max_iter: None,
            merge_faces: true,
        }
    }
}

/// A 3D [convex hull] representing the smallest convex set containing
/// all input points in a given point set.
///
/// This can be thought of as a shrink wrapping of a 3D object.
///
/// Faces are convex polygons given as loops of indices into [`points`](Self::points),
/// ordered counterclockwise when seen from outside the hull.
///
/// [convex hull]: https://en.wikipedia.org/wiki/Convex_hull
///
/// # Example
///
/// ```
/// use cheetah_hull::ConvexHull3d;
/// use glam::DVec3;
///
/// // The corners of a unit cube, plus a point inside it.
/// let mut points: Vec<DVec3> = (0..8)
///     .map(|i| DVec3::new((i & 1) as f64, ((i >> 1) & 1) as f64, ((i >> 2) & 1) as f64))
///     .collect();
/// points.push(DVec3::splat(0.5));
///
/// // No limit on the number of iterations.
/// let max_iter = None;
///
/// // Compute the convex hull.
/// let hull = ConvexHull3d::try_from_points(&points, max_iter).unwrap();
///
/// // The hull has the 8 corners and 6 square faces.
/// assert_eq!(hull.points().len(), 8);
/// assert_eq!(hull.faces().len(), 6);
/// assert!(hull.faces().iter().all(|face| face.len() == 4));
/// assert!((hull.volume() - 1.0).abs() < 1e-12);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ConvexHull3d {
    /// The points used by the faces of the hull.
    points: Vec<DVec3>,
    /// The faces of the hull as loops of indices into `points`.
    faces: Vec<Vec<u32>>,
    /// Set if the input was lower-dimensional.
    degeneracy: Option<DegenerateInput>,
}

impl ConvexHull3d {
    /// Attempts to compute a [`ConvexHull3d`] for the given set of points.
    ///
    /// `max_iter` specifies the maximum number of points to add to the hull.
    /// If `None`, the algorithm will run until completion.
    ///
    /// Point sets that are empty, or that lie on a point, line or plane, produce a single
    /// degenerate face instead of a closed surface. See [`ConvexHull3d::degeneracy`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConvexHull3dError`] if any point has a non-finite coordinate.
    #[inline]
    pub fn try_from_points(
        points: &[DVec3],
        max_iter: Option<usize>,
    ) -> Result<Self, ConvexHull3dError> {
        Self::try_from_points_with_config(
            points,
            &ConvexHull3dConfig {
                max_iter,
                ..Default::default()
            },
        )
    }

    /// Attempts to compute a [`ConvexHull3d`] for the given set of points with a custom
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConvexHull3dError`] if any point has a non-finite coordinate, or if the
    /// configured tolerance is not a finite positive number.
    pub fn try_from_points_with_config(
        points: &[DVec3],
        config: &ConvexHull3dConfig,
    ) -> Result<Self, ConvexHull3dError> {
        if !config.epsilon.is_finite() || config.epsilon <= 0.0 {
            return Err(ConvexHull3dError::InvalidEpsilon(config.epsilon));
        }
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(ConvexHull3dError::NonFinitePoint { index });
        }

        match init_tetrahedron(points, config.epsilon) {
            InitialConvexHull3d::Degenerate { kind, faces } => {
                let (points, faces) = Self::remove_unused_points(points, &faces);
                Ok(ConvexHull3d {
                    points,
                    faces,
                    degeneracy: Some(kind),
                })
            }
            InitialConvexHull3d::Tetrahedron {
                mesh,
                conflicts,
                base,
            } => {
                let mut quickhull = Quickhull {
                    points,
                    mesh,
                    conflicts,
                    base,
                    epsilon: config.epsilon,
                    merge_faces: config.merge_faces,
                    collapsed: false,
                };
                quickhull.update(config.max_iter);

                let (degeneracy, faces) = quickhull.finish();
                let (points, faces) = Self::remove_unused_points(points, &faces);
                Ok(ConvexHull3d {
                    points,
                    faces,
                    degeneracy,
                })
            }
        }
    }

    /// Returns the points of the convex hull.
    #[inline]
    pub fn points(&self) -> &[DVec3] {
        &self.points
    }

    /// Returns the faces of the convex hull as loops of indices into [`points`](Self::points).
    #[inline]
    pub fn faces(&self) -> &[Vec<u32>] {
        &self.faces
    }

    /// Returns the kind of degenerate input the hull was built from, or `None` if the hull is
    /// a closed polyhedron.
    #[inline]
    pub fn degeneracy(&self) -> Option<DegenerateInput> {
        self.degeneracy
    }

    /// Returns the faces of the convex hull as loops of coordinates.
    pub fn polygons(&self) -> Vec<Vec<DVec3>> {
        self.faces
            .iter()
            .map(|face| face.iter().map(|&i| self.points[i as usize]).collect())
            .collect()
    }

    /// Returns the vertices and faces of the convex hull.
    ///
    /// This consumes the convex hull.
    #[inline]
    pub fn vertices_indices(self) -> (Vec<DVec3>, Vec<Vec<u32>>) {
        (self.points, self.faces)
    }

    /// Triangulates every face as a fan around its first corner.
    ///
    /// Faces with fewer than three corners are skipped.
    pub fn triangle_indices(&self) -> Vec<[u32; 3]> {
        self.faces
            .iter()
            .flat_map(|face| {
                (1..face.len().saturating_sub(1)).map(move |i| [face[0], face[i], face[i + 1]])
            })
            .collect()
    }

    /// Computes the volume of the convex hull.
    ///
    /// Degenerate hulls have no volume.
    pub fn volume(&self) -> f64 {
        if self.degeneracy.is_some() {
            return 0.0;
        }

        self.triangle_indices()
            .iter()
            .map(|triangle| {
                let p0 = self.points[triangle[0] as usize];
                let p1 = self.points[triangle[1] as usize];
                let p2 = self.points[triangle[2] as usize];

                // Signed volume of the tetrahedron formed by the triangle and the origin.
                p0.dot(p1.cross(p2)) / 6.0
            })
            .sum()
    }

    /// Computes the point on the convex hull that is furthest in the given direction,
    /// or `None` if the hull is empty.
    pub fn support_point(&self, direction: DVec3) -> Option<DVec3> {
        let (first, rest) = self.points.split_first()?;
        let mut max = first.dot(direction);
        let mut support = *first;

        for point in rest {
            let dot_product = point.dot(direction);
            if dot_product > max {
                max = dot_product;
                support = *point;
            }
        }

        Some(support)
    }

    /// Collects the points used by `faces` and remaps the face indices to them.
    ///
    /// Points are numbered in order of first use.
    fn remove_unused_points(
        points: &[DVec3],
        faces: &[Vec<PointId>],
    ) -> (Vec<DVec3>, Vec<Vec<u32>>) {
        let mut remap: FixedHashMap<PointId, u32> = FixedHashMap::with_hasher(FixedHasher);
        let mut used = Vec::new();

        let faces = faces
            .iter()
            .map(|face| {
                face.iter()
                    .map(|&point| {
                        *remap.entry(point).or_insert_with(|| {
                            used.push(points[point.index()]);
                            (used.len() - 1) as u32
                        })
                    })
                    .collect()
            })
            .collect();

        (used, faces)
    }
}

/// The state of one hull construction.
struct Quickhull<'a> {
    points: &'a [DVec3],
    mesh: HalfEdgeMesh,
    conflicts: ConflictGraph,
    base: BasePlane,
    epsilon: f64,
    merge_faces: bool,
    /// Set once a merge would have folded the hull onto itself.
    collapsed: bool,
}

impl Quickhull<'_> {
    /// The main quickhull algorithm.
    fn update(&mut self, max_iter: Option<usize>) {
        let max_iter = max_iter.unwrap_or(usize::MAX);
        let mut iterations = 0;
        let mut stats = MergeStats::default();

        // For each face that has outside points:
        //
        // 1. Find the outside point that is farthest from the face, the "eye point".
        // 2. Find the "horizon", the edges that separate the faces visible from the eye point
        //    from the rest of the hull, and close the visible faces.
        // 3. Create new faces connecting the eye point to the horizon.
        // 4. Merge new faces that are not strictly convex against their neighbors.
        // 5. Reassign outside points from removed faces to the new faces.
        //
        // Outside points are only ever handed to faces created in the same step, which are
        // appended to the arena. Faces behind the cursor therefore never regain points.
        let mut i = 0;
        while i != self.mesh.faces.len() {
            if iterations >= max_iter {
                tracing::debug!(max_iter, "stopping at the iteration limit");
                break;
            }

            let face = FaceId::from(i);
            i += 1;

            if !self.mesh.face(face).is_open() || !self.conflicts.has_conflicts(face) {
                continue;
            }

            // Select the furthest point.
            let Some((eye, distance)) = self.conflicts.furthest_point(face, &self.mesh, self.points)
            else {
                continue;
            };

            tracing::trace!(?eye, ?face, distance, "adding point to hull");
            let face_stats = self.add_point(face, eye);
            stats.merged += face_stats.merged;
            stats.deferred += face_stats.deferred;
            iterations += 1;

            if face_stats.collapsed {
                self.collapsed = true;
                break;
            }
        }

        if cfg!(debug_assertions) {
            validation::validate_mesh(&self.mesh);
        }

        tracing::debug!(
            iterations,
            faces = self.mesh.open_faces().count(),
            merged = stats.merged,
            deferred = stats.deferred,
            "constructed convex hull"
        );
    }

    /// Adds `eye`, which is outside of `face`, to the hull.
    fn add_point(&mut self, face: FaceId, eye: PointId) -> MergeStats {
        debug_assert_eq!(self.conflicts.owner(eye), Some(face));
        self.conflicts.remove(eye);
        let eye_position = self.points[eye.index()];

        let horizon = compute_horizon(
            &mut self.mesh,
            &mut self.conflicts,
            face,
            eye_position,
            self.epsilon,
        );
        let new_faces = self.mesh.add_cone(eye, eye_position, &horizon);

        let stats = if self.merge_faces {
            FaceMerger {
                mesh: &mut self.mesh,
                conflicts: &mut self.conflicts,
                points: self.points,
                epsilon: self.epsilon,
            }
            .merge_new_faces(&new_faces)
        } else {
            MergeStats::default()
        };

        self.resolve_orphans(&new_faces);

        if cfg!(debug_assertions) {
            for &face in &new_faces {
                if self.mesh.face(face).is_open() {
                    validation::validate_face(&self.mesh, face);
                }
            }
        }

        stats
    }

    /// Gives every orphaned point to the new face it is farthest outside of, and discards
    /// the ones that are inside all of them.
    fn resolve_orphans(&mut self, new_faces: &[FaceId]) {
        for point in self.conflicts.take_orphans() {
            let position = self.points[point.index()];
            let mut furthest = None;
            let mut max_distance = self.epsilon;

            for &face in new_faces {
                let face_record = self.mesh.face(face);
                if !face_record.is_open() {
                    continue;
                }
                let distance = face_record.distance_to_point(position);
                if distance > max_distance {
                    max_distance = distance;
                    furthest = Some(face);
                }
            }

            if let Some(face) = furthest {
                self.conflicts.assign(point, face);
            }
        }
    }

    /// Returns the degeneracy and the faces of the finished hull as loops of input points.
    ///
    /// A hull that collapsed while merging, or that ended up as the two sides of a single
    /// polygon, is flatter than the tolerance. Its input is resolved as coplanar instead.
    fn finish(&self) -> (Option<DegenerateInput>, Vec<Vec<PointId>>) {
        let num_faces = self.mesh.open_faces().count();
        if self.collapsed || num_faces == 2 {
            tracing::debug!(
                num_faces,
                collapsed = self.collapsed,
                "hull is flat within tolerance, resolving as coplanar input"
            );
            return (
                Some(DegenerateInput::Coplanar),
                self.base.planar_hull(self.points),
            );
        }

        let faces = self
            .mesh
            .open_faces()
            .map(|face| self.mesh.face_points(face))
            .collect();
        (None, faces)
    }
}
