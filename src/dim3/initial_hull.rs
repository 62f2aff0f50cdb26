use glam::{DVec2, DVec3};

use crate::{
    dim3::{
        aabb::Aabb3d,
        conflict_graph::ConflictGraph,
        mesh::{FaceId, HalfEdgeMesh, PointId},
    },
    ConvexHull2d, DegenerateInput,
};

/// The starting point of hull construction.
///
/// Degenerate input is resolved right away into its final faces, while a full-dimensional
/// point set yields a tetrahedron with the remaining points distributed over its faces.
pub enum InitialConvexHull3d {
    Degenerate {
        kind: DegenerateInput,
        faces: Vec<Vec<PointId>>,
    },
    Tetrahedron {
        mesh: HalfEdgeMesh,
        conflicts: ConflictGraph,
        base: BasePlane,
    },
}

/// The plane through the first three vertices of the initial tetrahedron.
///
/// It is kept to resolve point sets that turn out to be flatter than the tolerance only
/// once the hull has collapsed during merging.
#[derive(Clone, Copy, Debug)]
pub struct BasePlane {
    a: usize,
    b: usize,
    normal: DVec3,
}

impl BasePlane {
    /// Returns the 2D hull of `points` projected onto the plane, as a single face.
    pub fn planar_hull(&self, points: &[DVec3]) -> Vec<Vec<PointId>> {
        degenerate_planar_hull(self.a, self.b, self.normal, points)
    }
}

trait ToRobust {
    fn to_robust(self) -> robust::Coord3D<f64>;
}

impl ToRobust for DVec3 {
    fn to_robust(self) -> robust::Coord3D<f64> {
        let DVec3 { x, y, z } = self;
        robust::Coord3D { x, y, z }
    }
}

fn degenerate(kind: DegenerateInput, faces: Vec<Vec<PointId>>) -> InitialConvexHull3d {
    tracing::debug!(?kind, "degenerate input, skipping hull construction");
    InitialConvexHull3d::Degenerate { kind, faces }
}

fn degenerate_segment_hull(a: usize, b: usize, points: &[DVec3]) -> Vec<Vec<PointId>> {
    let direction = (points[b] - points[a]).normalize();

    // Find the maximum and minimum projections along the direction.
    let mut min = (f64::INFINITY, 0);
    let mut max = (f64::NEG_INFINITY, 0);

    for (i, point) in points.iter().enumerate() {
        let projection = direction.dot(*point);
        if projection < min.0 {
            min = (projection, i);
        }
        if projection > max.0 {
            max = (projection, i);
        }
    }

    vec![vec![PointId::from(min.1), PointId::from(max.1)]]
}

fn degenerate_planar_hull(
    a: usize,
    b: usize,
    normal: DVec3,
    points: &[DVec3],
) -> Vec<Vec<PointId>> {
    // Project the points onto an orthonormal basis of the plane with `u × v = normal`,
    // so that counterclockwise in 2D is counterclockwise around the normal.
    let origin = points[a];
    let u = (points[b] - origin).normalize();
    let v = normal.cross(u);

    let projected: Vec<DVec2> = points
        .iter()
        .map(|p| {
            let offset = *p - origin;
            DVec2::new(u.dot(offset), v.dot(offset))
        })
        .collect();

    let face = ConvexHull2d::indices_from_points(&projected)
        .into_iter()
        .map(PointId::from)
        .collect();
    vec![face]
}

/// Returns the index of the point maximizing `key`, keeping the first one on ties.
fn max_by_key(points: &[DVec3], key: impl Fn(DVec3) -> f64) -> (usize, f64) {
    points
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best, best_value), (i, p)| {
            let value = key(*p);
            if value > best_value {
                (i, value)
            } else {
                (best, best_value)
            }
        })
}

/// Builds the initial hull for `points`, or resolves the point set as degenerate.
pub fn init_tetrahedron(points: &[DVec3], epsilon: f64) -> InitialConvexHull3d {
    match points.len() {
        0 => return degenerate(DegenerateInput::Empty, Vec::new()),
        1 | 2 => {
            let face = (0..points.len()).map(PointId::from).collect();
            return degenerate(DegenerateInput::Trivial, vec![face]);
        }
        _ => {}
    }

    let Some(aabb) = Aabb3d::from_points(points) else {
        return degenerate(DegenerateInput::Empty, Vec::new());
    };

    if aabb.diagonal().max_element() < epsilon {
        return degenerate(DegenerateInput::Coincident, vec![vec![PointId(0)]]);
    }

    // The first two vertices are the pair of axis extremes that are farthest apart.
    let (a, b, _) = (0..3)
        .map(|axis| (aabb.min_indices[axis], aabb.max_indices[axis]))
        .fold((0, 0, f64::NEG_INFINITY), |best, (a, b)| {
            let distance = points[a].distance_squared(points[b]);
            if distance > best.2 {
                (a, b, distance)
            } else {
                best
            }
        });

    // The third vertex is the one farthest from the line through the first two.
    let ab = points[b] - points[a];
    let (c, max_cross) = max_by_key(points, |p| ab.cross(p - points[b]).length_squared());

    if max_cross.sqrt() / ab.length() < epsilon {
        return degenerate(
            DegenerateInput::Collinear,
            degenerate_segment_hull(a, b, points),
        );
    }

    // The fourth vertex is the one farthest from the plane through the first three.
    let normal = ab.cross(points[c] - points[a]).normalize();
    let (d, max_distance) = max_by_key(points, |p| normal.dot(p - points[a]).abs());

    if max_distance < epsilon {
        return degenerate(
            DegenerateInput::Coplanar,
            degenerate_planar_hull(a, b, normal, points),
        );
    }

    let vertices = [a, b, c, d];
    let mut mesh = HalfEdgeMesh::with_capacity(points.len());
    let mut faces = [FaceId::PLACEHOLDER; 4];

    for (omitted, face) in faces.iter_mut().enumerate() {
        let mut triangle: Vec<(PointId, DVec3)> = (0..4)
            .filter(|&i| i != omitted)
            .map(|i| (PointId::from(vertices[i]), points[vertices[i]]))
            .collect();

        // Orient the triangle so that the omitted vertex lies below it.
        let opposite = points[vertices[omitted]];
        let orientation = robust::orient3d(
            triangle[0].1.to_robust(),
            triangle[1].1.to_robust(),
            triangle[2].1.to_robust(),
            opposite.to_robust(),
        );
        if orientation < 0.0 {
            triangle.swap(0, 1);
        }

        *face = mesh.add_face(&triangle);
    }

    mesh.pair_twins(&faces);

    // Give every remaining point to the face it is farthest outside of.
    let mut conflicts = ConflictGraph::new(points.len());
    for (i, point) in points.iter().enumerate() {
        if vertices.contains(&i) {
            continue;
        }

        let mut furthest = None;
        let mut max_distance = epsilon;
        for &face in &faces {
            let distance = mesh.face(face).distance_to_point(*point);
            if distance > max_distance {
                max_distance = distance;
                furthest = Some(face);
            }
        }

        if let Some(face) = furthest {
            conflicts.assign(PointId::from(i), face);
        }
    }

    tracing::debug!(
        ?vertices,
        outside = conflicts.num_claimed(),
        "built initial tetrahedron"
    );

    InitialConvexHull3d::Tetrahedron {
        mesh,
        conflicts,
        base: BasePlane { a, b, normal },
    }
}
