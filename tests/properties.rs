//! Property-based tests for hull construction.
//!
//! This module uses proptest to verify the fundamental properties of the hulls built from
//! random point clouds:
//! - Every face is planar and every input point lies on or below every face plane
//! - The faces form a closed surface with Euler characteristic 2
//! - Building a hull from the hull's own points gives back the same hull
//! - Every face is strictly convex against its neighbors on integer lattices, where merging
//!   has to resolve exactly coplanar faces
//! - Slabs only a few tolerances thick still give a closed hull or a single flat face
//! - 2D hulls are counterclockwise and contain every input point

use cheetah_hull::{
    ConvexHull2d, ConvexHull3d, ConvexHull3dConfig, DegenerateInput, DEFAULT_EPSILON,
};
use glam::{DVec2, DVec3};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

// =============================================================================
// TEST CONFIGURATION
// =============================================================================

/// Distance tolerance for geometric assertions on clouds within `[-10, 10]^3`.
const TOLERANCE: f64 = 1e-9;

/// Strategy for generating finite f64 coordinates
fn finite_coordinate() -> impl Strategy<Value = f64> {
    -10.0..10.0
}

fn point_3d() -> impl Strategy<Value = DVec3> {
    prop::array::uniform3(finite_coordinate()).prop_map(DVec3::from_array)
}

fn point_2d() -> impl Strategy<Value = DVec2> {
    prop::array::uniform2(finite_coordinate()).prop_map(DVec2::from_array)
}

/// Strategy for points of the integer lattice in `[-3, 3]^3`
fn lattice_point() -> impl Strategy<Value = DVec3> {
    prop::array::uniform3(-3i32..=3)
        .prop_map(|[x, y, z]| DVec3::new(x.into(), y.into(), z.into()))
}

/// Strategy for lattice points on the surface of the cube `[-3, 3]^3`
fn cube_surface_point() -> impl Strategy<Value = DVec3> {
    (lattice_point(), 0..3usize, any::<bool>()).prop_map(|(mut point, axis, positive)| {
        point[axis] = if positive { 3.0 } else { -3.0 };
        point
    })
}

/// Strategy for points in the unit square lifted by at most a few tolerances
fn slab_point() -> impl Strategy<Value = DVec3> {
    (0.0..1.0, 0.0..1.0, 0.0..5.0)
        .prop_map(|(x, y, lift)| DVec3::new(x, y, lift * DEFAULT_EPSILON))
}

fn face_plane(points: &[DVec3], face: &[u32]) -> (DVec3, f64) {
    let p0 = points[face[0] as usize];
    let normal = (1..face.len() - 1)
        .map(|i| (points[face[i] as usize] - p0).cross(points[face[i + 1] as usize] - p0))
        .sum::<DVec3>()
        .normalize();
    (normal, normal.dot(p0))
}

fn sorted_points(points: &[DVec3]) -> Vec<[f64; 3]> {
    let mut sorted: Vec<[f64; 3]> = points.iter().map(|p| p.to_array()).collect();
    sorted.sort_by(|a, b| {
        a[0].total_cmp(&b[0])
            .then(a[1].total_cmp(&b[1]))
            .then(a[2].total_cmp(&b[2]))
    });
    sorted
}

fn centroid(points: &[DVec3], face: &[u32]) -> DVec3 {
    face.iter().map(|&i| points[i as usize]).sum::<DVec3>() / face.len() as f64
}

/// Checks that the faces form a closed surface, and that every face sees the centroid of each
/// of its neighbors strictly below its plane.
fn check_strictly_convex(hull: &ConvexHull3d) -> Result<(), TestCaseError> {
    let points = hull.points();
    let mut neighbors = HashMap::new();
    for (i, face) in hull.faces().iter().enumerate() {
        for j in 0..face.len() {
            neighbors.insert((face[j], face[(j + 1) % face.len()]), i);
        }
    }

    for face in hull.faces() {
        let (normal, _) = face_plane(points, face);
        let offset = normal.dot(centroid(points, face));
        for j in 0..face.len() {
            let edge = (face[(j + 1) % face.len()], face[j]);
            let Some(&neighbor) = neighbors.get(&edge) else {
                return Err(TestCaseError::fail(format!("edge {edge:?} of {face:?} has no twin")));
            };
            let neighbor = &hull.faces()[neighbor];
            let distance = normal.dot(centroid(points, neighbor)) - offset;
            prop_assert!(
                distance < -DEFAULT_EPSILON,
                "face {:?} is not strictly convex against {:?}: {}",
                face,
                neighbor,
                distance
            );
        }
    }
    Ok(())
}

// =============================================================================
// 3D PROPERTIES
// =============================================================================

proptest! {
    /// Property: Every face is planar and no input point is outside any face plane
    #[test]
    fn prop_hull_contains_all_points(points in prop::collection::vec(point_3d(), 4..64)) {
        let hull = ConvexHull3d::try_from_points(&points, None).unwrap();
        prop_assume!(hull.degeneracy().is_none());

        for face in hull.faces() {
            prop_assert!(face.len() >= 3);
            let (normal, offset) = face_plane(hull.points(), face);

            for &corner in face {
                let distance = normal.dot(hull.points()[corner as usize]) - offset;
                prop_assert!(distance.abs() <= TOLERANCE, "face {:?} is not planar", face);
            }
            for point in &points {
                let distance = normal.dot(*point) - offset;
                prop_assert!(
                    distance <= TOLERANCE,
                    "{} is {} outside face {:?}",
                    point,
                    distance,
                    face
                );
            }
        }
    }

    /// Property: The faces form a closed 2-manifold with Euler characteristic 2
    #[test]
    fn prop_hull_is_closed(
        points in prop::collection::vec(point_3d(), 4..64),
        merge_faces in any::<bool>(),
    ) {
        let config = ConvexHull3dConfig { merge_faces, ..Default::default() };
        let hull = ConvexHull3d::try_from_points_with_config(&points, &config).unwrap();
        prop_assume!(hull.degeneracy().is_none());

        let mut edges = HashSet::new();
        for face in hull.faces() {
            if !merge_faces {
                prop_assert_eq!(face.len(), 3);
            }
            for i in 0..face.len() {
                let edge = (face[i], face[(i + 1) % face.len()]);
                prop_assert!(edges.insert(edge), "edge {:?} appears twice", edge);
            }
        }
        for &(a, b) in &edges {
            prop_assert!(edges.contains(&(b, a)), "edge {} -> {} has no twin", a, b);
        }

        let vertices = hull.points().len() as isize;
        let euler = vertices - edges.len() as isize / 2 + hull.faces().len() as isize;
        prop_assert_eq!(euler, 2);
        prop_assert!(hull.volume() > 0.0);
    }

    /// Property: The hull of the hull's points is the same hull
    #[test]
    fn prop_hull_is_idempotent(points in prop::collection::vec(point_3d(), 4..64)) {
        let hull = ConvexHull3d::try_from_points(&points, None).unwrap();
        prop_assume!(hull.degeneracy().is_none());

        let rebuilt = ConvexHull3d::try_from_points(hull.points(), None).unwrap();

        prop_assert_eq!(sorted_points(rebuilt.points()), sorted_points(hull.points()));
        prop_assert_eq!(rebuilt.faces().len(), hull.faces().len());
        let volume_error = (rebuilt.volume() - hull.volume()).abs();
        prop_assert!(volume_error <= TOLERANCE * hull.volume().max(1.0));
    }

    /// Property: Every returned point is one of the input points
    #[test]
    fn prop_hull_points_come_from_input(points in prop::collection::vec(point_3d(), 0..32)) {
        let hull = ConvexHull3d::try_from_points(&points, None).unwrap();
        for point in hull.points() {
            prop_assert!(points.contains(point));
        }
    }
}

// =============================================================================
// MERGING PROPERTIES
// =============================================================================

proptest! {
    /// Property: Coplanar lattice faces are merged, leaving only strictly convex edges
    #[test]
    fn prop_lattice_hull_is_strictly_convex(
        points in prop::collection::vec(lattice_point(), 8..64),
    ) {
        let hull = ConvexHull3d::try_from_points(&points, None).unwrap();
        prop_assume!(hull.degeneracy().is_none());
        check_strictly_convex(&hull)?;
    }

    /// Property: Points on the surface of a cube merge into at most six strictly convex faces
    /// plus the faces cutting off missing corners and edges
    #[test]
    fn prop_cube_surface_hull_is_strictly_convex(
        points in prop::collection::vec(cube_surface_point(), 8..96),
    ) {
        let hull = ConvexHull3d::try_from_points(&points, None).unwrap();
        prop_assume!(hull.degeneracy().is_none());
        check_strictly_convex(&hull)?;
    }

    /// Property: A slab a few tolerances thick gives a closed hull or a single flat face
    #[test]
    fn prop_thin_slab_terminates(points in prop::collection::vec(slab_point(), 4..160)) {
        let hull = ConvexHull3d::try_from_points(&points, None).unwrap();

        match hull.degeneracy() {
            None => {
                let mut edges = HashSet::new();
                for face in hull.faces() {
                    prop_assert!(face.len() >= 3);
                    for i in 0..face.len() {
                        prop_assert!(edges.insert((face[i], face[(i + 1) % face.len()])));
                    }
                }
                for &(a, b) in &edges {
                    prop_assert!(edges.contains(&(b, a)), "edge {} -> {} has no twin", a, b);
                }
            }
            Some(DegenerateInput::Coplanar) => {
                prop_assert_eq!(hull.faces().len(), 1);
                prop_assert!(hull.faces()[0].len() >= 3);
            }
            Some(other) => {
                prop_assert!(
                    matches!(other, DegenerateInput::Collinear | DegenerateInput::Coincident),
                    "unexpected degeneracy {:?}",
                    other
                );
            }
        }
    }
}

// =============================================================================
// 2D PROPERTIES
// =============================================================================

proptest! {
    /// Property: The 2D hull is counterclockwise and contains every input point
    #[test]
    fn prop_hull_2d_contains_all_points(points in prop::collection::vec(point_2d(), 3..64)) {
        let hull = ConvexHull2d::from_points(&points);
        let corners = hull.points();
        prop_assume!(corners.len() >= 3);

        for i in 0..corners.len() {
            let a = corners[i];
            let b = corners[(i + 1) % corners.len()];
            let edge = b - a;
            prop_assert!(edge.perp_dot(corners[(i + 2) % corners.len()] - b) > -TOLERANCE);
            for point in &points {
                prop_assert!(edge.perp_dot(*point - a) >= -TOLERANCE);
            }
        }
    }
}
