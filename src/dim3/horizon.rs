use glam::DVec3;

use crate::dim3::{
    conflict_graph::ConflictGraph,
    mesh::{FaceId, FaceMark, HalfEdgeId, HalfEdgeMesh},
};

/// A face whose edges are being walked by the horizon search.
struct Frame {
    /// The next edge to visit.
    edge: HalfEdgeId,
    /// The edge at which the walk around the face ends.
    stop: HalfEdgeId,
}

/// Closes every face visible from `eye`, starting from `start`, and returns the horizon.
///
/// The horizon is the closed loop of half-edges on the closed side that separate the visible
/// faces from the rest of the hull, ordered so that each edge starts where the previous one
/// ends. Points claimed by the closed faces are moved to the orphan list.
///
/// The search is a depth-first traversal across twins. Each face is walked from the edge after
/// the one it was entered through, which keeps the resulting loop connected.
pub fn compute_horizon(
    mesh: &mut HalfEdgeMesh,
    conflicts: &mut ConflictGraph,
    start: FaceId,
    eye: DVec3,
    epsilon: f64,
) -> Vec<HalfEdgeId> {
    let mut horizon = Vec::new();

    close_face(mesh, conflicts, start);
    let first = mesh.face(start).half_edge;

    // Maintain a DFS stack of faces being walked.
    // Note that this could also be implemented using recursion.
    let mut stack: Vec<Frame> = Vec::with_capacity(32);
    stack.push(Frame {
        edge: first,
        stop: first,
    });

    while let Some(frame) = stack.last_mut() {
        let edge = frame.edge;
        frame.edge = mesh.next(edge);
        if frame.edge == frame.stop {
            // The face has no edges left to visit.
            stack.pop();
        }

        let twin = mesh.twin(edge);
        let neighbor = mesh.half_edge(twin).face;
        let neighbor_face = mesh.face(neighbor);

        // Skip faces that were already removed.
        if !neighbor_face.is_open() {
            continue;
        }

        if neighbor_face.distance_to_point(eye) > epsilon {
            // The neighbor is visible as well, so remove it and continue from there.
            close_face(mesh, conflicts, neighbor);
            stack.push(Frame {
                edge: mesh.next(twin),
                stop: twin,
            });
        } else {
            horizon.push(edge);
        }
    }

    assert!(
        horizon.len() >= 3,
        "horizon has only {} edges",
        horizon.len()
    );
    for (i, &edge) in horizon.iter().enumerate() {
        let previous = horizon[(i + horizon.len() - 1) % horizon.len()];
        assert_eq!(
            mesh.tail(edge).point,
            mesh.head(previous).point,
            "horizon is not a connected loop at edge {i}"
        );
    }

    horizon
}

fn close_face(mesh: &mut HalfEdgeMesh, conflicts: &mut ConflictGraph, face: FaceId) {
    mesh.face_mut(face).mark = FaceMark::Closed;
    conflicts.release_face(face);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dim3::{
        initial_hull::{init_tetrahedron, InitialConvexHull3d},
        mesh::PointId,
    };

    fn corner_tetrahedron() -> (HalfEdgeMesh, ConflictGraph) {
        let points = [DVec3::ZERO, DVec3::X, DVec3::Y, DVec3::Z];
        match init_tetrahedron(&points, 1e-12) {
            InitialConvexHull3d::Tetrahedron { mesh, conflicts, .. } => (mesh, conflicts),
            InitialConvexHull3d::Degenerate { .. } => panic!("expected a tetrahedron"),
        }
    }

    fn most_visible_face(mesh: &HalfEdgeMesh, eye: DVec3) -> FaceId {
        mesh.open_faces()
            .max_by(|a, b| {
                let a = mesh.face(*a).distance_to_point(eye);
                let b = mesh.face(*b).distance_to_point(eye);
                a.total_cmp(&b)
            })
            .unwrap()
    }

    #[test]
    fn single_visible_face() {
        let (mut mesh, mut conflicts) = corner_tetrahedron();
        let eye = DVec3::splat(1.0);
        let start = most_visible_face(&mesh, eye);

        let horizon = compute_horizon(&mut mesh, &mut conflicts, start, eye, 1e-12);

        assert_eq!(horizon.len(), 3);
        assert_eq!(mesh.open_faces().count(), 3);
        for edge in horizon {
            assert_eq!(mesh.half_edge(edge).face, start);
            assert!(mesh.face(mesh.twin_face(edge)).is_open());
        }
    }

    #[test]
    fn three_visible_faces() {
        let (mut mesh, mut conflicts) = corner_tetrahedron();
        let eye = DVec3::splat(-1.0);
        let start = most_visible_face(&mesh, eye);

        let horizon = compute_horizon(&mut mesh, &mut conflicts, start, eye, 1e-12);

        // Only the slanted face survives, and the horizon runs around it.
        assert_eq!(horizon.len(), 3);
        let survivors: Vec<FaceId> = mesh.open_faces().collect();
        assert_eq!(survivors.len(), 1);
        for edge in horizon {
            assert_eq!(mesh.face(mesh.half_edge(edge).face).mark, FaceMark::Closed);
            assert_eq!(mesh.twin_face(edge), survivors[0]);
        }
        let mut corners = mesh.face_points(survivors[0]);
        corners.sort();
        assert_eq!(corners, vec![PointId(1), PointId(2), PointId(3)]);
    }

    #[test]
    fn closed_faces_release_their_points() {
        let (mut mesh, mut conflicts) = corner_tetrahedron();
        let eye = DVec3::splat(1.0);
        let start = most_visible_face(&mesh, eye);
        conflicts.assign(PointId(0), start);

        compute_horizon(&mut mesh, &mut conflicts, start, eye, 1e-12);

        assert_eq!(conflicts.owner(PointId(0)), None);
        assert_eq!(conflicts.take_orphans(), vec![PointId(0)]);
    }
}
