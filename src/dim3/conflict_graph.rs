//! Bookkeeping of the points that still lie outside the hull.

use glam::DVec3;

use crate::dim3::mesh::{FaceId, HalfEdgeMesh, PointId};

/// Tracks which face every unresolved point is outside of.
///
/// Each point is claimed by at most one face. Points released by a removed face are parked in
/// the orphan list until they are either assigned to a new face or discarded as interior.
#[derive(Clone, Debug, Default)]
pub struct ConflictGraph {
    /// The face claiming each input point, if any.
    owner: Vec<Option<FaceId>>,
    /// The points claimed by each face, indexed by face.
    outside: Vec<Vec<PointId>>,
    /// Points released from removed faces that await reassignment.
    orphans: Vec<PointId>,
}

impl ConflictGraph {
    pub fn new(num_points: usize) -> Self {
        Self {
            owner: vec![None; num_points],
            outside: Vec::new(),
            orphans: Vec::new(),
        }
    }

    /// Returns the face claiming `point`, if any.
    #[inline]
    pub fn owner(&self, point: PointId) -> Option<FaceId> {
        self.owner[point.index()]
    }

    /// Returns the points claimed by `face`.
    #[inline]
    pub fn outside_points(&self, face: FaceId) -> &[PointId] {
        self.outside
            .get(face.index())
            .map_or(&[], |points| points.as_slice())
    }

    #[inline]
    pub fn has_conflicts(&self, face: FaceId) -> bool {
        !self.outside_points(face).is_empty()
    }

    /// Returns the number of points currently claimed by any face.
    pub fn num_claimed(&self) -> usize {
        self.outside.iter().map(Vec::len).sum()
    }

    /// Makes `face` claim `point`.
    ///
    /// # Panics
    ///
    /// Panics with `debug_assertions` enabled if the point is already claimed.
    pub fn assign(&mut self, point: PointId, face: FaceId) {
        debug_assert!(
            self.owner[point.index()].is_none(),
            "point {point:?} is already claimed by {:?}",
            self.owner[point.index()]
        );

        if self.outside.len() <= face.index() {
            self.outside.resize_with(face.index() + 1, Vec::new);
        }
        self.outside[face.index()].push(point);
        self.owner[point.index()] = Some(face);
    }

    /// Removes `point` from the face claiming it.
    pub fn remove(&mut self, point: PointId) {
        let Some(face) = self.owner[point.index()].take() else {
            return;
        };
        let points = &mut self.outside[face.index()];
        if let Some(position) = points.iter().position(|&p| p == point) {
            points.swap_remove(position);
        }
    }

    /// Releases every point claimed by `face` into the orphan list.
    pub fn release_face(&mut self, face: FaceId) {
        for point in self.take_face_points(face) {
            self.orphans.push(point);
        }
    }

    /// Moves the points of a face that was absorbed by `survivor`.
    ///
    /// Points still more than `epsilon` outside the survivor's plane are claimed by it, and all
    /// others become orphans.
    pub fn transfer_face_points(
        &mut self,
        absorbed: FaceId,
        survivor: FaceId,
        mesh: &HalfEdgeMesh,
        points: &[DVec3],
        epsilon: f64,
    ) {
        let survivor_face = mesh.face(survivor);
        for point in self.take_face_points(absorbed) {
            if survivor_face.distance_to_point(points[point.index()]) > epsilon {
                self.assign(point, survivor);
            } else {
                self.orphans.push(point);
            }
        }
    }

    /// Takes the orphan list, leaving it empty.
    #[inline]
    pub fn take_orphans(&mut self) -> Vec<PointId> {
        core::mem::take(&mut self.orphans)
    }

    /// Returns the point claimed by `face` that is farthest from its plane, with that distance.
    pub fn furthest_point(
        &self,
        face: FaceId,
        mesh: &HalfEdgeMesh,
        points: &[DVec3],
    ) -> Option<(PointId, f64)> {
        let plane = mesh.face(face);
        self.outside_points(face)
            .iter()
            .map(|&point| (point, plane.distance_to_point(points[point.index()])))
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
    }

    fn take_face_points(&mut self, face: FaceId) -> Vec<PointId> {
        let Some(points) = self.outside.get_mut(face.index()) else {
            return Vec::new();
        };
        let points = core::mem::take(points);
        for point in &points {
            self.owner[point.index()] = None;
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_faces() -> (HalfEdgeMesh, FaceId, FaceId) {
        let points = [DVec3::ZERO, DVec3::X, DVec3::Y];
        let corners: Vec<(PointId, DVec3)> = (0..3)
            .map(|i| (PointId(i), points[i as usize]))
            .collect();
        let mut mesh = HalfEdgeMesh::default();
        let up = mesh.add_face(&corners);
        let down = mesh.add_face(&[corners[0], corners[2], corners[1]]);
        (mesh, up, down)
    }

    #[test]
    fn assign_and_remove() {
        let (mesh, up, _) = two_faces();
        let points = vec![
            DVec3::ZERO,
            DVec3::new(0.2, 0.2, 1.0),
            DVec3::new(0.2, 0.2, 3.0),
        ];
        let mut conflicts = ConflictGraph::new(points.len());

        conflicts.assign(PointId(1), up);
        conflicts.assign(PointId(2), up);
        assert_eq!(conflicts.owner(PointId(2)), Some(up));
        assert_eq!(conflicts.num_claimed(), 2);
        assert_eq!(
            conflicts.furthest_point(up, &mesh, &points),
            Some((PointId(2), 3.0))
        );

        conflicts.remove(PointId(2));
        assert_eq!(conflicts.owner(PointId(2)), None);
        assert_eq!(conflicts.outside_points(up), &[PointId(1)]);
    }

    #[test]
    fn release_face_orphans_points() {
        let (_, up, down) = two_faces();
        let mut conflicts = ConflictGraph::new(3);
        conflicts.assign(PointId(0), up);
        conflicts.assign(PointId(1), up);

        conflicts.release_face(up);

        assert!(!conflicts.has_conflicts(up));
        assert!(!conflicts.has_conflicts(down));
        assert_eq!(conflicts.owner(PointId(0)), None);
        assert_eq!(conflicts.take_orphans(), vec![PointId(0), PointId(1)]);
        assert!(conflicts.take_orphans().is_empty());
    }

    #[test]
    fn transfer_keeps_only_points_outside_survivor() {
        let (mesh, up, down) = two_faces();
        let points = vec![DVec3::new(0.1, 0.1, -2.0), DVec3::new(0.1, 0.1, 2.0)];
        let mut conflicts = ConflictGraph::new(points.len());
        conflicts.assign(PointId(0), down);
        conflicts.assign(PointId(1), down);

        conflicts.transfer_face_points(down, up, &mesh, &points, 1e-12);

        assert_eq!(conflicts.outside_points(up), &[PointId(1)]);
        assert_eq!(conflicts.take_orphans(), vec![PointId(0)]);
    }
}
