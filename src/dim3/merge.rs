//! Merging of new faces with their neighbors.
//!
//! After a cone of triangles is attached to the horizon, adjacent faces that are coplanar or
//! concave within the tolerance are merged into single polygons. This keeps every face of the
//! boundary strictly convex and prevents slivers from accumulating round-off error.
//!
//! A merge is refused if it would fold the surface onto itself, leaving a face with fewer than
//! three edges or a face on both sides of one of its edges. That only happens once the whole
//! hull is flatter than the tolerance, and the caller then resolves the input as coplanar.

use glam::DVec3;

use crate::dim3::{
    conflict_graph::ConflictGraph,
    mesh::{FaceId, FaceMark, HalfEdgeId, HalfEdgeMesh},
};

/// Decides which plane is used to test the edge between two faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergePolicy {
    /// Only the plane of the face with the larger area is trusted.
    ///
    /// The larger face only lends its plane to the test. The scanned face is still the one
    /// that survives the merge.
    LargerFace,
    /// Merge if either face sees the centroid of the other on or above its plane.
    Either,
}

/// The result of scanning the edges of one face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AdjacentMerge {
    Merged,
    Convex,
    /// The smaller face was non-convex against a neighbor, but the larger face's plane did
    /// not allow the merge.
    Deferred,
    /// A neighbor had to be merged, but absorbing it would fold the surface onto itself.
    Collapsed,
}

/// Counts of what the merge passes did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// The number of faces absorbed into a neighbor.
    pub merged: usize,
    /// The number of faces left for the second pass.
    pub deferred: usize,
    /// Whether a merge was refused because the hull has flattened into a plane.
    pub collapsed: bool,
}

/// The chain of edges a face shares with the neighbor it absorbs.
#[derive(Clone, Copy, Debug)]
struct SharedChain {
    survivor: FaceId,
    absorbed: FaceId,
    /// The survivor's edges just before and after the chain.
    adjacent_prev: HalfEdgeId,
    adjacent_next: HalfEdgeId,
    /// The absorbed face's edges just before and after the chain.
    opposite_prev: HalfEdgeId,
    opposite_next: HalfEdgeId,
    len: usize,
}

impl SharedChain {
    /// Extends the shared chain through `edge` in both directions.
    ///
    /// Returns `None` if the chain runs around the whole loop of the survivor.
    fn find(mesh: &HalfEdgeMesh, edge: HalfEdgeId) -> Option<Self> {
        let survivor = mesh.half_edge(edge).face;
        let absorbed = mesh.twin_face(edge);
        let num_vertices = mesh.face(survivor).num_vertices;
        let twin = mesh.twin(edge);

        let mut chain = SharedChain {
            survivor,
            absorbed,
            adjacent_prev: mesh.prev(edge),
            adjacent_next: mesh.next(edge),
            opposite_prev: mesh.prev(twin),
            opposite_next: mesh.next(twin),
            len: 1,
        };

        while mesh.twin_face(chain.adjacent_prev) == absorbed {
            if chain.len >= num_vertices {
                return None;
            }
            chain.adjacent_prev = mesh.prev(chain.adjacent_prev);
            chain.opposite_next = mesh.next(chain.opposite_next);
            chain.len += 1;
        }
        while mesh.twin_face(chain.adjacent_next) == absorbed {
            if chain.len >= num_vertices {
                return None;
            }
            chain.opposite_prev = mesh.prev(chain.opposite_prev);
            chain.adjacent_next = mesh.next(chain.adjacent_next);
            chain.len += 1;
        }

        Some(chain)
    }

    /// Returns the two places where the loops of the survivor and the absorbed face are
    /// joined, as `(prev, edge)` pairs in the order they are connected.
    fn joints(&self) -> [(HalfEdgeId, HalfEdgeId); 2] {
        [
            (self.opposite_prev, self.adjacent_next),
            (self.adjacent_prev, self.opposite_next),
        ]
    }

    /// Returns `true` if absorbing the neighbor would leave a face with fewer than three
    /// edges, or a face bordering itself.
    fn folds(&self, mesh: &HalfEdgeMesh) -> bool {
        let Self {
            survivor, absorbed, ..
        } = *self;
        if survivor == absorbed {
            return true;
        }

        let survivor_len = mesh.face(survivor).num_vertices;
        let absorbed_len = mesh.face(absorbed).num_vertices;
        if self.len >= absorbed_len {
            return true;
        }

        // Any other edge shared with the absorbed face would end up inside the merged loop.
        let shared = mesh
            .face_edges(survivor)
            .filter(|&edge| mesh.twin_face(edge) == absorbed)
            .count();
        if shared != self.len {
            return true;
        }

        // A joint whose two edges border the same face removes the vertex between them.
        let redundant = self.joints().map(|(prev, edge)| {
            let face = mesh.twin_face(edge);
            (mesh.twin_face(prev) == face).then_some((face, edge))
        });
        let num_redundant = redundant.iter().flatten().count();

        if survivor_len + absorbed_len - 2 * self.len - num_redundant < 3 {
            return true;
        }
        if num_redundant > 0
            && (self.adjacent_prev == self.adjacent_next
                || self.opposite_prev == self.opposite_next)
        {
            return true;
        }

        for (i, joint) in redundant.iter().enumerate() {
            let Some((face, edge)) = *joint else {
                continue;
            };
            let other = redundant[1 - i].map(|(other, _)| other);
            if face == survivor || face == absorbed || Some(face) == other {
                return true;
            }
            if mesh.face(face).num_vertices == 3 {
                // The triangle is deleted, and its third neighbor moves next to the survivor.
                let third = mesh.twin_face(mesh.prev(mesh.twin(edge)));
                if third == survivor || third == absorbed || Some(third) == other {
                    return true;
                }
            }
        }

        false
    }
}

/// Shared state of the merge passes.
pub struct FaceMerger<'a> {
    pub mesh: &'a mut HalfEdgeMesh,
    pub conflicts: &'a mut ConflictGraph,
    pub points: &'a [DVec3],
    pub epsilon: f64,
}

impl FaceMerger<'_> {
    /// Runs both merge passes over the faces of a new cone.
    ///
    /// The passes stop early if a merge would fold the surface onto itself, with
    /// [`MergeStats::collapsed`] set. The mesh is left valid but not fully merged.
    pub fn merge_new_faces(&mut self, new_faces: &[FaceId]) -> MergeStats {
        let mut stats = MergeStats::default();

        for &face in new_faces {
            if !self.mesh.face(face).is_open() {
                continue;
            }
            loop {
                match self.do_adjacent_merge(face, MergePolicy::LargerFace) {
                    AdjacentMerge::Merged => stats.merged += 1,
                    AdjacentMerge::Deferred => {
                        stats.deferred += 1;
                        break;
                    }
                    AdjacentMerge::Convex => break,
                    AdjacentMerge::Collapsed => {
                        stats.collapsed = true;
                        return stats;
                    }
                }
            }
        }

        for &face in new_faces {
            if !self.mesh.face(face).is_open() {
                continue;
            }
            loop {
                match self.do_adjacent_merge(face, MergePolicy::Either) {
                    AdjacentMerge::Merged => stats.merged += 1,
                    AdjacentMerge::Collapsed => {
                        stats.collapsed = true;
                        return stats;
                    }
                    AdjacentMerge::Convex | AdjacentMerge::Deferred => break,
                }
            }
        }

        stats
    }

    /// Returns the signed distance from the plane of `edge`'s face to the centroid of the face
    /// across it.
    fn opposite_face_distance(&self, edge: HalfEdgeId) -> f64 {
        let face = self.mesh.face(self.mesh.half_edge(edge).face);
        let opposite = self.mesh.face(self.mesh.twin_face(edge));
        face.distance_to_point(opposite.centroid)
    }

    /// Scans the edges of `face` and merges it with the first neighbor that fails the
    /// convexity test of `policy`.
    fn do_adjacent_merge(&mut self, face: FaceId, policy: MergePolicy) -> AdjacentMerge {
        let start = self.mesh.face(face).half_edge;
        let threshold = -self.epsilon;
        let mut convex = true;
        let mut edge = start;

        loop {
            let twin = self.mesh.twin(edge);
            let merge = match policy {
                MergePolicy::Either => {
                    self.opposite_face_distance(edge) >= threshold
                        || self.opposite_face_distance(twin) >= threshold
                }
                MergePolicy::LargerFace => {
                    let area = self.mesh.face(face).area;
                    let opposite_area = self.mesh.face(self.mesh.twin_face(edge)).area;

                    // Test with the plane of the larger face, and only note a violation seen
                    // from the smaller one.
                    let (trusted, other) = if area > opposite_area {
                        (edge, twin)
                    } else {
                        (twin, edge)
                    };
                    if self.opposite_face_distance(trusted) >= threshold {
                        true
                    } else {
                        if self.opposite_face_distance(other) >= threshold {
                            convex = false;
                        }
                        false
                    }
                }
            };

            if merge {
                let chain = SharedChain::find(self.mesh, edge);
                let Some(chain) = chain.filter(|chain| !chain.folds(self.mesh)) else {
                    tracing::debug!(
                        ?face,
                        neighbor = ?self.mesh.twin_face(edge),
                        "merge would fold the hull onto itself"
                    );
                    return AdjacentMerge::Collapsed;
                };

                let discarded = self.absorb_adjacent_face(chain);
                for absorbed in discarded {
                    self.conflicts.transfer_face_points(
                        absorbed,
                        face,
                        self.mesh,
                        self.points,
                        self.epsilon,
                    );
                }
                return AdjacentMerge::Merged;
            }

            edge = self.mesh.next(edge);
            if edge == start {
                break;
            }
        }

        if convex {
            AdjacentMerge::Convex
        } else {
            AdjacentMerge::Deferred
        }
    }

    /// Merges the absorbed face of `chain` into its survivor, returning the faces that were
    /// discarded in the process.
    ///
    /// The shared chain of edges is removed, and the remaining edges of the absorbed face are
    /// spliced into the survivor's loop. Where this leaves two consecutive edges bordering the
    /// same third face, the redundant vertex between them is removed as well.
    fn absorb_adjacent_face(&mut self, chain: SharedChain) -> Vec<FaceId> {
        let mesh = &mut *self.mesh;
        let SharedChain {
            survivor,
            absorbed,
            adjacent_prev,
            adjacent_next,
            opposite_prev,
            opposite_next,
            ..
        } = chain;

        tracing::trace!(?survivor, ?absorbed, "merging faces");

        let mut discarded = vec![absorbed];
        mesh.face_mut(absorbed).mark = FaceMark::Merged;

        // Hand the absorbed face's remaining edges over to the survivor.
        let end = mesh.next(opposite_prev);
        let mut moved = opposite_next;
        while moved != end {
            mesh.half_edge_mut(moved).face = survivor;
            moved = mesh.next(moved);
        }

        mesh.face_mut(survivor).half_edge = adjacent_next;

        discarded.extend(connect_half_edges(mesh, survivor, opposite_prev, adjacent_next));
        discarded.extend(connect_half_edges(mesh, survivor, adjacent_prev, opposite_next));

        mesh.compute_plane(survivor);

        discarded
    }
}
/// Links `prev` to `edge` in the loop of `survivor`.
///
/// If both edges border the same face, the vertex between them is redundant: `prev` is dropped,
/// and `edge` is paired with the matching edge of that face. A triangle on the other side is
/// discarded entirely and returned, while a larger face just loses an edge.
fn connect_half_edges(
    mesh: &mut HalfEdgeMesh,
    survivor: FaceId,
    prev: HalfEdgeId,
    edge: HalfEdgeId,
) -> Option<FaceId> {
    if mesh.twin_face(prev) != mesh.twin_face(edge) {
        mesh.half_edge_mut(prev).next = edge;
        mesh.half_edge_mut(edge).prev = prev;
        return None;
    }

    let opposite = mesh.twin_face(edge);
    let mut discarded = None;

    if mesh.face(survivor).half_edge == prev {
        mesh.face_mut(survivor).half_edge = edge;
    }

    let opposite_edge = if mesh.face(opposite).num_vertices == 3 {
        // Get rid of the opposite face altogether.
        mesh.face_mut(opposite).mark = FaceMark::Merged;
        discarded = Some(opposite);
        mesh.twin(mesh.prev(mesh.twin(edge)))
    } else {
        let opposite_edge = mesh.next(mesh.twin(edge));
        let removed = mesh.prev(opposite_edge);
        if mesh.face(opposite).half_edge == removed {
            mesh.face_mut(opposite).half_edge = opposite_edge;
        }
        let new_prev = mesh.prev(removed);
        mesh.half_edge_mut(opposite_edge).prev = new_prev;
        mesh.half_edge_mut(new_prev).next = opposite_edge;
        opposite_edge
    };

    let new_prev = mesh.prev(prev);
    mesh.half_edge_mut(edge).prev = new_prev;
    mesh.half_edge_mut(new_prev).next = edge;
    mesh.set_twins(edge, opposite_edge);

    if discarded.is_none() {
        mesh.compute_plane(opposite);
    }

    discarded
}
