//! Arena-backed half-edge mesh holding the boundary of the hull under construction.
//!
//! All records live in flat vectors and refer to each other through index newtypes, so mesh
//! surgery never has to juggle borrows. Records are never freed: faces that leave the boundary
//! are only marked, and their half-edges and vertices simply become unreachable.

use glam::DVec3;

use crate::fixed_hasher::{FixedHashMap, FixedHasher};

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $name {
            /// A placeholder that does not refer to any record.
            pub const PLACEHOLDER: $name = $name(u32::MAX);

            /// Returns the underlying index as a `usize`.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl From<usize> for $name {
            /// # Panics
            ///
            /// Panics if `value` does not fit in a `u32`.
            #[inline]
            fn from(value: usize) -> Self {
                let index = u32::try_from(value)
                    .expect(concat!(stringify!($name), " index does not fit in a u32"));
                $name(index)
            }
        }
    };
}

arena_id!(
    /// The index of a point in the input point set.
    PointId
);
arena_id!(
    /// The index of a [`Vertex`] in a [`HalfEdgeMesh`].
    VertexId
);
arena_id!(
    /// The index of a [`HalfEdge`] in a [`HalfEdgeMesh`].
    HalfEdgeId
);
arena_id!(
    /// The index of a [`Face`] in a [`HalfEdgeMesh`].
    FaceId
);

/// A face corner. Every face owns its own corners, so two faces meeting at the same input point
/// have distinct vertex records with the same position.
#[derive(Clone, Copy, Debug)]
pub struct Vertex {
    /// The coordinates of the corner.
    pub position: DVec3,
    /// The input point this corner was created from.
    pub point: PointId,
    /// The half-edge whose head is this vertex.
    pub half_edge: HalfEdgeId,
}

/// A directed edge belonging to exactly one face.
#[derive(Clone, Copy, Debug)]
pub struct HalfEdge {
    /// The vertex this edge points to.
    pub head: VertexId,
    /// The oppositely directed edge on the neighboring face.
    pub twin: HalfEdgeId,
    /// The next edge around the face, counterclockwise when seen from outside.
    pub next: HalfEdgeId,
    /// The previous edge around the face.
    pub prev: HalfEdgeId,
    /// The face this edge bounds.
    pub face: FaceId,
}

/// The lifecycle state of a [`Face`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaceMark {
    /// The face is part of the current hull boundary.
    Open,
    /// The face was absorbed into a neighbor.
    Merged,
    /// The face was visible from an eye point and removed.
    Closed,
}

/// A planar polygon of the hull boundary.
#[derive(Clone, Copy, Debug)]
pub struct Face {
    /// One of the edges of the face loop.
    pub half_edge: HalfEdgeId,
    /// The unit outward normal.
    pub normal: DVec3,
    /// The signed distance of the face plane from the origin along `normal`.
    pub offset: f64,
    /// The average of the corner positions.
    pub centroid: DVec3,
    /// The area of the polygon.
    pub area: f64,
    /// The number of edges in the face loop.
    pub num_vertices: usize,
    /// The lifecycle state.
    pub mark: FaceMark,
}

impl Face {
    /// Returns the signed distance from the face plane to `point`.
    ///
    /// Positive distances are outside the hull.
    #[inline]
    pub fn distance_to_point(&self, point: DVec3) -> f64 {
        self.normal.dot(point) - self.offset
    }

    /// Returns `true` if the face is still part of the hull boundary.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.mark == FaceMark::Open
    }
}

/// A doubly-connected edge list.
#[derive(Clone, Debug, Default)]
pub struct HalfEdgeMesh {
    pub vertices: Vec<Vertex>,
    pub half_edges: Vec<HalfEdge>,
    pub faces: Vec<Face>,
}

impl HalfEdgeMesh {
    #[inline]
    pub fn with_capacity(num_points: usize) -> Self {
        // A triangulated hull of `n` points has at most `2n - 4` faces and `6n - 12` half-edges.
        let num_faces = 2 * num_points.max(4);
        Self {
            vertices: Vec::with_capacity(3 * num_faces),
            half_edges: Vec::with_capacity(3 * num_faces),
            faces: Vec::with_capacity(num_faces),
        }
    }

    #[inline]
    pub fn face(&self, face: FaceId) -> &Face {
        &self.faces[face.index()]
    }

    #[inline]
    pub fn face_mut(&mut self, face: FaceId) -> &mut Face {
        &mut self.faces[face.index()]
    }

    #[inline]
    pub fn half_edge(&self, edge: HalfEdgeId) -> &HalfEdge {
        &self.half_edges[edge.index()]
    }

    #[inline]
    pub fn half_edge_mut(&mut self, edge: HalfEdgeId) -> &mut HalfEdge {
        &mut self.half_edges[edge.index()]
    }

    #[inline]
    pub fn vertex(&self, vertex: VertexId) -> &Vertex {
        &self.vertices[vertex.index()]
    }

    #[inline]
    pub fn next(&self, edge: HalfEdgeId) -> HalfEdgeId {
        self.half_edge(edge).next
    }

    #[inline]
    pub fn prev(&self, edge: HalfEdgeId) -> HalfEdgeId {
        self.half_edge(edge).prev
    }

    #[inline]
    pub fn twin(&self, edge: HalfEdgeId) -> HalfEdgeId {
        self.half_edge(edge).twin
    }

    /// Returns the face on the other side of `edge`.
    #[inline]
    pub fn twin_face(&self, edge: HalfEdgeId) -> FaceId {
        self.half_edge(self.twin(edge)).face
    }

    #[inline]
    pub fn head(&self, edge: HalfEdgeId) -> &Vertex {
        self.vertex(self.half_edge(edge).head)
    }

    /// Returns the vertex `edge` starts from, which is the head of its predecessor.
    #[inline]
    pub fn tail(&self, edge: HalfEdgeId) -> &Vertex {
        self.head(self.prev(edge))
    }

    /// Pairs two half-edges as twins of each other.
    #[inline]
    pub fn set_twins(&mut self, a: HalfEdgeId, b: HalfEdgeId) {
        self.half_edge_mut(a).twin = b;
        self.half_edge_mut(b).twin = a;
    }

    /// Returns the IDs of the faces that are still part of the boundary.
    pub fn open_faces(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.faces
            .iter()
            .enumerate()
            .filter(|(_, face)| face.is_open())
            .map(|(i, _)| FaceId::from(i))
    }

    /// Returns an iterator over the edges of a face loop, starting at the face's stored edge.
    pub fn face_edges(&self, face: FaceId) -> FaceEdges<'_> {
        let start = self.face(face).half_edge;
        FaceEdges {
            mesh: self,
            start,
            current: Some(start),
        }
    }

    /// Returns the input points at the corners of a face, in loop order.
    pub fn face_points(&self, face: FaceId) -> Vec<PointId> {
        self.face_edges(face)
            .map(|edge| self.head(edge).point)
            .collect()
    }

    /// Adds a face with the given corners and returns its ID.
    ///
    /// Edge `i` of the new loop points from corner `i - 1` to corner `i`. The twins are left as
    /// placeholders for the caller to pair.
    pub fn add_face(&mut self, corners: &[(PointId, DVec3)]) -> FaceId {
        let n = corners.len();
        assert!(n >= 3, "a face needs at least three corners, got {n}");

        let face = FaceId::from(self.faces.len());
        let base = self.half_edges.len();

        for (i, &(point, position)) in corners.iter().enumerate() {
            let vertex = VertexId::from(self.vertices.len());
            let edge = HalfEdgeId::from(base + i);
            self.vertices.push(Vertex {
                position,
                point,
                half_edge: edge,
            });
            self.half_edges.push(HalfEdge {
                head: vertex,
                twin: HalfEdgeId::PLACEHOLDER,
                next: HalfEdgeId::from(base + (i + 1) % n),
                prev: HalfEdgeId::from(base + (i + n - 1) % n),
                face,
            });
        }

        self.faces.push(Face {
            half_edge: HalfEdgeId::from(base),
            normal: DVec3::ZERO,
            offset: 0.0,
            centroid: DVec3::ZERO,
            area: 0.0,
            num_vertices: n,
            mark: FaceMark::Open,
        });
        self.compute_plane(face);

        face
    }

    /// Pairs every unpaired edge of `faces` with the oppositely directed edge between the same
    /// input points.
    pub fn pair_twins(&mut self, faces: &[FaceId]) {
        let mut edge_map: FixedHashMap<(PointId, PointId), HalfEdgeId> =
            FixedHashMap::with_capacity_and_hasher(3 * faces.len(), FixedHasher);

        for &face in faces {
            for edge in self.face_edges(face) {
                edge_map.insert((self.tail(edge).point, self.head(edge).point), edge);
            }
        }

        for &face in faces {
            let edges: Vec<HalfEdgeId> = self.face_edges(face).collect();
            for edge in edges {
                if self.twin(edge) != HalfEdgeId::PLACEHOLDER {
                    continue;
                }
                let key = (self.head(edge).point, self.tail(edge).point);
                if let Some(&twin) = edge_map.get(&key) {
                    self.set_twins(edge, twin);
                }
            }
        }
    }

    /// Recomputes the normal, offset, centroid, area and vertex count of a face from its loop.
    ///
    /// The normal is the sum of the fan triangle normals around the first corner, which stays
    /// well-defined for polygons produced by merging.
    pub fn compute_plane(&mut self, face: FaceId) {
        let start = self.face(face).half_edge;
        let p0 = self.head(start).position;

        let mut edge = self.next(start);
        let mut d2 = self.head(edge).position - p0;
        let mut centroid = p0 + self.head(edge).position;
        let mut normal = DVec3::ZERO;
        let mut num_vertices = 2;

        edge = self.next(edge);
        while edge != start {
            let position = self.head(edge).position;
            let d1 = d2;
            d2 = position - p0;
            normal += d1.cross(d2);
            centroid += position;
            num_vertices += 1;
            edge = self.next(edge);
        }

        let face = self.face_mut(face);
        face.area = 0.5 * normal.length();
        face.normal = normal.normalize_or_zero();
        face.centroid = centroid / num_vertices as f64;
        face.offset = face.normal.dot(face.centroid);
        face.num_vertices = num_vertices;
    }

    /// Builds the cone of triangles connecting `eye` to a closed horizon loop.
    ///
    /// Each horizon edge `u -> v` lies on a closed face, and its twin on the face that stays. The
    /// new triangle `(eye, u, v)` takes over the closed face's orientation along that edge, so its
    /// base is paired with the twin and its normal points outward. The lateral edges are paired
    /// with the neighboring triangles of the cone.
    pub fn add_cone(
        &mut self,
        eye: PointId,
        eye_position: DVec3,
        horizon: &[HalfEdgeId],
    ) -> Vec<FaceId> {
        let mut new_faces = Vec::with_capacity(horizon.len());
        let mut first_side: Option<HalfEdgeId> = None;
        let mut previous_side: Option<HalfEdgeId> = None;

        for &horizon_edge in horizon {
            let tail = *self.tail(horizon_edge);
            let head = *self.head(horizon_edge);
            let outer_twin = self.twin(horizon_edge);

            let face = self.add_face(&[
                (eye, eye_position),
                (tail.point, tail.position),
                (head.point, head.position),
            ]);

            // Edge 0 runs `head -> eye`, edge 1 `eye -> tail` and edge 2 `tail -> head`.
            let to_eye = self.face(face).half_edge;
            let from_eye = self.next(to_eye);
            let base = self.prev(to_eye);

            self.set_twins(base, outer_twin);

            match previous_side {
                Some(previous) => self.set_twins(from_eye, previous),
                None => first_side = Some(from_eye),
            }
            previous_side = Some(to_eye);

            new_faces.push(face);
        }

        if let (Some(first), Some(last)) = (first_side, previous_side) {
            self.set_twins(first, last);
        }

        new_faces
    }
}

/// An iterator over the half-edges of a face loop.
pub struct FaceEdges<'a> {
    mesh: &'a HalfEdgeMesh,
    start: HalfEdgeId,
    current: Option<HalfEdgeId>,
}

impl Iterator for FaceEdges<'_> {
    type Item = HalfEdgeId;

    fn next(&mut self) -> Option<Self::Item> {
        let edge = self.current?;
        let next = self.mesh.next(edge);
        self.current = (next != self.start).then_some(next);
        Some(edge)
    }
}
