use crate::{
    dim3::mesh::{FaceId, HalfEdgeMesh},
    fixed_hasher::FixedHashSet,
};

/// Checks the connectivity of a single open face, panicking on the first violation.
pub fn validate_face(mesh: &HalfEdgeMesh, face: FaceId) {
    let record = mesh.face(face);
    assert!(record.is_open(), "face {face:?} is not open: {:?}", record.mark);

    let start = record.half_edge;
    let mut edge = start;
    let mut num_edges = 0;

    loop {
        let half_edge = mesh.half_edge(edge);
        num_edges += 1;
        assert!(
            num_edges <= mesh.half_edges.len(),
            "face {face:?} has an unterminated edge loop"
        );

        assert_eq!(
            half_edge.face, face,
            "edge {edge:?} in the loop of {face:?} belongs to {:?}",
            half_edge.face
        );
        assert_eq!(
            mesh.prev(half_edge.next),
            edge,
            "next and prev links disagree at edge {edge:?} of {face:?}"
        );
        assert_eq!(
            mesh.vertex(half_edge.head).half_edge,
            edge,
            "head vertex of edge {edge:?} does not point back to it"
        );

        let twin = half_edge.twin;
        assert_eq!(
            mesh.twin(twin),
            edge,
            "twin of edge {edge:?} of {face:?} does not point back to it"
        );
        let neighbor = mesh.half_edge(twin).face;
        assert_ne!(neighbor, face, "edge {edge:?} of {face:?} is its own neighbor");
        assert!(
            mesh.face(neighbor).is_open(),
            "neighbor {neighbor:?} of {face:?} across edge {edge:?} is {:?}",
            mesh.face(neighbor).mark
        );
        assert_eq!(
            mesh.head(twin).point,
            mesh.tail(edge).point,
            "edge {edge:?} of {face:?} and its twin do not share endpoints"
        );

        edge = half_edge.next;
        if edge == start {
            break;
        }
    }

    assert!(num_edges >= 3, "face {face:?} has only {num_edges} edges");
    assert_eq!(
        num_edges, record.num_vertices,
        "face {face:?} has {num_edges} edges but records {} vertices",
        record.num_vertices
    );
}

/// Checks every open face and that the open faces form a closed surface of genus zero.
pub fn validate_mesh(mesh: &HalfEdgeMesh) {
    let mut vertices = FixedHashSet::default();
    let mut num_half_edges = 0;
    let mut num_faces = 0;

    for face in mesh.open_faces() {
        validate_face(mesh, face);
        num_faces += 1;
        for edge in mesh.face_edges(face) {
            vertices.insert(mesh.head(edge).point);
            num_half_edges += 1;
        }
    }

    let euler = vertices.len() as isize - num_half_edges as isize / 2 + num_faces as isize;
    assert_eq!(
        euler, 2,
        "open faces have Euler characteristic {euler} (V = {}, E = {}, F = {num_faces})",
        vertices.len(),
        num_half_edges / 2
    );
}
