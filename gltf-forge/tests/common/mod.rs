//! Shared document fixtures

#![allow(dead_code)]

use gltf_forge::{
    AccessorIndex, BufferIndex, Document, ElementShape, Mesh, MeshIndex, Node, Primitive, Scene,
    Semantic,
};

pub const CUBE_CORNERS: [[f32; 3]; 8] = [
    [-0.5, -0.5, -0.5],
    [0.5, -0.5, -0.5],
    [0.5, 0.5, -0.5],
    [-0.5, 0.5, -0.5],
    [-0.5, -0.5, 0.5],
    [0.5, -0.5, 0.5],
    [0.5, 0.5, 0.5],
    [-0.5, 0.5, 0.5],
];

pub const CUBE_INDICES: [u16; 36] = [
    0, 2, 1, 0, 3, 2, // back
    4, 5, 6, 4, 6, 7, // front
    0, 1, 5, 0, 5, 4, // bottom
    3, 7, 6, 3, 6, 2, // top
    0, 4, 7, 0, 7, 3, // left
    1, 2, 6, 1, 6, 5, // right
];

/// Accessors of a [`cube`] primitive
pub struct CubeAccessors {
    pub position: AccessorIndex,
    pub normal: AccessorIndex,
    pub indices: AccessorIndex,
}

/// Unit cube with corner normals, 8 vertices and 12 triangles
pub fn cube_accessors(doc: &mut Document, buffer: BufferIndex) -> CubeAccessors {
    let positions: Vec<f32> = CUBE_CORNERS.iter().flatten().copied().collect();
    let normals: Vec<f32> = CUBE_CORNERS
        .iter()
        .flat_map(|c| {
            let len = (c[0] * c[0] + c[1] * c[1] + c[2] * c[2]).sqrt();
            [c[0] / len, c[1] / len, c[2] / len]
        })
        .collect();

    let position = doc
        .add_vertex_data(buffer, ElementShape::Vec3, &positions)
        .expect("positions");
    doc.update_bounds(position).expect("position bounds");
    let normal = doc
        .add_vertex_data(buffer, ElementShape::Vec3, &normals)
        .expect("normals");
    let indices = doc
        .add_index_data(buffer, &CUBE_INDICES)
        .expect("indices");

    CubeAccessors {
        position,
        normal,
        indices,
    }
}

/// Cube mesh placed in a main scene
pub fn cube_document() -> (Document, BufferIndex, MeshIndex) {
    let mut doc = Document::new();
    let buffer = doc.create_buffer();
    let accessors = cube_accessors(&mut doc, buffer);

    let mut mesh = Mesh::new("cube");
    mesh.add_primitive(
        Primitive::new()
            .with_attribute(Semantic::Position, accessors.position)
            .with_attribute(Semantic::Normal, accessors.normal)
            .with_indices(accessors.indices),
    );
    let mesh = doc.add_mesh(mesh);
    let node = doc.add_node(Node::new("cube").with_mesh(mesh));
    let mut scene = Scene::new("main");
    scene.add_node(node);
    let scene = doc.add_scene(scene);
    doc.set_main_scene(scene);

    (doc, buffer, mesh)
}

/// Install a test subscriber honoring `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
