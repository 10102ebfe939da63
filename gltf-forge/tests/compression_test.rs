//! Compression bridge against the Draco backend and a recording backend

mod common;

use std::cell::Cell;

use gltf_forge::compression::KHR_DRACO_MESH_COMPRESSION;
use gltf_forge::{
    BufferIndex, BufferTarget, ComponentType, CompressionBackend, CompressionOptions, Document,
    DracoBackend, DracoMesh, ElementShape, GltfError, Mesh, MeshIndex, Primitive, PrimitiveMode,
    Semantic, StripFlags,
};

/// Backend over [`DracoMesh`] that records what it was asked to do
#[derive(Default)]
struct RecordingBackend {
    meshes_created: Cell<usize>,
    encode_calls: usize,
    encoded_points: u32,
    encoded_attributes: usize,
    last_mesh: Option<DracoMesh>,
    unsupported: Option<ComponentType>,
    fail: bool,
}

impl CompressionBackend for RecordingBackend {
    type Mesh = DracoMesh;

    fn extension_name(&self) -> &str {
        "EXT_recording"
    }

    fn supports(&self, component: ComponentType) -> bool {
        self.unsupported != Some(component)
    }

    fn new_mesh(&self) -> DracoMesh {
        self.meshes_created.set(self.meshes_created.get() + 1);
        DracoMesh::new()
    }

    fn encode(&mut self, mesh: &DracoMesh, _options: &CompressionOptions) -> Result<Vec<u8>, String> {
        self.encode_calls += 1;
        self.encoded_points = mesh.num_points();
        self.encoded_attributes = mesh.num_attributes();
        self.last_mesh = Some(mesh.clone());
        if self.fail {
            return Err("out of memory".to_string());
        }
        Ok(vec![0xAB; 5])
    }
}

impl RecordingBackend {
    fn untouched(&self) -> bool {
        self.meshes_created.get() == 0 && self.encode_calls == 0
    }
}

fn compress<B: CompressionBackend>(
    doc: &mut Document,
    mesh: MeshIndex,
    buffer: BufferIndex,
    backend: &mut B,
    options: &CompressionOptions,
) -> gltf_forge::Result<gltf_forge::CompressionRecord> {
    doc.compress_primitive(mesh, 0, buffer, backend, options)
}

#[test]
fn test_cube_with_draco() {
    common::init_tracing();
    let (mut doc, buffer, mesh) = common::cube_document();
    let mut backend = DracoBackend::new();

    let record = compress(
        &mut doc,
        mesh,
        buffer,
        &mut backend,
        &CompressionOptions::default(),
    )
    .unwrap();

    assert_eq!(record.extension(), KHR_DRACO_MESH_COMPRESSION);
    let view = doc.view(record.buffer_view()).unwrap();
    assert!(view.byte_length() > 0);
    let stream = doc.view_bytes(record.buffer_view()).unwrap();
    assert_eq!(&stream[0..5], b"DRACO");

    assert_eq!(record.attributes().len(), 2);
    assert_eq!(record.attributes()[&Semantic::Position], 0);
    assert_eq!(record.attributes()[&Semantic::Normal], 1);

    let ext = KHR_DRACO_MESH_COMPRESSION;
    assert_eq!(doc.extensions_used(), [ext.to_string()]);
    assert_eq!(doc.extensions_required(), [ext.to_string()]);

    let json = doc.to_json().unwrap();
    let primitive = &json["meshes"][0]["primitives"][0];
    assert_eq!(
        primitive["extensions"][ext]["bufferView"],
        record.buffer_view().index()
    );
    assert_eq!(primitive["extensions"][ext]["attributes"]["POSITION"], 0);
    assert_eq!(primitive["extensions"][ext]["attributes"]["NORMAL"], 1);
    assert_eq!(json["extensionsRequired"][0], "KHR_draco_mesh_compression");

    let glb = doc.to_glb().unwrap();
    assert_eq!(&glb[0..4], b"glTF");
}

#[test]
fn test_each_index_becomes_a_point() {
    let (mut doc, buffer, mesh) = common::cube_document();
    let mut backend = RecordingBackend::default();
    compress(
        &mut doc,
        mesh,
        buffer,
        &mut backend,
        &CompressionOptions::default(),
    )
    .unwrap();

    assert_eq!(backend.meshes_created.get(), 1);
    assert_eq!(backend.encode_calls, 1);
    assert_eq!(backend.encoded_points, 36);
    assert_eq!(backend.encoded_attributes, 2);
}

#[test]
fn test_deduplicate_merges_shared_corners() {
    let (mut doc, buffer, mesh) = common::cube_document();
    let mut backend = RecordingBackend::default();
    let options = CompressionOptions {
        deduplicate: true,
        ..CompressionOptions::default()
    };
    compress(&mut doc, mesh, buffer, &mut backend, &options).unwrap();

    assert_eq!(backend.encoded_points, 8);
}

#[test]
fn test_strip_flags_skip_normals() {
    let (mut doc, buffer, mesh) = common::cube_document();
    let mut backend = RecordingBackend::default();
    let options = CompressionOptions {
        strip: StripFlags {
            normals: true,
            ..StripFlags::default()
        },
        ..CompressionOptions::default()
    };
    let record = compress(&mut doc, mesh, buffer, &mut backend, &options).unwrap();

    assert_eq!(backend.encoded_attributes, 1);
    assert_eq!(record.attributes().len(), 1);
    assert!(record.attributes().contains_key(&Semantic::Position));
}

#[test]
fn test_non_triangle_mode_rejected_before_backend() {
    let mut doc = Document::new();
    let buffer = doc.create_buffer();
    let accessors = common::cube_accessors(&mut doc, buffer);
    let mut mesh = Mesh::new("lines");
    mesh.add_primitive(
        Primitive::new()
            .with_attribute(Semantic::Position, accessors.position)
            .with_indices(accessors.indices)
            .with_mode(PrimitiveMode::Lines),
    );
    let mesh = doc.add_mesh(mesh);
    let before = doc.buffers()[0].len();

    let mut backend = RecordingBackend::default();
    let err = compress(
        &mut doc,
        mesh,
        buffer,
        &mut backend,
        &CompressionOptions::default(),
    )
    .unwrap_err();

    assert!(matches!(err, GltfError::Validation(_)));
    assert!(backend.untouched());
    assert_eq!(doc.buffers()[0].len(), before);
    assert!(doc.extensions_used().is_empty());
}

#[test]
fn test_missing_indices_rejected() {
    let mut doc = Document::new();
    let buffer = doc.create_buffer();
    let accessors = common::cube_accessors(&mut doc, buffer);
    let mut mesh = Mesh::new("soup");
    mesh.add_primitive(Primitive::new().with_attribute(Semantic::Position, accessors.position));
    let mesh = doc.add_mesh(mesh);

    let mut backend = RecordingBackend::default();
    let err = compress(
        &mut doc,
        mesh,
        buffer,
        &mut backend,
        &CompressionOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, GltfError::Validation(_)));
    assert!(backend.untouched());
}

#[test]
fn test_byte_indices_unsupported() {
    let mut doc = Document::new();
    let buffer = doc.create_buffer();
    let accessors = common::cube_accessors(&mut doc, buffer);
    let narrow: Vec<u8> = common::CUBE_INDICES.iter().map(|&i| i as u8).collect();
    let indices = doc.add_index_data(buffer, &narrow).unwrap();
    let mut mesh = Mesh::new("cube");
    mesh.add_primitive(
        Primitive::new()
            .with_attribute(Semantic::Position, accessors.position)
            .with_indices(indices),
    );
    let mesh = doc.add_mesh(mesh);

    let mut backend = RecordingBackend::default();
    let err = compress(
        &mut doc,
        mesh,
        buffer,
        &mut backend,
        &CompressionOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, GltfError::UnsupportedType(_)));
    assert!(backend.untouched());
}

#[test]
fn test_unsupported_component_rejected() {
    let (mut doc, buffer, mesh) = common::cube_document();
    let mut backend = RecordingBackend {
        unsupported: Some(ComponentType::Float32),
        ..RecordingBackend::default()
    };
    let err = compress(
        &mut doc,
        mesh,
        buffer,
        &mut backend,
        &CompressionOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, GltfError::UnsupportedType(_)));
    assert!(backend.untouched());
}

#[test]
fn test_index_beyond_attribute_rejected() {
    let mut doc = Document::new();
    let buffer = doc.create_buffer();
    let positions = [0.0f32; 9];
    let position = doc
        .add_vertex_data(buffer, ElementShape::Vec3, &positions)
        .unwrap();
    let indices = doc.add_index_data(buffer, &[0u16, 1, 3]).unwrap();
    let mut mesh = Mesh::new("tri");
    mesh.add_primitive(
        Primitive::new()
            .with_attribute(Semantic::Position, position)
            .with_indices(indices),
    );
    let mesh = doc.add_mesh(mesh);

    let mut backend = RecordingBackend::default();
    let err = compress(
        &mut doc,
        mesh,
        buffer,
        &mut backend,
        &CompressionOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, GltfError::Validation(_)));
    assert!(backend.untouched());
}

#[test]
fn test_backend_failure_leaves_document_unchanged() {
    let (mut doc, buffer, mesh) = common::cube_document();
    let before = doc.buffers()[0].len();
    let views = doc.views().len();
    let mut backend = RecordingBackend {
        fail: true,
        ..RecordingBackend::default()
    };

    let err = compress(
        &mut doc,
        mesh,
        buffer,
        &mut backend,
        &CompressionOptions::default(),
    )
    .unwrap_err();

    match err {
        GltfError::Encoding(message) => assert!(message.contains("out of memory")),
        other => panic!("expected encoding error, got {other:?}"),
    }
    assert_eq!(backend.encode_calls, 1);
    assert_eq!(doc.buffers()[0].len(), before);
    assert_eq!(doc.views().len(), views);
    assert!(doc.mesh(mesh).unwrap().primitives[0].compression().is_none());
    assert!(doc.extensions_required().is_empty());
}

#[test]
fn test_primitive_compressed_once() {
    let (mut doc, buffer, mesh) = common::cube_document();
    let mut backend = RecordingBackend::default();
    let options = CompressionOptions::default();
    compress(&mut doc, mesh, buffer, &mut backend, &options).unwrap();

    let err = compress(&mut doc, mesh, buffer, &mut backend, &options).unwrap_err();
    assert!(matches!(err, GltfError::Validation(_)));
    assert_eq!(backend.encode_calls, 1);
    assert_eq!(doc.extensions_used().len(), 1);
}

#[test]
fn test_level_above_maximum_rejected() {
    let (mut doc, buffer, mesh) = common::cube_document();
    let mut backend = RecordingBackend::default();
    let options = CompressionOptions {
        compression_level: 11,
        ..CompressionOptions::default()
    };
    let err = compress(&mut doc, mesh, buffer, &mut backend, &options).unwrap_err();
    assert!(matches!(err, GltfError::Validation(_)));
    assert!(backend.untouched());
}

/// Quad with POSITION and TEXCOORD_0 interleaved at stride 20, u32 indices
fn interleaved_quad() -> (Document, BufferIndex, MeshIndex) {
    let mut doc = Document::new();
    let buffer = doc.create_buffer();

    // x y z u v
    let vertices: [f32; 20] = [
        0.0, 0.0, 0.0, 0.0, 0.0, //
        1.0, 0.0, 0.0, 1.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, 1.0, //
        1.0, 1.0, 0.0, 1.0, 1.0, //
    ];
    let bytes: Vec<u8> = vertices.iter().flat_map(|f| f.to_le_bytes()).collect();
    let view = doc.add_data(buffer, &bytes);
    let position = doc.create_accessor(
        view,
        ElementShape::Vec3,
        ComponentType::Float32,
        4,
        Some(BufferTarget::ArrayBuffer),
    );
    doc.set_accessor_interleaved(position, 0, 20).unwrap();
    let texcoord = doc.create_accessor(view, ElementShape::Vec2, ComponentType::Float32, 4, None);
    doc.set_accessor_interleaved(texcoord, 12, 20).unwrap();
    let indices = doc.add_index_data(buffer, &[0u32, 1, 2, 2, 1, 3]).unwrap();

    let mut mesh = Mesh::new("quad");
    mesh.add_primitive(
        Primitive::new()
            .with_attribute(Semantic::Position, position)
            .with_attribute(Semantic::TexCoord(0), texcoord)
            .with_indices(indices),
    );
    let mesh = doc.add_mesh(mesh);
    (doc, buffer, mesh)
}

#[test]
fn test_interleaved_attributes_with_u32_indices() {
    let (mut doc, buffer, mesh) = interleaved_quad();
    let mut backend = RecordingBackend::default();
    let record = compress(
        &mut doc,
        mesh,
        buffer,
        &mut backend,
        &CompressionOptions::default(),
    )
    .unwrap();

    assert_eq!(record.attributes().len(), 2);
    assert_eq!(record.attributes()[&Semantic::Position], 0);
    assert_eq!(record.attributes()[&Semantic::TexCoord(0)], 1);
    assert_eq!(backend.encoded_points, 6);
    assert_eq!(backend.encoded_attributes, 2);

    // Point p maps to index value p for both attributes
    let encoded = backend.last_mesh.as_ref().unwrap();
    assert_eq!(encoded.mapped_value(0, 3), Some(2));
    assert_eq!(encoded.mapped_value(1, 3), Some(2));
    assert_eq!(encoded.mapped_value(1, 5), Some(3));
}

#[test]
fn test_interleaved_quad_with_draco() {
    let (mut doc, buffer, mesh) = interleaved_quad();
    let record = compress(
        &mut doc,
        mesh,
        buffer,
        &mut DracoBackend::new(),
        &CompressionOptions::default(),
    )
    .unwrap();

    assert_eq!(record.attributes()[&Semantic::Position], 0);
    assert_eq!(record.attributes()[&Semantic::TexCoord(0)], 1);
    assert_eq!(&doc.view_bytes(record.buffer_view()).unwrap()[0..5], b"DRACO");
    let json = doc.to_json().unwrap();
    assert_eq!(
        json["meshes"][0]["primitives"][0]["extensions"][KHR_DRACO_MESH_COMPRESSION]["attributes"]
            ["TEXCOORD_0"],
        1
    );
}
