//! GLB container output, checked byte by byte and re-parsed with the gltf crate

mod common;

use gltf_forge::{Document, GltfError, glb};
use tempfile::tempdir;

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
}

#[test]
fn test_chunks_are_padded_to_four_bytes() {
    let json = r#"{"asset":{"version":"2.0"},"a":1}"#;
    let json = format!("{json:<37}");
    assert_eq!(json.len(), 37);
    let bin: Vec<u8> = (0..100u8).collect();

    let glb = glb::encode(&json, &[&bin[..]]).unwrap();

    assert_eq!(read_u32(&glb, 0), glb::GLB_MAGIC);
    assert_eq!(read_u32(&glb, 4), 2);
    assert_eq!(read_u32(&glb, 8) as usize, glb.len());
    assert_eq!(glb.len(), 12 + (8 + 40) + (8 + 100));

    let json_len = read_u32(&glb, 12) as usize;
    assert_eq!(json_len % 4, 0);
    assert_eq!(read_u32(&glb, 16), glb::CHUNK_JSON);
    assert_eq!(&glb[20..20 + 37], json.as_bytes());
    assert!(glb[20 + 37..20 + json_len].iter().all(|&b| b == b' '));

    let bin_at = 20 + json_len;
    let bin_len = read_u32(&glb, bin_at) as usize;
    assert_eq!(bin_len % 4, 0);
    assert_eq!(read_u32(&glb, bin_at + 4), glb::CHUNK_BIN);
    assert_eq!(&glb[bin_at + 8..bin_at + 8 + 100], &bin[..]);
}

#[test]
fn test_document_without_buffers_is_json_only() {
    let doc = Document::new();
    let glb = doc.to_glb().unwrap();

    let json_len = read_u32(&glb, 12) as usize;
    assert_eq!(glb.len(), 12 + 8 + json_len);

    let text = std::str::from_utf8(&glb[20..]).unwrap();
    let value: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
    assert_eq!(value["asset"]["version"], "2.0");
    assert!(value.get("buffers").is_none());
}

#[test]
fn test_cube_glb_reparses() {
    common::init_tracing();
    let (doc, _, _) = common::cube_document();
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("cube.glb");

    doc.save_glb(&path).expect("Failed to write GLB");

    let (document, buffers, _) = gltf::import(&path).expect("Failed to import GLB");
    assert_eq!(document.meshes().count(), 1);
    assert_eq!(buffers.len(), 1);

    let primitive = document.meshes().next().unwrap().primitives().next().unwrap();
    let reader = primitive.reader(|b| Some(&buffers[b.index()]));
    let positions: Vec<[f32; 3]> = reader.read_positions().unwrap().collect();
    assert_eq!(positions, common::CUBE_CORNERS.to_vec());
    let indices: Vec<u32> = reader.read_indices().unwrap().into_u32().collect();
    assert_eq!(indices.len(), 36);
    assert_eq!(indices[..6], [0, 2, 1, 0, 3, 2]);

    let bounds = primitive.bounding_box();
    assert_eq!(bounds.min, [-0.5, -0.5, -0.5]);
    assert_eq!(bounds.max, [0.5, 0.5, 0.5]);
}

#[test]
fn test_glb_ignores_external_uri() {
    let (mut doc, buffer, _) = common::cube_document();
    doc.buffer_mut(buffer).unwrap().set_uri("cube.bin");

    let glb = doc.to_glb().unwrap();
    let gltf = gltf::Gltf::from_slice(&glb).expect("Failed to parse GLB");
    let parsed = gltf.document.buffers().next().unwrap();
    assert!(matches!(parsed.source(), gltf::buffer::Source::Bin));
    assert!(gltf.blob.is_some());
}

#[test]
fn test_invalid_document_writes_nothing() {
    let mut doc = Document::new();
    let buffer = doc.create_buffer();
    doc.allocate(buffer, 0);

    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.glb");
    let err = doc.save_glb(&path).unwrap_err();
    assert!(matches!(err, GltfError::Validation(_)));
    assert!(!path.exists());
}
