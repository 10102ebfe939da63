//! glTF 2.0 document builder
//!
//! A [`Document`] owns an arena of binary [`Buffer`]s, [`View`]s into them and
//! typed [`Accessor`]s over the views, plus the scene-graph elements that
//! reference them by index. Documents are written as:
//!
//! - GLB containers ([`Document::save_glb`], [`glb`])
//! - `.gltf` text with sibling `.bin` files or embedded data URIs
//!   ([`Document::save_gltf`])
//!
//! Primitives can be compressed through any [`CompressionBackend`]; the
//! bundled [`DracoBackend`] writes `KHR_draco_mesh_compression` streams.
//!
//! ```no_run
//! use gltf_forge::{Document, ElementShape, Mesh, Node, Primitive, Scene, Semantic};
//!
//! # fn main() -> gltf_forge::Result<()> {
//! let mut doc = Document::new();
//! let buffer = doc.create_buffer();
//! let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
//! let position = doc.add_vertex_data(buffer, ElementShape::Vec3, &positions)?;
//! doc.update_bounds(position)?;
//!
//! let mut mesh = Mesh::new("triangle");
//! mesh.add_primitive(Primitive::new().with_attribute(Semantic::Position, position));
//! let mesh = doc.add_mesh(mesh);
//! let node = doc.add_node(Node::new("root").with_mesh(mesh));
//! let mut scene = Scene::new("main");
//! scene.add_node(node);
//! let scene = doc.add_scene(scene);
//! doc.set_main_scene(scene);
//!
//! doc.save_glb("triangle.glb")?;
//! # Ok(())
//! # }
//! ```

mod accessor;
mod buffer;
pub mod compression;
mod config;
mod document;
pub mod element;
mod error;
pub mod glb;
mod index;
mod output;
mod types;
mod view;

pub use accessor::{Accessor, Bounds, Component, TypedRangeMut};
pub use buffer::Buffer;
pub use compression::{
    AttributeClass, AttributeDescriptor, BackendMesh, CompressionBackend, CompressionOptions,
    CompressionRecord, DracoBackend, DracoMesh, QuantizationBits, StripFlags,
};
pub use config::{AssetConfig, CompressionConfig, ExportConfig, OutputConfig};
pub use document::Document;
pub use element::{
    AssetInfo, Camera, Element, ElementInfo, Image, Material, Mesh, Node, NormalTextureInfo,
    OcclusionTextureInfo, PbrMetallicRoughness, Primitive, Projection, Sampler, Scene, Texture,
    TextureInfo,
};
pub use error::{GltfError, Result};
pub use index::{
    AccessorIndex, BufferIndex, CameraIndex, ImageIndex, MaterialIndex, MeshIndex, NodeIndex,
    SamplerIndex, SceneIndex, TextureIndex, ViewIndex,
};
pub use output::{GltfOutput, data_uri};
pub use types::{
    AlphaMode, BufferTarget, ComponentType, ElementShape, MagFilter, MimeType, MinFilter,
    PrimitiveMode, Semantic, WrapMode,
};
pub use view::View;
