//! Compression bridge
//!
//! Hands a primitive's attribute and index accessors to a
//! [`CompressionBackend`] and stores the encoded stream back in the document:
//!
//! 1. Every precondition (topology, index type, supported component types,
//!    attached views, index range) is checked before the backend is touched.
//! 2. Each kept attribute is registered from its view bytes.
//! 3. Every index becomes its own point; face `k` is points `3k, 3k+1, 3k+2`.
//! 4. Point `p` of every attribute maps to the index value stored at `p`.
//! 5. Optionally identical points are merged.
//! 6. The backend encodes; the stream lands in a new view and an extension
//!    record is attached to the primitive.

mod backend;
mod draco;

pub use backend::{AttributeClass, AttributeDescriptor, BackendMesh, CompressionBackend};
pub use draco::{DracoBackend, DracoMesh};

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::document::Document;
use crate::error::{GltfError, Result};
use crate::index::{AccessorIndex, BufferIndex, MeshIndex, ViewIndex};
use crate::types::{ComponentType, ElementShape, PrimitiveMode, Semantic};

/// Extension name written by [`DracoBackend`]
pub const KHR_DRACO_MESH_COMPRESSION: &str = "KHR_draco_mesh_compression";

/// Highest accepted compression level
pub const MAX_COMPRESSION_LEVEL: u8 = 10;

// =============================================================================
// Options
// =============================================================================

/// Bit budget per attribute class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantizationBits {
    pub position: u8,
    pub normal: u8,
    pub texcoord: u8,
    pub color: u8,
    pub generic: u8,
}

impl Default for QuantizationBits {
    fn default() -> Self {
        Self {
            position: 14,
            normal: 10,
            texcoord: 12,
            color: 8,
            generic: 8,
        }
    }
}

impl QuantizationBits {
    pub fn for_class(&self, class: AttributeClass) -> u8 {
        match class {
            AttributeClass::Position => self.position,
            AttributeClass::Normal => self.normal,
            AttributeClass::TexCoord => self.texcoord,
            AttributeClass::Color => self.color,
            AttributeClass::Generic => self.generic,
        }
    }
}

/// Attribute classes left out of the compressed stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StripFlags {
    pub normals: bool,
    pub texcoords: bool,
    pub colors: bool,
    pub generic: bool,
}

impl StripFlags {
    /// Positions are never stripped
    pub fn strips(&self, class: AttributeClass) -> bool {
        match class {
            AttributeClass::Position => false,
            AttributeClass::Normal => self.normals,
            AttributeClass::TexCoord => self.texcoords,
            AttributeClass::Color => self.colors,
            AttributeClass::Generic => self.generic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionOptions {
    pub quantization: QuantizationBits,
    pub strip: StripFlags,
    /// 0 = fastest, 10 = smallest
    pub compression_level: u8,
    /// Merge points with identical attribute values before encoding
    pub deduplicate: bool,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            quantization: QuantizationBits::default(),
            strip: StripFlags::default(),
            compression_level: 7,
            deduplicate: false,
        }
    }
}

// =============================================================================
// Extension Record
// =============================================================================

/// Extension payload attached to a compressed primitive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionRecord {
    extension: String,
    buffer_view: ViewIndex,
    attributes: BTreeMap<Semantic, u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordJson<'a> {
    buffer_view: ViewIndex,
    attributes: &'a BTreeMap<Semantic, u32>,
}

impl CompressionRecord {
    pub fn new(extension: impl Into<String>, buffer_view: ViewIndex) -> Self {
        Self {
            extension: extension.into(),
            buffer_view,
            attributes: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, semantic: Semantic, id: u32) {
        self.attributes.insert(semantic, id);
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// View holding the encoded stream
    pub fn buffer_view(&self) -> ViewIndex {
        self.buffer_view
    }

    /// Semantic -> backend attribute id
    pub fn attributes(&self) -> &BTreeMap<Semantic, u32> {
        &self.attributes
    }

    pub(crate) fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(RecordJson {
            buffer_view: self.buffer_view,
            attributes: &self.attributes,
        })?)
    }
}

// =============================================================================
// Bridge
// =============================================================================

struct PlannedAttribute {
    accessor: AccessorIndex,
    descriptor: AttributeDescriptor,
}

/// Everything the backend needs, gathered without touching it
struct Plan {
    attributes: Vec<PlannedAttribute>,
    indices: Vec<u32>,
}

fn decode_indices(bytes: &[u8], stride: usize, count: usize, component: ComponentType) -> Vec<u32> {
    (0..count)
        .map(|p| {
            let at = p * stride;
            match component {
                ComponentType::Uint16 => u16::from_le_bytes([bytes[at], bytes[at + 1]]) as u32,
                _ => u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]),
            }
        })
        .collect()
}

impl Document {
    /// Compress one primitive and attach the extension record
    ///
    /// # Arguments
    /// * `mesh`, `primitive` - Primitive to encode
    /// * `buffer` - Buffer receiving the encoded stream
    /// * `backend` - Compression library
    /// * `options` - Quantization, strip flags, level and deduplication
    ///
    /// # Returns
    /// The attached record. On failure nothing is attached and no data is
    /// added to `buffer`.
    pub fn compress_primitive<B: CompressionBackend>(
        &mut self,
        mesh: MeshIndex,
        primitive: usize,
        buffer: BufferIndex,
        backend: &mut B,
        options: &CompressionOptions,
    ) -> Result<CompressionRecord> {
        let plan = self.plan_compression(mesh, primitive, buffer, backend, options)?;
        let num_points = plan.indices.len() as u32;

        let mut backend_mesh = backend.new_mesh();
        let mut ids: Vec<(Semantic, u32)> = Vec::with_capacity(plan.attributes.len());
        let mut raw_size = plan.indices.len() * 4;
        for attribute in &plan.attributes {
            let (bytes, _) = self.accessor_bytes(attribute.accessor)?;
            raw_size += bytes.len();
            let id = backend_mesh
                .add_attribute(&attribute.descriptor, bytes)
                .map_err(GltfError::Encoding)?;
            ids.push((attribute.descriptor.semantic.clone(), id));
        }

        backend_mesh.set_num_points(num_points);
        for face in 0..num_points / 3 {
            backend_mesh.add_face([face * 3, face * 3 + 1, face * 3 + 2]);
        }
        for (_, id) in &ids {
            for (point, &value) in plan.indices.iter().enumerate() {
                backend_mesh
                    .set_point_map_entry(*id, point as u32, value)
                    .map_err(GltfError::Encoding)?;
            }
        }

        if options.deduplicate {
            let removed = backend_mesh.deduplicate_points();
            debug!(
                "Deduplicated {} of {} points in mesh {} primitive {}",
                removed, num_points, mesh.0, primitive
            );
        }

        let encoded = backend
            .encode(&backend_mesh, options)
            .map_err(GltfError::Encoding)?;
        if encoded.is_empty() {
            return Err(GltfError::Encoding(
                "backend produced an empty stream".to_string(),
            ));
        }

        let view = self.add_data(buffer, &encoded);
        let mut record = CompressionRecord::new(backend.extension_name(), view);
        for (semantic, id) in ids {
            record.insert(semantic, id);
        }

        if let Some(target) = self
            .mesh_mut(mesh)
            .and_then(|m| m.primitives.get_mut(primitive))
        {
            target.compression = Some(record.clone());
        }
        self.add_extension(backend.extension_name(), true);

        info!(
            "Compressed mesh {} primitive {}: {} -> {} bytes ({})",
            mesh.0,
            primitive,
            raw_size,
            encoded.len(),
            record.extension()
        );
        Ok(record)
    }

    fn plan_compression<B: CompressionBackend>(
        &self,
        mesh: MeshIndex,
        primitive: usize,
        buffer: BufferIndex,
        backend: &B,
        options: &CompressionOptions,
    ) -> Result<Plan> {
        let location = format!("mesh {} primitive {primitive}", mesh.0);
        let target = self
            .meshes()
            .get(mesh.index())
            .and_then(|m| m.primitives.get(primitive))
            .ok_or_else(|| GltfError::Validation(format!("{location} does not exist")))?;

        if buffer.index() >= self.buffers().len() {
            return Err(GltfError::Validation(format!("{buffer} does not exist")));
        }
        if options.compression_level > MAX_COMPRESSION_LEVEL {
            return Err(GltfError::Validation(format!(
                "compression level {} outside 0-{MAX_COMPRESSION_LEVEL}",
                options.compression_level
            )));
        }
        if target.compression().is_some() {
            return Err(GltfError::Validation(format!(
                "{location} is already compressed"
            )));
        }
        if target.mode != PrimitiveMode::Triangles {
            return Err(GltfError::Validation(format!(
                "{location} uses {:?} topology, only triangle lists can be compressed",
                target.mode
            )));
        }

        // Indices
        let index_accessor = target
            .indices
            .ok_or_else(|| GltfError::Validation(format!("{location} has no indices")))?;
        let indices = self.get_accessor(index_accessor)?;
        if !matches!(indices.component(), ComponentType::Uint16 | ComponentType::Uint32) {
            return Err(GltfError::UnsupportedType(format!(
                "{location} index component type {} (expected uint16 or uint32)",
                indices.component()
            )));
        }
        if indices.shape() != ElementShape::Scalar {
            return Err(GltfError::Validation(format!(
                "{location} indices are {}, expected SCALAR",
                indices.shape().name()
            )));
        }
        let count = indices.count();
        if count == 0 || count % 3 != 0 {
            return Err(GltfError::Validation(format!(
                "{location} index count {count} is not a nonzero multiple of 3"
            )));
        }
        let (index_bytes, index_stride) = self.accessor_bytes(index_accessor)?;
        let decoded = decode_indices(index_bytes, index_stride, count, indices.component());
        let max_index = decoded.iter().copied().max().unwrap_or(0);

        // Attributes
        let mut attributes = Vec::with_capacity(target.attributes.len());
        for (semantic, &accessor_index) in &target.attributes {
            let class = AttributeClass::of(semantic);
            if options.strip.strips(class) {
                warn!("Stripping {} from compressed {}", semantic, location);
                continue;
            }

            let accessor = self.get_accessor(accessor_index)?;
            if !backend.supports(accessor.component()) {
                return Err(GltfError::UnsupportedType(format!(
                    "{location} attribute {semantic} component type {} is not supported by {}",
                    accessor.component(),
                    backend.extension_name()
                )));
            }
            let (_, stride) = self.accessor_bytes(accessor_index)?;
            if max_index as usize >= accessor.count() {
                return Err(GltfError::Validation(format!(
                    "{location} index {max_index} is out of range for attribute {semantic} ({} elements)",
                    accessor.count()
                )));
            }

            attributes.push(PlannedAttribute {
                accessor: accessor_index,
                descriptor: AttributeDescriptor {
                    semantic: semantic.clone(),
                    class,
                    components: accessor.shape().component_count() as u8,
                    component_type: accessor.component(),
                    normalized: accessor.normalized(),
                    byte_stride: stride,
                },
            });
        }
        if attributes.is_empty() {
            return Err(GltfError::Validation(format!(
                "{location} has no attributes left to compress"
            )));
        }

        Ok(Plan {
            attributes,
            indices: decoded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_json() {
        let mut record = CompressionRecord::new(KHR_DRACO_MESH_COMPRESSION, ViewIndex(5));
        record.insert(Semantic::Normal, 1);
        record.insert(Semantic::Position, 0);
        assert_eq!(
            record.to_json().unwrap(),
            json!({"bufferView": 5, "attributes": {"POSITION": 0, "NORMAL": 1}})
        );
    }

    #[test]
    fn test_strip_never_positions() {
        let strip = StripFlags {
            normals: true,
            texcoords: true,
            colors: true,
            generic: true,
        };
        assert!(!strip.strips(AttributeClass::Position));
        assert!(strip.strips(AttributeClass::Normal));
    }

    #[test]
    fn test_decode_indices() {
        let bytes = [1u8, 0, 2, 0, 0xFF, 0xFF];
        assert_eq!(
            decode_indices(&bytes, 2, 3, ComponentType::Uint16),
            vec![1, 2, 65535]
        );
        let bytes = 70000u32.to_le_bytes();
        assert_eq!(
            decode_indices(&bytes, 4, 1, ComponentType::Uint32),
            vec![70000]
        );
    }

    #[test]
    fn test_default_budgets() {
        let bits = QuantizationBits::default();
        assert_eq!(bits.for_class(AttributeClass::Position), 14);
        assert_eq!(bits.for_class(AttributeClass::Normal), 10);
        assert_eq!(bits.for_class(AttributeClass::TexCoord), 12);
        assert!(!CompressionOptions::default().deduplicate);
    }
}
