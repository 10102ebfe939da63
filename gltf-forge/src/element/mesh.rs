use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use super::{Element, ElementInfo};
use crate::compression::CompressionRecord;
use crate::error::{GltfError, Result};
use crate::index::{AccessorIndex, MaterialIndex};
use crate::types::{PrimitiveMode, Semantic};

/// Drawable geometry unit
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Primitive {
    pub attributes: BTreeMap<Semantic, AccessorIndex>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indices: Option<AccessorIndex>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<MaterialIndex>,
    #[serde(skip_serializing_if = "is_triangles")]
    pub mode: PrimitiveMode,
    /// Morph targets, each a set of displacement attributes
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<BTreeMap<Semantic, AccessorIndex>>,
    #[serde(skip)]
    pub(crate) compression: Option<CompressionRecord>,
    #[serde(flatten)]
    pub info: ElementInfo,
}

fn is_triangles(mode: &PrimitiveMode) -> bool {
    *mode == PrimitiveMode::Triangles
}

impl Primitive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, semantic: Semantic, accessor: AccessorIndex) -> Self {
        self.attributes.insert(semantic, accessor);
        self
    }

    pub fn with_indices(mut self, indices: AccessorIndex) -> Self {
        self.indices = Some(indices);
        self
    }

    pub fn with_material(mut self, material: MaterialIndex) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_mode(mut self, mode: PrimitiveMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn set_attribute(&mut self, semantic: Semantic, accessor: AccessorIndex) {
        self.attributes.insert(semantic, accessor);
    }

    pub fn add_target(&mut self, target: BTreeMap<Semantic, AccessorIndex>) {
        self.targets.push(target);
    }

    /// Compression extension record, present after a successful encode
    pub fn compression(&self) -> Option<&CompressionRecord> {
        self.compression.as_ref()
    }

    /// Every accessor this primitive references
    pub(crate) fn accessors(&self) -> impl Iterator<Item = AccessorIndex> + '_ {
        self.attributes
            .values()
            .copied()
            .chain(self.indices)
            .chain(self.targets.iter().flat_map(|t| t.values().copied()))
    }
}

impl Element for Primitive {
    fn to_json(&self) -> Result<Value> {
        if self.attributes.is_empty() {
            return Err(GltfError::validation("primitive has no attributes"));
        }

        let mut value = serde_json::to_value(self)?;
        if let (Some(record), Some(object)) = (&self.compression, value.as_object_mut()) {
            let extensions = object
                .entry("extensions")
                .or_insert_with(|| Value::Object(Map::new()));
            if let Some(extensions) = extensions.as_object_mut() {
                extensions.insert(record.extension().to_string(), record.to_json()?);
            }
        }
        Ok(value)
    }

    fn info(&self) -> &ElementInfo {
        &self.info
    }
}

/// Collection of primitives drawn together
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub primitives: Vec<Primitive>,
    /// Default morph target weights
    pub weights: Vec<f32>,
    pub info: ElementInfo,
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            info: ElementInfo::named(name),
            ..Self::default()
        }
    }

    /// Append a primitive and return its position
    pub fn add_primitive(&mut self, primitive: Primitive) -> usize {
        self.primitives.push(primitive);
        self.primitives.len() - 1
    }
}

impl Element for Mesh {
    fn to_json(&self) -> Result<Value> {
        if self.primitives.is_empty() {
            return Err(GltfError::validation("mesh has no primitives"));
        }

        let primitives = self
            .primitives
            .iter()
            .enumerate()
            .map(|(i, p)| {
                p.to_json().map_err(|err| match err {
                    GltfError::Validation(msg) => {
                        GltfError::Validation(format!("primitive {i}: {msg}"))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut object = Map::new();
        object.insert("primitives".to_string(), Value::Array(primitives));
        if !self.weights.is_empty() {
            object.insert("weights".to_string(), serde_json::to_value(&self.weights)?);
        }
        self.info.write_into(&mut object);
        Ok(Value::Object(object))
    }

    fn info(&self) -> &ElementInfo {
        &self.info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ViewIndex;
    use serde_json::json;

    fn triangle() -> Primitive {
        Primitive::new()
            .with_attribute(Semantic::Position, AccessorIndex(0))
            .with_attribute(Semantic::Normal, AccessorIndex(1))
            .with_indices(AccessorIndex(2))
    }

    #[test]
    fn test_primitive_record() {
        let value = triangle().to_json().unwrap();
        assert_eq!(
            value,
            json!({
                "attributes": {"POSITION": 0, "NORMAL": 1},
                "indices": 2
            })
        );
    }

    #[test]
    fn test_non_default_mode_written() {
        let value = triangle().with_mode(PrimitiveMode::Lines).to_json().unwrap();
        assert_eq!(value["mode"], json!(1));
    }

    #[test]
    fn test_compression_extension_merged() {
        let mut primitive = triangle();
        primitive.info.extensions.insert("EXT_other".to_string(), json!({}));
        let mut record = CompressionRecord::new("KHR_draco_mesh_compression", ViewIndex(3));
        record.insert(Semantic::Position, 0);
        record.insert(Semantic::Normal, 1);
        primitive.compression = Some(record);

        let value = primitive.to_json().unwrap();
        assert_eq!(
            value["extensions"],
            json!({
                "EXT_other": {},
                "KHR_draco_mesh_compression": {
                    "bufferView": 3,
                    "attributes": {"POSITION": 0, "NORMAL": 1}
                }
            })
        );
    }

    #[test]
    fn test_targets_written() {
        let mut primitive = triangle();
        let mut target = BTreeMap::new();
        target.insert(Semantic::Position, AccessorIndex(4));
        primitive.add_target(target);

        let value = primitive.to_json().unwrap();
        assert_eq!(value["targets"], json!([{"POSITION": 4}]));
        assert_eq!(primitive.accessors().count(), 4);
    }

    #[test]
    fn test_empty_mesh_rejected() {
        assert!(Mesh::new("empty").to_json().is_err());

        let mut mesh = Mesh::new("bad");
        mesh.add_primitive(Primitive::new());
        let err = mesh.to_json().unwrap_err();
        assert!(err.to_string().contains("primitive 0: primitive has no attributes"));
    }
}
