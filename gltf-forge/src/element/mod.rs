//! Scene-graph elements
//!
//! Plain data holders that reference the document's arena by index. Each one
//! serializes its own JSON record through [`Element::to_json`]; the
//! [`Document`](crate::Document) checks that referenced indices exist.

mod asset;
mod camera;
mod material;
mod mesh;
mod scene;
mod texture;

pub use asset::{AssetInfo, GENERATOR};
pub use camera::{Camera, Projection};
pub use material::{
    Material, NormalTextureInfo, OcclusionTextureInfo, PbrMetallicRoughness, TextureInfo,
};
pub use mesh::{Mesh, Primitive};
pub use scene::{Node, Scene};
pub use texture::{Image, Sampler, Texture};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{GltfError, Result};

/// JSON contribution of a document element
pub trait Element {
    fn to_json(&self) -> Result<Value>;

    fn info(&self) -> &ElementInfo;

    fn name(&self) -> Option<&str> {
        self.info().name.as_deref()
    }
}

/// Fields every element may carry
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ElementInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub extensions: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<Value>,
}

impl ElementInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Merge these fields into an already built JSON object
    pub(crate) fn write_into(&self, object: &mut Map<String, Value>) {
        if let Some(name) = &self.name {
            object.insert("name".to_string(), Value::String(name.clone()));
        }
        if !self.extensions.is_empty() {
            object.insert(
                "extensions".to_string(),
                Value::Object(self.extensions.clone()),
            );
        }
        if let Some(extras) = &self.extras {
            object.insert("extras".to_string(), extras.clone());
        }
    }
}

/// Serialize a derived record, rejecting anything but a JSON object
pub(crate) fn record_to_json<T: Serialize>(record: &T, what: &str) -> Result<Value> {
    let value = serde_json::to_value(record)?;
    if !value.is_object() {
        return Err(GltfError::Validation(format!(
            "{what} did not serialize to a JSON object"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_info_write_into() {
        let mut info = ElementInfo::named("root");
        info.extras = Some(json!({"tag": 1}));
        let mut object = Map::new();
        info.write_into(&mut object);
        assert_eq!(
            Value::Object(object),
            json!({"name": "root", "extras": {"tag": 1}})
        );
    }

    #[test]
    fn test_empty_info_serializes_to_nothing() {
        let value = serde_json::to_value(ElementInfo::default()).unwrap();
        assert_eq!(value, json!({}));
    }
}
