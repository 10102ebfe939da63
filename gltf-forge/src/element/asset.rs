use serde::Serialize;
use serde_json::Value;

use super::{Element, ElementInfo, record_to_json};
use crate::error::{GltfError, Result};

/// Default `generator` string
pub const GENERATOR: &str = concat!("gltf-forge ", env!("CARGO_PKG_VERSION"));

/// Asset metadata (`asset` in glTF JSON)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(flatten)]
    pub info: ElementInfo,
}

impl Default for AssetInfo {
    fn default() -> Self {
        Self {
            version: "2.0".to_string(),
            min_version: None,
            generator: Some(GENERATOR.to_string()),
            copyright: None,
            info: ElementInfo::default(),
        }
    }
}

impl Element for AssetInfo {
    fn to_json(&self) -> Result<Value> {
        if self.version.is_empty() {
            return Err(GltfError::validation("asset version is empty"));
        }
        record_to_json(self, "asset")
    }

    fn info(&self) -> &ElementInfo {
        &self.info
    }
}
