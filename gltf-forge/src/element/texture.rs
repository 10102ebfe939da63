use serde::Serialize;
use serde_json::Value;

use super::{Element, ElementInfo, record_to_json};
use crate::error::{GltfError, Result};
use crate::index::{ImageIndex, SamplerIndex, ViewIndex};
use crate::types::{MagFilter, MimeType, MinFilter, WrapMode};

/// Image plus sampling state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Texture {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ImageIndex>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampler: Option<SamplerIndex>,
    #[serde(flatten)]
    pub info: ElementInfo,
}

impl Texture {
    pub fn new(source: ImageIndex) -> Self {
        Self {
            source: Some(source),
            ..Self::default()
        }
    }

    pub fn with_sampler(mut self, sampler: SamplerIndex) -> Self {
        self.sampler = Some(sampler);
        self
    }
}

impl Element for Texture {
    fn to_json(&self) -> Result<Value> {
        record_to_json(self, "texture")
    }

    fn info(&self) -> &ElementInfo {
        &self.info
    }
}

/// Image data, referenced by URI or stored in a buffer view
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_view: Option<ViewIndex>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<MimeType>,
    #[serde(flatten)]
    pub info: ElementInfo,
}

impl Image {
    /// Image loaded from an external location
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Self::default()
        }
    }

    /// Image embedded in a buffer view
    pub fn from_view(view: ViewIndex, mime_type: MimeType) -> Self {
        Self {
            buffer_view: Some(view),
            mime_type: Some(mime_type),
            ..Self::default()
        }
    }
}

impl Element for Image {
    fn to_json(&self) -> Result<Value> {
        match (&self.uri, self.buffer_view) {
            (Some(_), Some(_)) => {
                return Err(GltfError::validation(
                    "image sets both uri and bufferView",
                ));
            }
            (None, None) => {
                return Err(GltfError::validation("image has neither uri nor bufferView"));
            }
            (None, Some(_)) if self.mime_type.is_none() => {
                return Err(GltfError::validation(
                    "image stored in a bufferView needs a mimeType",
                ));
            }
            _ => {}
        }
        record_to_json(self, "image")
    }

    fn info(&self) -> &ElementInfo {
        &self.info
    }
}

/// Texture filtering and wrapping
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sampler {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mag_filter: Option<MagFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_filter: Option<MinFilter>,
    #[serde(rename = "wrapS", skip_serializing_if = "Option::is_none")]
    pub wrap_s: Option<WrapMode>,
    #[serde(rename = "wrapT", skip_serializing_if = "Option::is_none")]
    pub wrap_t: Option<WrapMode>,
    #[serde(flatten)]
    pub info: ElementInfo,
}

impl Element for Sampler {
    fn to_json(&self) -> Result<Value> {
        record_to_json(self, "sampler")
    }

    fn info(&self) -> &ElementInfo {
        &self.info
    }
}
