//! Append-only byte arena
//!
//! A [`Buffer`] only ever grows. Ranges handed out by the document are
//! addressed by offset, so reallocating the backing `Vec` never invalidates
//! them.

use serde::Serialize;
use serde_json::Value;

use crate::error::{GltfError, Result};

/// Growable byte store backing one or more views
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Buffer {
    data: Vec<u8>,
    uri: Option<String>,
    name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BufferRecord<'a> {
    byte_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Bytes of `offset..offset + len`, if in range
    pub fn range(&self, offset: usize, len: usize) -> Option<&[u8]> {
        self.data.get(offset..offset.checked_add(len)?)
    }

    pub(crate) fn range_mut(&mut self, offset: usize, len: usize) -> Option<&mut [u8]> {
        let end = offset.checked_add(len)?;
        self.data.get_mut(offset..end)
    }

    /// External location used when the payload is not embedded
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn set_uri(&mut self, uri: impl Into<String>) {
        self.uri = Some(uri.into());
    }

    pub fn clear_uri(&mut self) {
        self.uri = None;
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Grow by `byte_length` zero bytes
    ///
    /// # Returns
    /// Offset of the new range
    pub(crate) fn grow(&mut self, byte_length: usize) -> usize {
        let offset = self.data.len();
        self.data.resize(offset + byte_length, 0);
        offset
    }

    /// Append `bytes` and return their offset
    pub(crate) fn append(&mut self, bytes: &[u8]) -> usize {
        let offset = self.data.len();
        self.data.extend_from_slice(bytes);
        offset
    }

    /// Pad with zeros until the length is a multiple of `alignment`
    pub(crate) fn align(&mut self, alignment: usize) {
        let padding = (alignment - self.data.len() % alignment) % alignment;
        self.data.resize(self.data.len() + padding, 0);
    }

    /// JSON record; `uri` overrides the stored uri (GLB mode passes `None`)
    pub(crate) fn to_json(&self, index: usize, uri: Option<&str>) -> Result<Value> {
        if self.data.is_empty() {
            return Err(GltfError::Validation(format!("buffer {index} is empty")));
        }
        let record = BufferRecord {
            byte_length: self.data.len(),
            uri,
            name: self.name.as_deref(),
        };
        Ok(serde_json::to_value(record)?)
    }
}
