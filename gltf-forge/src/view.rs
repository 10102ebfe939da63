//! Byte range descriptor over a buffer

use serde::Serialize;
use serde_json::Value;

use crate::buffer::Buffer;
use crate::error::{GltfError, Result};
use crate::index::BufferIndex;
use crate::types::BufferTarget;

/// Untyped byte range (`bufferView` in glTF JSON)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct View {
    buffer: Option<BufferIndex>,
    byte_offset: usize,
    byte_length: usize,
    byte_stride: Option<usize>,
    target: Option<BufferTarget>,
    name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ViewRecord<'a> {
    buffer: BufferIndex,
    #[serde(skip_serializing_if = "is_zero")]
    byte_offset: usize,
    byte_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    byte_stride: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<BufferTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

impl View {
    /// View over `byte_length` bytes at `byte_offset` of `buffer`
    pub fn new(buffer: BufferIndex, byte_offset: usize, byte_length: usize) -> Self {
        Self {
            buffer: Some(buffer),
            byte_offset,
            byte_length,
            ..Self::default()
        }
    }

    pub fn buffer(&self) -> Option<BufferIndex> {
        self.buffer
    }

    pub fn set_buffer(&mut self, buffer: BufferIndex) {
        self.buffer = Some(buffer);
    }

    pub fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    pub fn byte_stride(&self) -> Option<usize> {
        self.byte_stride
    }

    pub fn target(&self) -> Option<BufferTarget> {
        self.target
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Set the byte range; a `stride` of 0 means tightly packed
    pub fn set_range(&mut self, offset: usize, length: usize, stride: usize) {
        self.byte_offset = offset;
        self.byte_length = length;
        self.byte_stride = (stride != 0).then_some(stride);
    }

    pub fn set_target(&mut self, target: BufferTarget) {
        self.target = Some(target);
    }

    pub fn clear_target(&mut self) {
        self.target = None;
    }

    /// Fill in target and stride only where they are still unset
    pub(crate) fn refine(&mut self, target: Option<BufferTarget>, stride: Option<usize>) {
        if self.target.is_none() {
            self.target = target;
        }
        if self.byte_stride.is_none() {
            self.byte_stride = stride;
        }
    }

    /// Byte range in the owning buffer, checked against `buffers`
    pub(crate) fn resolve<'a>(&self, index: usize, buffers: &'a [Buffer]) -> Result<&'a [u8]> {
        let buffer_index = self.buffer.ok_or_else(|| {
            GltfError::Validation(format!("buffer view {index} has no buffer"))
        })?;
        let buffer = buffers.get(buffer_index.index()).ok_or_else(|| {
            GltfError::Validation(format!(
                "buffer view {index} references missing {buffer_index}"
            ))
        })?;
        buffer
            .range(self.byte_offset, self.byte_length)
            .ok_or_else(|| {
                GltfError::Validation(format!(
                    "buffer view {index} range {}..{} exceeds {buffer_index} ({} bytes)",
                    self.byte_offset,
                    self.byte_offset + self.byte_length,
                    buffer.len()
                ))
            })
    }

    pub(crate) fn to_json(&self, index: usize, buffers: &[Buffer]) -> Result<Value> {
        let Some(buffer) = self.buffer else {
            return Err(GltfError::Validation(format!(
                "buffer view {index} has no buffer"
            )));
        };
        if self.byte_length == 0 {
            return Err(GltfError::Validation(format!(
                "buffer view {index} has zero byteLength"
            )));
        }
        self.resolve(index, buffers)?;

        let record = ViewRecord {
            buffer,
            byte_offset: self.byte_offset,
            byte_length: self.byte_length,
            byte_stride: self.byte_stride,
            target: self.target,
            name: self.name.as_deref(),
        };
        Ok(serde_json::to_value(record)?)
    }
}
