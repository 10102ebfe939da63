//! Export settings (`gltf-forge.toml`)
//!
//! Every field has a default, so an empty file or a partial one is valid.
//!
//! ```toml
//! [asset]
//! generator = "my-tool 1.0"
//! copyright = "CC-BY-4.0"
//!
//! [output]
//! pretty = true
//! embed_buffers = false
//!
//! [compression]
//! enabled = true
//! level = 7
//! position_bits = 14
//! strip_normals = false
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use tracing::debug;

use crate::compression::{
    CompressionBackend, CompressionOptions, CompressionRecord, QuantizationBits, StripFlags,
};
use crate::document::Document;
use crate::element::GENERATOR;
use crate::error::{GltfError, Result};
use crate::index::{BufferIndex, MeshIndex};
use crate::output::GltfOutput;
use crate::types::PrimitiveMode;

/// Export configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExportConfig {
    /// Asset metadata written into every document
    #[serde(default)]
    pub asset: AssetConfig,
    /// `.gltf` text output
    #[serde(default)]
    pub output: OutputConfig,
    /// Mesh compression
    #[serde(default)]
    pub compression: CompressionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetConfig {
    /// `asset.generator` (default: crate name and version)
    #[serde(default = "default_generator")]
    pub generator: String,
    #[serde(default)]
    pub copyright: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    /// Indent JSON (default: false)
    #[serde(default)]
    pub pretty: bool,
    /// Embed buffers as data URIs (default: false)
    #[serde(default)]
    pub embed_buffers: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Let [`Document::compress_meshes`] run (default: false)
    #[serde(default)]
    pub enabled: bool,
    /// Encoder effort, 0-10 (default: 7)
    #[serde(default = "default_level")]
    pub level: u8,
    /// Merge identical points before encoding (default: false)
    #[serde(default)]
    pub deduplicate: bool,
    #[serde(default = "default_position_bits")]
    pub position_bits: u8,
    #[serde(default = "default_normal_bits")]
    pub normal_bits: u8,
    #[serde(default = "default_texcoord_bits")]
    pub texcoord_bits: u8,
    #[serde(default = "default_color_bits")]
    pub color_bits: u8,
    #[serde(default = "default_generic_bits")]
    pub generic_bits: u8,
    #[serde(default)]
    pub strip_normals: bool,
    #[serde(default)]
    pub strip_texcoords: bool,
    #[serde(default)]
    pub strip_colors: bool,
    #[serde(default)]
    pub strip_generic: bool,
}

fn default_generator() -> String {
    GENERATOR.to_string()
}
fn default_level() -> u8 {
    CompressionOptions::default().compression_level
}
fn default_position_bits() -> u8 {
    QuantizationBits::default().position
}
fn default_normal_bits() -> u8 {
    QuantizationBits::default().normal
}
fn default_texcoord_bits() -> u8 {
    QuantizationBits::default().texcoord
}
fn default_color_bits() -> u8 {
    QuantizationBits::default().color
}
fn default_generic_bits() -> u8 {
    QuantizationBits::default().generic
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            generator: default_generator(),
            copyright: None,
        }
    }
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: default_level(),
            deduplicate: false,
            position_bits: default_position_bits(),
            normal_bits: default_normal_bits(),
            texcoord_bits: default_texcoord_bits(),
            color_bits: default_color_bits(),
            generic_bits: default_generic_bits(),
            strip_normals: false,
            strip_texcoords: false,
            strip_colors: false,
            strip_generic: false,
        }
    }
}

impl ExportConfig {
    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| GltfError::io(path, e))?;
        Self::parse(&content)
    }

    /// Parse from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

impl CompressionConfig {
    /// Options for [`Document::compress_primitive`]
    pub fn options(&self) -> CompressionOptions {
        CompressionOptions {
            quantization: QuantizationBits {
                position: self.position_bits,
                normal: self.normal_bits,
                texcoord: self.texcoord_bits,
                color: self.color_bits,
                generic: self.generic_bits,
            },
            strip: StripFlags {
                normals: self.strip_normals,
                texcoords: self.strip_texcoords,
                colors: self.strip_colors,
                generic: self.strip_generic,
            },
            compression_level: self.level,
            deduplicate: self.deduplicate,
        }
    }
}

impl From<OutputConfig> for GltfOutput {
    fn from(config: OutputConfig) -> Self {
        Self {
            pretty: config.pretty,
            embed_buffers: config.embed_buffers,
        }
    }
}

impl Document {
    /// Copy asset metadata from `config`
    pub fn apply_config(&mut self, config: &ExportConfig) {
        let asset = self.asset_mut();
        asset.generator = Some(config.asset.generator.clone());
        asset.copyright = config.asset.copyright.clone();
    }

    /// Compress every indexed triangle primitive when `config.enabled` is set
    ///
    /// Primitives that are already compressed, unindexed, or not triangle
    /// lists are left as they are. Stops at the first failing primitive;
    /// earlier primitives stay compressed.
    ///
    /// # Returns
    /// One record per compressed primitive, empty when compression is off
    pub fn compress_meshes<B: CompressionBackend>(
        &mut self,
        config: &CompressionConfig,
        buffer: BufferIndex,
        backend: &mut B,
    ) -> Result<Vec<CompressionRecord>> {
        if !config.enabled {
            debug!("Mesh compression disabled");
            return Ok(Vec::new());
        }

        let options = config.options();
        let targets: Vec<(MeshIndex, usize)> = self
            .meshes()
            .iter()
            .enumerate()
            .flat_map(|(m, mesh)| {
                mesh.primitives
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| {
                        p.mode == PrimitiveMode::Triangles
                            && p.indices.is_some()
                            && p.compression().is_none()
                    })
                    .map(move |(p, _)| (MeshIndex::from_position(m), p))
            })
            .collect();

        let mut records = Vec::with_capacity(targets.len());
        for (mesh, primitive) in targets {
            records.push(self.compress_primitive(mesh, primitive, buffer, backend, &options)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = ExportConfig::parse("").unwrap();
        assert_eq!(config, ExportConfig::default());
        assert_eq!(config.compression.options(), CompressionOptions::default());
        assert_eq!(config.asset.generator, GENERATOR);
    }

    #[test]
    fn test_partial_section() {
        let config = ExportConfig::parse(
            r#"
            [compression]
            enabled = true
            position_bits = 16
            strip_colors = true
            "#,
        )
        .unwrap();
        let options = config.compression.options();
        assert!(config.compression.enabled);
        assert_eq!(options.quantization.position, 16);
        assert_eq!(options.quantization.normal, 10);
        assert!(options.strip.colors);
        assert!(!options.strip.normals);
        assert_eq!(options.compression_level, 7);
        assert!(!config.output.pretty);
    }

    #[test]
    fn test_invalid_toml() {
        let err = ExportConfig::parse("[output]\npretty = \"yes\"").unwrap_err();
        assert!(matches!(err, GltfError::Config(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = ExportConfig::load("/nonexistent/gltf-forge.toml").unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn test_apply_config() {
        let config = ExportConfig::parse(
            r#"
            [asset]
            generator = "exporter 2"
            copyright = "me"
            "#,
        )
        .unwrap();
        let mut doc = Document::new();
        doc.apply_config(&config);
        assert_eq!(doc.asset().generator.as_deref(), Some("exporter 2"));
        assert_eq!(doc.asset().copyright.as_deref(), Some("me"));
    }

    #[test]
    fn test_output_conversion() {
        let output: GltfOutput = OutputConfig {
            pretty: true,
            embed_buffers: true,
        }
        .into();
        assert!(output.pretty && output.embed_buffers);
    }
}
