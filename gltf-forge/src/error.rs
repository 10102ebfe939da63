//! Error type shared by every gltf-forge operation

use std::path::{Path, PathBuf};

/// Errors raised while building, validating or writing a document
#[derive(Debug, thiserror::Error)]
pub enum GltfError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while writing stream: {0}")]
    Stream(#[from] std::io::Error),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    #[error("encoding failed: {0}")]
    Encoding(String),

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl GltfError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        GltfError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        GltfError::Validation(message.into())
    }

    /// True for both path-qualified and stream I/O failures
    pub fn is_io(&self) -> bool {
        matches!(self, GltfError::Io { .. } | GltfError::Stream(_))
    }
}

pub type Result<T> = std::result::Result<T, GltfError>;
