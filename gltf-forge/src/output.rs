//! Plain `.gltf` output
//!
//! The JSON goes to a text file. Buffers are either written next to it as
//! `.bin` files referenced by relative URI, or embedded as base64 data URIs.

use std::fs;
use std::path::{Component, Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::info;

use crate::document::Document;
use crate::error::{GltfError, Result};

const DATA_URI_PREFIX: &str = "data:application/octet-stream;base64,";

/// How a `.gltf` file is written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GltfOutput {
    /// Indent the JSON text
    pub pretty: bool,
    /// Embed buffers as data URIs instead of writing sibling files
    pub embed_buffers: bool,
}

/// Base64 data URI holding `bytes`
pub fn data_uri(bytes: &[u8]) -> String {
    format!("{DATA_URI_PREFIX}{}", STANDARD.encode(bytes))
}

/// URIs that do not name a local file next to the document
fn is_external(uri: &str) -> bool {
    uri.starts_with("data:") || uri.contains("://")
}

/// Location of a sibling buffer file; the uri must stay inside `dir`
fn local_target(dir: &Path, uri: &str) -> Result<PathBuf> {
    let relative = Path::new(uri);
    let escapes = relative.components().any(|c| {
        matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
    });
    if escapes || relative.as_os_str().is_empty() {
        return Err(GltfError::Validation(format!(
            "buffer uri {uri:?} does not name a file inside {}",
            dir.display()
        )));
    }
    Ok(dir.join(relative))
}

impl Document {
    fn buffer_uris(&self, stem: &str, embed: bool) -> Vec<Option<String>> {
        let single = self.buffers().len() == 1;
        self.buffers()
            .iter()
            .enumerate()
            .map(|(i, buffer)| {
                if embed {
                    Some(data_uri(buffer.data()))
                } else if let Some(uri) = buffer.uri() {
                    Some(uri.to_string())
                } else if single {
                    Some(format!("{stem}.bin"))
                } else {
                    Some(format!("{stem}_{i}.bin"))
                }
            })
            .collect()
    }

    /// Write the document as `.gltf` text plus external buffer files
    ///
    /// Sibling buffers are named after the buffer's own uri, `<stem>.bin` for
    /// a single buffer, or `<stem>_<n>.bin`. Nothing is written when the
    /// document fails validation.
    ///
    /// # Returns
    /// Every file written, the `.gltf` file first
    pub fn save_gltf(&self, path: impl AsRef<Path>, output: &GltfOutput) -> Result<Vec<PathBuf>> {
        let path = path.as_ref();
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("buffer");

        let uris = self.buffer_uris(stem, output.embed_buffers);
        let json = self.json_with_uris(&uris)?;
        let text = if output.pretty {
            serde_json::to_string_pretty(&json)?
        } else {
            serde_json::to_string(&json)?
        };

        let mut targets = Vec::with_capacity(uris.len());
        for (buffer, uri) in self.buffers().iter().zip(&uris) {
            match uri.as_deref() {
                Some(uri) if !is_external(uri) => targets.push((buffer, local_target(dir, uri)?)),
                _ => {}
            }
        }

        let mut written = vec![path.to_path_buf()];
        for (buffer, target) in targets {
            fs::write(&target, buffer.data()).map_err(|e| GltfError::io(&target, e))?;
            written.push(target);
        }
        fs::write(path, text).map_err(|e| GltfError::io(path, e))?;

        info!(
            "Wrote {} ({} buffers, {})",
            path.display(),
            uris.len(),
            if output.embed_buffers {
                "embedded"
            } else {
                "external"
            }
        );
        Ok(written)
    }
}
