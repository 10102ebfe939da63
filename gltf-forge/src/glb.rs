//! Binary glTF container writer
//!
//! ```text
//! Header (12 bytes):
//!   magic "glTF" (u32 LE 0x46546C67), version 2, total length
//! JSON chunk:
//!   length (u32), type 0x4E4F534A, text padded with 0x20
//! BIN chunk (one per buffer, in order):
//!   length (u32), type 0x004E4942, bytes padded with 0x00
//! ```
//!
//! Every chunk length is a multiple of 4.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::error::{GltfError, Result};

pub const GLB_MAGIC: u32 = 0x4654_6C67;
pub const GLB_VERSION: u32 = 2;
pub const CHUNK_JSON: u32 = 0x4E4F_534A;
pub const CHUNK_BIN: u32 = 0x004E_4942;
pub const HEADER_SIZE: usize = 12;
pub const CHUNK_HEADER_SIZE: usize = 8;

/// Round up to the next multiple of 4
pub fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}

/// Size of the whole file image
pub fn total_length(json_len: usize, buffer_lens: impl IntoIterator<Item = usize>) -> usize {
    HEADER_SIZE
        + CHUNK_HEADER_SIZE
        + padded_len(json_len)
        + buffer_lens
            .into_iter()
            .map(|len| CHUNK_HEADER_SIZE + padded_len(len))
            .sum::<usize>()
}

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| GltfError::Validation(format!("{what} of {value} bytes exceeds the GLB limit")))
}

fn write_chunk<W: Write>(writer: &mut W, chunk_type: u32, payload: &[u8], pad: u8) -> Result<()> {
    let padded = padded_len(payload.len());
    writer.write_all(&to_u32(padded, "chunk")?.to_le_bytes())?;
    writer.write_all(&chunk_type.to_le_bytes())?;
    writer.write_all(payload)?;
    for _ in payload.len()..padded {
        writer.write_all(&[pad])?;
    }
    Ok(())
}

/// Write a GLB image of `json` and `buffers` to `writer`
///
/// An empty `buffers` list produces a JSON-only file.
pub fn write<W: Write>(writer: &mut W, json: &str, buffers: &[&[u8]]) -> Result<()> {
    let total = total_length(json.len(), buffers.iter().map(|b| b.len()));
    let total = to_u32(total, "file")?;
    if buffers.is_empty() {
        debug!("Writing JSON-only GLB ({} bytes)", total);
    }

    writer.write_all(&GLB_MAGIC.to_le_bytes())?;
    writer.write_all(&GLB_VERSION.to_le_bytes())?;
    writer.write_all(&total.to_le_bytes())?;

    write_chunk(writer, CHUNK_JSON, json.as_bytes(), b' ')?;
    for buffer in buffers {
        write_chunk(writer, CHUNK_BIN, buffer, 0)?;
    }
    Ok(())
}

/// GLB image in memory
pub fn encode(json: &str, buffers: &[&[u8]]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(total_length(json.len(), buffers.iter().map(|b| b.len())));
    write(&mut out, json, buffers)?;
    Ok(out)
}

/// Write a GLB file to `path`
pub fn save(path: impl AsRef<Path>, json: &str, buffers: &[&[u8]]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| GltfError::io(path, e))?;
    let mut writer = BufWriter::new(file);

    match write(&mut writer, json, buffers) {
        Ok(()) => {}
        Err(GltfError::Stream(source)) => return Err(GltfError::io(path, source)),
        Err(other) => return Err(other),
    }
    writer.flush().map_err(|e| GltfError::io(path, e))?;

    info!(
        "Wrote {} ({} bytes, {} binary chunks)",
        path.display(),
        total_length(json.len(), buffers.iter().map(|b| b.len())),
        buffers.len()
    );
    Ok(())
}
