//! In-memory artifact archive builders.

use std::io::{Cursor, Write};

use bytes::Bytes;
use serde::Serialize;
use zip::CompressionMethod;
use zip::result::{ZipError, ZipResult};
use zip::write::{SimpleFileOptions, ZipWriter};

/// Builds a deflated zip archive containing the given entries in order.
pub fn zip_archive(entries: &[(&str, &[u8])]) -> ZipResult<Bytes> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, content) in entries {
        writer.start_file(*name, options)?;
        writer.write_all(content)?;
    }

    let cursor = writer.finish()?;
    Ok(Bytes::from(cursor.into_inner()))
}

/// Builds a zip archive holding `value` serialized as JSON under `entry_name`.
pub fn json_archive<T: Serialize>(entry_name: &str, value: &T) -> ZipResult<Bytes> {
    let json = serde_json::to_vec(value).map_err(|e| ZipError::Io(std::io::Error::other(e)))?;
    zip_archive(&[(entry_name, json.as_slice())])
}
