//! Append-only JSON-lines files.

use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tb_domain::error::{Error, Result};

/// Serialize records to a JSONL string.
pub fn serialize_lines<T: Serialize>(records: &[T]) -> Result<String> {
    let mut buf = String::new();
    for record in records {
        let json = serde_json::to_string(record)
            .map_err(|e| Error::Persistence(format!("serializing record: {e}")))?;
        buf.push_str(&json);
        buf.push('\n');
    }
    Ok(buf)
}

/// Append records to `path`, creating the file if needed.
pub fn append_lines<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }
    let buf = serialize_lines(records)?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| persistence(path, e))?;
    file.write_all(buf.as_bytes())
        .map_err(|e| persistence(path, e))?;
    Ok(())
}

/// Read every well-formed record from `path`.  A missing file is empty;
/// malformed lines are skipped with a warning.
pub fn read_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let raw = std::fs::read_to_string(path).map_err(|e| persistence(path, e))?;
    let mut records = Vec::new();
    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(line) {
            Ok(r) => records.push(r),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "skipping malformed jsonl line"
                );
            }
        }
    }
    Ok(records)
}

/// Replace the file's contents with `records` (write to a sibling temp file,
/// then rename).
pub fn rewrite<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let buf = serialize_lines(records)?;
    write_atomic(path, buf.as_bytes())
}

/// Write `bytes` to `path` via a temp file + rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes).map_err(|e| persistence(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| persistence(path, e))?;
    Ok(())
}

/// Remove `path`; a file that is already gone is not an error.
pub fn remove(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(persistence(path, e)),
    }
}

pub(crate) fn persistence(path: &Path, e: std::io::Error) -> Error {
    Error::Persistence(format!("{}: {e}", path.display()))
}
