//! Atomic file writes: temp file + fsync + rename.
//!
//! Used by every component that persists state across process invocations
//! (OCR cache, specimen index, JIT cache metadata, provenance log, output
//! writers) so a crash mid-write never leaves a half-written file behind.

use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, thiserror::Error)]
pub enum AtomicWriteError {
    #[error("failed to create parent directory {0}: {1}")]
    CreateDir(Utf8PathBuf, std::io::Error),
    #[error("failed to create temp file in {0}: {1}")]
    TempFile(Utf8PathBuf, std::io::Error),
    #[error("failed to write content: {0}")]
    Write(std::io::Error),
    #[error("failed to fsync temp file: {0}")]
    Fsync(std::io::Error),
    #[error("failed to rename temp file into place at {0}: {1}")]
    Rename(Utf8PathBuf, std::io::Error),
}

/// Atomically write `content` to `path`.
pub fn write_file_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), AtomicWriteError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AtomicWriteError::CreateDir(parent.to_path_buf(), e))?;
    }

    let temp_dir = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let mut temp_file = NamedTempFile::new_in(temp_dir)
        .map_err(|e| AtomicWriteError::TempFile(temp_dir.to_path_buf(), e))?;

    temp_file
        .write_all(content)
        .map_err(AtomicWriteError::Write)?;
    temp_file.as_file().sync_all().map_err(AtomicWriteError::Fsync)?;

    temp_file
        .persist(path.as_std_path())
        .map_err(|e| AtomicWriteError::Rename(path.to_path_buf(), e.error))?;

    Ok(())
}

/// Atomically append a line to `path`, creating it if necessary. Not
/// lock-free across processes; callers (e.g. the provenance log, the run
/// controller's single writer task) are responsible for serializing
/// concurrent appends themselves.
pub fn append_line(path: &Utf8Path, line: &str) -> Result<(), AtomicWriteError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AtomicWriteError::CreateDir(parent.to_path_buf(), e))?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path.as_std_path())
        .map_err(AtomicWriteError::Write)?;
    file.write_all(line.as_bytes())
        .map_err(AtomicWriteError::Write)?;
    file.write_all(b"\n").map_err(AtomicWriteError::Write)?;
    file.sync_all().map_err(AtomicWriteError::Fsync)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_then_read_roundtrips() {
        let dir = tempdir().unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().join("out.json");
        write_file_atomic(&path, b"{\"a\":1}").unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"a\":1}");
    }

    #[test]
    fn write_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = Utf8Path::from_path(dir.path())
            .unwrap()
            .join("a/b/c/out.json");
        write_file_atomic(&path, b"hi").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn append_line_accumulates() {
        let dir = tempdir().unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().join("log.jsonl");
        append_line(&path, "one").unwrap();
        append_line(&path, "two").unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "one\ntwo\n");
    }
}
