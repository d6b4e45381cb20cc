//! Atomic output file replacement

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::errors::{AppError, AppResult};

/// What happened to the output file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Written,
    /// File already held exactly these bytes
    Unchanged,
}

/// Replace `path` with `contents` via a temporary file in the same directory.
///
/// Readers see either the old file or the new one, never a partial write.
pub fn write_atomic(path: &Path, contents: &[u8]) -> AppResult<WriteStatus> {
    if let Ok(existing) = fs::read(path)
        && existing == contents
    {
        debug!("{} is up to date, skipping write", path.display());
        return Ok(WriteStatus::Unchanged);
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| AppError::io(dir, e))?;

    let mut temp = tempfile::Builder::new()
        .prefix(".epg-grabber-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| AppError::io(dir, e))?;

    temp.write_all(contents).map_err(|e| AppError::io(temp.path(), e))?;
    temp.as_file().sync_all().map_err(|e| AppError::io(temp.path(), e))?;

    // Temp files are created 0600; keep the previous file's mode, or use the usual default
    let permissions = match fs::metadata(path) {
        Ok(metadata) => Some(metadata.permissions()),
        Err(_) => default_permissions(),
    };
    if let Some(permissions) = permissions {
        fs::set_permissions(temp.path(), permissions).map_err(|e| AppError::io(temp.path(), e))?;
    }

    temp.persist(path).map_err(|e| AppError::io(path, e.error))?;
    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(WriteStatus::Written)
}

#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_creates_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("epg.xml");

        assert_eq!(write_atomic(&path, b"first").unwrap(), WriteStatus::Written);
        assert_eq!(fs::read(&path).unwrap(), b"first");

        assert_eq!(write_atomic(&path, b"second").unwrap(), WriteStatus::Written);
        assert_eq!(fs::read(&path).unwrap(), b"second");

        // No temporary files are left behind
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_identical_content_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("epg.xml");
        write_atomic(&path, b"same").unwrap();
        let before = fs::metadata(&path).unwrap().modified().unwrap();

        assert_eq!(write_atomic(&path, b"same").unwrap(), WriteStatus::Unchanged);
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), before);
    }

    #[cfg(unix)]
    #[test]
    fn test_new_file_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("epg.xml");
        write_atomic(&path, b"<tv/>").unwrap();
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o644);
    }
}
