//! Atomic I/O operations

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use crate::{Error, Result};

/// Read a file's bytes, treating a missing file as `None`.
pub fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Write content atomically to a file.
///
/// Uses a write-to-temp-then-rename strategy so readers observe either the
/// previous content or the complete new content. Missing parent directories
/// are created. An existing file keeps its permissions.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let file_name = path.file_name().ok_or_else(|| Error::InvalidPath {
        path: path.to_path_buf(),
    })?;

    // Temp file lives next to the target (same filesystem for the rename)
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;

    let mut temp = tempfile::Builder::new()
        .prefix(&format!(".{}.", file_name.to_string_lossy()))
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| Error::io(parent, e))?;

    temp.write_all(content)
        .map_err(|e| Error::io(temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| Error::io(temp.path(), e))?;

    let permissions = match fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => default_permissions(),
    };
    if let Some(permissions) = permissions {
        fs::set_permissions(temp.path(), permissions)
            .map_err(|e| Error::io(temp.path(), e))?;
    }

    temp.persist(path).map_err(|e| Error::io(path, e.error))?;
    tracing::trace!(path = %path.display(), bytes = content.len(), "atomic write complete");

    Ok(())
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
