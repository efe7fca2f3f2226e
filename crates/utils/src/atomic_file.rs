//! Atomic file writes so stores and key files are never left half-written

use rigger_core::{Error, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use uuid::Uuid;

/// Permission mode for files holding key material (owner read/write only)
pub const PRIVATE_FILE_MODE: u32 = 0o600;

/// Write data to a file atomically by writing to a temporary file and renaming
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    write_atomic_with_mode(path, content, None)
}

/// Write data atomically with owner-only permissions on unix
pub fn write_atomic_private(path: &Path, content: &[u8]) -> Result<()> {
    write_atomic_with_mode(path, content, Some(PRIVATE_FILE_MODE))
}

fn write_atomic_with_mode(path: &Path, content: &[u8], mode: Option<u32>) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    fs::create_dir_all(parent)
        .map_err(|e| Error::file_system(parent, "create parent directory", e))?;

    // Same directory as the target so the rename stays on one filesystem
    let temp_path = parent.join(format!(".{}.tmp", Uuid::new_v4()));

    let written = open_temp(&temp_path, mode)
        .and_then(|mut file| {
            file.write_all(content)?;
            file.sync_all()
        })
        .map_err(|e| Error::file_system(&temp_path, "write temporary file", e));

    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        Error::file_system(path, "atomic rename", e)
    })
}

fn open_temp(path: &Path, mode: Option<u32>) -> std::io::Result<fs::File> {
    let mut options = OpenOptions::new();
    options.create(true).write(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if let Some(mode) = mode {
            options.mode(mode);
        }
    }
    #[cfg(not(unix))]
    {
        let _ = mode;
    }

    options.open(path)
}
