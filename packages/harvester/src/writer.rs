//! Atomic file writes for every artifact the harvester persists.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Write `content` to `path` through a temporary sibling file.
///
/// The temporary file is synced before it is renamed over the target, so a
/// crash leaves either the old file or the new one, never a partial write.
/// Parent directories are created as needed.
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let temp_file = dir.join(format!(".{}.tmp", file_name.to_string_lossy()));

    let written = (|| {
        let mut file = File::create(&temp_file)?;
        file.write_all(content)?;
        file.sync_all() // Ensure data is flushed to disk
    })();
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_file);
        return Err(e);
    }

    // On Windows, rename fails if the destination already exists
    #[cfg(target_os = "windows")]
    if path.exists() {
        fs::remove_file(path)?;
    }

    // Atomic rename (on most filesystems)
    fs::rename(&temp_file, path)
}
