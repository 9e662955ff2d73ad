// Unpacking of downloaded feed archives.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

use crate::error::{GtfsError, Result};

/// Writes every entry of the zip at `archive_path` under `dest`.
///
/// Existing files with the same name are overwritten. Entries already
/// written stay in place if a later entry fails.
pub fn extract_all(archive_path: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
    let file = fs::File::open(archive_path).map_err(|e| GtfsError::io(archive_path, e))?;
    let mut archive = ZipArchive::new(file)?;

    fs::create_dir_all(dest).map_err(|e| GtfsError::io(dest, e))?;

    let mut written = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;

        let relative = entry
            .enclosed_name()
            .map(Path::to_path_buf)
            .ok_or_else(|| GtfsError::UnsafeEntry(entry.name().to_string()))?;
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| GtfsError::io(&out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| GtfsError::io(parent, e))?;
        }

        let mut out = fs::File::create(&out_path).map_err(|e| GtfsError::io(&out_path, e))?;
        let bytes = io::copy(&mut entry, &mut out).map_err(|e| GtfsError::io(&out_path, e))?;
        tracing::debug!(entry = %out_path.display(), bytes, "Extracted archive entry");

        written.push(out_path);
    }

    Ok(written)
}
