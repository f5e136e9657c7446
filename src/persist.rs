use std::fs::File;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::SpzError;

/// Write a file through a temporary sibling and rename it into place.
///
/// If `write` fails, or syncing or renaming fails, the temporary is removed
/// and whatever was at `path` before is left untouched.
pub(crate) fn write_atomic<F>(path: &Path, write: F) -> Result<(), SpzError>
where
    F: FnOnce(&mut File) -> Result<(), SpzError>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    write(tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| SpzError::Io(e.error))?;
    Ok(())
}
