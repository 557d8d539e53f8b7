//! Filesystem capability used to check, read and publish bundle artifacts.

use std::io::{self, Write};
use std::path::Path;

/// The filesystem operations the combine pipeline needs.
///
/// Kept narrow so tests can substitute failures (read-only directories,
/// truncated writes) without touching the real disk.
pub trait FileSystem: Send + Sync {
    /// Returns `true` if something exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Reads the whole file at `path`.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Returns `true` if `path` exists and may be written to.
    fn is_writable(&self, path: &Path) -> bool;

    /// Creates `path` and any missing parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Replaces the file at `path` with `data` so that readers see either the
    /// old content or the new content, never a mix.
    ///
    /// Returns the number of bytes that actually reached the new file; a
    /// value smaller than `data.len()` means nothing was published.
    fn write_atomic(&self, path: &Path, data: &[u8]) -> io::Result<u64>;
}

/// The local disk.
///
/// [`write_atomic`](FileSystem::write_atomic) writes into a temporary file
/// in the destination directory, checks its length, then renames it over
/// the destination.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

/// Permissions given to published artifacts; temp files start out private.
#[cfg(unix)]
const ARTIFACT_MODE: u32 = 0o644;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    // Asks the OS rather than reading mode bits, so ownership and
    // privileges are taken into account.
    fn is_writable(&self, path: &Path) -> bool {
        if path.is_dir() {
            tempfile::tempfile_in(path).is_ok()
        } else {
            std::fs::OpenOptions::new().write(true).open(path).is_ok()
        }
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> io::Result<u64> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(data)?;
        temp.as_file().sync_all()?;

        let written = temp.as_file().metadata()?.len();
        if written != data.len() as u64 {
            // Dropping the temp file removes it; the old artifact stays.
            return Ok(written);
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            temp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(ARTIFACT_MODE))?;
        }

        temp.persist(path).map_err(|e| e.error)?;
        Ok(written)
    }
}
