//! Content fingerprinting of requirement paths.
//!
//! A path backed by a readable file is fingerprinted by its bytes. A path
//! with no backing file (a generated endpoint such as `js/i18n.js?lang=en`)
//! is fingerprinted by the path string itself, so both kinds share one
//! cache-key space.

use std::path::Path;

use sheaf_common::Fingerprint;

use crate::fs::FileSystem;
use crate::resolver::PathResolver;

/// Computes fingerprints for byte buffers and requirement paths.
#[derive(Clone, Copy)]
pub struct ContentFingerprinter<'a> {
    resolver: &'a dyn PathResolver,
    fs: &'a dyn FileSystem,
}

impl<'a> ContentFingerprinter<'a> {
    /// Creates a fingerprinter resolving paths through `resolver` and reading through `fs`.
    pub fn new(resolver: &'a dyn PathResolver, fs: &'a dyn FileSystem) -> Self {
        Self { resolver, fs }
    }

    /// Fingerprints a byte buffer.
    pub fn fingerprint(&self, bytes: &[u8]) -> Fingerprint {
        Fingerprint::from_bytes(bytes)
    }

    /// Fingerprints a requirement path: its file's bytes when it resolves to
    /// a readable file, otherwise the path string.
    pub fn fingerprint_path(&self, path: &str) -> Fingerprint {
        self.resolver
            .resolve_absolute(path)
            .and_then(|abs| self.fingerprint_file(&abs))
            .unwrap_or_else(|| Fingerprint::from_key(path))
    }

    /// Fingerprints the file at an absolute path, or `None` if it can't be read.
    pub fn fingerprint_file(&self, path: &Path) -> Option<Fingerprint> {
        self.fs.read(path).ok().map(|bytes| self.fingerprint(&bytes))
    }

    /// The resolver this fingerprinter resolves paths through.
    pub fn resolver(&self) -> &'a dyn PathResolver {
        self.resolver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFileSystem;
    use crate::resolver::SiteResolver;

    #[test]
    fn unchanged_file_keeps_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.js"), "var a = 1;").unwrap();
        let resolver = SiteResolver::new(dir.path(), "/");
        let fp = ContentFingerprinter::new(&resolver, &LocalFileSystem);

        assert_eq!(fp.fingerprint_path("a.js"), fp.fingerprint_path("a.js"));
        assert_eq!(fp.fingerprint_path("a.js"), fp.fingerprint(b"var a = 1;"));
    }

    #[test]
    fn single_byte_edit_changes_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.js");
        std::fs::write(&path, "var a = 1;").unwrap();
        let resolver = SiteResolver::new(dir.path(), "/");
        let fp = ContentFingerprinter::new(&resolver, &LocalFileSystem);

        let before = fp.fingerprint_path("a.js");
        std::fs::write(&path, "var a = 2;").unwrap();
        assert_ne!(before, fp.fingerprint_path("a.js"));
    }

    #[test]
    fn unresolved_path_hashes_the_path_string() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = SiteResolver::new(dir.path(), "/");
        let fp = ContentFingerprinter::new(&resolver, &LocalFileSystem);

        let dynamic = "js/i18n.js?lang=en";
        assert_eq!(fp.fingerprint_path(dynamic), Fingerprint::from_key(dynamic));
        assert_ne!(
            fp.fingerprint_path(dynamic),
            fp.fingerprint_path("js/i18n.js?lang=de")
        );
    }

    #[test]
    fn fingerprint_file_of_missing_path_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = SiteResolver::new(dir.path(), "/");
        let fp = ContentFingerprinter::new(&resolver, &LocalFileSystem);
        assert!(fp.fingerprint_file(&dir.path().join("gone.js")).is_none());
    }
}
