//! Mapping requirement paths onto the site's files and URLs.

use std::path::{Path, PathBuf};

/// Resolves site-relative requirement paths.
///
/// Requirement paths are opaque strings such as `js/app.js` or
/// `js/config.js?locale=en`; the resolver decides what, if anything, backs
/// them on disk.
pub trait PathResolver: Send + Sync {
    /// Returns the absolute path of the file behind `path`, or `None` when no
    /// regular file backs it (e.g. a dynamically generated endpoint).
    fn resolve_absolute(&self, path: &str) -> Option<PathBuf>;

    /// Directory every requirement path is relative to.
    fn base_folder(&self) -> &Path;

    /// URL prefix the base folder is served under.
    fn base_url(&self) -> &str;
}

/// A [`PathResolver`] rooted at a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct SiteResolver {
    root: PathBuf,
    base_url: String,
}

impl SiteResolver {
    /// Creates a resolver for files under `root`, served at `base_url`.
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }
}

impl PathResolver for SiteResolver {
    fn resolve_absolute(&self, path: &str) -> Option<PathBuf> {
        let relative = path.trim_start_matches('/');
        if relative.is_empty() {
            return None;
        }
        let candidate = self.root.join(relative);
        candidate.is_file().then_some(candidate)
    }

    fn base_folder(&self) -> &Path {
        &self.root
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
