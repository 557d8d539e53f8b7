//! The minification capability consumed by the bundle builder.

use crate::error::MinifyError;

/// Minifies the text of one source file.
///
/// Called once per source; a failure only affects that source, whose raw
/// content is bundled instead.
pub trait Minifier: Send + Sync {
    /// Minifies `content`, read from the requirement `path`.
    fn minify(&self, path: &str, content: &str) -> Result<String, MinifyError>;
}

/// A [`Minifier`] that returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMinifier;

impl Minifier for IdentityMinifier {
    fn minify(&self, _path: &str, content: &str) -> Result<String, MinifyError> {
        Ok(content.to_string())
    }
}

impl<F> Minifier for F
where
    F: Fn(&str, &str) -> Result<String, MinifyError> + Send + Sync,
{
    fn minify(&self, path: &str, content: &str) -> Result<String, MinifyError> {
        self(path, content)
    }
}
