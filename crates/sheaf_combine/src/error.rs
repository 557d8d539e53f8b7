//! Error types for combine operations.

use std::path::PathBuf;

/// Errors that can occur while assembling or writing a bundle.
///
/// None of these escape [`CombinePipeline::process`](crate::CombinePipeline::process):
/// the pipeline turns each one into a failed [`BuildOutcome`](crate::BuildOutcome)
/// plus a diagnostic, and the bundle's sources are served individually.
#[derive(Debug, thiserror::Error)]
pub enum CombineError {
    /// The artifact, or the directory that should hold it, is not writable.
    #[error("cannot write combined file {path}")]
    Unwritable {
        /// The artifact path.
        path: PathBuf,
    },

    /// A source listed in a bundle could not be resolved or read.
    #[error("cannot read source '{source_path}'")]
    Unreadable {
        /// The source path as configured.
        source_path: String,
        /// The underlying I/O error, if the file resolved but reading failed.
        #[source]
        source: Option<std::io::Error>,
    },

    /// Fewer bytes reached the artifact than were assembled.
    #[error("short write to {path}: wrote {written} of {expected} bytes")]
    ShortWrite {
        /// The artifact path.
        path: PathBuf,
        /// Length of the assembled buffer.
        expected: u64,
        /// Bytes the filesystem reported as persisted.
        written: u64,
    },

    /// An I/O error occurred while writing the artifact.
    #[error("combine I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// A minifier declined or failed to minify one source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct MinifyError {
    /// Human-readable failure reason.
    pub reason: String,
}

impl MinifyError {
    /// Creates a minify error with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
