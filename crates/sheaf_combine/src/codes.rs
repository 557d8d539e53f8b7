//! Diagnostic codes emitted by the combine pipeline.

use sheaf_diagnostics::{Category, DiagnosticCode};

/// A source path is listed under two different bundles.
pub const CONFIGURATION_CONFLICT: DiagnosticCode = DiagnosticCode::new(Category::Warning, 101);

/// The artifact or its directory is not writable.
pub const UNWRITABLE: DiagnosticCode = DiagnosticCode::new(Category::Warning, 102);

/// A source could not be minified; its raw content was bundled instead.
pub const MINIFY_FAILURE: DiagnosticCode = DiagnosticCode::new(Category::Warning, 103);

/// The artifact write did not persist the whole buffer.
pub const SHORT_WRITE: DiagnosticCode = DiagnosticCode::new(Category::Warning, 104);

/// A bundled source could not be read.
pub const UNREADABLE: DiagnosticCode = DiagnosticCode::new(Category::Warning, 105);
