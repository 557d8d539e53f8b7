//! Content-hash driven combining of script and stylesheet requirements.
//!
//! A render pass registers the scripts and styles it needs in a
//! [`RequirementRegistry`]. [`CombinePipeline::process`] then maps those
//! requirements onto the configured bundles, rebuilds any bundle whose
//! sources changed (by content fingerprint, never by timestamp) and hands
//! back a registry that lists bundle paths in place of their sources.
//!
//! Every failure inside the pipeline degrades to serving files individually;
//! the diagnostics explaining why land in a [`DiagnosticSink`](sheaf_diagnostics::DiagnosticSink).

#![warn(missing_docs)]

pub mod builder;
pub mod codes;
pub mod error;
pub mod fingerprint;
pub mod fs;
pub mod manifest;
pub mod minifier;
pub mod outcome;
pub mod pipeline;
pub mod plan;
pub mod registry;
pub mod resolver;
pub mod runtime;
pub mod url;
pub mod validator;

pub use builder::{BundleBuilder, Rebuild};
pub use error::{CombineError, MinifyError};
pub use fingerprint::ContentFingerprinter;
pub use fs::{FileSystem, LocalFileSystem};
pub use manifest::BundleManifest;
pub use minifier::{IdentityMinifier, Minifier};
pub use outcome::{BuildOutcome, BundleReport, FailReason, FallbackReason, SkipReason};
pub use pipeline::{BundleStatus, CombinePipeline, CombineRun, CombineSettings, StatusReport};
pub use plan::{BundlePlan, BundleTarget, ReverseIndex};
pub use registry::{RegistrySnapshot, RequirementRegistry, SourceEntry, StyleEntry, StyleParams};
pub use resolver::{PathResolver, SiteResolver};
pub use runtime::{RuntimeContext, StaticRuntime};
pub use url::asset_url;
pub use validator::{CacheValidator, Freshness, StaleReason, Validation};
