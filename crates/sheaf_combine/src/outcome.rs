//! Per-bundle results of a combine run.

use std::fmt;

use serde::Serialize;
use sheaf_common::Fingerprint;

use crate::validator::StaleReason;

/// What happened to one bundle during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "kebab-case")]
pub enum BuildOutcome {
    /// Nothing was written.
    Skipped(SkipReason),
    /// The artifact was rebuilt from fully minified sources.
    Rebuilt,
    /// The artifact was rebuilt, but some sources went in unminified.
    RebuiltWithFallback(FallbackReason),
    /// The artifact could not be rebuilt; its sources are served individually.
    Failed(FailReason),
}

impl BuildOutcome {
    /// Whether requests for the bundle's sources are redirected to the bundle.
    pub fn serves_bundle(&self) -> bool {
        match self {
            BuildOutcome::Skipped(SkipReason::Fresh)
            | BuildOutcome::Rebuilt
            | BuildOutcome::RebuiltWithFallback(_) => true,
            BuildOutcome::Skipped(_) | BuildOutcome::Failed(_) => false,
        }
    }

    /// Whether the artifact was written during this run.
    pub fn was_rebuilt(&self) -> bool {
        matches!(self, BuildOutcome::Rebuilt | BuildOutcome::RebuiltWithFallback(_))
    }
}

impl fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildOutcome::Skipped(reason) => write!(f, "skipped ({reason})"),
            BuildOutcome::Rebuilt => write!(f, "rebuilt"),
            BuildOutcome::RebuiltWithFallback(reason) => write!(f, "rebuilt with fallback ({reason})"),
            BuildOutcome::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

/// Why a bundle was not rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// The artifact exists and every source matches its fingerprint.
    Fresh,
    /// The bundle name is on the block list.
    Blocked,
    /// Every source of the bundle is blocked.
    Empty,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::Fresh => "fresh",
            SkipReason::Blocked => "blocked",
            SkipReason::Empty => "empty",
        })
    }
}

/// Why a rebuilt bundle is not fully minified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackReason {
    /// These sources failed to minify and were bundled raw.
    Unminified(Vec<String>),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Unminified(paths) => write!(f, "unminified: {}", paths.join(", ")),
        }
    }
}

/// Why a bundle could not be rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailReason {
    /// The artifact or its directory is not writable.
    Unwritable,
    /// The write did not persist the whole buffer.
    ShortWrite,
    /// A source could not be read.
    Unreadable,
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailReason::Unwritable => "unwritable",
            FailReason::ShortWrite => "short-write",
            FailReason::Unreadable => "unreadable",
        })
    }
}

/// The result for one candidate bundle of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleReport {
    /// Bundle name.
    pub name: String,
    /// Site-relative path the bundle is served under.
    pub output_path: String,
    /// Why the bundle was considered stale, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale: Option<StaleReason>,
    /// What happened.
    pub outcome: BuildOutcome,
    /// Fingerprint of the artifact being served, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Fingerprint>,
}
