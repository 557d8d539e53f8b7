//! Deciding whether a bundle artifact still reflects its sources.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use sheaf_common::Fingerprint;

use crate::fingerprint::ContentFingerprinter;
use crate::fs::FileSystem;
use crate::manifest::BundleManifest;
use crate::plan::{BundlePlan, BundleTarget};
use crate::registry::RegistrySnapshot;

/// Whether a bundle needs rebuilding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "kebab-case")]
pub enum Freshness {
    /// The artifact exists and matches every registered source.
    Fresh,
    /// The artifact must be rebuilt.
    Stale(StaleReason),
}

impl Freshness {
    /// Returns `true` for [`Freshness::Fresh`].
    pub fn is_fresh(&self) -> bool {
        matches!(self, Freshness::Fresh)
    }
}

/// Why a bundle is stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StaleReason {
    /// The artifact does not exist.
    Missing,
    /// The artifact has no usable manifest, or was changed after it was written.
    Untracked,
    /// The named source differs from its registered or recorded fingerprint.
    ContentChanged(String),
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::Missing => write!(f, "missing"),
            StaleReason::Untracked => write!(f, "untracked"),
            StaleReason::ContentChanged(source) => write!(f, "content-changed: {source}"),
        }
    }
}

/// The result of [`CacheValidator::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    /// Whether the bundle needs rebuilding.
    pub freshness: Freshness,
    /// Fingerprint of the artifact bytes on disk, when they were read and
    /// matched the manifest.
    pub artifact: Option<Fingerprint>,
}

impl Validation {
    fn stale(reason: StaleReason) -> Self {
        Self {
            freshness: Freshness::Stale(reason),
            artifact: None,
        }
    }
}

/// Compares a bundle's sources against the fingerprints registered this pass
/// and those recorded when the artifact was built.
pub struct CacheValidator<'a> {
    fingerprinter: ContentFingerprinter<'a>,
    fs: &'a dyn FileSystem,
}

impl<'a> CacheValidator<'a> {
    /// Creates a validator.
    pub fn new(fingerprinter: ContentFingerprinter<'a>, fs: &'a dyn FileSystem) -> Self {
        Self { fingerprinter, fs }
    }

    /// Decides whether `target`, stored at `artifact`, is fresh.
    pub fn check(
        &self,
        plan: &BundlePlan,
        target: &BundleTarget,
        artifact: &Path,
        registry: RegistrySnapshot<'_>,
    ) -> Freshness {
        self.validate(plan, target, artifact, registry).freshness
    }

    /// Like [`check`](Self::check), also returning the artifact fingerprint.
    ///
    /// A registered source is changed when its registered fingerprint
    /// differs from its current one or from the one recorded in the
    /// artifact's manifest. A source not registered this pass is changed
    /// when its current fingerprint differs from the recorded one. Sources
    /// are scanned in order and the scan stops at the first mismatch, so
    /// the reported reason names only that source. Blocked sources never
    /// take part.
    pub fn validate(
        &self,
        plan: &BundlePlan,
        target: &BundleTarget,
        artifact: &Path,
        registry: RegistrySnapshot<'_>,
    ) -> Validation {
        if !self.fs.exists(artifact) {
            return Validation::stale(StaleReason::Missing);
        }

        let Some(manifest) = BundleManifest::load(self.fs, artifact) else {
            tracing::debug!(bundle = %target.name, "no manifest for artifact");
            return Validation::stale(StaleReason::Untracked);
        };
        let written = self.fs.read(artifact).ok().map(|bytes| self.fingerprinter.fingerprint(&bytes));
        if written != Some(manifest.artifact) {
            tracing::debug!(bundle = %target.name, "artifact differs from its manifest");
            return Validation::stale(StaleReason::Untracked);
        }

        for source in plan.unblocked_sources(target) {
            let current = self.fingerprinter.fingerprint_path(source);
            let recorded = manifest.source(source);
            let registered = registry.fingerprint_of(source);
            let changed = match registered {
                Some(registered) => current != registered || recorded != Some(registered),
                None => recorded != Some(current),
            };
            if changed {
                tracing::debug!(
                    bundle = %target.name,
                    source,
                    registered = %registered.map(|fp| fp.short()).unwrap_or_default(),
                    current = %current.short(),
                    recorded = %recorded.map(|fp| fp.short()).unwrap_or_default(),
                    "source changed"
                );
                return Validation::stale(StaleReason::ContentChanged(source.to_string()));
            }
        }

        Validation {
            freshness: Freshness::Fresh,
            artifact: written,
        }
    }
}
