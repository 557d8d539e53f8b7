//! Top-level combine orchestration for one render pass.
//!
//! The pipeline ties together the bundle plan, the cache validator and the
//! bundle builder:
//!
//! 1. Skip everything when combining is disabled or the runtime is in
//!    development mode without an override.
//! 2. Build the reverse index (reporting conflicts).
//! 3. For every bundle absorbing a registered requirement, check freshness
//!    and rebuild it if stale.
//! 4. Rewrite the registry so served bundles replace their sources.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use sheaf_common::Fingerprint;
use sheaf_config::{CombineConfig, SheafConfig};
use sheaf_diagnostics::DiagnosticSink;

use crate::builder::BundleBuilder;
use crate::fingerprint::ContentFingerprinter;
use crate::fs::{FileSystem, LocalFileSystem};
use crate::minifier::{IdentityMinifier, Minifier};
use crate::outcome::{BuildOutcome, BundleReport, SkipReason};
use crate::plan::{BundlePlan, BundleTarget, ReverseIndex};
use crate::registry::{RegistrySnapshot, RequirementRegistry, SourceEntry, StyleEntry};
use crate::resolver::PathResolver;
use crate::runtime::RuntimeContext;
use crate::url::asset_url;
use crate::validator::{CacheValidator, Freshness, StaleReason};

/// Process-wide combine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombineSettings {
    /// Global switch; when false every pass is a pass-through.
    pub enabled: bool,
    /// Directory, relative to the base folder, that receives bundles.
    pub output_dir: String,
    /// Prefix each bundled file with a header comment.
    pub write_header_comment: bool,
    /// Append fingerprints to asset URLs.
    pub suffix_requirements: bool,
}

impl CombineSettings {
    /// Settings taken from the `[combine]` table.
    pub fn from_config(config: &CombineConfig) -> Self {
        Self {
            enabled: config.enabled,
            output_dir: config.output_dir.clone(),
            write_header_comment: config.write_header_comment,
            suffix_requirements: config.suffix_requirements,
        }
    }
}

impl Default for CombineSettings {
    fn default() -> Self {
        Self::from_config(&CombineConfig::default())
    }
}

/// The result of [`CombinePipeline::process`].
#[derive(Debug, Clone)]
pub struct CombineRun {
    /// The rewritten registry the renderer should emit.
    pub registry: RequirementRegistry,
    /// One report per candidate bundle, in the order they were processed.
    pub reports: Vec<BundleReport>,
    /// `false` when the pass was a pass-through (combining disabled).
    pub combined: bool,
}

impl CombineRun {
    /// Number of bundles written during the run.
    pub fn rebuilt_count(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.was_rebuilt()).count()
    }

    /// Looks up the report for a bundle.
    pub fn report(&self, name: &str) -> Option<&BundleReport> {
        self.reports.iter().find(|r| r.name == name)
    }
}

/// Freshness of one candidate bundle, computed without building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "kebab-case")]
pub enum BundleStatus {
    /// Would be served as is.
    Fresh,
    /// Would be rebuilt.
    Stale(StaleReason),
    /// Would not be built at all.
    Skipped(SkipReason),
}

/// One line of [`CombinePipeline::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Bundle name.
    pub name: String,
    /// Site-relative path the bundle is served under.
    pub output_path: String,
    /// What a combine pass would do with it.
    pub status: BundleStatus,
}

/// Combines registered requirements into bundles.
///
/// One pipeline is shared by every render request. Validation and rebuild of
/// a given bundle run under that bundle's lock, so concurrent passes in one
/// process never rebuild the same bundle twice at once; a pass that waited
/// on the lock re-validates and normally finds the bundle fresh.
pub struct CombinePipeline {
    plan: BundlePlan,
    settings: CombineSettings,
    resolver: Arc<dyn PathResolver>,
    minifier: Arc<dyn Minifier>,
    fs: Arc<dyn FileSystem>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CombinePipeline {
    /// Creates a pipeline using the identity minifier and the local disk.
    pub fn new(plan: BundlePlan, settings: CombineSettings, resolver: Arc<dyn PathResolver>) -> Self {
        Self {
            plan,
            settings,
            resolver,
            minifier: Arc::new(IdentityMinifier),
            fs: Arc::new(LocalFileSystem),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a pipeline from a loaded configuration.
    pub fn from_config(config: &SheafConfig, resolver: Arc<dyn PathResolver>) -> Self {
        Self::new(
            BundlePlan::from_config(config),
            CombineSettings::from_config(&config.combine),
            resolver,
        )
    }

    /// Replaces the minifier.
    pub fn with_minifier(mut self, minifier: Arc<dyn Minifier>) -> Self {
        self.minifier = minifier;
        self
    }

    /// Replaces the filesystem.
    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// The bundle plan.
    pub fn plan(&self) -> &BundlePlan {
        &self.plan
    }

    /// The combine settings.
    pub fn settings(&self) -> &CombineSettings {
        &self.settings
    }

    /// A fingerprinter bound to this pipeline's resolver and filesystem.
    ///
    /// Use it to register requirements so their fingerprints match what the
    /// validator recomputes.
    pub fn fingerprinter(&self) -> ContentFingerprinter<'_> {
        ContentFingerprinter::new(self.resolver.as_ref(), self.fs.as_ref())
    }

    /// The URL a requirement path (or a bundle output path) is served from.
    pub fn url_for(&self, path: &str) -> Option<String> {
        asset_url(path, &self.fingerprinter(), self.settings.suffix_requirements)
    }

    /// Site-relative path a bundle is served under.
    pub fn output_path(&self, bundle: &str) -> String {
        let dir = self.settings.output_dir.trim_matches('/');
        if dir.is_empty() || dir == "." {
            bundle.to_string()
        } else {
            format!("{dir}/{bundle}")
        }
    }

    /// Where a bundle's artifact lives on disk.
    pub fn artifact_path(&self, bundle: &str) -> PathBuf {
        self.resolver.base_folder().join(self.output_path(bundle))
    }

    /// Runs one combine pass over `registry` and returns the rewritten registry.
    ///
    /// The input registry is consumed: the returned one lists bundle paths
    /// in place of the sources they absorbed, so it must not be processed
    /// again in the same pass.
    pub fn process(
        &self,
        mut registry: RequirementRegistry,
        runtime: &dyn RuntimeContext,
        sink: &DiagnosticSink,
    ) -> CombineRun {
        if !self.is_active(runtime) {
            return CombineRun {
                registry,
                reports: Vec::new(),
                combined: false,
            };
        }

        let index = self.plan.reverse_index(sink);
        let snapshot = registry.snapshot();

        let reports: Vec<BundleReport> = self
            .candidates(&index, snapshot)
            .into_iter()
            .map(|target| self.process_target(target, snapshot, sink))
            .collect();

        let (scripts, styles) = self.rewrite(&index, snapshot, &reports);
        registry.replace(scripts, styles);

        CombineRun {
            registry,
            reports,
            combined: true,
        }
    }

    /// Reports what [`process`](Self::process) would do, without writing anything.
    pub fn status(&self, registry: &RequirementRegistry, runtime: &dyn RuntimeContext) -> Vec<StatusReport> {
        if !self.is_active(runtime) {
            return Vec::new();
        }

        let index = self.plan.reverse_index(&DiagnosticSink::new());
        let snapshot = registry.snapshot();
        let validator = CacheValidator::new(self.fingerprinter(), self.fs.as_ref());

        self.candidates(&index, snapshot)
            .into_iter()
            .map(|target| {
                let status = match self.skip_reason(target) {
                    Some(reason) => BundleStatus::Skipped(reason),
                    None => match validator.check(
                        &self.plan,
                        target,
                        &self.artifact_path(&target.name),
                        snapshot,
                    ) {
                        Freshness::Fresh => BundleStatus::Fresh,
                        Freshness::Stale(reason) => BundleStatus::Stale(reason),
                    },
                };
                StatusReport {
                    name: target.name.clone(),
                    output_path: self.output_path(&target.name),
                    status,
                }
            })
            .collect()
    }

    fn is_active(&self, runtime: &dyn RuntimeContext) -> bool {
        if !self.settings.enabled {
            tracing::debug!("combining disabled in configuration");
            return false;
        }
        if !runtime.wants_combine() {
            tracing::debug!("development mode without combine override; serving files individually");
            return false;
        }
        true
    }

    /// Bundles claiming at least one registered requirement, in order of
    /// first appearance (scripts, then styles).
    fn candidates(&self, index: &ReverseIndex, snapshot: RegistrySnapshot<'_>) -> Vec<&BundleTarget> {
        let names: IndexSet<&str> = snapshot
            .scripts()
            .map(|e| e.path.as_str())
            .chain(snapshot.styles().map(|e| e.path.as_str()))
            .filter_map(|path| index.target_of(path))
            .collect();

        names
            .into_iter()
            .filter_map(|name| self.plan.target(name))
            .collect()
    }

    fn skip_reason(&self, target: &BundleTarget) -> Option<SkipReason> {
        if self.plan.is_blocked(&target.name) {
            Some(SkipReason::Blocked)
        } else if self.plan.unblocked_sources(target).next().is_none() {
            Some(SkipReason::Empty)
        } else {
            None
        }
    }

    fn process_target(
        &self,
        target: &BundleTarget,
        snapshot: RegistrySnapshot<'_>,
        sink: &DiagnosticSink,
    ) -> BundleReport {
        let output_path = self.output_path(&target.name);

        if let Some(reason) = self.skip_reason(target) {
            tracing::debug!(bundle = %target.name, %reason, "bundle skipped");
            return BundleReport {
                name: target.name.clone(),
                output_path,
                stale: None,
                outcome: BuildOutcome::Skipped(reason),
                artifact: None,
            };
        }

        let artifact = self.artifact_path(&target.name);
        let lock = self.lock_for(&target.name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let validator = CacheValidator::new(self.fingerprinter(), self.fs.as_ref());
        let validation = validator.validate(&self.plan, target, &artifact, snapshot);
        let (stale, outcome, fingerprint) = match validation.freshness {
            Freshness::Fresh => {
                tracing::debug!(bundle = %target.name, "bundle is fresh");
                (None, BuildOutcome::Skipped(SkipReason::Fresh), validation.artifact)
            }
            Freshness::Stale(reason) => {
                tracing::info!(bundle = %target.name, %reason, "rebuilding bundle");
                let builder = BundleBuilder::new(
                    self.resolver.as_ref(),
                    self.fs.as_ref(),
                    self.minifier.as_ref(),
                    self.settings.write_header_comment,
                );
                let rebuild = builder.rebuild(&self.plan, target, &artifact, sink);
                (Some(reason), rebuild.outcome, rebuild.artifact)
            }
        };

        BundleReport {
            name: target.name.clone(),
            output_path,
            stale,
            outcome,
            artifact: fingerprint,
        }
    }

    fn lock_for(&self, bundle: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(bundle.to_string()).or_default())
    }

    /// Builds the post-combine script and style lists.
    ///
    /// A requirement absorbed by a served bundle is replaced by the bundle's
    /// output path, inserted at the position of its first source. Styles
    /// take the params of the last source merged into the bundle. Blocked
    /// requirements and those of unserved bundles stay as they are.
    fn rewrite(
        &self,
        index: &ReverseIndex,
        snapshot: RegistrySnapshot<'_>,
        reports: &[BundleReport],
    ) -> (Vec<SourceEntry>, Vec<StyleEntry>) {
        let served: HashMap<&str, (&str, Fingerprint)> = reports
            .iter()
            .filter(|r| r.outcome.serves_bundle())
            .map(|r| {
                let fingerprint = r.artifact.unwrap_or_else(|| Fingerprint::from_key(&r.output_path));
                (r.name.as_str(), (r.output_path.as_str(), fingerprint))
            })
            .collect();

        let redirect = |path: &str| {
            if self.plan.is_blocked(path) {
                return None;
            }
            index
                .target_of(path)
                .and_then(|name| served.get(name))
                .copied()
        };

        let mut scripts: IndexMap<String, SourceEntry> = IndexMap::new();
        for entry in snapshot.scripts() {
            match redirect(&entry.path) {
                Some((output, fingerprint)) => {
                    scripts.entry(output.to_string()).or_insert_with(|| SourceEntry {
                        path: output.to_string(),
                        fingerprint,
                    });
                }
                None => {
                    scripts.insert(entry.path.clone(), entry.clone());
                }
            }
        }

        let mut styles: IndexMap<String, StyleEntry> = IndexMap::new();
        for entry in snapshot.styles() {
            match redirect(&entry.path) {
                Some((output, fingerprint)) => {
                    styles.insert(
                        output.to_string(),
                        StyleEntry {
                            path: output.to_string(),
                            params: entry.params.clone(),
                            fingerprint,
                        },
                    );
                }
                None => {
                    styles.insert(entry.path.clone(), entry.clone());
                }
            }
        }

        (scripts.into_values().collect(), styles.into_values().collect())
    }
}
