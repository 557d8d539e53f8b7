//! Bundle configuration and the source → bundle reverse index.

use std::collections::{HashMap, HashSet};

use sheaf_config::{BundleDef, SheafConfig};
use sheaf_diagnostics::{Diagnostic, DiagnosticSink};

use crate::codes;

/// A named combined output file and its ordered source paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleTarget {
    /// File name inside the combined-output directory.
    pub name: String,
    /// Source paths in concatenation order.
    pub source_paths: Vec<String>,
}

impl From<&BundleDef> for BundleTarget {
    fn from(def: &BundleDef) -> Self {
        Self {
            name: def.name.clone(),
            source_paths: def.sources.clone(),
        }
    }
}

/// Static bundle configuration: ordered targets plus the block list.
///
/// Read-only for the lifetime of the process; one plan serves every
/// render pass.
#[derive(Debug, Clone, Default)]
pub struct BundlePlan {
    targets: Vec<BundleTarget>,
    blocked: HashSet<String>,
}

impl BundlePlan {
    /// Creates a plan from ordered targets and a block list.
    pub fn new<I, S>(targets: Vec<BundleTarget>, blocked: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets,
            blocked: blocked.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds the plan described by a loaded configuration.
    pub fn from_config(config: &SheafConfig) -> Self {
        Self::new(
            config.bundles.iter().map(BundleTarget::from).collect(),
            config.combine.blocked.iter().cloned(),
        )
    }

    /// Configured targets in declaration order.
    pub fn targets(&self) -> &[BundleTarget] {
        &self.targets
    }

    /// Looks up a target by name.
    pub fn target(&self, name: &str) -> Option<&BundleTarget> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// Returns `true` if `path` (a source path or a bundle name) is blocked.
    pub fn is_blocked(&self, path: &str) -> bool {
        self.blocked.contains(path)
    }

    /// The target's sources with blocked paths removed, in order.
    pub fn unblocked_sources<'a>(&'a self, target: &'a BundleTarget) -> impl Iterator<Item = &'a str> {
        target
            .source_paths
            .iter()
            .map(String::as_str)
            .filter(|path| !self.is_blocked(path))
    }

    /// Builds the reverse index, reporting every source claimed by two
    /// different targets.
    ///
    /// Targets are visited in declaration order and the last claim wins, so
    /// a conflicting source ends up mapped to the later target. Each
    /// conflict is a warning; indexing always completes.
    pub fn reverse_index(&self, sink: &DiagnosticSink) -> ReverseIndex {
        let mut map: HashMap<String, String> = HashMap::new();

        for target in &self.targets {
            for source in &target.source_paths {
                if let Some(previous) = map.get(source) {
                    if previous != &target.name {
                        tracing::warn!(
                            source = %source,
                            first = %previous,
                            second = %target.name,
                            "source claimed by two bundles"
                        );
                        sink.emit(
                            Diagnostic::warning(
                                codes::CONFIGURATION_CONFLICT,
                                format!(
                                    "'{source}' appears in two combined files: '{previous}' and '{}'",
                                    target.name
                                ),
                            )
                            .with_subject(source.clone())
                            .with_note(format!("'{}' is used for this source", target.name)),
                        );
                    }
                }
                map.insert(source.clone(), target.name.clone());
            }
        }

        ReverseIndex { map }
    }
}

/// Source path → bundle name, rebuilt on every pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReverseIndex {
    map: HashMap<String, String>,
}

impl ReverseIndex {
    /// The bundle that absorbs `source`, if any.
    pub fn target_of(&self, source: &str) -> Option<&str> {
        self.map.get(source).map(String::as_str)
    }

    /// Number of indexed sources.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if no source is claimed by any bundle.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
