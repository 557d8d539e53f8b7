//! The set of scripts and styles requested by one render pass.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;
use sheaf_common::Fingerprint;

use crate::fingerprint::ContentFingerprinter;

/// Rendering attributes of a stylesheet requirement (e.g. `media`).
pub type StyleParams = BTreeMap<String, String>;

/// A registered script and its fingerprint at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceEntry {
    /// Requirement path.
    pub path: String,
    /// Fingerprint taken when the path was (re-)registered.
    pub fingerprint: Fingerprint,
}

/// A registered stylesheet, its rendering attributes and its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleEntry {
    /// Requirement path.
    pub path: String,
    /// Rendering attributes; a bundle inherits those of its last style.
    pub params: StyleParams,
    /// Fingerprint taken when the path was (re-)registered.
    pub fingerprint: Fingerprint,
}

/// Scripts and styles requested for one render pass, in request order.
///
/// Order is significant: scripts are emitted in registration order, so a
/// library registered before its plugins stays ahead of them. Re-registering
/// a path keeps its original position but always takes a fresh fingerprint.
///
/// A registry is single-use per pass. After
/// [`CombinePipeline::process`](crate::CombinePipeline::process) it lists
/// bundle paths instead of their sources; processing that result again
/// without re-registering gives a different (degenerate) result.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequirementRegistry {
    scripts: IndexMap<String, SourceEntry>,
    styles: IndexMap<String, StyleEntry>,
}

impl RequirementRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a script, replacing any earlier entry for the same path.
    pub fn register_script(&mut self, path: impl Into<String>, fingerprinter: &ContentFingerprinter<'_>) {
        let path = path.into();
        let fingerprint = fingerprinter.fingerprint_path(&path);
        tracing::trace!(%path, fingerprint = %fingerprint.short(), "registered script");
        self.scripts.insert(path.clone(), SourceEntry { path, fingerprint });
    }

    /// Registers a stylesheet, replacing any earlier entry for the same path.
    pub fn register_style(
        &mut self,
        path: impl Into<String>,
        params: StyleParams,
        fingerprinter: &ContentFingerprinter<'_>,
    ) {
        let path = path.into();
        let fingerprint = fingerprinter.fingerprint_path(&path);
        tracing::trace!(%path, fingerprint = %fingerprint.short(), "registered style");
        self.styles.insert(
            path.clone(),
            StyleEntry {
                path,
                params,
                fingerprint,
            },
        );
    }

    /// Returns a read-only view of the current contents.
    pub fn snapshot(&self) -> RegistrySnapshot<'_> {
        RegistrySnapshot {
            scripts: &self.scripts,
            styles: &self.styles,
        }
    }

    /// Swaps the whole contents for the given entries, keeping their order.
    pub fn replace<S, T>(&mut self, scripts: S, styles: T)
    where
        S: IntoIterator<Item = SourceEntry>,
        T: IntoIterator<Item = StyleEntry>,
    {
        self.scripts = scripts.into_iter().map(|e| (e.path.clone(), e)).collect();
        self.styles = styles.into_iter().map(|e| (e.path.clone(), e)).collect();
    }

    /// Registered scripts in order.
    pub fn scripts(&self) -> impl Iterator<Item = &SourceEntry> {
        self.scripts.values()
    }

    /// Registered styles in order.
    pub fn styles(&self) -> impl Iterator<Item = &StyleEntry> {
        self.styles.values()
    }

    /// Script paths in order.
    pub fn script_paths(&self) -> Vec<&str> {
        self.scripts.keys().map(String::as_str).collect()
    }

    /// Style paths in order.
    pub fn style_paths(&self) -> Vec<&str> {
        self.styles.keys().map(String::as_str).collect()
    }

    /// Looks up a registered style.
    pub fn style(&self, path: &str) -> Option<&StyleEntry> {
        self.styles.get(path)
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty() && self.styles.is_empty()
    }
}

/// A borrowed, read-only view of a [`RequirementRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct RegistrySnapshot<'a> {
    scripts: &'a IndexMap<String, SourceEntry>,
    styles: &'a IndexMap<String, StyleEntry>,
}

impl<'a> RegistrySnapshot<'a> {
    /// Registered scripts in order.
    pub fn scripts(&self) -> impl Iterator<Item = &'a SourceEntry> {
        self.scripts.values()
    }

    /// Registered styles in order.
    pub fn styles(&self) -> impl Iterator<Item = &'a StyleEntry> {
        self.styles.values()
    }

    /// The fingerprint recorded for `path` this pass, whether it was
    /// registered as a script or a style.
    pub fn fingerprint_of(&self, path: &str) -> Option<Fingerprint> {
        self.scripts
            .get(path)
            .map(|e| e.fingerprint)
            .or_else(|| self.styles.get(path).map(|e| e.fingerprint))
    }
}
