//! Sidecar record of what a bundle artifact was built from.
//!
//! Each artifact `<output_dir>/<name>` is accompanied by
//! `<output_dir>/<name>.manifest.json`, holding the fingerprint of the
//! artifact bytes and of every source that went into it. The validator
//! compares those against the fingerprints registered in the current pass.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sheaf_common::Fingerprint;

use crate::error::CombineError;
use crate::fs::FileSystem;

/// Suffix appended to an artifact's file name to locate its manifest.
pub const MANIFEST_SUFFIX: &str = ".manifest.json";

/// Version written into new manifests; others are ignored on load.
const SHEAF_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fingerprints of one built artifact and its sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleManifest {
    /// Version of sheaf that built the artifact.
    pub sheaf_version: String,
    /// Bundle name.
    pub bundle: String,
    /// Fingerprint of the artifact bytes as written.
    pub artifact: Fingerprint,
    /// Fingerprint of every bundled source, in bundle order.
    pub sources: IndexMap<String, Fingerprint>,
}

impl BundleManifest {
    /// Creates a manifest for a freshly written artifact.
    pub fn new(bundle: impl Into<String>, artifact: Fingerprint) -> Self {
        Self {
            sheaf_version: SHEAF_VERSION.to_string(),
            bundle: bundle.into(),
            artifact,
            sources: IndexMap::new(),
        }
    }

    /// Records the fingerprint a source had when it was bundled.
    pub fn record(&mut self, source: impl Into<String>, fingerprint: Fingerprint) {
        self.sources.insert(source.into(), fingerprint);
    }

    /// The recorded fingerprint of `source`, if it was bundled.
    pub fn source(&self, source: &str) -> Option<Fingerprint> {
        self.sources.get(source).copied()
    }

    /// Manifest location for an artifact.
    pub fn path_for(artifact: &Path) -> PathBuf {
        let mut name = artifact
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(MANIFEST_SUFFIX);
        artifact.with_file_name(name)
    }

    /// Loads the manifest for `artifact`.
    ///
    /// Any problem (missing, unreadable, corrupt, other version) yields
    /// `None`, which the validator treats as an untracked artifact.
    pub fn load(fs: &dyn FileSystem, artifact: &Path) -> Option<Self> {
        let bytes = fs.read(&Self::path_for(artifact)).ok()?;
        let manifest: Self = serde_json::from_slice(&bytes).ok()?;
        manifest.is_compatible().then_some(manifest)
    }

    /// Writes the manifest next to `artifact`.
    pub fn save(&self, fs: &dyn FileSystem, artifact: &Path) -> Result<(), CombineError> {
        let path = Self::path_for(artifact);
        let json = serde_json::to_vec_pretty(self).map_err(|e| CombineError::Io {
            path: path.clone(),
            source: e.into(),
        })?;
        let written = fs.write_atomic(&path, &json).map_err(|e| CombineError::Io {
            path: path.clone(),
            source: e,
        })?;
        if written != json.len() as u64 {
            return Err(CombineError::ShortWrite {
                path,
                expected: json.len() as u64,
                written,
            });
        }
        Ok(())
    }

    /// Returns `true` if this manifest was written by this version.
    pub fn is_compatible(&self) -> bool {
        self.sheaf_version == SHEAF_VERSION
    }
}
