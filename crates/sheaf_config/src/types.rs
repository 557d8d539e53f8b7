//! Configuration types deserialized from `sheaf.toml`.

use serde::Deserialize;

/// The top-level configuration parsed from `sheaf.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SheafConfig {
    /// Where the site's files live and how they are addressed.
    #[serde(default)]
    pub site: SiteConfig,
    /// Combine switches and output location.
    #[serde(default)]
    pub combine: CombineConfig,
    /// Bundle definitions, in declaration order.
    ///
    /// Order matters: when a source is claimed by two bundles, the later
    /// declaration wins the mapping.
    #[serde(default)]
    pub bundles: Vec<BundleDef>,
}

/// Site layout used to resolve requirement paths.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Site root directory, relative to the configuration file.
    #[serde(default = "default_root")]
    pub root: String,
    /// URL prefix under which the site root is served.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            base_url: default_base_url(),
        }
    }
}

/// Settings controlling whether and how bundles are combined.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CombineConfig {
    /// Global switch; when false every requirement is served individually.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Directory, relative to the site root, that receives combined files.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Prefix each source inside a bundle with a `/****** FILE: ... *****/` comment.
    #[serde(default = "default_true")]
    pub write_header_comment: bool,
    /// Append a `?m=<fingerprint>` cache-busting suffix to asset URLs.
    #[serde(default = "default_true")]
    pub suffix_requirements: bool,
    /// Source paths (or bundle names) never combined.
    #[serde(default)]
    pub blocked: Vec<String>,
}

impl Default for CombineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_dir: default_output_dir(),
            write_header_comment: true,
            suffix_requirements: true,
            blocked: Vec::new(),
        }
    }
}

/// A named combined output file and its ordered sources.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleDef {
    /// Output file name inside the combined-output directory (e.g. `all.js`).
    pub name: String,
    /// Site-relative source paths, concatenated in this order.
    #[serde(default)]
    pub sources: Vec<String>,
}

impl BundleDef {
    /// Creates a bundle definition from a name and its ordered sources.
    pub fn new<I, S>(name: impl Into<String>, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }
}

fn default_root() -> String {
    ".".to_string()
}

fn default_base_url() -> String {
    "/".to_string()
}

fn default_output_dir() -> String {
    "_combined".to_string()
}

fn default_true() -> bool {
    true
}
