//! Conformance test helpers for the Sheaf combine pipeline.
//!
//! Provides a temporary site fixture, configuration builders and stub
//! collaborators (a failing minifier, filesystems that lose or refuse writes) so the
//! integration tests can drive whole combine passes and assert on bundles,
//! rewritten registries and diagnostics.

#![warn(missing_docs)]

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sheaf_combine::{
    CombinePipeline, CombineRun, FileSystem, LocalFileSystem, MinifyError, Minifier,
    RequirementRegistry, SiteResolver, StaticRuntime, StyleParams,
};
use sheaf_config::SheafConfig;
use sheaf_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink, Severity};

/// Result of one combine pass.
pub struct PassResult {
    /// The pipeline's output.
    pub run: CombineRun,
    /// All diagnostics emitted during the pass.
    pub diagnostics: Vec<Diagnostic>,
    /// Number of warning-severity diagnostics.
    pub warning_count: usize,
}

impl PassResult {
    /// Diagnostics carrying `code`.
    pub fn with_code(&self, code: DiagnosticCode) -> Vec<&Diagnostic> {
        self.diagnostics.iter().filter(|d| d.code == code).collect()
    }

    /// Rewritten script paths.
    pub fn scripts(&self) -> Vec<&str> {
        self.run.registry.script_paths()
    }

    /// Rewritten style paths.
    pub fn styles(&self) -> Vec<&str> {
        self.run.registry.style_paths()
    }
}

/// Builds a `SheafConfig` from bundle definitions and a block list.
pub fn make_config(bundles: &[(&str, &[&str])], blocked: &[&str]) -> SheafConfig {
    let mut toml_str = format!("[combine]\nblocked = [{}]\n", quoted(blocked));
    for (name, sources) in bundles {
        toml_str.push_str(&format!(
            "\n[[bundles]]\nname = \"{name}\"\nsources = [{}]\n",
            quoted(sources)
        ));
    }
    sheaf_config::load_config_from_str(&toml_str).unwrap()
}

fn quoted(items: &[&str]) -> String {
    items
        .iter()
        .map(|s| format!("\"{s}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A site directory in a temporary location.
pub struct Site {
    dir: tempfile::TempDir,
}

impl Site {
    /// Creates a site containing `files` (site-relative path, content).
    pub fn new(files: &[(&str, &str)]) -> Self {
        let site = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        for (path, content) in files {
            site.write(path, content);
        }
        site
    }

    /// Site root directory.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a site-relative file.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Writes (or overwrites) a site file, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) {
        let full = self.path(relative);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
    }

    /// Reads a site file as text.
    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path(relative)).unwrap()
    }

    /// Whether a site file exists.
    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }

    /// A pipeline for this site with the default collaborators.
    pub fn pipeline(&self, config: &SheafConfig) -> CombinePipeline {
        CombinePipeline::from_config(config, Arc::new(SiteResolver::new(self.root(), "/")))
    }
}

/// Registers scripts and `(path, media)` styles in order.
///
/// An empty media string registers the style without params.
pub fn register(pipeline: &CombinePipeline, scripts: &[&str], styles: &[(&str, &str)]) -> RequirementRegistry {
    let fingerprinter = pipeline.fingerprinter();
    let mut registry = RequirementRegistry::new();
    for script in scripts {
        registry.register_script(*script, &fingerprinter);
    }
    for (style, media) in styles {
        let mut params = StyleParams::new();
        if !media.is_empty() {
            params.insert("media".to_string(), media.to_string());
        }
        registry.register_style(*style, params, &fingerprinter);
    }
    registry
}

/// Runs one live-mode pass.
pub fn run_pass(pipeline: &CombinePipeline, registry: RequirementRegistry) -> PassResult {
    run_pass_with(pipeline, registry, StaticRuntime::live())
}

/// Runs one pass under the given mode flags.
pub fn run_pass_with(pipeline: &CombinePipeline, registry: RequirementRegistry, runtime: StaticRuntime) -> PassResult {
    let sink = DiagnosticSink::new();
    let run = pipeline.process(registry, &runtime, &sink);
    let diagnostics = sink.take_all();
    let warning_count = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .count();
    PassResult {
        run,
        diagnostics,
        warning_count,
    }
}

/// A minifier that rejects every input.
pub struct AlwaysFails;

impl Minifier for AlwaysFails {
    fn minify(&self, _path: &str, _content: &str) -> Result<String, MinifyError> {
        Err(MinifyError::new("unsupported syntax"))
    }
}

/// A minifier that trims whitespace from each line and counts its calls.
#[derive(Default)]
pub struct TrimMinifier {
    calls: AtomicUsize,
}

impl TrimMinifier {
    /// Number of files minified so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Minifier for TrimMinifier {
    fn minify(&self, _path: &str, content: &str) -> Result<String, MinifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

/// A filesystem whose writes report one byte fewer than requested and
/// never replace the target.
pub struct ShortWriteFs;

impl FileSystem for ShortWriteFs {
    fn exists(&self, path: &Path) -> bool {
        LocalFileSystem.exists(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        LocalFileSystem.read(path)
    }

    fn is_writable(&self, path: &Path) -> bool {
        LocalFileSystem.is_writable(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        LocalFileSystem.create_dir_all(path)
    }

    fn write_atomic(&self, _path: &Path, data: &[u8]) -> io::Result<u64> {
        Ok((data.len() as u64).saturating_sub(1))
    }
}

/// A filesystem whose writability checks pass but which refuses to write
/// at or under the given paths, like a directory owned by another user.
pub struct DeniedFs {
    denied: Vec<PathBuf>,
}

impl DeniedFs {
    /// Refuses writes at or under each of `denied`.
    pub fn new(denied: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            denied: denied.into_iter().collect(),
        }
    }

    fn is_denied(&self, path: &Path) -> bool {
        self.denied.iter().any(|d| path.starts_with(d))
    }
}

impl FileSystem for DeniedFs {
    fn exists(&self, path: &Path) -> bool {
        LocalFileSystem.exists(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        LocalFileSystem.read(path)
    }

    fn is_writable(&self, path: &Path) -> bool {
        LocalFileSystem.is_writable(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        LocalFileSystem.create_dir_all(path)
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> io::Result<u64> {
        if self.is_denied(path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"));
        }
        LocalFileSystem.write_atomic(path, data)
    }
}

/// Makes a directory read-only (`0o555`) and restores `0o755` on drop.
#[cfg(unix)]
pub struct ReadOnlyDir {
    path: PathBuf,
}

#[cfg(unix)]
impl ReadOnlyDir {
    /// Creates `path` if needed and removes its write bits.
    pub fn new(path: PathBuf) -> Self {
        use std::os::unix::fs::PermissionsExt;
        std::fs::create_dir_all(&path).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o555)).unwrap();
        Self { path }
    }

    /// Whether the OS actually refuses new files here; privileged users
    /// bypass the mode bits.
    pub fn is_enforced(&self) -> bool {
        tempfile::tempfile_in(&self.path).is_err()
    }
}

#[cfg(unix)]
impl Drop for ReadOnlyDir {
    fn drop(&mut self) {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o755));
    }
}
