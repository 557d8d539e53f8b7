//! Shared helpers for CLI commands.
//!
//! Project root resolution, configuration loading, requirement parsing and
//! diagnostic output used by both `combine` and `status`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sheaf_combine::{
    CombinePipeline, RequirementRegistry, SiteResolver, StaticRuntime, StyleParams,
};
use sheaf_config::{SheafConfig, CONFIG_FILE};
use sheaf_diagnostics::{
    Category, Diagnostic, DiagnosticCode, DiagnosticRenderer, TerminalRenderer,
};

use crate::{GlobalArgs, ReportFormat, RequestArgs};

/// The configuration could not be loaded.
pub const CONFIG_LOAD_FAILURE: DiagnosticCode = DiagnosticCode::new(Category::Error, 1);

/// A located and loaded site project.
#[derive(Debug)]
pub struct Project {
    /// Directory holding the configuration file.
    pub dir: PathBuf,
    /// The loaded configuration.
    pub config: SheafConfig,
}

impl Project {
    /// Absolute site root: `site.root` resolved against the project directory.
    pub fn site_root(&self) -> PathBuf {
        self.dir.join(&self.config.site.root)
    }

    /// A pipeline serving this project's site from the local disk.
    pub fn pipeline(&self) -> CombinePipeline {
        let resolver = SiteResolver::new(self.site_root(), self.config.site.base_url.clone());
        CombinePipeline::from_config(&self.config, Arc::new(resolver))
    }
}

/// Walks up from `start` looking for the nearest directory containing `sheaf.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the configuration file path from global CLI args.
///
/// `--config` may name the file itself or the directory holding it; without
/// it the current directory and its parents are searched.
pub fn resolve_config_path(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match global.config {
        Some(ref config_path) => {
            let p = PathBuf::from(config_path);
            if p.is_dir() {
                Ok(p.join(CONFIG_FILE))
            } else {
                Ok(p)
            }
        }
        None => Ok(find_project_root(&std::env::current_dir()?)?.join(CONFIG_FILE)),
    }
}

/// Locates and loads the project.
pub fn load_project(global: &GlobalArgs) -> Result<Project, Box<dyn std::error::Error>> {
    let path = resolve_config_path(global)?;
    let config = sheaf_config::load_config_file(&path)
        .map_err(|e| format!("{}: {e}", path.display()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    tracing::debug!(config = %path.display(), bundles = config.bundles.len(), "loaded configuration");
    Ok(Project { dir, config })
}

/// Loads the project, or reports why it could not be loaded.
///
/// Returns `None` after printing an `E001` diagnostic.
pub fn load_or_report(global: &GlobalArgs, format: ReportFormat) -> Option<Project> {
    match load_project(global) {
        Ok(project) => Some(project),
        Err(e) => {
            let diag = Diagnostic::error(CONFIG_LOAD_FAILURE, e.to_string())
                .with_help(format!("create a {CONFIG_FILE} or pass --config"));
            match format {
                ReportFormat::Text => render_diagnostics(&[diag], global),
                ReportFormat::Json => {
                    let doc = serde_json::json!({ "diagnostics": [diag] });
                    println!("{}", to_pretty_json(&doc));
                }
            }
            None
        }
    }
}

/// Splits a `PATH[:MEDIA]` style argument.
///
/// The text after the last `:` is taken as the media type unless it contains
/// a `/`, so `https://cdn/x.css` stays a plain path.
pub fn parse_style_arg(arg: &str) -> (String, StyleParams) {
    let mut params = StyleParams::new();
    if let Some((path, media)) = arg.rsplit_once(':') {
        if !path.is_empty() && !media.is_empty() && !media.contains('/') {
            params.insert("media".to_string(), media.to_string());
            return (path.to_string(), params);
        }
    }
    (arg.to_string(), params)
}

/// Registers the requested scripts and styles, in argument order.
pub fn build_registry(pipeline: &CombinePipeline, request: &RequestArgs) -> RequirementRegistry {
    let fingerprinter = pipeline.fingerprinter();
    let mut registry = RequirementRegistry::new();
    for script in &request.scripts {
        registry.register_script(script.as_str(), &fingerprinter);
    }
    for style in &request.styles {
        let (path, params) = parse_style_arg(style);
        registry.register_style(path, params, &fingerprinter);
    }
    registry
}

/// Mode flags for the request.
pub fn runtime(request: &RequestArgs) -> StaticRuntime {
    StaticRuntime {
        dev_mode: request.dev,
        test_run: false,
        force_combine: request.force,
    }
}

/// Prints diagnostics to stderr.
pub fn render_diagnostics(diagnostics: &[Diagnostic], global: &GlobalArgs) {
    let renderer = TerminalRenderer::new(global.color);
    for diag in diagnostics {
        if global.quiet && !diag.severity.is_error() {
            continue;
        }
        eprint!("{}", renderer.render(diag));
    }
}

/// Pretty JSON, falling back to an empty object.
pub fn to_pretty_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
