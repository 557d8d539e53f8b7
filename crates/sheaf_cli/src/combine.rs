//! `sheaf combine` — one combine pass over the requested files.
//!
//! 1. Load the project configuration
//! 2. Register the requested scripts and styles
//! 3. Run the combine pipeline
//! 4. Print bundle outcomes, the rewritten requirement list and diagnostics

use serde::Serialize;
use sheaf_combine::{BundleReport, CombinePipeline, CombineRun, RequirementRegistry, StyleParams};
use sheaf_diagnostics::{Diagnostic, DiagnosticSink};

use crate::pipeline::{build_registry, load_or_report, render_diagnostics, runtime, to_pretty_json};
use crate::{CombineArgs, GlobalArgs, ReportFormat};

/// One output requirement and the URL it is served from.
#[derive(Debug, Serialize)]
struct OutputEntry {
    path: String,
    #[serde(skip_serializing_if = "StyleParams::is_empty")]
    params: StyleParams,
    url: Option<String>,
}

#[derive(Debug, Serialize)]
struct CombineDocument<'a> {
    combined: bool,
    bundles: &'a [BundleReport],
    scripts: Vec<OutputEntry>,
    styles: Vec<OutputEntry>,
    diagnostics: Vec<Diagnostic>,
}

/// Runs the `sheaf combine` command.
///
/// Returns exit code 1 when the configuration cannot be loaded and 0
/// otherwise; per-bundle problems are reported as warnings.
pub fn run(args: &CombineArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let Some(project) = load_or_report(global, args.format) else {
        return Ok(1);
    };

    let pipeline = project.pipeline();
    let registry = build_registry(&pipeline, &args.request);

    if !global.quiet && args.format == ReportFormat::Text {
        eprintln!(
            "   Combining {} script(s), {} style(s) in {}",
            registry.scripts().count(),
            registry.styles().count(),
            project.site_root().display()
        );
    }

    let sink = DiagnosticSink::new();
    let run = pipeline.process(registry, &runtime(&args.request), &sink);
    let diagnostics = sink.take_all();

    let scripts = script_entries(&pipeline, &run.registry);
    let styles = style_entries(&pipeline, &run.registry);

    match args.format {
        ReportFormat::Text => {
            render_diagnostics(&diagnostics, global);
            if !global.quiet {
                print_reports(&run);
            }
            for entry in scripts.iter().chain(&styles) {
                println!("{}", format_entry(entry));
            }
            if !global.quiet {
                eprintln!(
                    "   Result: {} bundle(s), {} rebuilt, {} warning(s)",
                    run.reports.len(),
                    run.rebuilt_count(),
                    diagnostics.len()
                );
            }
        }
        ReportFormat::Json => {
            let doc = CombineDocument {
                combined: run.combined,
                bundles: &run.reports,
                scripts,
                styles,
                diagnostics,
            };
            println!("{}", to_pretty_json(&doc));
        }
    }

    Ok(0)
}

fn print_reports(run: &CombineRun) {
    if !run.combined {
        eprintln!("   Combining disabled; files are served individually");
        return;
    }
    for report in &run.reports {
        match &report.stale {
            Some(reason) => eprintln!(
                "   {:>10} {} ({reason}): {}",
                "Bundle", report.output_path, report.outcome
            ),
            None => eprintln!("   {:>10} {}: {}", "Bundle", report.output_path, report.outcome),
        }
    }
}

fn script_entries(pipeline: &CombinePipeline, registry: &RequirementRegistry) -> Vec<OutputEntry> {
    registry
        .scripts()
        .map(|entry| OutputEntry {
            path: entry.path.clone(),
            params: StyleParams::new(),
            url: pipeline.url_for(&entry.path),
        })
        .collect()
}

fn style_entries(pipeline: &CombinePipeline, registry: &RequirementRegistry) -> Vec<OutputEntry> {
    registry
        .styles()
        .map(|entry| OutputEntry {
            path: entry.path.clone(),
            params: entry.params.clone(),
            url: pipeline.url_for(&entry.path),
        })
        .collect()
}

fn format_entry(entry: &OutputEntry) -> String {
    let mut line = entry.url.clone().unwrap_or_else(|| entry.path.clone());
    for (key, value) in &entry.params {
        line.push_str(&format!(" {key}={value}"));
    }
    line
}
