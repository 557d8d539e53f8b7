//! `sheaf status` — report bundle freshness without building.

use sheaf_combine::{BundleStatus, StatusReport};

use crate::pipeline::{build_registry, load_or_report, runtime, to_pretty_json};
use crate::{GlobalArgs, ReportFormat, StatusArgs};

/// Runs the `sheaf status` command.
pub fn run(args: &StatusArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let Some(project) = load_or_report(global, args.format) else {
        return Ok(1);
    };

    let pipeline = project.pipeline();
    let registry = build_registry(&pipeline, &args.request);
    let reports = pipeline.status(&registry, &runtime(&args.request));

    match args.format {
        ReportFormat::Text => {
            if reports.is_empty() && !global.quiet {
                eprintln!("   No bundles would be combined");
            }
            for report in &reports {
                println!("{}", format_status(report));
            }
        }
        ReportFormat::Json => println!("{}", to_pretty_json(&reports)),
    }

    Ok(0)
}

fn format_status(report: &StatusReport) -> String {
    let state = match &report.status {
        BundleStatus::Fresh => "fresh".to_string(),
        BundleStatus::Stale(reason) => format!("stale ({reason})"),
        BundleStatus::Skipped(reason) => format!("skipped ({reason})"),
    };
    format!("{:<10} {}", state, report.output_path)
}
