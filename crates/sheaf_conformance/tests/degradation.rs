//! Failure handling: every problem degrades to serving files individually
//! and leaves a diagnostic behind.

use std::sync::Arc;

use sheaf_combine::{codes, BuildOutcome, FailReason, FallbackReason};
use sheaf_conformance::{
    make_config, register, run_pass, AlwaysFails, DeniedFs, ShortWriteFs, Site, TrimMinifier,
};
use sheaf_diagnostics::Severity;

#[test]
fn source_claimed_twice_raises_one_conflict() {
    let site = Site::new(&[("a.js", "a"), ("b.js", "b")]);
    let config = make_config(&[("bundle1.js", &["a.js"]), ("bundle2.js", &["a.js", "b.js"])], &[]);
    let pipeline = site.pipeline(&config);

    let pass = run_pass(&pipeline, register(&pipeline, &["a.js", "b.js"], &[]));
    let conflicts = pass.with_code(codes::CONFIGURATION_CONFLICT);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].severity, Severity::Warning);
    assert_eq!(conflicts[0].subject.as_deref(), Some("a.js"));
    assert!(conflicts[0].message.contains("bundle1.js"));
    assert!(conflicts[0].message.contains("bundle2.js"));

    assert_eq!(pass.scripts(), vec!["_combined/bundle2.js"]);
    assert!(pass.run.report("bundle1.js").is_none());
}

#[test]
fn conflict_does_not_stop_other_bundles() {
    let site = Site::new(&[("a.js", "a"), ("x.js", "x")]);
    let config = make_config(
        &[("one.js", &["a.js"]), ("two.js", &["a.js"]), ("other.js", &["x.js"])],
        &[],
    );
    let pipeline = site.pipeline(&config);

    let pass = run_pass(&pipeline, register(&pipeline, &["a.js", "x.js"], &[]));
    assert_eq!(pass.scripts(), vec!["_combined/two.js", "_combined/other.js"]);
    assert_eq!(pass.run.rebuilt_count(), 2);
}

#[test]
fn failing_minifier_produces_raw_concatenation() {
    let site = Site::new(&[("a.js", "var a = 1;\n"), ("b.js", "var b = 2;")]);
    let config = make_config(&[("all.js", &["a.js", "b.js"])], &[]);
    let pipeline = site.pipeline(&config).with_minifier(Arc::new(AlwaysFails));

    let pass = run_pass(&pipeline, register(&pipeline, &["a.js", "b.js"], &[]));
    assert_eq!(
        pass.run.report("all.js").unwrap().outcome,
        BuildOutcome::RebuiltWithFallback(FallbackReason::Unminified(vec![
            "a.js".to_string(),
            "b.js".to_string()
        ]))
    );
    assert_eq!(
        site.read("_combined/all.js"),
        "/****** FILE: a.js *****/\nvar a = 1;\n\n/****** FILE: b.js *****/\nvar b = 2;\n"
    );
    assert_eq!(pass.with_code(codes::MINIFY_FAILURE).len(), 2);
    assert_eq!(pass.scripts(), vec!["_combined/all.js"]);
}

#[test]
fn working_minifier_is_applied_per_source() {
    let site = Site::new(&[("a.js", "  var a = 1;\n\n"), ("b.js", "\tvar b = 2;  ")]);
    let config = make_config(&[("all.js", &["a.js", "b.js"])], &[]);
    let minifier = Arc::new(TrimMinifier::default());
    let pipeline = site.pipeline(&config).with_minifier(minifier.clone());

    let pass = run_pass(&pipeline, register(&pipeline, &["a.js", "b.js"], &[]));
    assert_eq!(pass.run.report("all.js").unwrap().outcome, BuildOutcome::Rebuilt);
    assert_eq!(minifier.calls(), 2);
    assert_eq!(
        site.read("_combined/all.js"),
        "/****** FILE: a.js *****/\nvar a = 1;\n/****** FILE: b.js *****/\nvar b = 2;\n"
    );
    assert_eq!(pass.warning_count, 0);
}

#[cfg(unix)]
#[test]
fn readonly_output_directory_keeps_sources_individual() {
    use sheaf_conformance::ReadOnlyDir;

    let site = Site::new(&[("a.js", "a"), ("b.js", "b"), ("x.js", "x")]);
    let config = make_config(&[("all.js", &["a.js", "b.js"])], &[]);
    let pipeline = site.pipeline(&config);
    let guard = ReadOnlyDir::new(site.path("_combined"));

    let pass = run_pass(&pipeline, register(&pipeline, &["a.js", "x.js", "b.js"], &[]));
    if !guard.is_enforced() {
        // Running privileged: the directory is writable after all.
        assert_eq!(pass.run.report("all.js").unwrap().outcome, BuildOutcome::Rebuilt);
        return;
    }
    assert_eq!(
        pass.run.report("all.js").unwrap().outcome,
        BuildOutcome::Failed(FailReason::Unwritable)
    );
    assert_eq!(pass.scripts(), vec!["a.js", "x.js", "b.js"]);
    assert_eq!(pass.with_code(codes::UNWRITABLE).len(), 1);
    assert!(!site.exists("_combined/all.js"));
}

#[test]
fn denied_output_directory_is_unwritable() {
    let site = Site::new(&[("a.js", "a"), ("b.js", "b"), ("x.js", "x")]);
    let config = make_config(&[("all.js", &["a.js", "b.js"])], &[]);
    let denied = DeniedFs::new([site.path("_combined")]);
    let pipeline = site.pipeline(&config).with_file_system(Arc::new(denied));

    let pass = run_pass(&pipeline, register(&pipeline, &["a.js", "x.js", "b.js"], &[]));
    assert_eq!(
        pass.run.report("all.js").unwrap().outcome,
        BuildOutcome::Failed(FailReason::Unwritable)
    );
    assert_eq!(pass.scripts(), vec!["a.js", "x.js", "b.js"]);
    assert_eq!(pass.with_code(codes::UNWRITABLE).len(), 1);
    assert!(pass.with_code(codes::SHORT_WRITE).is_empty());
    assert!(!site.exists("_combined/all.js"));
}

#[test]
fn unwritable_bundle_does_not_affect_others() {
    let site = Site::new(&[("a.js", "a"), ("x.css", "x{}"), ("_combined/all.js", "old")]);
    let config = make_config(&[("all.js", &["a.js"]), ("all.css", &["x.css"])], &[]);
    let denied = DeniedFs::new([site.path("_combined/all.js")]);
    let pipeline = site.pipeline(&config).with_file_system(Arc::new(denied));

    let pass = run_pass(&pipeline, register(&pipeline, &["a.js"], &[("x.css", "")]));
    assert_eq!(
        pass.run.report("all.js").unwrap().outcome,
        BuildOutcome::Failed(FailReason::Unwritable)
    );
    assert_eq!(pass.run.report("all.css").unwrap().outcome, BuildOutcome::Rebuilt);
    assert_eq!(pass.scripts(), vec!["a.js"]);
    assert_eq!(pass.styles(), vec!["_combined/all.css"]);
    assert_eq!(site.read("_combined/all.js"), "old");
}

#[test]
fn short_write_keeps_sources_individual() {
    let site = Site::new(&[("a.js", "a"), ("b.js", "b")]);
    let config = make_config(&[("all.js", &["a.js", "b.js"])], &[]);
    let pipeline = site.pipeline(&config).with_file_system(Arc::new(ShortWriteFs));

    let pass = run_pass(&pipeline, register(&pipeline, &["a.js", "b.js"], &[]));
    assert_eq!(
        pass.run.report("all.js").unwrap().outcome,
        BuildOutcome::Failed(FailReason::ShortWrite)
    );
    assert_eq!(pass.scripts(), vec!["a.js", "b.js"]);
    assert_eq!(pass.with_code(codes::SHORT_WRITE).len(), 1);
    assert!(!site.exists("_combined/all.js"));
}

#[test]
fn missing_source_fails_only_its_bundle() {
    let site = Site::new(&[("a.js", "a"), ("x.js", "x")]);
    let config = make_config(&[("broken.js", &["a.js", "gone.js"]), ("ok.js", &["x.js"])], &[]);
    let pipeline = site.pipeline(&config);

    let pass = run_pass(&pipeline, register(&pipeline, &["a.js", "x.js"], &[]));
    assert_eq!(
        pass.run.report("broken.js").unwrap().outcome,
        BuildOutcome::Failed(FailReason::Unreadable)
    );
    assert_eq!(pass.run.report("ok.js").unwrap().outcome, BuildOutcome::Rebuilt);
    assert_eq!(pass.scripts(), vec!["a.js", "_combined/ok.js"]);
    let unreadable = pass.with_code(codes::UNREADABLE);
    assert_eq!(unreadable.len(), 1);
    assert_eq!(unreadable[0].subject.as_deref(), Some("gone.js"));
}

#[test]
fn no_failure_is_an_error() {
    let site = Site::new(&[("a.js", "a")]);
    let config = make_config(&[("one.js", &["a.js"]), ("two.js", &["a.js", "gone.js"])], &[]);
    let pipeline = site.pipeline(&config).with_minifier(Arc::new(AlwaysFails));

    let pass = run_pass(&pipeline, register(&pipeline, &["a.js"], &[]));
    assert!(pass.diagnostics.iter().all(|d| d.severity == Severity::Warning));
}
