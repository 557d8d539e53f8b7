//! Read → minify → concatenate → write for one stale bundle.

use std::io;
use std::path::Path;

use sheaf_common::Fingerprint;
use sheaf_diagnostics::{Diagnostic, DiagnosticSink};

use crate::codes;
use crate::error::{CombineError, MinifyError};
use crate::fs::FileSystem;
use crate::manifest::BundleManifest;
use crate::minifier::Minifier;
use crate::outcome::{BuildOutcome, FailReason, FallbackReason};
use crate::plan::{BundlePlan, BundleTarget};
use crate::resolver::PathResolver;

/// Rebuilds bundle artifacts.
///
/// Each source is minified on its own; a source that fails to minify goes
/// into the bundle raw while the others stay minified. Every file is
/// followed by a newline so the last statement of one file can never run
/// into the first statement of the next.
pub struct BundleBuilder<'a> {
    resolver: &'a dyn PathResolver,
    fs: &'a dyn FileSystem,
    minifier: &'a dyn Minifier,
    write_header_comment: bool,
}

/// The result of [`BundleBuilder::rebuild`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rebuild {
    /// What happened.
    pub outcome: BuildOutcome,
    /// Fingerprint of the published artifact, when one was written.
    pub artifact: Option<Fingerprint>,
}

impl Rebuild {
    fn failed(outcome: BuildOutcome) -> Self {
        Self {
            outcome,
            artifact: None,
        }
    }
}

/// The concatenated bundle, the fingerprint of each source as read, and
/// the sources that went in unminified.
struct Assembled {
    buffer: Vec<u8>,
    sources: Vec<(String, Fingerprint)>,
    unminified: Vec<(String, MinifyError)>,
}

impl<'a> BundleBuilder<'a> {
    /// Creates a builder.
    pub fn new(
        resolver: &'a dyn PathResolver,
        fs: &'a dyn FileSystem,
        minifier: &'a dyn Minifier,
        write_header_comment: bool,
    ) -> Self {
        Self {
            resolver,
            fs,
            minifier,
            write_header_comment,
        }
    }

    /// Rebuilds `target` into `artifact` and returns only the outcome.
    pub fn build(
        &self,
        plan: &BundlePlan,
        target: &BundleTarget,
        artifact: &Path,
        sink: &DiagnosticSink,
    ) -> BuildOutcome {
        self.rebuild(plan, target, artifact, sink).outcome
    }

    /// Rebuilds `target` into `artifact`.
    ///
    /// Never fails outright: problems are reported to `sink` and turned into
    /// a [`BuildOutcome::Failed`] so the caller can serve the sources
    /// individually. Minification warnings are emitted only once the bundle
    /// has been assembled and written.
    pub fn rebuild(
        &self,
        plan: &BundlePlan,
        target: &BundleTarget,
        artifact: &Path,
        sink: &DiagnosticSink,
    ) -> Rebuild {
        if let Err(err) = self.prepare(artifact) {
            return Rebuild::failed(self.fail(target, err, sink));
        }

        let assembled = match self.assemble(plan, target) {
            Ok(assembled) => assembled,
            Err(err) => return Rebuild::failed(self.fail(target, err, sink)),
        };

        let written = self.publish(artifact, &assembled.buffer);

        for (source, err) in &assembled.unminified {
            tracing::warn!(bundle = %target.name, source = %source, error = %err, "minification failed");
            sink.emit(
                Diagnostic::warning(codes::MINIFY_FAILURE, format!("failed to minify '{source}': {err}"))
                    .with_subject(source.clone())
                    .with_note(format!("unminified content was used in '{}'", target.name)),
            );
        }

        if let Err(err) = written {
            return Rebuild::failed(self.fail(target, err, sink));
        }

        let fingerprint = Fingerprint::from_bytes(&assembled.buffer);
        let mut manifest = BundleManifest::new(&target.name, fingerprint);
        for (source, fingerprint) in &assembled.sources {
            manifest.record(source.as_str(), *fingerprint);
        }
        if let Err(err) = manifest.save(self.fs, artifact) {
            // The artifact is valid; the next pass sees it as untracked and rebuilds.
            tracing::warn!(bundle = %target.name, error = %err, "cannot record bundle manifest");
        }

        tracing::info!(
            bundle = %target.name,
            bytes = assembled.buffer.len(),
            unminified = assembled.unminified.len(),
            "rebuilt bundle"
        );

        let outcome = if assembled.unminified.is_empty() {
            BuildOutcome::Rebuilt
        } else {
            BuildOutcome::RebuiltWithFallback(FallbackReason::Unminified(
                assembled.unminified.into_iter().map(|(source, _)| source).collect(),
            ))
        };
        Rebuild {
            outcome,
            artifact: Some(fingerprint),
        }
    }

    /// Ensures the output directory exists and the artifact can be written.
    fn prepare(&self, artifact: &Path) -> Result<(), CombineError> {
        let unwritable = || CombineError::Unwritable {
            path: artifact.to_path_buf(),
        };
        let dir = artifact.parent().ok_or_else(unwritable)?;

        if !self.fs.exists(dir) {
            self.fs.create_dir_all(dir).map_err(|e| {
                tracing::debug!(dir = %dir.display(), error = %e, "cannot create output directory");
                unwritable()
            })?;
        }

        let writable = if self.fs.exists(artifact) {
            self.fs.is_writable(artifact)
        } else {
            self.fs.is_writable(dir)
        };
        if writable {
            Ok(())
        } else {
            Err(unwritable())
        }
    }

    /// Reads, minifies and concatenates the unblocked sources in order.
    fn assemble(&self, plan: &BundlePlan, target: &BundleTarget) -> Result<Assembled, CombineError> {
        let mut buffer = Vec::new();
        let mut sources = Vec::new();
        let mut unminified = Vec::new();

        for source in plan.unblocked_sources(target) {
            let raw = self.read_source(source)?;
            sources.push((source.to_string(), Fingerprint::from_bytes(&raw)));

            let content = match String::from_utf8(raw) {
                Ok(text) => match self.minifier.minify(source, &text) {
                    Ok(minified) => minified.into_bytes(),
                    Err(err) => {
                        unminified.push((source.to_string(), err));
                        text.into_bytes()
                    }
                },
                Err(not_utf8) => {
                    unminified.push((source.to_string(), MinifyError::new("source is not valid UTF-8")));
                    not_utf8.into_bytes()
                }
            };

            if self.write_header_comment {
                buffer.extend_from_slice(format!("/****** FILE: {source} *****/\n").as_bytes());
            }
            buffer.extend_from_slice(&content);
            buffer.push(b'\n');
        }

        Ok(Assembled {
            buffer,
            sources,
            unminified,
        })
    }

    fn read_source(&self, source: &str) -> Result<Vec<u8>, CombineError> {
        let path = self
            .resolver
            .resolve_absolute(source)
            .ok_or_else(|| CombineError::Unreadable {
                source_path: source.to_string(),
                source: None,
            })?;
        self.fs.read(&path).map_err(|e| CombineError::Unreadable {
            source_path: source.to_string(),
            source: Some(e),
        })
    }

    /// Writes the buffer and checks that all of it was persisted.
    ///
    /// A denied write is reported as unwritable, the same as a failed
    /// writability check.
    fn publish(&self, artifact: &Path, buffer: &[u8]) -> Result<(), CombineError> {
        let expected = buffer.len() as u64;
        let written = self.fs.write_atomic(artifact, buffer).map_err(|e| {
            if e.kind() == io::ErrorKind::PermissionDenied {
                tracing::debug!(artifact = %artifact.display(), error = %e, "write denied");
                CombineError::Unwritable {
                    path: artifact.to_path_buf(),
                }
            } else {
                CombineError::Io {
                    path: artifact.to_path_buf(),
                    source: e,
                }
            }
        })?;
        if written != expected {
            return Err(CombineError::ShortWrite {
                path: artifact.to_path_buf(),
                expected,
                written,
            });
        }
        Ok(())
    }

    fn fail(&self, target: &BundleTarget, err: CombineError, sink: &DiagnosticSink) -> BuildOutcome {
        let (code, reason, subject) = match &err {
            CombineError::Unwritable { path } => {
                (codes::UNWRITABLE, FailReason::Unwritable, path.display().to_string())
            }
            CombineError::Unreadable { source_path, .. } => {
                (codes::UNREADABLE, FailReason::Unreadable, source_path.clone())
            }
            CombineError::ShortWrite { path, .. } | CombineError::Io { path, .. } => {
                (codes::SHORT_WRITE, FailReason::ShortWrite, path.display().to_string())
            }
        };

        tracing::warn!(bundle = %target.name, error = %err, "bundle not rebuilt");

        let mut diag = Diagnostic::warning(code, format!("couldn't create '{}': {err}", target.name))
            .with_subject(subject)
            .with_note("its sources will be included individually");
        if let CombineError::Unreadable { source: Some(io), .. } = &err {
            diag = diag.with_note(io.to_string());
        }
        if reason == FailReason::Unwritable {
            diag = diag.with_help("make the combined-output directory writable");
        }
        sink.emit(diag);

        BuildOutcome::Failed(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFileSystem;
    use crate::minifier::IdentityMinifier;
    use crate::resolver::SiteResolver;

    fn site(files: &[(&str, &str)]) -> (tempfile::TempDir, SiteResolver) {
        let dir = tempfile::tempdir().unwrap();
        for (path, content) in files {
            let full = dir.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, content).unwrap();
        }
        let resolver = SiteResolver::new(dir.path(), "/");
        (dir, resolver)
    }

    fn plan(sources: &[&str], blocked: &[&str]) -> BundlePlan {
        BundlePlan::new(
            vec![BundleTarget {
                name: "all.js".to_string(),
                source_paths: sources.iter().map(|s| s.to_string()).collect(),
            }],
            blocked.iter().copied(),
        )
    }

    #[test]
    fn concatenates_with_headers_and_newlines() {
        let (dir, resolver) = site(&[("js/a.js", "a();"), ("js/b.js", "b();")]);
        let plan = plan(&["js/a.js", "js/b.js"], &[]);
        let artifact = dir.path().join("_combined/all.js");
        let sink = DiagnosticSink::new();

        let builder = BundleBuilder::new(&resolver, &LocalFileSystem, &IdentityMinifier, true);
        let outcome = builder.build(&plan, &plan.targets()[0], &artifact, &sink);

        assert_eq!(outcome, BuildOutcome::Rebuilt);
        assert_eq!(
            std::fs::read_to_string(&artifact).unwrap(),
            "/****** FILE: js/a.js *****/\na();\n/****** FILE: js/b.js *****/\nb();\n"
        );
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn headers_are_optional_separators_are_not() {
        let (dir, resolver) = site(&[("a.js", "var a = 1"), ("b.js", "var b = 2")]);
        let plan = plan(&["a.js", "b.js"], &[]);
        let artifact = dir.path().join("all.js");
        let sink = DiagnosticSink::new();

        BundleBuilder::new(&resolver, &LocalFileSystem, &IdentityMinifier, false).build(
            &plan,
            &plan.targets()[0],
            &artifact,
            &sink,
        );
        assert_eq!(std::fs::read_to_string(&artifact).unwrap(), "var a = 1\nvar b = 2\n");
    }

    #[test]
    fn blocked_sources_are_left_out() {
        let (dir, resolver) = site(&[("a.js", "a"), ("legacy.js", "legacy"), ("b.js", "b")]);
        let plan = plan(&["a.js", "legacy.js", "b.js"], &["legacy.js"]);
        let artifact = dir.path().join("all.js");

        BundleBuilder::new(&resolver, &LocalFileSystem, &IdentityMinifier, false).build(
            &plan,
            &plan.targets()[0],
            &artifact,
            &DiagnosticSink::new(),
        );
        assert_eq!(std::fs::read_to_string(&artifact).unwrap(), "a\nb\n");
    }

    #[test]
    fn minify_failure_is_per_source() {
        let (dir, resolver) = site(&[("a.js", "a ( ) ;"), ("bad.js", "b ( ) ;")]);
        let plan = plan(&["a.js", "bad.js"], &[]);
        let artifact = dir.path().join("all.js");
        let sink = DiagnosticSink::new();

        let minifier = |path: &str, content: &str| -> Result<String, MinifyError> {
            if path == "bad.js" {
                Err(MinifyError::new("unexpected token"))
            } else {
                Ok(content.replace(' ', ""))
            }
        };
        let outcome = BundleBuilder::new(&resolver, &LocalFileSystem, &minifier, false).build(
            &plan,
            &plan.targets()[0],
            &artifact,
            &sink,
        );

        assert_eq!(
            outcome,
            BuildOutcome::RebuiltWithFallback(FallbackReason::Unminified(vec!["bad.js".to_string()]))
        );
        assert_eq!(std::fs::read_to_string(&artifact).unwrap(), "a();\nb ( ) ;\n");
        let warnings = sink.with_code(codes::MINIFY_FAILURE);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].subject.as_deref(), Some("bad.js"));
    }

    #[test]
    fn non_utf8_source_is_bundled_raw() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bin.js"), [0xff, 0xfe, b'x']).unwrap();
        let resolver = SiteResolver::new(dir.path(), "/");
        let plan = plan(&["bin.js"], &[]);
        let artifact = dir.path().join("all.js");
        let sink = DiagnosticSink::new();

        let outcome = BundleBuilder::new(&resolver, &LocalFileSystem, &IdentityMinifier, false).build(
            &plan,
            &plan.targets()[0],
            &artifact,
            &sink,
        );
        assert!(matches!(outcome, BuildOutcome::RebuiltWithFallback(_)));
        assert_eq!(std::fs::read(&artifact).unwrap(), vec![0xff, 0xfe, b'x', b'\n']);
    }

    #[test]
    fn unreadable_source_fails_bundle() {
        let (dir, resolver) = site(&[("a.js", "a")]);
        let plan = plan(&["a.js", "gone.js"], &[]);
        let artifact = dir.path().join("all.js");
        let sink = DiagnosticSink::new();

        let outcome = BundleBuilder::new(&resolver, &LocalFileSystem, &IdentityMinifier, false).build(
            &plan,
            &plan.targets()[0],
            &artifact,
            &sink,
        );
        assert_eq!(outcome, BuildOutcome::Failed(FailReason::Unreadable));
        assert!(!artifact.exists());
        assert_eq!(sink.with_code(codes::UNREADABLE).len(), 1);
    }

    #[test]
    fn creates_missing_output_directory() {
        let (dir, resolver) = site(&[("a.js", "a")]);
        let plan = plan(&["a.js"], &[]);
        let artifact = dir.path().join("deep/nested/out/all.js");

        let outcome = BundleBuilder::new(&resolver, &LocalFileSystem, &IdentityMinifier, false).build(
            &plan,
            &plan.targets()[0],
            &artifact,
            &DiagnosticSink::new(),
        );
        assert_eq!(outcome, BuildOutcome::Rebuilt);
        assert!(artifact.exists());
    }

    /// Local disk with a fixed writability answer and writes that are denied.
    struct LockedDisk {
        check_passes: bool,
    }

    impl FileSystem for LockedDisk {
        fn exists(&self, path: &Path) -> bool {
            LocalFileSystem.exists(path)
        }

        fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
            LocalFileSystem.read(path)
        }

        fn is_writable(&self, _path: &Path) -> bool {
            self.check_passes
        }

        fn create_dir_all(&self, path: &Path) -> io::Result<()> {
            LocalFileSystem.create_dir_all(path)
        }

        fn write_atomic(&self, _path: &Path, _data: &[u8]) -> io::Result<u64> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"))
        }
    }

    #[test]
    fn readonly_artifact_is_unwritable() {
        let (dir, resolver) = site(&[("a.js", "a"), ("all.js", "old")]);
        let artifact = dir.path().join("all.js");
        let plan = plan(&["a.js"], &[]);
        let sink = DiagnosticSink::new();

        let fs = LockedDisk { check_passes: false };
        let outcome = BundleBuilder::new(&resolver, &fs, &IdentityMinifier, false).build(
            &plan,
            &plan.targets()[0],
            &artifact,
            &sink,
        );
        assert_eq!(outcome, BuildOutcome::Failed(FailReason::Unwritable));
        assert_eq!(std::fs::read_to_string(&artifact).unwrap(), "old");
        assert_eq!(sink.with_code(codes::UNWRITABLE).len(), 1);
    }

    #[test]
    fn denied_write_is_unwritable_not_short() {
        let (dir, resolver) = site(&[("a.js", "a")]);
        let artifact = dir.path().join("_combined/all.js");
        let plan = plan(&["a.js"], &[]);
        let sink = DiagnosticSink::new();

        let fs = LockedDisk { check_passes: true };
        let rebuild = BundleBuilder::new(&resolver, &fs, &IdentityMinifier, false).rebuild(
            &plan,
            &plan.targets()[0],
            &artifact,
            &sink,
        );
        assert_eq!(rebuild.outcome, BuildOutcome::Failed(FailReason::Unwritable));
        assert_eq!(rebuild.artifact, None);
        assert_eq!(sink.with_code(codes::UNWRITABLE).len(), 1);
        assert!(sink.with_code(codes::SHORT_WRITE).is_empty());
        assert!(!artifact.exists());
    }

    #[test]
    fn rebuild_reports_published_fingerprint() {
        let (dir, resolver) = site(&[("a.js", "a"), ("b.js", "b")]);
        let plan = plan(&["a.js", "b.js"], &[]);
        let artifact = dir.path().join("all.js");

        let rebuild = BundleBuilder::new(&resolver, &LocalFileSystem, &IdentityMinifier, false).rebuild(
            &plan,
            &plan.targets()[0],
            &artifact,
            &DiagnosticSink::new(),
        );
        assert_eq!(rebuild.outcome, BuildOutcome::Rebuilt);
        let bytes = std::fs::read(&artifact).unwrap();
        assert_eq!(rebuild.artifact, Some(Fingerprint::from_bytes(&bytes)));
    }

    #[test]
    fn records_manifest_after_publish() {
        let (dir, resolver) = site(&[("a.js", "a"), ("b.js", "b")]);
        let plan = plan(&["a.js", "b.js"], &[]);
        let artifact = dir.path().join("all.js");

        BundleBuilder::new(&resolver, &LocalFileSystem, &IdentityMinifier, false).build(
            &plan,
            &plan.targets()[0],
            &artifact,
            &DiagnosticSink::new(),
        );

        let manifest = BundleManifest::load(&LocalFileSystem, &artifact).unwrap();
        assert_eq!(manifest.bundle, "all.js");
        assert_eq!(manifest.artifact, Fingerprint::from_bytes(b"a\nb\n"));
        assert_eq!(manifest.source("a.js"), Some(Fingerprint::from_bytes(b"a")));
        assert_eq!(manifest.source("b.js"), Some(Fingerprint::from_bytes(b"b")));
    }
}
