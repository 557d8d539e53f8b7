//! Cache-busting URLs for requirement paths.

use crate::fingerprint::ContentFingerprinter;

/// Query key carrying the content fingerprint.
const FINGERPRINT_QUERY_KEY: &str = "m";

/// Returns the URL a requirement should be served from.
///
/// - Protocol-relative and `http(s)` URLs are returned unchanged.
/// - Paths backed by a file become `base_url + path`, followed by
///   `?m=<fingerprint>` when `suffix` is set, followed by the path's own
///   query string.
/// - Anything else yields `None`.
pub fn asset_url(path: &str, fingerprinter: &ContentFingerprinter<'_>, suffix: bool) -> Option<String> {
    if path.starts_with("//") || path.starts_with("http://") || path.starts_with("https://") {
        return Some(path.to_string());
    }

    let (file, query) = match path.split_once('?') {
        Some((file, query)) => (file, Some(query)),
        None => (path, None),
    };

    let resolver = fingerprinter.resolver();
    let absolute = resolver.resolve_absolute(file)?;

    let mut url = join_url(resolver.base_url(), file);
    let mut separator = '?';
    if suffix {
        let fingerprint = fingerprinter.fingerprint_file(&absolute)?;
        url.push_str(&format!("?{FINGERPRINT_QUERY_KEY}={fingerprint}"));
        separator = '&';
    }
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push(separator);
        url.push_str(query);
    }
    Some(url)
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
