//! Filename and URL helpers for report and snapshot naming.
//!
//! Two naming schemes coexist: report files use the sanitized slug
//! from `sanitize_for_filename`, visual baselines use the raw stem from
//! `derive_file_stem`. Existing baselines are keyed by the latter, so the two
//! must not be unified.

use crate::error::{QaError, Result};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Name used for the site root in both naming schemes.
pub const STARTPAGE: &str = "startpage";

fn separator_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // ASCII word class; whitespace and dashes are covered by the negation.
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_]+").expect("static regex"))
}

/// Turn a URL path into a lowercase, filesystem-safe slug.
///
/// `/Team/Mitglied A!` becomes `team-mitglied-a`; the root and the empty
/// string map to `startpage`.
pub fn sanitize_for_filename(input: &str) -> String {
    let s = input.strip_prefix('/').unwrap_or(input).replace('/', "-");
    let s = separator_runs().replace_all(&s, "-").to_lowercase();
    let s = s.trim_matches('-');
    if s.is_empty() {
        STARTPAGE.to_string()
    } else {
        s.to_string()
    }
}

/// Snapshot stem for a page path: `/` is `startpage`, otherwise the first
/// slash is dropped and nothing else changes (`/a/b` stays `a/b`).
pub fn derive_file_stem(path: &str) -> String {
    if path == "/" {
        return STARTPAGE.to_string();
    }
    path.replacen('/', "", 1)
}

/// Pathname component of an absolute URL.
pub fn path_from_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|source| QaError::Url {
        url: url.to_string(),
        source,
    })?;
    Ok(parsed.path().to_string())
}

/// Prefix a site-relative path with `base`; absolute URLs pass through.
pub fn resolve_url(base: &str, url: &str) -> String {
    if Url::parse(url).is_ok() {
        return url.to_string();
    }
    let base = base.trim_end_matches('/');
    if url.starts_with('/') {
        format!("{}{}", base, url)
    } else {
        format!("{}/{}", base, url)
    }
}
