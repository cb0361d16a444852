//! Site-level smoke checks run against `BASE_URL`.
//!
//! - the start page title equals `TEST_TITLE` (skipped when unset)
//! - an unknown path answers 404
//! - `/robots.txt` answers 200 with a non-empty body
//! - `/sitemap.xml` answers 200

use crate::config::Env;
use crate::error::Result;
use crate::fetch::PageSource;
use crate::models::{CheckResult, Issue};
use crate::paths::resolve_url;
use kuchiki::traits::TendrilSink;

/// Path that no site is expected to serve.
pub const MISSING_PATH: &str = "/i-dont-exist";

fn issue(check: &str, url: &str, message: String) -> Option<Issue> {
    Some(Issue {
        check: check.to_string(),
        url: url.to_string(),
        severity: "error".to_string(),
        message,
    })
}

/// Text of the first `<title>`, trimmed.
pub fn page_title(html: &str) -> Option<String> {
    let doc = kuchiki::parse_html().one(html);
    let title = doc.select_first("title").ok()?;
    let text = title.text_contents();
    Some(text.trim().to_string())
}

pub fn run_base(base_url: &str, env: &Env, pages: &dyn PageSource) -> Result<CheckResult> {
    let mut res = CheckResult::default();

    if let Some(expected) = env.non_empty("TEST_TITLE") {
        let url = resolve_url(base_url, "/");
        let page = pages.load(&url)?;
        let found = page_title(&page.body);
        res.push(match found {
            Some(ref t) if t == expected => None,
            Some(t) => issue("title", &url, format!("expected title '{}', found '{}'", expected, t)),
            None => issue("title", &url, "page has no <title>".to_string()),
        });
    } else {
        tracing::debug!("TEST_TITLE not set; skipping title check");
    }

    let url = resolve_url(base_url, MISSING_PATH);
    let page = pages.load(&url)?;
    res.push(if page.status == 404 {
        None
    } else {
        issue("not-found", &url, format!("expected status 404, got {}", page.status))
    });

    let url = resolve_url(base_url, "/robots.txt");
    let page = pages.load(&url)?;
    res.push(if !page.is_success() {
        issue("robots", &url, format!("expected status 200, got {}", page.status))
    } else if page.body.trim().is_empty() {
        issue("robots", &url, "robots.txt is empty".to_string())
    } else {
        None
    });

    let url = resolve_url(base_url, "/sitemap.xml");
    let page = pages.load(&url)?;
    res.push(if page.is_success() {
        None
    } else {
        issue("sitemap", &url, format!("expected status 200, got {}", page.status))
    });

    tracing::info!(checks = res.summary.checks, errors = res.summary.errors, "smoke checks finished");
    Ok(res)
}
