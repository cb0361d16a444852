//! JSON-LD structured data check.
//!
//! Loads `BASE_URL + STRUCTURED_DATA_URL`, reads the first
//! `application/ld+json` script and requires its `@type` to equal
//! `STRUCTURED_DATA_TYPE`.

use crate::config::Env;
use crate::error::Result;
use crate::fetch::PageSource;
use crate::models::{CheckResult, Issue};
use crate::paths::resolve_url;
use kuchiki::traits::TendrilSink;
use serde_json::Value as Json;

pub const LD_JSON_SELECTOR: &str = r#"script[type="application/ld+json"]"#;

/// Expected `@type` when `STRUCTURED_DATA_TYPE` is unset.
pub const DEFAULT_TYPE: &str = "JobPosting";

const CHECK: &str = "structured-data";

fn issue(url: &str, message: String) -> Option<Issue> {
    Some(Issue {
        check: CHECK.to_string(),
        url: url.to_string(),
        severity: "error".to_string(),
        message,
    })
}

/// Raw text of the first JSON-LD script in the document.
pub fn ld_json_text(html: &str) -> Option<String> {
    let doc = kuchiki::parse_html().one(html);
    let script = doc.select_first(LD_JSON_SELECTOR).ok()?;
    Some(script.text_contents())
}

/// Whether `value` declares `expected` as its `@type`.
///
/// `@type` may be a string or a list; top-level arrays and `@graph`
/// containers match when any node does.
pub fn declares_type(value: &Json, expected: &str) -> bool {
    match value {
        Json::Array(items) => items.iter().any(|v| declares_type(v, expected)),
        Json::Object(map) => {
            let own = match map.get("@type") {
                Some(Json::String(t)) => t == expected,
                Some(Json::Array(ts)) => ts.iter().any(|t| t.as_str() == Some(expected)),
                _ => false,
            };
            own || map
                .get("@graph")
                .is_some_and(|g| declares_type(g, expected))
        }
        _ => false,
    }
}

/// Check one loaded document; `None` when it passes.
pub fn check_document(url: &str, html: &str, expected: &str) -> Option<Issue> {
    let Some(text) = ld_json_text(html) else {
        return issue(url, format!("no {} found", LD_JSON_SELECTOR));
    };
    let data: Json = match serde_json::from_str(text.trim()) {
        Ok(v) => v,
        Err(e) => return issue(url, format!("structured data is not valid JSON: {}", e)),
    };
    if declares_type(&data, expected) {
        return None;
    }
    let found = data
        .get("@type")
        .map(|t| t.to_string())
        .unwrap_or_else(|| "no @type".to_string());
    issue(url, format!("expected @type \"{}\", found {}", expected, found))
}

pub fn run_structured_data(base_url: &str, env: &Env, pages: &dyn PageSource) -> Result<CheckResult> {
    let path = env.require("STRUCTURED_DATA_URL")?;
    let expected = env.non_empty("STRUCTURED_DATA_TYPE").unwrap_or(DEFAULT_TYPE);
    let url = resolve_url(base_url, path);
    let page = pages.load(&url)?;

    let mut res = CheckResult::default();
    if page.is_success() {
        res.push(check_document(&url, &page.body, expected));
    } else {
        res.push(issue(&url, format!("expected status 200, got {}", page.status)));
    }
    tracing::info!(url = %url, expected, errors = res.summary.errors, "structured data checked");
    Ok(res)
}
