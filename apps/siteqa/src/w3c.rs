//! HTML conformance aggregation.
//!
//! Validator messages pass through the suppression list first; what remains
//! is grouped by message type. A separate structural check records pages
//! whose main content does not hold exactly one top-level heading.

use crate::config::{Env, IgnoreCfg, DEFAULT_W3C_URL};
use crate::error::{QaError, Result};
use crate::fetch::PageSource;
use crate::groups::{Groups, OrderedSet};
use crate::paths::resolve_url;
use kuchiki::traits::TendrilSink;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Group key for the heading-count check.
pub const HEADING: &str = "heading";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidationResponse {
    #[serde(default)]
    pub messages: Vec<ValidatorMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_line: Option<u64>,
}

/// Validates raw HTML documents.
pub trait HtmlValidator {
    fn validate(&self, html: &str) -> Result<ValidationResponse>;
}

/// Client for a Nu HTML Checker instance (public or self-hosted).
pub struct NuValidator {
    client: Client,
    endpoint: Url,
}

impl NuValidator {
    /// Endpoint from `W3C_URL`, falling back to the public checker.
    ///
    /// A configured endpoint is treated as self-hosted and may use a
    /// self-signed certificate.
    pub fn from_env(env: &Env, timeout: Option<Duration>) -> Result<Self> {
        let (raw, self_hosted) = match env.non_empty("W3C_URL") {
            Some(u) => (u, true),
            None => (DEFAULT_W3C_URL, false),
        };
        Self::new(raw, self_hosted, timeout)
    }

    pub fn new(endpoint: &str, accept_invalid_certs: bool, timeout: Option<Duration>) -> Result<Self> {
        let mut url = Url::parse(endpoint).map_err(|source| QaError::Url {
            url: endpoint.to_string(),
            source,
        })?;
        if !url.query_pairs().any(|(k, _)| k == "out") {
            url.query_pairs_mut().append_pair("out", "json");
        }
        let mut builder = Client::builder()
            .danger_accept_invalid_certs(accept_invalid_certs)
            .user_agent(concat!("siteqa/", env!("CARGO_PKG_VERSION")));
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().map_err(|e| QaError::Validator {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            client,
            endpoint: url,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}

impl HtmlValidator for NuValidator {
    fn validate(&self, html: &str) -> Result<ValidationResponse> {
        let fail = |reason: String| QaError::Validator {
            endpoint: self.endpoint.to_string(),
            reason,
        };
        let resp = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "text/html; charset=utf-8")
            .body(html.to_string())
            .send()
            .map_err(|e| fail(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(fail(format!("status {}", resp.status())));
        }
        resp.json::<ValidationResponse>()
            .map_err(|e| fail(format!("unexpected response: {}", e)))
    }
}

/// One suppression rule.
#[derive(Debug, Clone)]
pub enum IgnoreRule {
    Exact(String),
    Pattern(Regex),
}

impl IgnoreRule {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            IgnoreRule::Exact(s) => s == text,
            IgnoreRule::Pattern(re) => re.is_match(text),
        }
    }
}

/// Ordered suppression list applied before grouping.
#[derive(Debug, Clone, Default)]
pub struct Suppressions(Vec<IgnoreRule>);

impl Suppressions {
    pub fn compile(rules: &[IgnoreCfg]) -> Result<Self> {
        rules
            .iter()
            .map(|r| match r {
                IgnoreCfg::Exact { exact } => Ok(IgnoreRule::Exact(exact.clone())),
                IgnoreCfg::Pattern { pattern } => Regex::new(pattern)
                    .map(IgnoreRule::Pattern)
                    .map_err(|source| QaError::IgnorePattern {
                        pattern: pattern.clone(),
                        source,
                    }),
            })
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    pub fn suppresses(&self, msg: &ValidatorMessage) -> bool {
        self.0.iter().any(|r| r.matches(&msg.message))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
/// All messages of one type across the pass.
pub struct ValidationGroup {
    pub message: OrderedSet,
    pub extract: OrderedSet,
    pub urls: OrderedSet,
}

#[derive(Debug, Default)]
pub struct W3cAudit {
    pub groups: Groups<ValidationGroup>,
    pub pages_checked: usize,
    pub suppressed: usize,
}

impl W3cAudit {
    /// Fold one page's validator messages, dropping suppressed ones.
    pub fn record_messages(&mut self, url: &str, messages: &[ValidatorMessage], suppressions: &Suppressions) {
        for msg in messages {
            if suppressions.suppresses(msg) {
                self.suppressed += 1;
                continue;
            }
            self.groups.merge(&msg.kind, ValidationGroup::default, |g| {
                g.message.insert(msg.message.as_str());
                if let Some(extract) = msg.extract.as_deref() {
                    g.extract.insert(extract);
                }
                g.urls.insert(url);
            });
        }
    }

    /// Record a page whose heading count is not exactly one.
    pub fn record_heading(&mut self, url: &str, selector: &str, count: usize) {
        if count == 1 {
            return;
        }
        self.groups.merge(HEADING, ValidationGroup::default, |g| {
            g.message
                .insert(format!("expected exactly one element matching '{}'", selector));
            g.urls.insert(format!("{} (count: {})", url, count));
        });
    }

    /// Group types that fail the run: `error`, `heading`, and `fail_on`.
    pub fn failing_types(&self, fail_on: &[String]) -> Vec<&str> {
        self.groups
            .keys()
            .filter(|k| *k == "error" || *k == HEADING || fail_on.iter().any(|f| f.as_str() == *k))
            .collect()
    }

    pub fn passed(&self, fail_on: &[String]) -> bool {
        self.failing_types(fail_on).is_empty()
    }
}

/// Count elements matching `selector` in an HTML document.
pub fn count_matches(html: &str, selector: &str) -> Result<usize> {
    let doc = kuchiki::parse_html().one(html);
    let found = doc
        .select(selector)
        .map_err(|_| QaError::Selector(selector.to_string()))?;
    Ok(found.count())
}

/// Settings for one validation pass.
pub struct W3cRun<'a> {
    pub base_url: &'a str,
    pub heading_selector: &'a str,
    pub suppressions: &'a Suppressions,
}

/// Validate each page in order; the first collaborator failure aborts.
pub fn run_w3c(
    urls: &[String],
    run: &W3cRun<'_>,
    pages: &dyn PageSource,
    validator: &dyn HtmlValidator,
) -> Result<W3cAudit> {
    let mut audit = W3cAudit::default();
    for url in urls {
        let full = resolve_url(run.base_url, url);
        let page = pages.load(&full)?;
        if !page.is_success() {
            tracing::warn!(url = %full, status = page.status, "page answered with non-success status");
        }
        let headings = count_matches(&page.body, run.heading_selector)?;
        audit.record_heading(&full, run.heading_selector, headings);

        let result = validator.validate(&page.body)?;
        tracing::info!(url = %full, messages = result.messages.len(), "validated page");
        audit.record_messages(&full, &result.messages, run.suppressions);
        audit.pages_checked += 1;
    }
    Ok(audit)
}

/// Pages for the validation pass: `TEST_W3C_URLS`, else `KEY_URLS`.
pub fn target_urls(env: &Env) -> Vec<String> {
    let urls = env.list("TEST_W3C_URLS");
    if urls.is_empty() {
        env.list("KEY_URLS")
    } else {
        urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Fetched;
    use std::collections::HashMap;

    const NFC: &str = "Text run is not in Unicode Normalization Form C.";

    fn msg(kind: &str, text: &str, extract: Option<&str>) -> ValidatorMessage {
        ValidatorMessage {
            kind: kind.into(),
            sub_type: None,
            message: text.into(),
            extract: extract.map(String::from),
            last_line: None,
        }
    }

    struct Pages(HashMap<String, String>);

    impl PageSource for Pages {
        fn load(&self, url: &str) -> Result<Fetched> {
            self.0
                .get(url)
                .map(|body| Fetched {
                    url: url.to_string(),
                    status: 200,
                    body: body.clone(),
                })
                .ok_or_else(|| QaError::PageFetch {
                    url: url.to_string(),
                    reason: "not found".into(),
                })
        }
    }

    /// Answers with the messages keyed by a marker comment in the page.
    struct Canned(HashMap<&'static str, Vec<ValidatorMessage>>);

    impl HtmlValidator for Canned {
        fn validate(&self, html: &str) -> Result<ValidationResponse> {
            let messages = self
                .0
                .iter()
                .find(|(marker, _)| html.contains(*marker))
                .map(|(_, m)| m.clone())
                .unwrap_or_default();
            Ok(ValidationResponse { messages })
        }
    }

    struct Unreachable;

    impl HtmlValidator for Unreachable {
        fn validate(&self, _html: &str) -> Result<ValidationResponse> {
            Err(QaError::Validator {
                endpoint: "https://validator.test/".into(),
                reason: "connection reset".into(),
            })
        }
    }

    fn page(marker: &str, h1s: usize) -> String {
        let headings = "<h1>Title</h1>".repeat(h1s);
        format!(
            "<!DOCTYPE html><html><head><title>t</title></head><body><!--{}--><div id=\"content\">{}</div></body></html>",
            marker, headings
        )
    }

    #[test]
    fn test_exact_suppression_yields_no_groups() {
        let sup = Suppressions::compile(&[IgnoreCfg::Exact { exact: NFC.into() }]).unwrap();
        let mut audit = W3cAudit::default();
        audit.record_messages("https://a.test/", &[msg("info", NFC, None)], &sup);
        assert!(audit.groups.is_empty());
        assert_eq!(audit.suppressed, 1);
        assert!(audit.passed(&["error".to_string()]));
    }

    #[test]
    fn test_pattern_suppression() {
        let sup = Suppressions::compile(&[IgnoreCfg::Pattern {
            pattern: "^Trailing slash".into(),
        }])
        .unwrap();
        let mut audit = W3cAudit::default();
        audit.record_messages(
            "u",
            &[
                msg("info", "Trailing slash on void elements has no effect", Some("<br/>")),
                msg("error", "Stray end tag “div”.", Some("</div>")),
            ],
            &sup,
        );
        assert_eq!(audit.groups.keys().collect::<Vec<_>>(), vec!["error"]);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = Suppressions::compile(&[IgnoreCfg::Pattern { pattern: "(".into() }]).unwrap_err();
        assert!(matches!(err, QaError::IgnorePattern { .. }));
    }

    #[test]
    fn test_grouping_dedups_fields_independently() {
        let mut audit = W3cAudit::default();
        let sup = Suppressions::default();
        audit.record_messages("a", &[msg("error", "Stray end tag", Some("</p>"))], &sup);
        audit.record_messages(
            "b",
            &[
                msg("error", "Stray end tag", Some("</div>")),
                msg("error", "Duplicate ID", Some("</p>")),
            ],
            &sup,
        );
        let g = audit.groups.get("error").unwrap();
        assert_eq!(g.message.iter().collect::<Vec<_>>(), vec!["Stray end tag", "Duplicate ID"]);
        assert_eq!(g.extract.iter().collect::<Vec<_>>(), vec!["</p>", "</div>"]);
        assert_eq!(g.urls.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_info_groups_are_reported_without_failing_unless_configured() {
        let mut audit = W3cAudit::default();
        audit.record_messages("a", &[msg("info", "Consider adding a lang attribute", None)], &Suppressions::default());
        assert!(audit.passed(&["error".to_string()]));
        assert!(!audit.passed(&["info".to_string()]));
    }

    #[test]
    fn test_count_matches_scopes_to_content_region() {
        let html = "<h1>outside</h1><div id=\"content\"><h1>a</h1><section><h1>b</h1></section></div>";
        assert_eq!(count_matches(html, "#content h1").unwrap(), 2);
        assert_eq!(count_matches(html, "h1").unwrap(), 3);
        assert!(matches!(count_matches(html, "[[["), Err(QaError::Selector(_))));
    }

    #[test]
    fn test_run_records_heading_and_errors_and_fails() {
        let pages = Pages(HashMap::from([
            ("https://a.test/".to_string(), page("home", 1)),
            ("https://a.test/team".to_string(), page("team", 2)),
        ]));
        let validator = Canned(HashMap::from([
            ("home", vec![msg("info", NFC, None)]),
            ("team", vec![msg("error", "Duplicate ID “x”.", Some("<p id=\"x\">"))]),
        ]));
        let sup = Suppressions::compile(&[IgnoreCfg::Exact { exact: NFC.into() }]).unwrap();
        let run = W3cRun {
            base_url: "https://a.test",
            heading_selector: "#content h1",
            suppressions: &sup,
        };
        let urls = vec!["/".to_string(), "/team".to_string()];
        let audit = run_w3c(&urls, &run, &pages, &validator).unwrap();
        assert_eq!(audit.pages_checked, 2);
        assert_eq!(audit.groups.keys().collect::<Vec<_>>(), vec!["heading", "error"]);
        let heading = audit.groups.get(HEADING).unwrap();
        assert_eq!(
            heading.urls.iter().collect::<Vec<_>>(),
            vec!["https://a.test/team (count: 2)"]
        );
        assert_eq!(audit.failing_types(&[]), vec!["heading", "error"]);
    }

    #[test]
    fn test_single_heading_and_suppressed_messages_pass() {
        let pages = Pages(HashMap::from([("https://a.test/".to_string(), page("home", 1))]));
        let validator = Canned(HashMap::from([("home", vec![msg("info", NFC, None)])]));
        let sup = Suppressions::compile(&[IgnoreCfg::Exact { exact: NFC.into() }]).unwrap();
        let run = W3cRun {
            base_url: "https://a.test",
            heading_selector: "#content h1",
            suppressions: &sup,
        };
        let audit = run_w3c(&["/".to_string()], &run, &pages, &validator).unwrap();
        assert!(audit.groups.is_empty());
        assert!(audit.passed(&["error".to_string()]));
    }

    #[test]
    fn test_validator_failure_aborts_the_run() {
        let pages = Pages(HashMap::from([("https://a.test/".to_string(), page("home", 1))]));
        let run = W3cRun {
            base_url: "https://a.test",
            heading_selector: "#content h1",
            suppressions: &Suppressions::default(),
        };
        let err = run_w3c(&["/".to_string()], &run, &pages, &Unreachable).unwrap_err();
        assert!(matches!(err, QaError::Validator { .. }));
    }

    #[test]
    fn test_response_without_messages_is_empty() {
        let resp: ValidationResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.messages.is_empty());
    }

    #[test]
    fn test_target_urls_prefer_dedicated_list() {
        let env = Env::from_pairs([("KEY_URLS", "/a,/b"), ("TEST_W3C_URLS", "/c")]);
        assert_eq!(target_urls(&env), vec!["/c".to_string()]);
        let env = Env::from_pairs([("KEY_URLS", "/a, /b")]);
        assert_eq!(target_urls(&env), vec!["/a".to_string(), "/b".to_string()]);
    }

    #[test]
    fn test_endpoint_gets_json_output_query() {
        let v = NuValidator::new("https://validator.example.org/nu/", true, None).unwrap();
        assert_eq!(v.endpoint(), "https://validator.example.org/nu/?out=json");
        let v = NuValidator::new("https://validator.example.org/?out=json", false, None).unwrap();
        assert_eq!(v.endpoint(), "https://validator.example.org/?out=json");
    }
}
