//! Accessibility aggregation.
//!
//! Each page's axe-core violations are kept verbatim in the complete record
//! and folded into `ViolationGroup`s keyed by rule id. A run passes only when
//! no group exists after the full pass.

use crate::error::{QaError, Result};
use crate::groups::{Groups, OrderedSet};
use crate::options::PageOptions;
use crate::paths::{path_from_url, resolve_url, sanitize_for_filename};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
/// One axe-core violation. Unknown fields are carried through untouched.
pub struct Violation {
    pub id: String,
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub nodes: Vec<ViolationNode>,
    #[serde(flatten)]
    pub extra: Map<String, Json>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationNode {
    #[serde(default)]
    pub target: Vec<Target>,
    #[serde(flatten)]
    pub extra: Map<String, Json>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
/// A node target: a plain selector, or a shadow-DOM selector chain.
pub enum Target {
    Selector(String),
    Shadow(Vec<String>),
}

impl Target {
    pub fn selector(&self) -> String {
        match self {
            Target::Selector(s) => s.clone(),
            Target::Shadow(parts) => parts.join(" >>> "),
        }
    }
}

fn wrapper_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#c\d+ > ").expect("static regex"))
}

/// Strip a leading `#c<digits> > ` content-wrapper segment, once.
///
/// Wrapper ids differ between environments; without the prefix the same
/// element is recognized across pages.
pub fn normalize_target(target: &str) -> &str {
    match wrapper_prefix().find(target) {
        Some(m) => &target[m.end()..],
        None => target,
    }
}

#[derive(Debug, Clone, Serialize)]
/// All observations of one rule id across the pass.
pub struct ViolationGroup {
    pub impact: Option<String>,
    pub description: String,
    pub targets: OrderedSet,
    pub urls: OrderedSet,
}

#[derive(Debug, Clone, Serialize)]
/// Complete record entry for a page with at least one violation.
pub struct PageAudit {
    pub url: String,
    pub violations: Vec<Violation>,
}

#[derive(Debug, Default)]
pub struct A11yAudit {
    /// Pages with violations, keyed by option index.
    pub complete: IndexMap<u32, PageAudit>,
    pub groups: Groups<ViolationGroup>,
    pub pages_scanned: usize,
}

impl A11yAudit {
    /// Fold one page's scan into the audit.
    pub fn record(&mut self, index: u32, url: &str, violations: Vec<Violation>) {
        self.pages_scanned += 1;
        if violations.is_empty() {
            return;
        }
        for v in &violations {
            self.groups.merge(
                &v.id,
                || ViolationGroup {
                    impact: v.impact.clone(),
                    description: v.description.clone(),
                    targets: OrderedSet::new(),
                    urls: OrderedSet::new(),
                },
                |g| {
                    for target in v.nodes.iter().flat_map(|n| n.target.iter()) {
                        g.targets.insert(normalize_target(&target.selector()));
                    }
                    g.urls.insert(url);
                },
            );
        }
        self.complete.insert(
            index,
            PageAudit {
                url: url.to_string(),
                violations,
            },
        );
    }

    pub fn passed(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Produces axe-core violations for a page.
pub trait AccessibilityScanner {
    fn scan(&mut self, url: &str, tags: &[String]) -> Result<Vec<Violation>>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AxeFile {
    Results { violations: Vec<Violation> },
    Bare(Vec<Violation>),
}

/// Reads axe-core JSON results exported per page into a directory.
///
/// The file for a page is `<dir>/<slug>.json`, where the slug is
/// `sanitize_for_filename` of the page path.
pub struct AxeResultsDir {
    pub dir: PathBuf,
}

impl AxeResultsDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn file_for(&self, url: &str) -> PathBuf {
        let path = path_from_url(url).unwrap_or_else(|_| url.to_string());
        self.dir.join(format!("{}.json", sanitize_for_filename(&path)))
    }
}

impl AccessibilityScanner for AxeResultsDir {
    fn scan(&mut self, url: &str, tags: &[String]) -> Result<Vec<Violation>> {
        let file = self.file_for(url);
        let fail = |reason: String| QaError::ScanResults {
            url: url.to_string(),
            reason,
        };
        let data = fs::read_to_string(&file)
            .map_err(|e| fail(format!("{}: {}", file.display(), e)))?;
        let parsed: AxeFile = serde_json::from_str(&data)
            .map_err(|e| fail(format!("{}: {}", file.display(), e)))?;
        let violations = match parsed {
            AxeFile::Results { violations } | AxeFile::Bare(violations) => violations,
        };
        Ok(filter_by_tags(violations, tags))
    }
}

/// Keep violations carrying at least one of `tags`. Untagged violations and
/// an empty filter keep everything.
pub fn filter_by_tags(violations: Vec<Violation>, tags: &[String]) -> Vec<Violation> {
    if tags.is_empty() {
        return violations;
    }
    violations
        .into_iter()
        .filter(|v| v.tags.is_empty() || v.tags.iter().any(|t| tags.contains(t)))
        .collect()
}

/// Scan every page with a URL, strictly one after another.
pub fn run_a11y(
    options: &PageOptions,
    base_url: &str,
    scanner: &mut dyn AccessibilityScanner,
    tags: &[String],
) -> Result<A11yAudit> {
    let mut audit = A11yAudit::default();
    for (opt, url) in options.with_url() {
        let full = resolve_url(base_url, url);
        let violations = scanner.scan(&full, tags)?;
        tracing::info!(url = %full, violations = violations.len(), "scanned page");
        audit.record(opt.index, &full, violations);
    }
    Ok(audit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Env;
    use crate::options::from_env;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn violation(id: &str, targets: &[&str]) -> Violation {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "impact": "serious",
            "description": format!("{} description", id),
            "tags": ["wcag2aa"],
            "helpUrl": "https://dequeuniversity.com/rules/axe/4.8/x",
            "nodes": targets.iter().map(|t| serde_json::json!({"target": [t], "html": "<div>"})).collect::<Vec<_>>(),
        }))
        .unwrap()
    }

    struct MapScanner(HashMap<String, Vec<Violation>>);

    impl AccessibilityScanner for MapScanner {
        fn scan(&mut self, url: &str, _tags: &[String]) -> Result<Vec<Violation>> {
            Ok(self.0.get(url).cloned().unwrap_or_default())
        }
    }

    #[test]
    fn test_normalize_strips_only_first_wrapper_segment() {
        assert_eq!(normalize_target("#c12 > div > span"), "div > span");
        assert_eq!(normalize_target("#c12 > #c13 > span"), "#c13 > span");
        assert_eq!(normalize_target("#content > div"), "#content > div");
        assert_eq!(normalize_target("div > #c12 > span"), "div > #c12 > span");
        assert_eq!(normalize_target("#c12>div"), "#c12>div");
    }

    #[test]
    fn test_same_id_on_two_pages_dedups_targets_and_collects_urls() {
        let mut audit = A11yAudit::default();
        audit.record(0, "https://a.test/", vec![violation("color-contrast", &["#c1 > .btn", ".logo"])]);
        audit.record(1, "https://a.test/b", vec![violation("color-contrast", &["#c99 > .btn"])]);
        assert_eq!(audit.groups.len(), 1);
        let g = audit.groups.get("color-contrast").unwrap();
        assert_eq!(g.targets.iter().collect::<Vec<_>>(), vec![".btn", ".logo"]);
        assert_eq!(
            g.urls.iter().collect::<Vec<_>>(),
            vec!["https://a.test/", "https://a.test/b"]
        );
        assert_eq!(g.impact.as_deref(), Some("serious"));
        assert!(!audit.passed());
    }

    #[test]
    fn test_pages_without_violations_pass() {
        let mut audit = A11yAudit::default();
        audit.record(0, "https://a.test/", Vec::new());
        assert!(audit.passed());
        assert!(audit.complete.is_empty());
        assert_eq!(audit.pages_scanned, 1);
    }

    #[test]
    fn test_run_with_disjoint_ids_yields_two_groups_and_fails() {
        let env = Env::from_pairs([("KEY_URL_0", "/"), ("KEY_URL_1", "/team")]);
        let options = from_env(&env).unwrap();
        let mut scanner = MapScanner(HashMap::from([
            ("https://a.test/".to_string(), vec![violation("region", &["main"])]),
            ("https://a.test/team".to_string(), vec![violation("image-alt", &["img"])]),
        ]));
        let audit = run_a11y(&options, "https://a.test", &mut scanner, &[]).unwrap();
        assert!(!audit.passed());

        let complete = serde_json::to_value(&audit.complete).unwrap();
        assert_eq!(complete["0"]["url"], "https://a.test/");
        assert!(complete["1"]["violations"][0]["helpUrl"].is_string());

        let compact = serde_json::to_value(&audit.groups).unwrap();
        let keys: Vec<_> = compact.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["region".to_string(), "image-alt".to_string()]);
        assert_eq!(compact["region"]["urls"], serde_json::json!(["https://a.test/"]));
        assert_eq!(compact["image-alt"]["urls"], serde_json::json!(["https://a.test/team"]));
    }

    #[test]
    fn test_results_dir_reads_axe_files_and_filters_tags() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("team-members.json"),
            serde_json::json!({
                "url": "https://a.test/team/members",
                "violations": [
                    {"id": "region", "tags": ["best-practice"], "nodes": [{"target": ["main"]}]},
                    {"id": "duplicate-id", "tags": ["wcag2a"], "nodes": [{"target": [["#host", "button"]]}]}
                ]
            })
            .to_string(),
        )
        .unwrap();
        let mut scanner = AxeResultsDir::new(dir.path());
        let found = scanner
            .scan("https://a.test/team/members", &["wcag2a".to_string()])
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].nodes[0].target[0].selector(), "#host >>> button");

        let err = scanner.scan("https://a.test/missing", &[]).unwrap_err();
        assert!(matches!(err, QaError::ScanResults { .. }));
    }

    #[test]
    fn test_results_dir_maps_root_to_startpage() {
        let scanner = AxeResultsDir::new("/tmp/r");
        assert_eq!(
            scanner.file_for("https://a.test/"),
            PathBuf::from("/tmp/r/startpage.json")
        );
    }
}
