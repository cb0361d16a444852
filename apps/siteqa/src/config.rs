//! Configuration discovery and effective settings resolution.
//!
//! Two inputs feed a run:
//! - the environment snapshot (`Env`): `<root>/.env` overlaid by the process
//!   environment, captured once at startup and passed down explicitly;
//! - an optional `siteqa.toml|yaml|yml` in the repository root (or closest
//!   ancestor) carrying report and suppression settings.
//!
//! Defaults:
//! - `reports_dir`: `reports`
//! - `output`: `human`
//! - `a11y.tags`: wcag2a, wcag2aa, wcag21a, wcag21aa, wcag22aa, best-practice
//! - `a11y.results_dir`: `axe-results`
//! - `w3c.fail_on`: `["error"]`
//! - `w3c.heading_selector`: `#content h1`
//!
//! Overrides precedence: CLI > config file > defaults.

use crate::error::{QaError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TAGS: [&str; 6] = [
    "wcag2a",
    "wcag2aa",
    "wcag21a",
    "wcag21aa",
    "wcag22aa",
    "best-practice",
];

/// Public Nu validator used when `W3C_URL` is not set.
pub const DEFAULT_W3C_URL: &str = "https://validator.w3.org/nu/";

/// Snapshot of the environment variables a run reads.
///
/// Iteration is sorted by name, which keeps resolver output stable across
/// platforms whose process environment order differs.
#[derive(Debug, Default, Clone)]
pub struct Env {
    vars: BTreeMap<String, String>,
}

impl Env {
    /// Capture `.env` under `root` (if present) overlaid by the process env.
    pub fn capture(root: &Path) -> Result<Self> {
        let mut vars = BTreeMap::new();
        let dotenv = root.join(".env");
        if dotenv.exists() {
            let iter = dotenvy::from_path_iter(&dotenv).map_err(|e| QaError::Config {
                path: dotenv.clone(),
                reason: e.to_string(),
            })?;
            for item in iter {
                let (k, v) = item.map_err(|e| QaError::Config {
                    path: dotenv.clone(),
                    reason: match e {
                        dotenvy::Error::LineParse(line, _) => format!(
                            "cannot parse '{}'; quote values that contain spaces",
                            line
                        ),
                        other => other.to_string(),
                    },
                })?;
                vars.insert(k, v);
            }
            tracing::debug!(path = %dotenv.display(), count = vars.len(), "loaded .env");
        }
        for (k, v) in std::env::vars() {
            vars.insert(k, v);
        }
        Ok(Self { vars })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Value of `key` when set and non-empty.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn require(&self, key: &str) -> Result<&str> {
        self.non_empty(key)
            .ok_or_else(|| QaError::MissingVar(key.to_string()))
    }

    /// Truthy flag: set and non-empty.
    pub fn flag(&self, key: &str) -> bool {
        self.non_empty(key).is_some()
    }

    /// Comma-separated list, trimmed, empty items dropped.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Accessibility section under `[a11y]`.
pub struct A11yCfg {
    pub tags: Option<Vec<String>>,
    pub results_dir: Option<String>,
    /// Prefix for per-page report titles.
    pub project: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
/// One `[[w3c.ignore]]` entry: exact message text or a regex.
pub enum IgnoreCfg {
    Exact { exact: String },
    Pattern { pattern: String },
}

#[derive(Debug, Default, Deserialize, Clone)]
/// HTML validation section under `[w3c]`.
pub struct W3cCfg {
    pub fail_on: Option<Vec<String>>,
    pub heading_selector: Option<String>,
    #[serde(default)]
    pub ignore: Vec<IgnoreCfg>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `siteqa.toml|yaml`.
pub struct QaConfig {
    pub reports_dir: Option<String>,
    pub output: Option<String>,
    #[serde(default)]
    pub a11y: Option<A11yCfg>,
    #[serde(default)]
    pub w3c: Option<W3cCfg>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    pub reports_dir: PathBuf,
    pub output: String,
    pub tags: Vec<String>,
    pub results_dir: PathBuf,
    pub project: String,
    pub fail_on: Vec<String>,
    pub heading_selector: String,
    pub ignore: Vec<IgnoreCfg>,
    pub timeout: Option<Duration>,
}

/// Walk upward from `start` to detect the repository root.
///
/// Stops when a `siteqa.toml|yaml|yml` or a `.git` directory is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if CONFIG_FILES.iter().any(|f| cur.join(f).exists()) {
            return cur.to_path_buf();
        }
        if cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

const CONFIG_FILES: [&str; 3] = ["siteqa.toml", "siteqa.yaml", "siteqa.yml"];

/// Load `QaConfig` from `siteqa.toml` or `siteqa.yaml|yml` if present.
///
/// A missing file is `Ok(None)`; a broken one is an error.
pub fn load_config(root: &Path) -> Result<Option<QaConfig>> {
    let toml_path = root.join("siteqa.toml");
    if toml_path.exists() {
        let s = read(&toml_path)?;
        let cfg = toml::from_str(&s).map_err(|e| QaError::Config {
            path: toml_path.clone(),
            reason: e.to_string(),
        })?;
        return Ok(Some(cfg));
    }
    for yml in ["siteqa.yaml", "siteqa.yml"] {
        let p = root.join(yml);
        if p.exists() {
            let s = read(&p)?;
            let cfg = serde_yaml::from_str(&s).map_err(|e| QaError::Config {
                path: p.clone(),
                reason: e.to_string(),
            })?;
            return Ok(Some(cfg));
        }
    }
    Ok(None)
}

fn read(p: &Path) -> Result<String> {
    fs::read_to_string(p).map_err(|e| QaError::Config {
        path: p.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(
    cli_repo_root: Option<&str>,
    cli_output: Option<&str>,
    cli_reports: Option<&str>,
    cli_results: Option<&str>,
) -> Result<Effective> {
    let start = PathBuf::from(cli_repo_root.unwrap_or("."));
    let repo_root = detect_repo_root(&start);
    let cfg = load_config(&repo_root)?.unwrap_or_default();
    let a11y = cfg.a11y.unwrap_or_default();
    let w3c = cfg.w3c.unwrap_or_default();

    let output = cli_output
        .map(|s| s.to_string())
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());
    let reports_dir = cli_reports
        .map(|s| s.to_string())
        .or(cfg.reports_dir)
        .unwrap_or_else(|| "reports".to_string());
    let results_dir = cli_results
        .map(|s| s.to_string())
        .or(a11y.results_dir)
        .unwrap_or_else(|| "axe-results".to_string());
    let tags = a11y
        .tags
        .unwrap_or_else(|| DEFAULT_TAGS.iter().map(|t| t.to_string()).collect());
    let fail_on = w3c.fail_on.unwrap_or_else(|| vec!["error".to_string()]);
    let heading_selector = w3c
        .heading_selector
        .unwrap_or_else(|| "#content h1".to_string());

    Ok(Effective {
        reports_dir: repo_root.join(reports_dir),
        results_dir: repo_root.join(results_dir),
        repo_root,
        output,
        tags,
        project: a11y.project.unwrap_or_else(|| "siteqa".to_string()),
        fail_on,
        heading_selector,
        ignore: w3c.ignore,
        timeout: w3c.timeout_secs.map(Duration::from_secs),
    })
}
