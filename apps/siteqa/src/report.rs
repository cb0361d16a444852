//! Report artifacts written at the end of a pass.
//!
//! Accessibility: `a11y/a11y-audit-complete.json`, `a11y/a11y-audit-compact.json`
//! (both only when violations exist), one HTML page per affected page and an
//! `a11y/index.html` linking them. Validation: `w3c/w3c-audit-compact.json`.
//! Directories are created on demand.

use crate::a11y::{A11yAudit, PageAudit};
use crate::error::{QaError, Result};
use crate::paths::{path_from_url, sanitize_for_filename};
use crate::w3c::W3cAudit;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const A11Y_COMPLETE: &str = "a11y-audit-complete.json";
pub const A11Y_COMPACT: &str = "a11y-audit-compact.json";
pub const W3C_COMPACT: &str = "w3c-audit-compact.json";

fn write(path: &Path, contents: &str) -> Result<()> {
    let io = |source: std::io::Error| QaError::Report {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io)?;
    }
    fs::write(path, contents).map_err(io)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    write(path, &serde_json::to_string_pretty(value)?)
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Report file name for a page URL.
pub fn page_report_name(url: &str) -> String {
    let path = path_from_url(url).unwrap_or_else(|_| url.to_string());
    format!("{}.html", sanitize_for_filename(&path))
}

fn render_page_report(project: &str, page: &PageAudit) -> String {
    let mut rows = String::new();
    for v in &page.violations {
        let targets: Vec<String> = v
            .nodes
            .iter()
            .flat_map(|n| n.target.iter())
            .map(|t| format!("<li><code>{}</code></li>", html_escape(&t.selector())))
            .collect();
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td><ul>{}</ul></td></tr>\n",
            html_escape(&v.id),
            html_escape(v.impact.as_deref().unwrap_or("")),
            html_escape(&v.description),
            targets.join("")
        ));
    }
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n<p>{count} violation(s) on <a href=\"{url}\">{url}</a></p>\n<table>\n<tr><th>Rule</th><th>Impact</th><th>Description</th><th>Targets</th></tr>\n{rows}</table>\n</body>\n</html>\n",
        title = html_escape(&format!("{}: {}", project, page.url)),
        count = page.violations.len(),
        url = html_escape(&page.url),
        rows = rows,
    )
}

fn render_index(pages: &[String]) -> String {
    let items: Vec<String> = pages
        .iter()
        .map(|p| format!("<li><a href=\"{0}\">{0}</a></li>", html_escape(p)))
        .collect();
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<title>All Reports</title>\n</head>\n<body>\n<ul>\n{}\n</ul>\n</body>\n</html>\n",
        items.join("\n")
    )
}

/// Write all accessibility artifacts. Returns the files written.
pub fn write_a11y(dir: &Path, project: &str, audit: &A11yAudit) -> Result<Vec<PathBuf>> {
    let dir = dir.join("a11y");
    let mut written = Vec::new();
    let mut pages = Vec::new();
    for page in audit.complete.values() {
        let name = page_report_name(&page.url);
        let path = dir.join(&name);
        write(&path, &render_page_report(project, page))?;
        written.push(path);
        pages.push(name);
    }
    if !audit.groups.is_empty() {
        let complete = dir.join(A11Y_COMPLETE);
        write_json(&complete, &audit.complete)?;
        let compact = dir.join(A11Y_COMPACT);
        write_json(&compact, &audit.groups)?;
        written.push(complete);
        written.push(compact);
    }
    let index = dir.join("index.html");
    write(&index, &render_index(&pages))?;
    written.push(index);
    tracing::info!(dir = %dir.display(), files = written.len(), "wrote accessibility reports");
    Ok(written)
}

/// Write the grouped validation report.
pub fn write_w3c(dir: &Path, audit: &W3cAudit) -> Result<PathBuf> {
    let path = dir.join("w3c").join(W3C_COMPACT);
    write_json(&path, &audit.groups)?;
    tracing::info!(path = %path.display(), "wrote validation report");
    Ok(path)
}
