//! Visual-regression and Lighthouse run plans.
//!
//! Screenshot capture, image diffing and the Lighthouse audit itself happen
//! in the browser runner; this module decides which pages take part, under
//! which snapshot name, and with which tolerances.

use crate::config::Env;
use crate::options::PageOptions;
use crate::paths::{derive_file_stem, path_from_url, resolve_url};
use indexmap::IndexMap;
use serde::Serialize;

/// Minimum score for each Lighthouse category.
pub const LIGHTHOUSE_THRESHOLDS: [(&str, u8); 4] = [
    ("performance", 90),
    ("accessibility", 90),
    ("best-practices", 90),
    ("seo", 90),
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    pub index: u32,
    /// Baseline capture against the live site; `None` without `LIVE_BASE_URL`.
    pub reference_url: Option<String>,
    pub test_url: String,
    pub snapshot: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_diff_pixel_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_diff_pixels: Option<u64>,
    pub skipped: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LighthouseEntry {
    pub index: u32,
    pub url: String,
    pub thresholds: IndexMap<String, u8>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunPlan {
    pub snapshots: Vec<SnapshotEntry>,
    pub lighthouse: Vec<LighthouseEntry>,
}

impl RunPlan {
    pub fn active_snapshots(&self) -> usize {
        self.snapshots.iter().filter(|s| !s.skipped).count()
    }
}

/// Snapshot file name for a page path, shared by reference and test runs.
pub fn snapshot_name(path: &str) -> String {
    format!("reference-{}.png", derive_file_stem(path))
}

pub fn build_plan(options: &PageOptions, env: &Env) -> RunPlan {
    let base = env.get("BASE_URL").unwrap_or_default();
    let live = env.non_empty("LIVE_BASE_URL");
    let mut plan = RunPlan::default();
    for (opt, url) in options.with_url() {
        // Sitemap entries are absolute; the snapshot is named by path only.
        let path = path_from_url(url).unwrap_or_else(|_| url.to_string());
        plan.snapshots.push(SnapshotEntry {
            index: opt.index,
            reference_url: live.map(|l| resolve_url(l, url)),
            test_url: resolve_url(base, url),
            snapshot: snapshot_name(&path),
            max_diff_pixel_ratio: opt.max_diff_pixel_ratio,
            max_diff_pixels: opt.max_diff_pixels,
            skipped: opt.is_disabled(),
        });
        if opt.runs_lighthouse() {
            plan.lighthouse.push(LighthouseEntry {
                index: opt.index,
                url: resolve_url(base, url),
                thresholds: LIGHTHOUSE_THRESHOLDS
                    .iter()
                    .map(|(k, v)| (k.to_string(), *v))
                    .collect(),
            });
        }
    }
    plan
}
