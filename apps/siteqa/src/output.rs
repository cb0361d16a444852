//! Output rendering for options, a11y, w3c, base, structured-data and plan
//! commands.
//!
//! Supports `human` (default) and `json` outputs. The JSON form includes
//! per-item fields and a top-level summary.

use crate::a11y::A11yAudit;
use crate::models::CheckResult;
use crate::options::PageOptions;
use crate::plan::RunPlan;
use crate::w3c::W3cAudit;
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;
use std::sync::atomic::{AtomicBool, Ordering};

static COLOR_DISABLED: AtomicBool = AtomicBool::new(false);

/// Turn off colors for stdout output (`--no-color`).
pub fn disable_colors() {
    COLOR_DISABLED.store(true, Ordering::Relaxed);
}

fn colors_allowed(output: &str, disabled: bool, no_color_env: bool) -> bool {
    output != "json" && !disabled && !no_color_env
}

fn use_colors(output: &str) -> bool {
    colors_allowed(
        output,
        COLOR_DISABLED.load(Ordering::Relaxed),
        std::env::var_os("NO_COLOR").is_some(),
    )
}

fn print_json(value: &JsonVal) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("{} {}", error_prefix(), e),
    }
}

pub fn error_prefix() -> String {
    if use_colors("human") {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

fn paint(text: &str, color: bool, f: fn(&str) -> String) -> String {
    if color {
        f(text)
    } else {
        text.to_string()
    }
}

fn red(s: &str) -> String {
    s.red().bold().to_string()
}

fn yellow(s: &str) -> String {
    s.yellow().bold().to_string()
}

fn green(s: &str) -> String {
    s.green().bold().to_string()
}

fn bold(s: &str) -> String {
    s.bold().to_string()
}

/// Print resolved page options.
pub fn print_options(opts: &PageOptions, output: &str) {
    match output {
        "json" => print_json(&compose_options_json(opts)),
        _ => {
            let color = use_colors(output);
            for o in opts.iter() {
                let mut extras = Vec::new();
                if let Some(r) = o.max_diff_pixel_ratio {
                    extras.push(format!("ratio={}", r));
                }
                if let Some(p) = o.max_diff_pixels {
                    extras.push(format!("pixels={}", p));
                }
                if o.is_disabled() {
                    extras.push("disabled".to_string());
                }
                if o.runs_lighthouse() {
                    extras.push("lighthouse".to_string());
                }
                let url = o.url.as_deref().unwrap_or("(no url)");
                println!(
                    "{} {} {}",
                    paint(&format!("[{}]", o.index), color, bold),
                    url,
                    extras.join(" ")
                );
            }
            println!("— Summary — pages={}", opts.len());
        }
    }
}

/// Print accessibility results grouped by rule id.
pub fn print_a11y(audit: &A11yAudit, output: &str) {
    match output {
        "json" => print_json(&compose_a11y_json(audit)),
        _ => {
            let color = use_colors(output);
            for (id, g) in audit.groups.iter() {
                let impact = g.impact.as_deref().unwrap_or("unknown");
                println!(
                    "{} {} ❲{}❳ — {}",
                    paint("✖", color, red),
                    paint(id, color, bold),
                    impact,
                    g.description
                );
                for t in g.targets.iter() {
                    println!("    target: {}", t);
                }
                for u in g.urls.iter() {
                    println!("    url:    {}", u);
                }
            }
            let summary = format!(
                "— Summary — violations={} pages={} affected={}",
                audit.groups.len(),
                audit.pages_scanned,
                audit.complete.len()
            );
            println!("{}", paint(&summary, color, bold));
        }
    }
}

/// Print validation groups; failing types are marked as errors.
pub fn print_w3c(audit: &W3cAudit, fail_on: &[String], output: &str) {
    match output {
        "json" => print_json(&compose_w3c_json(audit, fail_on)),
        _ => {
            let color = use_colors(output);
            let failing = audit.failing_types(fail_on);
            for (kind, g) in audit.groups.iter() {
                let icon = if failing.contains(&kind) {
                    paint("✖", color, red)
                } else {
                    paint("▲", color, yellow)
                };
                println!("{} {}", icon, paint(kind, color, bold));
                for m in g.message.iter() {
                    println!("    message: {}", m);
                }
                for e in g.extract.iter() {
                    println!("    extract: {}", e.trim());
                }
                for u in g.urls.iter() {
                    println!("    url:     {}", u);
                }
            }
            let summary = format!(
                "— Summary — groups={} failing={} pages={} suppressed={}",
                audit.groups.len(),
                failing.len(),
                audit.pages_checked,
                audit.suppressed
            );
            println!("{}", paint(&summary, color, bold));
        }
    }
}

/// Print smoke-check and structured-data issues.
pub fn print_base(res: &CheckResult, output: &str) {
    match output {
        "json" => print_json(&compose_base_json(res)),
        _ => {
            let color = use_colors(output);
            for is in &res.issues {
                let sev = match is.severity.as_str() {
                    "error" => paint("⟦error⟧", color, red),
                    _ => paint("⟦warn⟧", color, yellow),
                };
                println!("{} {} ❲{}❳ — {}", sev, is.url, is.check, is.message);
            }
            let summary = format!(
                "— Summary — errors={} warnings={} checks={}",
                res.summary.errors, res.summary.warnings, res.summary.checks
            );
            println!("{}", paint(&summary, color, bold));
        }
    }
}

/// Print the visual-regression and Lighthouse plan.
pub fn print_plan(plan: &RunPlan, output: &str) {
    match output {
        "json" => print_json(&compose_plan_json(plan)),
        _ => {
            let color = use_colors(output);
            for s in &plan.snapshots {
                if s.skipped {
                    println!(
                        "{} [{}] {}",
                        paint("⏭️  skipped:", color, yellow),
                        s.index,
                        s.test_url
                    );
                    continue;
                }
                let mut tol = Vec::new();
                if let Some(r) = s.max_diff_pixel_ratio {
                    tol.push(format!("ratio={}", r));
                }
                if let Some(p) = s.max_diff_pixels {
                    tol.push(format!("pixels={}", p));
                }
                println!(
                    "{} [{}] {} -> {} {}",
                    paint("📸 snapshot:", color, green),
                    s.index,
                    s.test_url,
                    s.snapshot,
                    tol.join(" ")
                );
            }
            for l in &plan.lighthouse {
                let th: Vec<String> = l.thresholds.iter().map(|(k, v)| format!("{}>={}", k, v)).collect();
                println!(
                    "{} [{}] {} {}",
                    paint("🔦 lighthouse:", color, green),
                    l.index,
                    l.url,
                    th.join(" ")
                );
            }
        }
    }
}

/// Compose options JSON object (pure) for testing/snapshot purposes.
pub fn compose_options_json(opts: &PageOptions) -> JsonVal {
    let items: Vec<_> = opts.iter().collect();
    json!({"pages": items, "summary": {"pages": opts.len()}})
}

/// Compose a11y JSON object (pure) for testing/snapshot purposes.
pub fn compose_a11y_json(audit: &A11yAudit) -> JsonVal {
    json!({
        "violations": audit.groups,
        "summary": {
            "violations": audit.groups.len(),
            "pages": audit.pages_scanned,
            "affected": audit.complete.len(),
            "passed": audit.passed(),
        }
    })
}

/// Compose w3c JSON object (pure) for testing/snapshot purposes.
pub fn compose_w3c_json(audit: &W3cAudit, fail_on: &[String]) -> JsonVal {
    json!({
        "groups": audit.groups,
        "summary": {
            "groups": audit.groups.len(),
            "failing": audit.failing_types(fail_on),
            "pages": audit.pages_checked,
            "suppressed": audit.suppressed,
            "passed": audit.passed(fail_on),
        }
    })
}

/// Compose smoke-check JSON object (pure) for testing/snapshot purposes.
pub fn compose_base_json(res: &CheckResult) -> JsonVal {
    json!({"issues": res.issues, "summary": res.summary})
}

/// Compose plan JSON object (pure) for testing/snapshot purposes.
pub fn compose_plan_json(plan: &RunPlan) -> JsonVal {
    json!({
        "snapshots": plan.snapshots,
        "lighthouse": plan.lighthouse,
        "summary": {
            "snapshots": plan.active_snapshots(),
            "skipped": plan.snapshots.len() - plan.active_snapshots(),
            "lighthouse": plan.lighthouse.len(),
        }
    })
}
