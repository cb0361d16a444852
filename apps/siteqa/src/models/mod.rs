//! Shared data models for smoke-check results.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
/// A single failed or noteworthy check with severity and location.
pub struct Issue {
    pub check: String,
    pub url: String,
    pub severity: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
/// Aggregated counts used by printers and for the exit code.
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
    pub checks: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
/// Smoke-check results container.
pub struct CheckResult {
    pub issues: Vec<Issue>,
    pub summary: Summary,
}

impl CheckResult {
    /// Count a check; a failing one contributes its issue.
    pub fn push(&mut self, issue: Option<Issue>) {
        self.summary.checks += 1;
        if let Some(is) = issue {
            match is.severity.as_str() {
                "error" => self.summary.errors += 1,
                _ => self.summary.warnings += 1,
            }
            self.issues.push(is);
        }
    }
}
