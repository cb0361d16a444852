//! siteqa core library.
//!
//! This crate resolves per-page test options and folds accessibility and
//! HTML validation findings into deduplicated, grouped reports. Browser
//! driving, axe-core, the Nu HTML checker and Lighthouse stay outside; they
//! are reached through the collaborator traits in `a11y`, `w3c`, `fetch` and
//! `options`.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Environment snapshot, config discovery and effective settings.
//! - `options`: Page option resolution from env variables or a sitemap.
//! - `groups`: Deduplicating multi-map shared by the aggregators.
//! - `a11y`: Accessibility violation aggregation.
//! - `w3c`: HTML validation aggregation, suppression and heading check.
//! - `base`: Site smoke checks.
//! - `plan`: Visual-regression and Lighthouse plans.
//! - `structured`: JSON-LD structured data check.
//! - `fetch`: HTTP page and sitemap collaborators.
//! - `report`: Report artifacts on disk.
//! - `output`: Human/JSON printers.
//! - `paths`: Filename and URL helpers.
pub mod a11y;
pub mod base;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod groups;
pub mod logger;
pub mod models;
pub mod options;
pub mod output;
pub mod paths;
pub mod plan;
pub mod report;
pub mod structured;
pub mod w3c;
