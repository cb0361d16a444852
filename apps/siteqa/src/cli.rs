//! CLI argument parsing via `clap`.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "siteqa",
    version,
    about = "Website QA runner: page options, accessibility, HTML validation",
    long_about = "siteqa resolves per-page test options from indexed environment variables or a sitemap, aggregates accessibility and HTML validation findings into deduplicated reports, and runs site smoke checks.\n\nConfiguration precedence: CLI > siteqa.toml > defaults. Environment: .env overlaid by the process environment.",
    after_help = "Examples:\n  siteqa options --output json\n  siteqa a11y --results axe-results --reports reports\n  siteqa w3c\n  siteqa base\n  siteqa structured-data\n  siteqa plan --sitemap",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[arg(long, short, global = true, action = clap::ArgAction::SetTrue, help = "Debug logging")]
    pub verbose: bool,
    #[arg(long, short, global = true, conflicts_with = "verbose", action = clap::ArgAction::SetTrue, help = "Only log errors")]
    pub quiet: bool,
    #[arg(long, global = true, action = clap::ArgAction::SetTrue, help = "Disable colored logs")]
    pub no_color: bool,
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current siteqa version.")]
    Version,
    /// Print resolved page options
    #[command(
        about = "Print resolved page options",
        long_about = "Resolve KEY_URL_<n>, REGRESSION_*_<n> and LIGHTHOUSE_<n> variables (or the sitemap) into per-page options.",
        after_help = "Examples:\n  siteqa options\n  siteqa options --sitemap --output json"
    )]
    Options {
        #[arg(long, help = "Repository root (default: current dir)")]
        root: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Read pages from SITEMAP_URL")]
        sitemap: bool,
    },
    /// Aggregate accessibility scan results
    #[command(
        about = "Aggregate accessibility results",
        long_about = "Read axe-core results per page, group violations by rule id and write complete/compact reports. Exits 1 when any violation remains.",
        after_help = "Examples:\n  siteqa a11y --results axe-results\n  siteqa a11y --output json"
    )]
    A11y {
        #[arg(long, help = "Repository root (default: current dir)")]
        root: Option<String>,
        #[arg(long, help = "Directory with <page-slug>.json axe results")]
        results: Option<String>,
        #[arg(long, help = "Report output directory (default: reports)")]
        reports: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Read pages from SITEMAP_URL")]
        sitemap: bool,
    },
    /// Validate pages with the Nu HTML checker
    #[command(
        about = "Validate HTML of key pages",
        long_about = "Fetch TEST_W3C_URLS (or KEY_URLS) pages, check the heading count and submit the markup to W3C_URL. Exits 1 on error or heading groups.",
        after_help = "Examples:\n  siteqa w3c\n  siteqa w3c --output json"
    )]
    W3c {
        #[arg(long, help = "Repository root (default: current dir)")]
        root: Option<String>,
        #[arg(long, help = "Report output directory (default: reports)")]
        reports: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
    },
    /// Site smoke checks
    #[command(
        about = "Run site smoke checks",
        long_about = "Check the start page title, the 404 page, robots.txt and sitemap.xml on BASE_URL.",
        after_help = "Examples:\n  siteqa base"
    )]
    Base {
        #[arg(long, help = "Repository root (default: current dir)")]
        root: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
    },
    /// JSON-LD structured data check
    #[command(
        about = "Check structured data of a page",
        long_about = "Load BASE_URL + STRUCTURED_DATA_URL and require the first application/ld+json script to declare @type STRUCTURED_DATA_TYPE (default JobPosting).",
        after_help = "Examples:\n  siteqa structured-data\n  siteqa structured-data --output json"
    )]
    StructuredData {
        #[arg(long, help = "Repository root (default: current dir)")]
        root: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
    },
    /// Visual-regression and Lighthouse plan
    #[command(
        about = "Print the visual-regression and Lighthouse plan",
        long_about = "List snapshot names, tolerances and skipped pages for the screenshot runner, and the pages audited by Lighthouse.",
        after_help = "Examples:\n  siteqa plan --output json"
    )]
    Plan {
        #[arg(long, help = "Repository root (default: current dir)")]
        root: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Read pages from SITEMAP_URL")]
        sitemap: bool,
    },
}
