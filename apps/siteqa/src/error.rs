//! Error types shared by the resolver, the collaborators, and the report writers.
//!
//! Every failure that aborts a check is a `QaError`. Findings (violations,
//! validator messages, failed smoke checks) are not errors; they are folded
//! into the aggregators and decide the exit code afterwards.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QaError {
    /// A config file exists but could not be read or parsed.
    #[error("invalid config '{path}': {reason}")]
    Config { path: PathBuf, reason: String },

    /// A required environment variable is missing or empty.
    #[error("environment variable {0} is not set")]
    MissingVar(String),

    /// An indexed option value could not be converted to its field type.
    #[error("invalid value for {key}: '{value}' is not a valid {expected}")]
    InvalidOption {
        key: String,
        value: String,
        expected: &'static str,
    },

    /// The sitemap could not be fetched.
    #[error("failed to fetch sitemap '{url}': {reason}")]
    SitemapFetch { url: String, reason: String },

    /// The sitemap document is not well-formed XML.
    #[error("sitemap '{url}' is not well-formed: {source}")]
    SitemapParse {
        url: String,
        #[source]
        source: roxmltree::Error,
    },

    /// The sitemap parsed but is not a `<urlset>` (e.g. a sitemap index).
    #[error("sitemap '{url}' has root <{root}>, expected <urlset>")]
    SitemapFormat { url: String, root: String },

    /// A URL could not be parsed or joined onto the base URL.
    #[error("invalid url '{url}': {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Loading a page for auditing failed.
    #[error("failed to load '{url}': {reason}")]
    PageFetch { url: String, reason: String },

    /// The HTML validator could not be reached or answered garbage.
    #[error("html validator at '{endpoint}' failed: {reason}")]
    Validator { endpoint: String, reason: String },

    /// Accessibility scan results for a page are missing or malformed.
    #[error("accessibility results for '{url}' unavailable: {reason}")]
    ScanResults { url: String, reason: String },

    /// The configured heading selector is not valid CSS.
    #[error("invalid css selector '{0}'")]
    Selector(String),

    /// A suppression rule carries an invalid regular expression.
    #[error("invalid ignore pattern '{pattern}': {source}")]
    IgnorePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Writing a report artifact failed.
    #[error("failed to write report '{path}': {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, QaError>;
