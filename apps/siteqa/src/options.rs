//! Per-page option resolution.
//!
//! Pages are configured either through indexed environment variables
//! (`KEY_URL_<n>`, `REGRESSION_RATIO_<n>`, ...) or through a remote sitemap.
//! Both sources produce `PageOptions`: an ordered map from a stable index to
//! the page's settings. Consumers look pages up by index; iteration order is
//! the order in which indices were first seen and carries no other meaning.

use crate::config::Env;
use crate::error::{QaError, Result};
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Settings for one tested page.
pub struct PageOption {
    pub index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_diff_pixel_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_diff_pixels: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lighthouse: Option<bool>,
}

impl PageOption {
    pub fn is_disabled(&self) -> bool {
        self.disabled.unwrap_or(false)
    }

    pub fn runs_lighthouse(&self) -> bool {
        self.lighthouse.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct PageOptions(IndexMap<u32, PageOption>);

impl PageOptions {
    pub fn get(&self, index: u32) -> Option<&PageOption> {
        self.0.get(&index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageOption> {
        self.0.values()
    }

    /// Pages that carry a URL; pages without one are skipped by every check.
    pub fn with_url(&self) -> impl Iterator<Item = (&PageOption, &str)> {
        self.0
            .values()
            .filter_map(|o| o.url.as_deref().map(|u| (o, u)))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn entry(&mut self, index: u32) -> &mut PageOption {
        self.0.entry(index).or_insert_with(|| PageOption {
            index,
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Url,
    Ratio,
    Pixels,
    Disabled,
    Lighthouse,
}

const PREFIXES: [(&str, Field); 5] = [
    ("KEY_URL_", Field::Url),
    ("REGRESSION_RATIO_", Field::Ratio),
    ("REGRESSION_PIXEL_", Field::Pixels),
    ("REGRESSION_DISABLED_", Field::Disabled),
    ("LIGHTHOUSE_", Field::Lighthouse),
];

/// Split `name` into its field and numeric index suffix when it is a
/// recognized option key.
fn classify(name: &str) -> Option<(Field, &str)> {
    PREFIXES.iter().find_map(|(prefix, field)| {
        let suffix = name.strip_prefix(prefix)?;
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            tracing::debug!(name, "ignoring option key without numeric index");
            return None;
        }
        Some((*field, suffix))
    })
}

fn invalid(key: &str, value: &str, expected: &'static str) -> QaError {
    QaError::InvalidOption {
        key: key.to_string(),
        value: value.to_string(),
        expected,
    }
}

/// Build page options from the indexed environment variables.
pub fn from_env(env: &Env) -> Result<PageOptions> {
    let mut opts = PageOptions::default();
    for (key, value) in env.iter() {
        let Some((field, suffix)) = classify(key) else {
            continue;
        };
        let index = suffix
            .parse::<u32>()
            .map_err(|_| invalid(key, suffix, "page index"))?;
        let opt = opts.entry(index);
        match field {
            Field::Url => opt.url = Some(value.to_string()),
            Field::Ratio => {
                let ratio = value
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|r| r.is_finite())
                    .ok_or_else(|| invalid(key, value, "number"))?;
                opt.max_diff_pixel_ratio = Some(ratio);
            }
            Field::Pixels => {
                let pixels = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| invalid(key, value, "non-negative integer"))?;
                opt.max_diff_pixels = Some(pixels);
            }
            Field::Disabled => opt.disabled = Some(!value.is_empty()),
            Field::Lighthouse => opt.lighthouse = Some(!value.is_empty()),
        }
    }
    tracing::debug!(pages = opts.len(), "resolved page options from environment");
    Ok(opts)
}

/// Fetches sitemap documents.
pub trait SitemapSource {
    fn fetch_sitemap(&self, url: &str) -> Result<String>;
}

/// Extract `urlset/url/loc` values in document order (first `loc` per `url`).
pub fn parse_sitemap(url: &str, xml: &str) -> Result<Vec<String>> {
    let doc = roxmltree::Document::parse(xml).map_err(|source| QaError::SitemapParse {
        url: url.to_string(),
        source,
    })?;
    let root = doc.root_element();
    if root.tag_name().name() != "urlset" {
        return Err(QaError::SitemapFormat {
            url: url.to_string(),
            root: root.tag_name().name().to_string(),
        });
    }
    let locs = root
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "url")
        .filter_map(|entry| {
            entry
                .children()
                .find(|n| n.is_element() && n.tag_name().name() == "loc")
                .and_then(|loc| loc.text())
                .map(|t| t.trim().to_string())
        })
        .filter(|loc| !loc.is_empty())
        .collect();
    Ok(locs)
}

/// Build page options from a sitemap: indices `0..n` in document order, URL only.
pub fn from_sitemap(source: &dyn SitemapSource, url: &str) -> Result<PageOptions> {
    let xml = source.fetch_sitemap(url)?;
    let mut opts = PageOptions::default();
    for (i, loc) in parse_sitemap(url, &xml)?.into_iter().enumerate() {
        // Sitemaps beyond u32::MAX entries are not a realistic input.
        let index = u32::try_from(i).unwrap_or(u32::MAX);
        opts.entry(index).url = Some(loc);
    }
    tracing::info!(url, pages = opts.len(), "resolved page options from sitemap");
    Ok(opts)
}

/// Pick the source: the sitemap when forced or `TESTFROMSITEMAP` is set,
/// the environment otherwise.
pub fn resolve(env: &Env, force_sitemap: bool, sitemap: &dyn SitemapSource) -> Result<PageOptions> {
    if force_sitemap || env.flag("TESTFROMSITEMAP") {
        let url = env.require("SITEMAP_URL")?;
        from_sitemap(sitemap, url)
    } else {
        from_env(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSitemap(&'static str);

    impl SitemapSource for FixedSitemap {
        fn fetch_sitemap(&self, _url: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingSitemap;

    impl SitemapSource for FailingSitemap {
        fn fetch_sitemap(&self, url: &str) -> Result<String> {
            Err(QaError::SitemapFetch {
                url: url.to_string(),
                reason: "connection refused".into(),
            })
        }
    }

    const SITEMAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://example.org/</loc><lastmod>2024-01-01</lastmod></url>
  <url><loc> https://example.org/team/ </loc></url>
  <url><lastmod>2024-01-01</lastmod></url>
  <url><loc>https://example.org/contact</loc><loc>https://example.org/ignored</loc></url>
</urlset>"#;

    #[test]
    fn test_indexed_keys_land_on_their_index_only() {
        let env = Env::from_pairs([
            ("KEY_URL_3", "/foo"),
            ("REGRESSION_PIXEL_3", "50"),
            ("PATH", "/usr/bin"),
        ]);
        let opts = from_env(&env).unwrap();
        assert_eq!(opts.len(), 1);
        let o = opts.get(3).unwrap();
        assert_eq!(o.url.as_deref(), Some("/foo"));
        assert_eq!(o.max_diff_pixels, Some(50));
        assert_eq!(o.max_diff_pixel_ratio, None);
        assert!(opts.get(0).is_none());
    }

    #[test]
    fn test_all_fields_and_boolean_semantics() {
        let env = Env::from_pairs([
            ("KEY_URL_1", "/a"),
            ("REGRESSION_RATIO_1", "0.02"),
            ("REGRESSION_DISABLED_1", "yes"),
            ("LIGHTHOUSE_1", "1"),
            ("KEY_URL_2", "/b"),
            ("REGRESSION_DISABLED_2", ""),
        ]);
        let opts = from_env(&env).unwrap();
        let a = opts.get(1).unwrap();
        assert_eq!(a.max_diff_pixel_ratio, Some(0.02));
        assert!(a.is_disabled());
        assert!(a.runs_lighthouse());
        let b = opts.get(2).unwrap();
        assert_eq!(b.disabled, Some(false));
        assert!(!b.runs_lighthouse());
    }

    #[test]
    fn test_options_without_url_are_kept_but_skipped_by_with_url() {
        let env = Env::from_pairs([("KEY_URL_0", "/a"), ("REGRESSION_PIXEL_7", "5")]);
        let opts = from_env(&env).unwrap();
        assert_eq!(opts.len(), 2);
        let urls: Vec<_> = opts.with_url().map(|(_, u)| u).collect();
        assert_eq!(urls, vec!["/a"]);
    }

    #[test]
    fn test_unrecognized_and_non_numeric_keys_are_ignored() {
        let env = Env::from_pairs([
            ("KEY_URLS", "/a,/b"),
            ("KEY_URL_X", "/x"),
            ("KEY_URL_", "/empty"),
            ("LIGHTHOUSE", "1"),
        ]);
        assert!(from_env(&env).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_numbers_are_errors() {
        let env = Env::from_pairs([("REGRESSION_PIXEL_1", "many")]);
        let err = from_env(&env).unwrap_err();
        assert!(
            matches!(err, QaError::InvalidOption { ref key, .. } if key == "REGRESSION_PIXEL_1")
        );
        let env = Env::from_pairs([("REGRESSION_RATIO_1", "NaN")]);
        assert!(from_env(&env).is_err());
    }

    #[test]
    fn test_index_beyond_u32_is_an_error() {
        let env = Env::from_pairs([("KEY_URL_99999999999", "/far")]);
        let err = from_env(&env).unwrap_err();
        assert!(matches!(
            err,
            QaError::InvalidOption { ref key, expected: "page index", .. } if key == "KEY_URL_99999999999"
        ));
    }

    #[test]
    fn test_sitemap_assigns_sequential_indices() {
        let opts = from_sitemap(&FixedSitemap(SITEMAP), "https://example.org/sitemap.xml").unwrap();
        let urls: Vec<_> = opts.iter().map(|o| (o.index, o.url.clone().unwrap())).collect();
        assert_eq!(
            urls,
            vec![
                (0, "https://example.org/".to_string()),
                (1, "https://example.org/team/".to_string()),
                (2, "https://example.org/contact".to_string()),
            ]
        );
        assert!(opts.iter().all(|o| o.max_diff_pixels.is_none()));
    }

    #[test]
    fn test_malformed_sitemap_is_an_error() {
        let err = from_sitemap(&FixedSitemap("<urlset><url>"), "s").unwrap_err();
        assert!(matches!(err, QaError::SitemapParse { .. }));
        assert!(matches!(
            from_sitemap(&FailingSitemap, "s").unwrap_err(),
            QaError::SitemapFetch { .. }
        ));
    }

    #[test]
    fn test_sitemap_index_is_rejected() {
        let index = r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://example.org/sitemap-pages.xml</loc></sitemap>
</sitemapindex>"#;
        let err = from_sitemap(&FixedSitemap(index), "https://example.org/sitemap.xml").unwrap_err();
        assert!(matches!(err, QaError::SitemapFormat { ref root, .. } if root == "sitemapindex"));
    }

    #[test]
    fn test_resolve_selects_source_by_flag() {
        let env = Env::from_pairs([
            ("TESTFROMSITEMAP", "1"),
            ("SITEMAP_URL", "https://example.org/sitemap.xml"),
            ("KEY_URL_9", "/env"),
        ]);
        let opts = resolve(&env, false, &FixedSitemap(SITEMAP)).unwrap();
        assert_eq!(opts.len(), 3);
        assert!(opts.get(9).is_none());

        let env = Env::from_pairs([("KEY_URL_9", "/env")]);
        let opts = resolve(&env, false, &FailingSitemap).unwrap();
        assert_eq!(opts.get(9).unwrap().url.as_deref(), Some("/env"));

        let err = resolve(&env, true, &FixedSitemap(SITEMAP)).unwrap_err();
        assert!(matches!(err, QaError::MissingVar(ref k) if k == "SITEMAP_URL"));
    }
}
