//! HTTP collaborators: page loading with consent-cookie injection and
//! sitemap retrieval.
//!
//! Requests are blocking and issued one at a time; a check awaits each page
//! before moving to the next.

use crate::config::Env;
use crate::error::{QaError, Result};
use crate::options::SitemapSource;
use reqwest::blocking::Client;
use reqwest::cookie::Jar;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// A loaded page: final status and body text.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl Fetched {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Loads pages for auditing.
pub trait PageSource {
    fn load(&self, url: &str) -> Result<Fetched>;
}

/// Consent cookie set before any navigation that must bypass the banner.
#[derive(Debug, Clone)]
pub struct ConsentCookie {
    pub name: String,
    pub value: String,
    /// URL whose domain receives the cookie.
    pub url: String,
}

impl ConsentCookie {
    /// `COOKIE_NAME` with `value_var` for the domain of `url_var`.
    ///
    /// `None` when any of the three is unset; the run then proceeds without
    /// consent and the banner stays in the markup.
    pub fn from_env(env: &Env, value_var: &str, url_var: &str) -> Option<Self> {
        Some(Self {
            name: env.non_empty("COOKIE_NAME")?.to_string(),
            value: env.non_empty(value_var)?.to_string(),
            url: env.non_empty(url_var)?.to_string(),
        })
    }
}

/// Blocking HTTP client shared by the page and sitemap collaborators.
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(cookie: Option<&ConsentCookie>, timeout: Option<Duration>) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        if let Some(c) = cookie {
            let url = Url::parse(&c.url).map_err(|source| QaError::Url {
                url: c.url.clone(),
                source,
            })?;
            jar.add_cookie_str(&format!("{}={}; Path=/", c.name, c.value), &url);
            tracing::debug!(name = %c.name, domain = url.host_str().unwrap_or(""), "consent cookie set");
        }
        let mut builder = Client::builder()
            .cookie_provider(jar)
            .user_agent(concat!("siteqa/", env!("CARGO_PKG_VERSION")));
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().map_err(|e| QaError::PageFetch {
            url: String::new(),
            reason: format!("http client setup failed: {}", e),
        })?;
        Ok(Self { client })
    }
}

impl PageSource for HttpClient {
    fn load(&self, url: &str) -> Result<Fetched> {
        let fail = |e: reqwest::Error| QaError::PageFetch {
            url: url.to_string(),
            reason: e.to_string(),
        };
        tracing::debug!(url, "loading page");
        let resp = self.client.get(url).send().map_err(fail)?;
        let status = resp.status().as_u16();
        let body = resp.text().map_err(fail)?;
        Ok(Fetched {
            url: url.to_string(),
            status,
            body,
        })
    }
}

impl SitemapSource for HttpClient {
    fn fetch_sitemap(&self, url: &str) -> Result<String> {
        let fail = |reason: String| QaError::SitemapFetch {
            url: url.to_string(),
            reason,
        };
        let resp = self.client.get(url).send().map_err(|e| fail(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(fail(format!("status {}", resp.status())));
        }
        resp.text().map_err(|e| fail(e.to_string()))
    }
}
