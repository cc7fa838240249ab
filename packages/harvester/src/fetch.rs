//! Page loading.
//!
//! Extractors never talk to the network themselves. The orchestrator loads
//! pages through a [`PageFetcher`] and hands the resulting [`Document`] to
//! the extractor, so the same extractors run against a live session or a
//! scripted one in tests.

use std::time::Duration;

use reqwest::blocking::Client;
use scraper::{Html, Selector};

use crate::config::{DEFAULT_FETCH_TIMEOUT_SECS, USER_AGENT};
use crate::error::{FetchError, Result};

/// Options for a single page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub timeout: Duration,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

/// A loaded page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Final URL after redirects; relative links resolve against it.
    pub url: String,
    pub html: String,
}

impl Document {
    #[must_use]
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }

    /// Parse the page into a DOM tree.
    #[must_use]
    pub fn parse(&self) -> Html {
        Html::parse_document(&self.html)
    }

    /// Whether any element matches the CSS selector. Invalid selectors never
    /// match.
    #[must_use]
    pub fn has_selector(&self, selector: &str) -> bool {
        match Selector::parse(selector) {
            Ok(sel) => self.parse().select(&sel).next().is_some(),
            Err(_) => false,
        }
    }
}

/// A page-loading session.
///
/// Implementations keep the most recently loaded page as their current page;
/// `wait_for` applies to that page.
pub trait PageFetcher {
    /// Load a page.
    fn load_page(&mut self, url: &str, options: &LoadOptions)
        -> std::result::Result<Document, FetchError>;

    /// Wait until `selector` is present on the current page.
    fn wait_for(&mut self, selector: &str, timeout: Duration)
        -> std::result::Result<(), FetchError>;
}

impl<T: PageFetcher + ?Sized> PageFetcher for Box<T> {
    fn load_page(
        &mut self,
        url: &str,
        options: &LoadOptions,
    ) -> std::result::Result<Document, FetchError> {
        (**self).load_page(url, options)
    }

    fn wait_for(&mut self, selector: &str, timeout: Duration) -> std::result::Result<(), FetchError> {
        (**self).wait_for(selector, timeout)
    }
}

/// Create a configured HTTP client.
///
/// # Returns
/// A `reqwest::blocking::Client` with the harvester's user agent and the
/// default timeout. Individual loads may override the timeout.
pub fn create_client() -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// [`PageFetcher`] over plain HTTP.
///
/// Serves pages as delivered by the server; content that only appears after
/// client-side scripting ran is not visible to it.
pub struct HttpFetcher {
    client: Client,
    current: Option<Document>,
}

impl HttpFetcher {
    /// Create a fetcher with a fresh client.
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(create_client()?))
    }

    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            current: None,
        }
    }
}

impl PageFetcher for HttpFetcher {
    fn load_page(
        &mut self,
        url: &str,
        options: &LoadOptions,
    ) -> std::result::Result<Document, FetchError> {
        tracing::debug!(url, timeout_secs = options.timeout.as_secs(), "Loading page");

        let response = self
            .client
            .get(url)
            .timeout(options.timeout)
            .send()
            .map_err(|e| request_error(url, &e))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        // 4xx will not succeed on retry (bot protection, missing pages)
        if status.is_client_error() {
            return Err(FetchError::Blocked {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let html = response.text().map_err(|e| request_error(url, &e))?;
        let document = Document::new(final_url, html);
        self.current = Some(document.clone());
        Ok(document)
    }

    fn wait_for(&mut self, selector: &str, timeout: Duration) -> std::result::Result<(), FetchError> {
        // Static HTML does not change after delivery, so one check suffices.
        let present = self
            .current
            .as_ref()
            .is_some_and(|doc| doc.has_selector(selector));
        if present {
            Ok(())
        } else {
            Err(FetchError::SelectorTimeout {
                selector: selector.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }
}

fn request_error(url: &str, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
