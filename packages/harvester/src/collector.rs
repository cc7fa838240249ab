//! Derivation of per-state municipality lists.
//!
//! The collector reads a directory page that links each municipality's
//! hosted code and keeps the links whose platform the classifier
//! recognises.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::Selector;

use crate::config::{directory_url, DEFAULT_DIRECTORY_URL};
use crate::error::{FetchError, HarvesterError, Result};
use crate::fetch::{LoadOptions, PageFetcher};
use crate::html;
use crate::platform::classify;
use crate::retry::{retry, RetryError, RetryPolicy};
use crate::types::{slugify, Municipality, PlatformTag};

/// Source of municipality lists, one state at a time.
pub trait MunicipalityCollector {
    /// Derive the current list of municipalities for a state.
    fn collect(&mut self, state: &str) -> Result<Vec<Municipality>>;
}

#[allow(clippy::expect_used)] // Static selector that is guaranteed to be valid
static DIRECTORY_LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Trailing "- Code of Ordinances", "- Code" and similar.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static CODE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*-\s*code.*$").expect("valid regex"));

/// Trailing "Municipal Code", "City Code", "Code of Ordinances".
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static NAMED_CODE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(municipal code|city code|code of ordinances|revised ordinances).*$")
        .expect("valid regex")
});

/// Trailing ", NY" and whatever follows.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static STATE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*,\s*[A-Z]{2}\b.*$").expect("valid regex"));

/// Leading "City of ".
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static CITY_OF_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^city of\s+").expect("valid regex"));

/// Clean a directory link text into a municipality name.
///
/// # Examples
/// ```
/// use ethics_harvester::collector::clean_municipality_name;
///
/// assert_eq!(clean_municipality_name("Provo - Code of Ordinances"), "Provo");
/// assert_eq!(clean_municipality_name("City of Orem, UT"), "Orem");
/// assert_eq!(clean_municipality_name("Sandy City Code"), "Sandy");
/// ```
#[must_use]
pub fn clean_municipality_name(text: &str) -> String {
    let text = html::normalize_text(text);
    let text = CODE_SUFFIX.replace(&text, "");
    let text = NAMED_CODE_SUFFIX.replace(&text, "");
    let text = STATE_SUFFIX.replace(&text, "");
    let text = CITY_OF_PREFIX.replace(&text, "");
    text.trim().to_string()
}

/// Whether a name denotes a county ("Utah County") rather than a
/// municipality. "County of X" names are kept.
///
/// # Examples
/// ```
/// use ethics_harvester::collector::is_county;
///
/// assert!(is_county("Utah County"));
/// assert!(!is_county("County of Los Alamos"));
/// assert!(!is_county("Provo"));
/// ```
#[must_use]
pub fn is_county(name: &str) -> bool {
    let lower = name.to_lowercase();
    if !lower.contains("county") || lower.starts_with("county of") {
        return false;
    }
    lower.ends_with("county") || lower.contains(" county")
}

/// Collects municipalities from a per-state directory page.
pub struct DirectoryCollector<F: PageFetcher> {
    fetcher: F,
    url_template: String,
    load_options: LoadOptions,
    retry: RetryPolicy,
}

impl<F: PageFetcher> DirectoryCollector<F> {
    /// Create a collector using the default directory.
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            url_template: DEFAULT_DIRECTORY_URL.to_string(),
            load_options: LoadOptions::default(),
            retry: RetryPolicy::none(),
        }
    }

    /// Use a different directory. `{state}` is replaced by the state code.
    #[must_use]
    pub fn with_url_template(mut self, template: impl Into<String>) -> Self {
        self.url_template = template.into();
        self
    }

    #[must_use]
    pub fn with_load_options(mut self, options: LoadOptions) -> Self {
        self.load_options = options;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Turn directory links into municipalities.
///
/// Links are taken in document order. In-page and same-host links,
/// unrecognised platforms and counties are skipped; the first link for
/// an id wins.
pub fn parse_directory(state: &str, page_url: &str, page_html: &str) -> Vec<Municipality> {
    let parsed = scraper::Html::parse_document(page_html);
    let own_host = html::host_of(page_url);
    let mut seen: HashSet<String> = HashSet::new();
    let mut municipalities = Vec::new();

    for link in parsed.select(&DIRECTORY_LINKS) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if href.trim_start().starts_with('#') {
            continue;
        }
        let Some(url) = html::resolve_url(page_url, href) else {
            continue;
        };
        if own_host.is_some() && html::host_of(&url) == own_host {
            continue;
        }

        let platform = classify(&url);
        if platform == PlatformTag::Unknown {
            continue;
        }

        let name = clean_municipality_name(&html::text_of(link));
        if name.is_empty() || is_county(&name) {
            continue;
        }

        let id = format!("{state}-{}", slugify(&name));
        if !seen.insert(id.clone()) {
            tracing::debug!(id = %id, url = %url, "Duplicate municipality link skipped");
            continue;
        }

        municipalities.push(Municipality::new(id, name, state, url).with_platform(platform));
    }

    municipalities
}

impl<F: PageFetcher> MunicipalityCollector for DirectoryCollector<F> {
    fn collect(&mut self, state: &str) -> Result<Vec<Municipality>> {
        let url = directory_url(&self.url_template, state);
        tracing::info!(state, url = %url, "Collecting municipalities");

        let load_options = self.load_options;
        let fetcher = &mut self.fetcher;
        let document = retry(
            &self.retry,
            |_| fetcher.load_page(&url, &load_options),
            FetchError::is_transient,
        )
        .map_err(|e| match e {
            RetryError::Exhausted { attempts, last } => HarvesterError::RetriesExhausted {
                attempts,
                message: last.to_string(),
            },
            RetryError::Permanent { error, .. } => HarvesterError::Fetch(error),
        })?;

        let municipalities = parse_directory(state, &document.url, &document.html);
        tracing::info!(state, count = municipalities.len(), "Collected municipalities");
        Ok(municipalities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DIRECTORY: &str = r##"<html><body>
        <nav><a href="#main">Skip to content</a><a href="/source-library/">Library</a></nav>
        <ul>
          <li><a href="https://provo.municipal.codes/">Provo - Code of Ordinances</a></li>
          <li><a href="https://library.municode.com/ut/sandy">Sandy City Code</a></li>
          <li><a href="https://ecode360.com/UT1234">Town of Alta, UT</a></li>
          <li><a href="https://library.municode.com/ut/utah_county">Utah County</a></li>
          <li><a href="https://example.org/bountiful">Bountiful</a></li>
          <li><a href="https://provo.municipal.codes/Code">Provo</a></li>
        </ul>
    </body></html>"##;

    #[test]
    fn test_parse_directory() {
        let found = parse_directory(
            "UT",
            "https://www.generalcode.com/source-library/?state=UT",
            DIRECTORY,
        );
        let ids: Vec<&str> = found.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["UT-provo", "UT-sandy", "UT-town-of-alta"]);
        assert_eq!(found[0].platform_tag, Some(PlatformTag::GeneralCode));
        assert_eq!(found[2].platform_tag, Some(PlatformTag::Ecode360));
        assert_eq!(found[1].source_url, "https://library.municode.com/ut/sandy");
        assert!(found.iter().all(|m| m.state == "UT"));
    }

    #[test]
    fn test_clean_municipality_name() {
        assert_eq!(clean_municipality_name("  Logan   City Code "), "Logan");
        assert_eq!(clean_municipality_name("Malta, NY - Code"), "Malta");
        assert_eq!(clean_municipality_name("Park City"), "Park City");
    }

    #[test]
    fn test_is_county() {
        assert!(is_county("Salt Lake County"));
        assert!(is_county("Salt Lake County Code"));
        assert!(!is_county("County of Santa Fe"));
        assert!(!is_county("Countyville"));
    }
}
