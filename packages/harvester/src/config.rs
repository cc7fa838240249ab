//! Configuration constants, validation functions and the resolved run
//! configuration for the harvester.

use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::error::{HarvesterError, Result};
use crate::retry::{Backoff, RetryPolicy};

/// Default terms that mark a table-of-contents entry as an ethics chapter.
pub const DEFAULT_ETHICS_TERMS: &[&str] = &[
    "ethic",
    "code of conduct",
    "conflict of interest",
    "conflicts of interest",
    "financial disclosure",
    "public officer",
    "standards of conduct",
    "professional conduct",
    "prohibited interest",
];

/// Default discretionary ("aspirational") phrases flagged for review.
pub const DEFAULT_DISCRETIONARY_TERMS: &[&str] = &[
    "strive",
    "shall endeavor",
    "aspire",
    "seek to",
    "best interest",
    "shall pursue",
    "commit to",
];

/// Delay between consecutive page loads, in milliseconds.
///
/// Hosting platforms rate limit aggressively; 2.5 seconds keeps a single
/// session under their thresholds.
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 2_500;

/// Retries after the first failed page load.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base delay for retry backoff (milliseconds).
pub const RETRY_BASE_DELAY_MS: u64 = 2_000;

/// Upper bound for a single retry delay (milliseconds).
pub const RETRY_MAX_DELAY_MS: u64 = 30_000;

/// Page load timeout in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

/// Timeout for a content selector to appear, in milliseconds.
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Browser-like user agent; several platforms reject unknown agents.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default directory for rendered documents and the run summary.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Default directory for cached municipality lists.
pub const DEFAULT_CACHE_DIR: &str = "cache";

/// Per-state municipality directory. `{state}` is replaced by the state code.
pub const DEFAULT_DIRECTORY_URL: &str = "https://www.generalcode.com/source-library/?state={state}";

/// State code pattern: two ASCII letters.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static STATE_CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{2}$").expect("valid regex"));

/// Validate and normalise a state code.
///
/// # Returns
/// * `Ok(code)` upper-cased
/// * `Err(HarvesterError::InvalidStateCode)` if not two letters
///
/// # Examples
/// ```
/// use ethics_harvester::config::validate_state_code;
///
/// assert_eq!(validate_state_code("ut").unwrap(), "UT");
/// assert!(validate_state_code("Utah").is_err());
/// ```
pub fn validate_state_code(state: &str) -> Result<String> {
    let trimmed = state.trim();
    if STATE_CODE_PATTERN.is_match(trimmed) {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err(HarvesterError::InvalidStateCode(state.to_string()))
    }
}

/// Build the directory URL for a state from a `{state}` template.
///
/// # Examples
/// ```
/// use ethics_harvester::config::directory_url;
///
/// assert_eq!(
///     directory_url("https://codes.example/?state={state}", "NY"),
///     "https://codes.example/?state=NY"
/// );
/// ```
#[must_use]
pub fn directory_url(template: &str, state: &str) -> String {
    template.replace("{state}", state)
}

/// Remove characters that are unsafe in file names.
///
/// Forbidden characters are dropped, spaces become underscores and the result
/// is capped at 100 characters.
///
/// # Examples
/// ```
/// use ethics_harvester::config::sanitize_filename;
///
/// assert_eq!(sanitize_filename("Salt Lake City"), "Salt_Lake_City");
/// assert_eq!(sanitize_filename("a/b:c*d?"), "abcd");
/// ```
#[must_use]
pub fn sanitize_filename(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .filter(|c| !c.is_control())
        .map(|c| if c == ' ' { '_' } else { c })
        .take(100)
        .collect()
}

/// Resolved configuration for one harvest run.
///
/// Constructed once (by the CLI or a test) and handed to the orchestrator.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// States to process, in order.
    pub states: Vec<String>,

    /// Stop after this many municipalities (across all states).
    pub limit: Option<usize>,

    /// Re-derive municipality lists even when a cached copy exists.
    pub force_recollect: bool,

    /// Retry policy for transient page-load failures.
    pub retry: RetryPolicy,

    /// Minimum delay between consecutive page loads.
    pub request_delay: Duration,

    /// Page load timeout.
    pub fetch_timeout: Duration,

    /// Timeout for content selectors to appear.
    pub wait_timeout: Duration,

    /// Terms that identify an ethics chapter title.
    pub ethics_terms: Vec<String>,

    /// Discretionary phrases to flag.
    pub discretionary_terms: Vec<String>,

    /// Where rendered documents and the run summary go.
    pub output_dir: PathBuf,

    /// Where municipality lists are cached.
    pub cache_dir: PathBuf,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            states: Vec::new(),
            limit: None,
            force_recollect: false,
            retry: RetryPolicy::new(
                DEFAULT_MAX_RETRIES,
                Backoff::Exponential {
                    base: Duration::from_millis(RETRY_BASE_DELAY_MS),
                    max: Duration::from_millis(RETRY_MAX_DELAY_MS),
                },
            ),
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            wait_timeout: Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS),
            ethics_terms: DEFAULT_ETHICS_TERMS.iter().map(|s| s.to_string()).collect(),
            discretionary_terms: DEFAULT_DISCRETIONARY_TERMS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

impl HarvestConfig {
    /// Create a configuration for the given states with default settings.
    pub fn for_states<I, S>(states: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::default().with_states(states)
    }

    /// Replace the state list. Codes are validated, upper-cased and
    /// de-duplicated keeping first occurrence.
    pub fn with_states<I, S>(mut self, states: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ordered: Vec<String> = Vec::new();
        for state in states {
            let code = validate_state_code(state.as_ref())?;
            if !ordered.contains(&code) {
                ordered.push(code);
            }
        }
        self.states = ordered;
        Ok(self)
    }

    #[must_use]
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn with_force_recollect(mut self, force: bool) -> Self {
        self.force_recollect = force;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_ethics_terms(mut self, terms: Vec<String>) -> Self {
        self.ethics_terms = terms;
        self
    }

    #[must_use]
    pub fn with_discretionary_terms(mut self, terms: Vec<String>) -> Self {
        self.discretionary_terms = terms;
        self
    }

    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Check the configuration before a run starts.
    pub fn validate(&self) -> Result<()> {
        if self.states.is_empty() {
            return Err(HarvesterError::InvalidConfig(
                "at least one state is required".to_string(),
            ));
        }
        if self.limit == Some(0) {
            return Err(HarvesterError::InvalidConfig(
                "limit must be greater than zero".to_string(),
            ));
        }
        if self.ethics_terms.iter().all(|t| t.trim().is_empty()) {
            return Err(HarvesterError::InvalidConfig(
                "ethics term list is empty".to_string(),
            ));
        }
        if self.fetch_timeout.is_zero() {
            return Err(HarvesterError::InvalidConfig(
                "fetch timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
