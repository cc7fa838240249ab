//! Shared helpers for the integration tests: an in-memory page fetcher, a
//! renderer that records what it was given, and fixture loading.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ethics_harvester::harvester::Sleeper;
use ethics_harvester::{
    Backoff, ChapterMetadata, ContentBlock, Document, FetchError, HarvestConfig, LoadOptions,
    PageFetcher, RenderError, Renderer, RetryPolicy,
};

/// Load fixture file content.
pub fn load_fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to load {}: {}", path.display(), e))
}

/// URLs requested from a [`ScriptedFetcher`], in order.
#[derive(Debug, Clone, Default)]
pub struct LoadLog(Arc<Mutex<Vec<String>>>);

impl LoadLog {
    pub fn urls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

/// Serves pages from memory.
///
/// Unknown URLs fail as blocked (404) so they are never retried.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    pages: HashMap<String, String>,
    transient_failures: HashMap<String, u32>,
    blocked: HashSet<String>,
    current: Option<Document>,
    log: LoadLog,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), html.into());
        self
    }

    /// Time out the first `times` loads of `url`.
    pub fn failing(mut self, url: &str, times: u32) -> Self {
        self.transient_failures.insert(url.to_string(), times);
        self
    }

    /// Answer every load of `url` with a 403.
    pub fn blocked(mut self, url: &str) -> Self {
        self.blocked.insert(url.to_string());
        self
    }

    pub fn log(&self) -> LoadLog {
        self.log.clone()
    }
}

impl PageFetcher for ScriptedFetcher {
    fn load_page(&mut self, url: &str, _options: &LoadOptions) -> Result<Document, FetchError> {
        self.log.0.lock().unwrap().push(url.to_string());

        if let Some(remaining) = self.transient_failures.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                });
            }
        }
        if self.blocked.contains(url) {
            return Err(FetchError::Blocked {
                url: url.to_string(),
                status: 403,
            });
        }
        let Some(html) = self.pages.get(url) else {
            return Err(FetchError::Blocked {
                url: url.to_string(),
                status: 404,
            });
        };

        let document = Document::new(url, html.clone());
        self.current = Some(document.clone());
        Ok(document)
    }

    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), FetchError> {
        match &self.current {
            Some(document) if document.has_selector(selector) => Ok(()),
            _ => Err(FetchError::SelectorTimeout {
                selector: selector.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }
}

/// One call to [`RecordingRenderer::render`].
#[derive(Debug, Clone)]
pub struct Rendered {
    pub metadata: ChapterMetadata,
    pub blocks: Vec<ContentBlock>,
}

/// Records rendered chapters instead of writing documents.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    rendered: Arc<Mutex<Vec<Rendered>>>,
    fail: bool,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A renderer that rejects every chapter.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn rendered(&self) -> Vec<Rendered> {
        self.rendered.lock().unwrap().clone()
    }
}

impl Renderer for RecordingRenderer {
    fn render(
        &mut self,
        metadata: &ChapterMetadata,
        blocks: &[ContentBlock],
    ) -> Result<PathBuf, RenderError> {
        if self.fail {
            return Err(RenderError::new(&metadata.chapter.title, "disk full"));
        }
        self.rendered.lock().unwrap().push(Rendered {
            metadata: metadata.clone(),
            blocks: blocks.to_vec(),
        });
        Ok(PathBuf::from(format!("{}_{}.html", metadata.municipality, metadata.state)))
    }
}

/// A Utah configuration with no request spacing and zero backoff.
pub fn test_config(dir: &Path, max_retries: u32) -> HarvestConfig {
    HarvestConfig::for_states(["UT"])
        .unwrap()
        .with_retry(RetryPolicy::new(max_retries, Backoff::Fixed(Duration::ZERO)))
        .with_request_delay(Duration::ZERO)
        .with_output_dir(dir.join("output"))
        .with_cache_dir(dir.join("cache"))
}

/// A sleeper that only counts how often it was asked to sleep.
pub fn counting_sleeper() -> (Sleeper, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let sleeper: Sleeper = Arc::new(move |_: Duration| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (sleeper, count)
}
