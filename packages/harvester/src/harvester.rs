//! Orchestrator that ties all components together.
//!
//! One municipality is processed start to finish before the next begins:
//! classify, resolve an extractor, load the table of contents, locate the
//! ethics chapter, load and extract it, detect discretionary language,
//! render, record. Every branch ends in exactly one [`ScrapeResult`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::cache::CollectionCache;
use crate::collector::MunicipalityCollector;
use crate::config::HarvestConfig;
use crate::error::{FetchError, HarvesterError, Result};
use crate::fetch::{Document, LoadOptions, PageFetcher};
use crate::html::without_fragment;
use crate::platform::classify;
use crate::progress::{ProgressTracker, RunObserver};
use crate::registry::{create_platform_registry, ParserRegistry};
use crate::render::Renderer;
use crate::retry::{retry_with, RetryError, RetryPolicy};
use crate::summary::{write_summary, write_view, ReportView, RunReport};
use crate::terms::TermMatcher;
use crate::types::{ChapterMetadata, ChapterRef, Municipality, PlatformTag, ScrapeResult};

/// Shared flag asking a run to stop at the next municipality boundary.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Sleep function used for request spacing and retry backoff.
pub type Sleeper = Arc<dyn Fn(Duration) + Send + Sync>;

/// Page loads with request spacing, readiness waits and bounded retry.
struct Session<F> {
    fetcher: F,
    retry: RetryPolicy,
    request_delay: Duration,
    load_options: LoadOptions,
    wait_timeout: Duration,
    last_request: Option<Instant>,
    sleeper: Sleeper,
    stop: StopSignal,
}

impl<F: PageFetcher> Session<F> {
    /// Load `url`, then wait for `ready` if given. Transient failures are
    /// retried per the policy; a stop signal ends the retries early.
    fn load(&mut self, url: &str, ready: Option<&str>) -> Result<Document> {
        let Self {
            fetcher,
            retry,
            request_delay,
            load_options,
            wait_timeout,
            last_request,
            sleeper,
            stop,
        } = self;
        let sleep: &(dyn Fn(Duration) + Send + Sync) = &**sleeper;

        let outcome = retry_with(
            retry,
            sleep,
            |attempt| -> std::result::Result<Document, FetchError> {
                if let Some(last) = *last_request {
                    let elapsed = last.elapsed();
                    if elapsed < *request_delay {
                        sleep(*request_delay - elapsed);
                    }
                }
                tracing::debug!(url, attempt, "Loading page");
                let loaded = fetcher.load_page(url, load_options);
                *last_request = Some(Instant::now());
                let document = loaded?;
                if let Some(selector) = ready {
                    fetcher.wait_for(selector, *wait_timeout)?;
                }
                Ok(document)
            },
            |error: &FetchError| error.is_transient() && !stop.is_stopped(),
        );

        outcome.map_err(|e| match e {
            RetryError::Exhausted { attempts, last } => HarvesterError::RetriesExhausted {
                attempts,
                message: last.to_string(),
            },
            RetryError::Permanent { error, .. } if error.is_transient() && stop.is_stopped() => {
                HarvesterError::Cancelled
            }
            RetryError::Permanent { error, .. } => HarvesterError::Fetch(error),
        })
    }
}

/// Drives the end-to-end pipeline over a run's municipalities.
pub struct Harvester<F, R> {
    config: HarvestConfig,
    registry: ParserRegistry,
    session: Session<F>,
    renderer: R,
    ethics_terms: TermMatcher,
    discretionary_terms: TermMatcher,
    stop: StopSignal,
}

impl<F: PageFetcher, R: Renderer> Harvester<F, R> {
    /// Create an orchestrator with every platform extractor registered.
    ///
    /// # Returns
    /// * `Err(HarvesterError::InvalidConfig)` if the configuration is unusable
    pub fn new(config: HarvestConfig, fetcher: F, renderer: R) -> Result<Self> {
        config.validate()?;
        let stop = StopSignal::new();
        let session = Session {
            fetcher,
            retry: config.retry,
            request_delay: config.request_delay,
            load_options: LoadOptions {
                timeout: config.fetch_timeout,
            },
            wait_timeout: config.wait_timeout,
            last_request: None,
            sleeper: Arc::new(thread::sleep),
            stop: stop.clone(),
        };
        Ok(Self {
            ethics_terms: TermMatcher::new(&config.ethics_terms),
            discretionary_terms: TermMatcher::new(&config.discretionary_terms),
            registry: create_platform_registry(),
            session,
            renderer,
            stop,
            config,
        })
    }

    /// Replace the extractor registry.
    #[must_use]
    pub fn with_registry(mut self, registry: ParserRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Observe an externally owned stop signal.
    #[must_use]
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.session.stop = stop.clone();
        self.stop = stop;
        self
    }

    /// Replace the sleep function used for spacing and backoff.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Sleeper) -> Self {
        self.session.sleeper = sleeper;
        self
    }

    #[must_use]
    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    #[must_use]
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Collection phase: the municipality lists of every configured state,
    /// concatenated in state order and cut to the configured limit.
    ///
    /// A state whose list cannot be derived is skipped with a warning. A
    /// list that cannot be persisted aborts the run.
    pub fn collect(
        &self,
        cache: &CollectionCache,
        collector: &mut dyn MunicipalityCollector,
    ) -> Result<Vec<Municipality>> {
        let mut municipalities = Vec::new();
        for state in &self.config.states {
            match cache.load(state, self.config.force_recollect, collector) {
                Ok(list) => {
                    tracing::info!(state = %state, count = list.len(), "Municipality list ready");
                    municipalities.extend(list);
                }
                Err(e @ HarvesterError::CachePersistence { .. }) => {
                    tracing::error!(state = %state, error = %e, "Cannot persist municipality list");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(state = %state, error = %e, "Skipping state, no municipality list");
                }
            }
            if self.stop.is_stopped() {
                break;
            }
        }

        if let Some(limit) = self.config.limit {
            municipalities.truncate(limit);
        }
        Ok(municipalities)
    }

    /// Run the full pipeline: collect, process every municipality, write the
    /// run summary.
    pub fn run(
        &mut self,
        cache: &CollectionCache,
        collector: &mut dyn MunicipalityCollector,
        observer: &mut dyn RunObserver,
    ) -> Result<RunReport> {
        let municipalities = self.collect(cache, collector)?;
        Ok(self.process_all(&municipalities, observer))
    }

    /// Process municipalities in order and write the run summary.
    ///
    /// The stop signal is honoured between municipalities; the summary is
    /// written either way. It is also rewritten after every recorded
    /// municipality, so the file on disk is never behind by more than the
    /// municipality in flight.
    pub fn process_all(
        &mut self,
        municipalities: &[Municipality],
        observer: &mut dyn RunObserver,
    ) -> RunReport {
        let mut tracker = ProgressTracker::new(municipalities.len());
        let mut results = Vec::with_capacity(municipalities.len());
        let mut stopped = false;
        observer.begin(municipalities.len());

        for municipality in municipalities {
            if self.stop.is_stopped() {
                tracing::warn!(
                    remaining = municipalities.len() - results.len(),
                    "Stop requested, ending run"
                );
                stopped = true;
                break;
            }
            let result = self.process_municipality(municipality);
            tracker.record(&result);
            results.push(result);

            let progress = tracker.snapshot();
            self.checkpoint(&ReportView {
                states: &self.config.states,
                stopped: self.stop.is_stopped(),
                progress: &progress,
                results: &results,
            });
            if let Some(result) = results.last() {
                observer.recorded(result, &progress);
            }
        }
        // A stop during the last municipality still counts
        stopped |= self.stop.is_stopped();

        let progress = tracker.snapshot();
        observer.finish(&progress);

        let report = RunReport {
            states: self.config.states.clone(),
            stopped,
            progress,
            results,
        };
        if let Err(e) = write_summary(&self.config.output_dir, &report) {
            tracing::error!(error = %e, "Failed to write run summary");
        }
        report
    }

    fn checkpoint(&self, report: &ReportView<'_>) {
        if let Err(e) = write_view(&self.config.output_dir, report) {
            tracing::warn!(error = %e, "Failed to write run summary checkpoint");
        }
    }

    /// Take one municipality from `Pending` to `Recorded`.
    pub fn process_municipality(&mut self, municipality: &Municipality) -> ScrapeResult {
        let id = municipality.id.as_str();
        let platform = municipality
            .platform_tag
            .unwrap_or_else(|| classify(&municipality.source_url));
        tracing::debug!(municipality = id, platform = %platform, "Classified");

        let extractor = match self.registry.resolve(platform, &municipality.source_url) {
            Ok(extractor) => extractor,
            Err(e) => return failed(id, platform, &e, None),
        };

        let toc = match self
            .session
            .load(&municipality.source_url, extractor.toc_ready_selector())
        {
            Ok(document) => document,
            Err(e) => return failed(id, platform, &e, None),
        };

        let chapter = match extractor.locate_ethics_chapter(&toc, &self.ethics_terms) {
            Ok(Some(chapter)) => chapter,
            Ok(None) => {
                tracing::info!(municipality = id, platform = %platform, "No ethics chapter found");
                return ScrapeResult::not_found(id, platform);
            }
            Err(e) => return failed(id, platform, &e, None),
        };
        tracing::debug!(municipality = id, chapter = %chapter.title, "Chapter located");

        let reuse_toc = same_page(&chapter.locator_url, &toc.url)
            || same_page(&chapter.locator_url, &municipality.source_url);
        let loaded;
        let page = if reuse_toc {
            &toc
        } else {
            loaded = match self
                .session
                .load(&chapter.locator_url, extractor.content_ready_selector())
            {
                Ok(document) => document,
                Err(e) => return failed(id, platform, &e, Some(chapter)),
            };
            &loaded
        };

        let blocks = match extractor.extract_content(page, &chapter) {
            Ok(blocks) => blocks,
            Err(e) => return failed(id, platform, &e, Some(chapter)),
        };
        let detected_terms = extractor.detect_aspirational(&blocks, &self.discretionary_terms);
        tracing::debug!(
            municipality = id,
            blocks = blocks.len(),
            terms = detected_terms.len(),
            "Chapter extracted"
        );

        let metadata = ChapterMetadata {
            municipality: municipality.name.clone(),
            state: municipality.state.clone(),
            platform,
            source_url: municipality.source_url.clone(),
            chapter,
            detected_terms,
        };
        match self.renderer.render(&metadata, &blocks) {
            Ok(path) => {
                tracing::info!(municipality = id, path = %path.display(), "Ethics chapter saved");
                ScrapeResult::success(
                    id,
                    platform,
                    metadata.chapter,
                    metadata.detected_terms,
                    path,
                )
            }
            Err(e) => failed(id, platform, &e.into(), Some(metadata.chapter)),
        }
    }
}

fn same_page(a: &str, b: &str) -> bool {
    without_fragment(a) == without_fragment(b)
}

/// Record a failed municipality.
fn failed(
    id: &str,
    platform: PlatformTag,
    error: &HarvesterError,
    chapter: Option<ChapterRef>,
) -> ScrapeResult {
    let kind = error.kind();
    let detail = match error {
        HarvesterError::Cancelled => "cancelled".to_string(),
        other => other.to_string(),
    };
    tracing::warn!(municipality = id, platform = %platform, kind = %kind, error = %detail, "Municipality failed");

    let result = ScrapeResult::error(id, platform, kind, detail);
    match chapter {
        Some(chapter) => result.with_chapter(chapter),
        None => result,
    }
}
