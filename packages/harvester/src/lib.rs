//! Ethics Harvester - Collect municipal ethics codes from code hosting platforms.
//!
//! This crate finds the ethics / code-of-conduct chapter in each
//! municipality's published code, extracts it as ordered content blocks,
//! flags discretionary ("aspirational") language and renders one document
//! per municipality.
//!
//! # Example
//!
//! ```
//! use ethics_harvester::{classify, config, PlatformTag};
//!
//! assert_eq!(
//!     classify("https://library.municode.com/ut/provo/codes/code_of_ordinances"),
//!     PlatformTag::Municode
//! );
//! assert_eq!(config::validate_state_code("ut").unwrap(), "UT");
//! ```
//!
//! # Architecture
//!
//! The harvester is organized into several modules:
//!
//! - [`config`]: Configuration constants, validation and [`HarvestConfig`]
//! - [`types`]: Core data types (Municipality, ChapterRef, ContentBlock, etc.)
//! - [`error`]: Error types and Result alias
//! - [`platform`]: URL to platform classification
//! - [`fetch`]: Page-fetching boundary and the HTTP implementation
//! - [`html`]: HTML traversal shared by the extractors
//! - [`extractors`]: One extractor per supported platform
//! - [`registry`]: Platform to extractor lookup
//! - [`collector`]: Municipality directory collection
//! - [`cache`]: Per-state municipality list cache
//! - [`retry`]: Bounded retry with backoff
//! - [`progress`]: Run counters and observers
//! - [`render`]: Output document rendering
//! - [`summary`]: End-of-run summary artifact
//! - [`harvester`]: The orchestrator
//! - [`cli`]: Command-line interface

pub mod cache;
pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod extractors;
pub mod fetch;
pub mod harvester;
pub mod html;
pub mod platform;
pub mod progress;
pub mod registry;
pub mod render;
pub mod retry;
pub mod summary;
pub mod terms;
pub mod types;
pub mod writer;

// Re-export the orchestrator
pub use harvester::{Harvester, StopSignal};

// Re-export commonly used items
pub use cache::CollectionCache;
pub use collector::{DirectoryCollector, MunicipalityCollector};
pub use config::{validate_state_code, HarvestConfig};
pub use error::{ErrorKind, FetchError, HarvesterError, RenderError, Result};
pub use extractors::Extractor;
pub use fetch::{Document, HttpFetcher, LoadOptions, PageFetcher};
pub use platform::classify;
pub use progress::{NullObserver, ProgressSnapshot, ProgressTracker, RunObserver};
pub use registry::{create_platform_registry, ParserRegistry};
pub use render::{HtmlRenderer, Renderer};
pub use retry::{Backoff, RetryPolicy};
pub use summary::RunReport;
pub use terms::TermMatcher;
pub use types::{
    BlockKind, ChapterMetadata, ChapterRef, ContentBlock, Municipality, PlatformTag, ScrapeResult,
    ScrapeStatus,
};
