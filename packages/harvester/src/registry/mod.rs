//! Parser registry mapping platform tags to extractors.
//!
//! The registry is built once per run and is read-only afterwards. A tag
//! with no registered extractor is a classification failure for the
//! municipality that carries it, never for the run.

mod config;
mod core;

pub use config::{create_platform_registry, extractor_for};
pub use core::ParserRegistry;
