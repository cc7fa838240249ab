//! Registry mapping platform tags to extractors.

use std::collections::HashMap;

use crate::error::{HarvesterError, Result};
use crate::extractors::Extractor;
use crate::types::PlatformTag;

/// Registry mapping platform tags to extractors.
pub struct ParserRegistry {
    extractors: HashMap<PlatformTag, Box<dyn Extractor>>,
}

impl ParserRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// Register an extractor under the platform it reports.
    ///
    /// A later registration for the same platform replaces the earlier one.
    pub fn register(&mut self, extractor: impl Extractor + 'static) {
        self.register_boxed(Box::new(extractor));
    }

    /// Register an already boxed extractor.
    pub fn register_boxed(&mut self, extractor: Box<dyn Extractor>) {
        self.extractors.insert(extractor.platform(), extractor);
    }

    /// Resolve the extractor for a platform.
    ///
    /// # Arguments
    /// * `platform` - Tag produced by the classifier
    /// * `url` - Source URL, reported in the error
    ///
    /// # Returns
    /// * `Err(HarvesterError::Classification)` if nothing is registered
    pub fn resolve(&self, platform: PlatformTag, url: &str) -> Result<&dyn Extractor> {
        self.extractors
            .get(&platform)
            .map(|e| e.as_ref())
            .ok_or_else(|| HarvesterError::Classification {
                platform,
                url: url.to_string(),
            })
    }

    /// Check if an extractor is registered for a platform.
    #[must_use]
    pub fn has_extractor(&self, platform: PlatformTag) -> bool {
        self.extractors.contains_key(&platform)
    }

    /// Registered platforms, sorted.
    #[must_use]
    pub fn platforms(&self) -> Vec<PlatformTag> {
        let mut platforms: Vec<PlatformTag> = self.extractors.keys().copied().collect();
        platforms.sort();
        platforms
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}
