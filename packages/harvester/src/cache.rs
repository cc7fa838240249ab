//! Per-state municipality list cache.
//!
//! One JSON file per state under the cache directory:
//!
//! ```json
//! {
//!   "state": "UT",
//!   "municipalities": [
//!     { "id": "UT-provo", "name": "Provo", "sourceUrl": "https://provo.municipal.codes/", "platformTag": "general_code" }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::collector::MunicipalityCollector;
use crate::error::{HarvesterError, Result};
use crate::types::{Municipality, PlatformTag};
use crate::writer::write_atomic;

/// Cached municipality record, as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedMunicipality {
    id: String,
    name: String,
    source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    platform_tag: Option<PlatformTag>,
}

/// Cache file layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheFile {
    state: String,
    municipalities: Vec<CachedMunicipality>,
}

impl From<&Municipality> for CachedMunicipality {
    fn from(m: &Municipality) -> Self {
        Self {
            id: m.id.clone(),
            name: m.name.clone(),
            source_url: m.source_url.clone(),
            platform_tag: m.platform_tag,
        }
    }
}

impl CachedMunicipality {
    fn into_municipality(self, state: &str) -> Municipality {
        Municipality {
            id: self.id,
            name: self.name,
            state: state.to_string(),
            source_url: self.source_url,
            platform_tag: self.platform_tag,
        }
    }
}

/// Persists and serves per-state municipality lists.
#[derive(Debug, Clone)]
pub struct CollectionCache {
    dir: PathBuf,
}

impl CollectionCache {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache file for a state.
    #[must_use]
    pub fn path_for(&self, state: &str) -> PathBuf {
        self.dir.join(format!("{state}_municipalities.json"))
    }

    /// Read the persisted list for a state.
    ///
    /// # Returns
    /// * `Ok(None)` if nothing is cached yet
    /// * `Err` if the file exists but cannot be read or parsed, or lists an
    ///   id twice
    pub fn read(&self, state: &str) -> Result<Option<Vec<Municipality>>> {
        let path = self.path_for(state);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file: CacheFile = serde_json::from_str(&content)?;

        let duplicate = {
            let mut ids = HashSet::new();
            file.municipalities
                .iter()
                .find(|m| !ids.insert(m.id.as_str()))
                .map(|m| m.id.clone())
        };
        if let Some(id) = duplicate {
            return Err(HarvesterError::InvalidCache {
                path: path.display().to_string(),
                reason: format!("duplicate id '{id}'"),
            });
        }

        let state = file.state;
        Ok(Some(
            file.municipalities
                .into_iter()
                .map(|m| m.into_municipality(&state))
                .collect(),
        ))
    }

    /// Persist the list for a state, replacing any previous copy atomically.
    pub fn save(&self, state: &str, municipalities: &[Municipality]) -> Result<PathBuf> {
        let path = self.path_for(state);
        let file = CacheFile {
            state: state.to_string(),
            municipalities: municipalities.iter().map(CachedMunicipality::from).collect(),
        };
        let content = serde_json::to_string_pretty(&file)?;

        write_atomic(&path, content.as_bytes()).map_err(|source| {
            HarvesterError::CachePersistence {
                state: state.to_string(),
                path: path.display().to_string(),
                source,
            }
        })?;

        tracing::debug!(state, path = %path.display(), count = municipalities.len(), "Saved municipality list");
        Ok(path)
    }

    /// Serve the list for a state.
    ///
    /// The persisted list is returned unless `force_refresh` is set, nothing
    /// is cached, or the cached copy cannot be read. In those cases the list
    /// is re-derived through `collector` and persisted; a failure to persist
    /// is returned as [`HarvesterError::CachePersistence`].
    pub fn load(
        &self,
        state: &str,
        force_refresh: bool,
        collector: &mut dyn MunicipalityCollector,
    ) -> Result<Vec<Municipality>> {
        if !force_refresh {
            match self.read(state) {
                Ok(Some(municipalities)) => {
                    tracing::debug!(state, count = municipalities.len(), "Using cached municipality list");
                    return Ok(municipalities);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(state, error = %e, "Unreadable municipality cache, collecting again");
                }
            }
        }

        let municipalities = collector.collect(state)?;
        self.save(state, &municipalities)?;
        Ok(municipalities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    struct FixedCollector {
        calls: usize,
        list: Vec<Municipality>,
    }

    impl MunicipalityCollector for FixedCollector {
        fn collect(&mut self, _state: &str) -> Result<Vec<Municipality>> {
            self.calls += 1;
            Ok(self.list.clone())
        }
    }

    fn sample() -> Vec<Municipality> {
        vec![
            Municipality::new("UT-provo", "Provo", "UT", "https://provo.municipal.codes/")
                .with_platform(PlatformTag::GeneralCode),
            Municipality::new("UT-park-city", "Park City", "UT", "https://example.org/pc"),
        ]
    }

    #[test]
    fn test_save_uses_camel_case_layout() {
        let dir = tempdir().unwrap();
        let cache = CollectionCache::new(dir.path());
        let path = cache.save("UT", &sample()).unwrap();

        assert_eq!(path, dir.path().join("UT_municipalities.json"));
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["state"], "UT");
        assert_eq!(value["municipalities"][0]["sourceUrl"], "https://provo.municipal.codes/");
        assert_eq!(value["municipalities"][0]["platformTag"], "general_code");
        assert!(value["municipalities"][1].get("platformTag").is_none());
    }

    #[test]
    fn test_read_missing_is_none() {
        let dir = tempdir().unwrap();
        let cache = CollectionCache::new(dir.path());
        assert!(cache.read("NY").unwrap().is_none());
    }

    #[test]
    fn test_load_collects_when_empty_then_serves_cache() {
        let dir = tempdir().unwrap();
        let cache = CollectionCache::new(dir.path());
        let mut collector = FixedCollector {
            calls: 0,
            list: sample(),
        };

        let first = cache.load("UT", false, &mut collector).unwrap();
        let second = cache.load("UT", false, &mut collector).unwrap();

        assert_eq!(collector.calls, 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_load_force_refresh_recollects() {
        let dir = tempdir().unwrap();
        let cache = CollectionCache::new(dir.path());
        cache.save("UT", &sample()[..1]).unwrap();

        let mut collector = FixedCollector {
            calls: 0,
            list: sample(),
        };
        let loaded = cache.load("UT", true, &mut collector).unwrap();

        assert_eq!(collector.calls, 1);
        assert_eq!(loaded.len(), 2);
        assert_eq!(cache.read("UT").unwrap().unwrap().len(), 2);
    }

    #[test]
    fn test_load_corrupt_cache_falls_back_to_collection() {
        let dir = tempdir().unwrap();
        let cache = CollectionCache::new(dir.path());
        fs::write(cache.path_for("UT"), "{ not json").unwrap();

        let mut collector = FixedCollector {
            calls: 0,
            list: sample(),
        };
        let loaded = cache.load("UT", false, &mut collector).unwrap();

        assert_eq!(collector.calls, 1);
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_duplicate_ids_are_rejected_and_recollected() {
        let dir = tempdir().unwrap();
        let cache = CollectionCache::new(dir.path());
        fs::write(
            cache.path_for("UT"),
            r#"{"state":"UT","municipalities":[
                {"id":"UT-provo","name":"Provo","sourceUrl":"https://provo.municipal.codes/"},
                {"id":"UT-provo","name":"Provo City","sourceUrl":"https://example.org/provo"}
            ]}"#,
        )
        .unwrap();

        let err = cache.read("UT").unwrap_err();
        assert!(err.to_string().contains("duplicate id 'UT-provo'"));

        let mut collector = FixedCollector {
            calls: 0,
            list: sample(),
        };
        let loaded = cache.load("UT", false, &mut collector).unwrap();
        assert_eq!(collector.calls, 1);
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_save_failure_is_cache_persistence_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("cache");
        fs::write(&blocker, "not a directory").unwrap();

        let cache = CollectionCache::new(&blocker);
        let err = cache.save("UT", &sample()).unwrap_err();
        assert!(matches!(err, HarvesterError::CachePersistence { .. }));
    }
}
