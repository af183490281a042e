use std::sync::Arc;

use anyhow::{Context, Result};

use crate::model::{CacheEntry, LastSearch, Region};
use crate::persist::KeyValueStore;

pub const LAST_SEARCH_KEY: &str = "lastSearch";

/// `lowercase(identity) + "_" + region`. Case never affects hits.
pub fn cache_key(player_identity: &str, region: Region) -> String {
    format!("{}_{}", player_identity.to_lowercase(), region.code())
}

/// Per-player results for the current session, plus the last search used by
/// "roast again". No eviction: entries live as long as the backing store.
#[derive(Clone)]
pub struct SessionCache {
    store: Arc<dyn KeyValueStore>,
}

impl SessionCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Unreadable entries are reported as absent.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let raw = self.store.get(key)?;
        serde_json::from_str::<CacheEntry>(&raw).ok()
    }

    pub fn put(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        let json = serde_json::to_string(entry).context("serialize cache entry")?;
        self.store
            .set(key, &json)
            .with_context(|| format!("store cache entry {key}"))
    }

    /// Concatenates `new_topics` onto the stored list. Duplicates are kept.
    /// Returns the updated entry, or `None` when there is nothing cached.
    pub fn append_used_topics(&self, key: &str, new_topics: &[String]) -> Result<Option<CacheEntry>> {
        let Some(mut entry) = self.get(key) else {
            return Ok(None);
        };
        entry.used_topics.extend(new_topics.iter().cloned());
        self.put(key, &entry)?;
        Ok(Some(entry))
    }

    pub fn last_search(&self) -> Option<LastSearch> {
        let raw = self.store.get(LAST_SEARCH_KEY)?;
        serde_json::from_str(&raw).ok()
    }

    pub fn set_last_search(&self, search: &LastSearch) -> Result<()> {
        let json = serde_json::to_string(search).context("serialize last search")?;
        self.store
            .set(LAST_SEARCH_KEY, &json)
            .context("store last search")
    }
}
