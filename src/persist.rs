use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};

const STORE_DIR: &str = "league_roasted";

/// Session-scoped string key/value storage. Everything the client remembers
/// between analyses goes through this seam.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("memory store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let guard = self.entries.lock().expect("memory store lock poisoned");
        guard.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut guard = self.entries.lock().expect("memory store lock poisoned");
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut guard = self.entries.lock().expect("memory store lock poisoned");
        guard.remove(key);
        Ok(())
    }
}

/// Mirrors the in-memory map to a per-process JSON file so the session can be
/// inspected from outside. The file is removed when the store is dropped.
#[derive(Debug)]
pub struct SessionFileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl SessionFileStore {
    pub fn open_default() -> Result<Self> {
        let dir = store_dir().context("no cache directory available")?;
        let file = format!("session-{}.json", std::process::id());
        Self::open(dir.join(file))
    }

    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("create session store dir")?;
        }
        let entries = load_entries(&path).unwrap_or_default();
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &HashMap<String, String>) -> Result<()> {
        let json = serde_json::to_string(entries).context("serialize session store")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).context("write session store")?;
        fs::rename(&tmp, &self.path).context("swap session store")?;
        Ok(())
    }
}

impl KeyValueStore for SessionFileStore {
    fn get(&self, key: &str) -> Option<String> {
        let guard = self.entries.lock().expect("session store lock poisoned");
        guard.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut guard = self.entries.lock().expect("session store lock poisoned");
        guard.insert(key.to_string(), value.to_string());
        self.flush(&guard)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut guard = self.entries.lock().expect("session store lock poisoned");
        if guard.remove(key).is_some() {
            self.flush(&guard)?;
        }
        Ok(())
    }
}

impl Drop for SessionFileStore {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn load_entries(path: &Path) -> Option<HashMap<String, String>> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

fn store_dir() -> Option<PathBuf> {
    // Prefer XDG cache.
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(STORE_DIR));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(STORE_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(STORE_DIR)
            .join(format!("{name}-{}.json", std::process::id()))
    }

    #[test]
    fn memory_store_round_trips_and_deletes() {
        let store = MemoryStore::new();
        store.set("k", "v").expect("set");
        assert_eq!(store.get("k").as_deref(), Some("v"));
        store.delete("k").expect("delete");
        assert!(store.get("k").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn session_file_is_written_and_removed_on_drop() {
        let path = temp_path("store-drop");
        {
            let store = SessionFileStore::open(path.clone()).expect("open");
            store.set("lastSearch", "{}").expect("set");
            let raw = fs::read_to_string(store.path()).expect("file written");
            assert!(raw.contains("lastSearch"));
        }
        assert!(!path.exists());
    }

    #[test]
    fn session_file_tolerates_garbage_on_open() {
        let path = temp_path("store-garbage");
        fs::create_dir_all(path.parent().expect("parent")).expect("dir");
        fs::write(&path, "not json").expect("seed");
        let store = SessionFileStore::open(path).expect("open");
        assert!(store.get("anything").is_none());
    }
}
