//! Persisted UI preferences.
//!
//! Values are flat strings keyed by name, the same shape browser local
//! storage gives the web front-end. They are read on startup, written on
//! change and removed on reset.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

pub mod keys {
    pub const API_KEY: &str = "gemini_api_key";
    pub const VOICE: &str = "gemini_voice";
    pub const LANGUAGE: &str = "gemini_language";
    pub const VIDEO_FPS: &str = "video_fps";
    pub const VIDEO_RESIZE_WIDTH: &str = "video_resize_width";
    pub const VIDEO_QUALITY: &str = "video_quality";
    pub const SYSTEM_INSTRUCTION: &str = "system_instruction";
    pub const SAMPLE_RATE: &str = "sample_rate";

    /// Keys cleared by a reset. The API key and language survive it.
    pub const RESET: [&str; 6] = [
        VIDEO_FPS,
        VIDEO_RESIZE_WIDTH,
        VIDEO_QUALITY,
        SAMPLE_RATE,
        VOICE,
        SYSTEM_INSTRUCTION,
    ];
}

#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("Failed to access preference file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Preference file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A flat string key/value store.
pub trait PreferenceStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError>;
    fn remove(&mut self, key: &str) -> Result<(), PreferenceError>;
}

/// In-memory store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
    values: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: Arc::new(Mutex::new(map)),
        }
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PreferenceError> {
        self.lock().remove(key);
        Ok(())
    }
}

/// A JSON object file, rewritten in full on every change.
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FilePreferenceStore {
    /// Loads the file at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PreferenceError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|source| PreferenceError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(PreferenceError::Io { path, source }),
        };
        debug!(path = %path.display(), entries = values.len(), "Loaded preferences");
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), PreferenceError> {
        let io_err = |source| PreferenceError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(&self.values).map_err(|source| {
            PreferenceError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;
        std::fs::write(&self.path, json).map_err(io_err)
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.values.insert(key.to_string(), value.to_string());
        self.persist()
    }

    fn remove(&mut self, key: &str) -> Result<(), PreferenceError> {
        if self.values.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_clones_share_state() {
        let mut store = MemoryPreferenceStore::new();
        let observer = store.clone();
        store.set(keys::VOICE, "Puck").unwrap();
        assert_eq!(observer.get(keys::VOICE).as_deref(), Some("Puck"));
        store.remove(keys::VOICE).unwrap();
        assert!(observer.get(keys::VOICE).is_none());
    }

    #[test]
    fn file_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let mut store = FilePreferenceStore::open(&path).unwrap();
        assert!(store.get(keys::API_KEY).is_none());
        store.set(keys::API_KEY, "secret").unwrap();
        store.set(keys::VIDEO_FPS, "5").unwrap();

        let reopened = FilePreferenceStore::open(&path).unwrap();
        assert_eq!(reopened.get(keys::API_KEY).as_deref(), Some("secret"));
        assert_eq!(reopened.get(keys::VIDEO_FPS).as_deref(), Some("5"));

        let mut reopened = reopened;
        reopened.remove(keys::VIDEO_FPS).unwrap();
        let again = FilePreferenceStore::open(&path).unwrap();
        assert!(again.get(keys::VIDEO_FPS).is_none());
        assert_eq!(again.path(), path.as_path());
    }

    #[test]
    fn file_store_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "[1, 2").unwrap();

        match FilePreferenceStore::open(&path) {
            Err(PreferenceError::Parse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn empty_file_is_an_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "").unwrap();
        let store = FilePreferenceStore::open(&path).unwrap();
        assert!(store.get(keys::SAMPLE_RATE).is_none());
    }
}
