//! Local persistence for chat history and theme preference.
//!
//! The store is a plain key-value map of strings.  Two keys are used:
//! [`HISTORY_KEY`] holds the JSON-serialized message list and [`THEME_KEY`]
//! holds `light` or `dark`.  Reads never fail from the caller's point of
//! view: missing or corrupt data yields the empty default.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{Error, Result};
use crate::observability::{STORE_READ_FAILURES, STORE_WRITE_FAILURES};
use crate::types::{Message, Theme};

/// Key under which the serialized message list is kept.
pub const HISTORY_KEY: &str = "chat_history";

/// Key under which the theme preference is kept.
pub const THEME_KEY: &str = "theme";

/// A string-to-string persistent map.
pub trait KeyValueStore: Send {
    /// Returns the value stored under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`.  Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Stores each key as a file in a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `dir`.  The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates a store in the platform data directory, e.g.
    /// `~/.local/share/parley` on Linux.
    pub fn in_data_dir() -> Result<Self> {
        let base = dirs::data_dir()
            .ok_or_else(|| Error::configuration("could not determine the data directory"))?;
        Ok(Self::new(base.join("parley")))
    }

    /// Returns the directory backing this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(Error::configuration(format!("invalid store key: {key:?}")));
        }
        Ok(self.dir.join(key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::io(format!("failed to read {}", path.display()), err)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).map_err(|err| {
            Error::io(format!("failed to create {}", self.dir.display()), err)
        })?;
        // Write then rename so a crash never leaves a half-written value.
        let tmp = self.dir.join(format!(".{key}.tmp"));
        let mut file = fs::File::create(&tmp)
            .map_err(|err| Error::io(format!("failed to create {}", tmp.display()), err))?;
        let written = file
            .write_all(value.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|err| Error::io(format!("failed to write {}", tmp.display()), err))
            .and_then(|()| {
                fs::rename(&tmp, &path).map_err(|err| {
                    Error::io(format!("failed to replace {}", path.display()), err)
                })
            });
        if written.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        written
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::io(format!("failed to remove {}", path.display()), err)),
        }
    }
}

/// In-memory store.
///
/// Clones share the same map, so a test can keep a handle and inspect what
/// a controller wrote, or hand a second controller the same contents to
/// simulate a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }
}

/// Loads the persisted message list, or an empty list if absent or corrupt.
pub fn load_history(store: &dyn KeyValueStore) -> Vec<Message> {
    let raw = match store.get(HISTORY_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            STORE_READ_FAILURES.click();
            tracing::warn!(error = %err, "failed to load chat history");
            return Vec::new();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(messages) => messages,
        Err(err) => {
            STORE_READ_FAILURES.click();
            tracing::warn!(error = %err, "discarding unreadable chat history");
            Vec::new()
        }
    }
}

/// Persists the message list.
pub fn save_history(store: &mut dyn KeyValueStore, messages: &[Message]) -> Result<()> {
    let raw = serde_json::to_string(messages)?;
    store.set(HISTORY_KEY, &raw).inspect_err(|_| {
        STORE_WRITE_FAILURES.click();
    })
}

/// Erases the persisted message list.
pub fn clear_history(store: &mut dyn KeyValueStore) -> Result<()> {
    store.remove(HISTORY_KEY).inspect_err(|_| {
        STORE_WRITE_FAILURES.click();
    })
}

/// Loads the theme preference, or `None` if absent or unrecognized.
pub fn load_theme(store: &dyn KeyValueStore) -> Option<Theme> {
    match store.get(THEME_KEY) {
        Ok(raw) => raw.and_then(|raw| raw.trim().parse().ok()),
        Err(err) => {
            STORE_READ_FAILURES.click();
            tracing::warn!(error = %err, "failed to load theme preference");
            None
        }
    }
}

/// Persists the theme preference.
pub fn save_theme(store: &mut dyn KeyValueStore, theme: Theme) -> Result<()> {
    store.set(THEME_KEY, &theme.to_string()).inspect_err(|_| {
        STORE_WRITE_FAILURES.click();
    })
}
