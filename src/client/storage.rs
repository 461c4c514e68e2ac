// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable client-side key/value storage for the session identifier.

use super::ClientError;
use dashmap::DashMap;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Well-known key holding the session identifier.
pub const SESSION_STORAGE_KEY: &str = "portal_session_id";

/// Synchronous string storage in the style of browser `localStorage`.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;
    fn remove(&self, key: &str) -> Result<(), ClientError>;
}

/// Process-local storage; lost when the process exits.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    values: DashMap<String, String>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self.values.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        self.values.remove(key);
        Ok(())
    }
}

/// JSON file storage that survives restarts.
///
/// Writes go to a sibling temp file first and are renamed into place.
#[derive(Debug)]
pub struct FileSessionStorage {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>, ClientError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                ClientError::Storage(format!("{}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(ClientError::Storage(format!(
                "{}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn save(&self, values: &HashMap<String, String>) -> Result<(), ClientError> {
        let io_err = |e: std::io::Error| ClientError::Storage(format!("{}: {}", self.path.display(), e));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(values)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }

    fn modify(
        &self,
        f: impl FnOnce(&mut HashMap<String, String>),
    ) -> Result<(), ClientError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| ClientError::Storage("storage lock poisoned".to_string()))?;
        let mut values = self.load()?;
        f(&mut values);
        self.save(&values)
    }
}

impl SessionStorage for FileSessionStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.modify(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        if !self.path.exists() {
            return Ok(());
        }
        self.modify(|values| {
            values.remove(key);
        })
    }
}
