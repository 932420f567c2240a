//! Keep: persist a box's value between runs.
//!
//! A keep spec names a key and a mode. `session` keys live in memory for
//! the life of the process; `local` keys go to a JSON file on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::fs;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeepMode {
    #[default]
    Session,
    Local,
}

/// Parsed `keepAt` setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepSpec {
    pub key: String,
    pub mode: KeepMode,
}

impl KeepSpec {
    /// Parse `"key"`, `"session: key"` or `"local: key"`.
    /// Returns `None` for a blank key.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let (mode, key) = match input.split_once(':') {
            Some((prefix, rest)) if prefix.trim() == "session" => (KeepMode::Session, rest),
            Some((prefix, rest)) if prefix.trim() == "local" => (KeepMode::Local, rest),
            _ => (KeepMode::Session, input),
        };
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some(Self {
            key: key.to_string(),
            mode,
        })
    }
}

#[async_trait]
pub trait KeepStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeepStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }
}

/// All keys in one JSON object on disk. A missing file reads as empty.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    guard: tokio::sync::Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Map<String, Value>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(Error::Keep {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&content).map_err(|source| Error::KeepFormat {
            path: self.path.clone(),
            source,
        })
    }

    async fn write_all(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|source| Error::Keep {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(map).map_err(|source| Error::KeepFormat {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, json).await.map_err(|source| Error::Keep {
            path: self.path.clone(),
            source,
        })
    }
}

#[async_trait]
impl KeepStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.guard.lock().await;
        Ok(self.read_all().await?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.guard.lock().await;
        let mut map = self.read_all().await?;
        map.insert(key.to_string(), value);
        self.write_all(&map).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.guard.lock().await;
        let mut map = self.read_all().await?;
        if map.remove(key).is_some() {
            self.write_all(&map).await?;
        }
        Ok(())
    }
}

/// The session and local stores boxes pick from.
#[derive(Clone)]
pub struct KeepStores {
    pub session: Arc<dyn KeepStore>,
    pub local: Arc<dyn KeepStore>,
}

impl Default for KeepStores {
    fn default() -> Self {
        Self {
            session: Arc::new(MemoryStore::new()),
            local: Arc::new(MemoryStore::new()),
        }
    }
}

impl KeepStores {
    /// Memory-backed session store and a file-backed local store.
    pub fn with_local_file(path: impl Into<PathBuf>) -> Self {
        Self {
            session: Arc::new(MemoryStore::new()),
            local: Arc::new(FileStore::new(path)),
        }
    }

    pub fn store_for(&self, mode: KeepMode) -> Arc<dyn KeepStore> {
        match mode {
            KeepMode::Session => self.session.clone(),
            KeepMode::Local => self.local.clone(),
        }
    }
}

/// One box's binding to its keep key.
#[derive(Clone)]
pub struct Keep {
    spec: KeepSpec,
    store: Arc<dyn KeepStore>,
}

impl Keep {
    pub fn new(spec: KeepSpec, stores: &KeepStores) -> Self {
        let store = stores.store_for(spec.mode);
        Self { spec, store }
    }

    pub fn spec(&self) -> &KeepSpec {
        &self.spec
    }

    pub async fn load(&self) -> Result<Option<Value>> {
        let value = self.store.get(&self.spec.key).await?;
        Ok(value.filter(|v| !v.is_null()))
    }

    /// Save a value; `Null` removes the key.
    pub async fn save(&self, value: &Value) -> Result<()> {
        debug!(key = %self.spec.key, mode = ?self.spec.mode, "keep value");
        if value.is_null() {
            self.store.remove(&self.spec.key).await
        } else {
            self.store.set(&self.spec.key, value.clone()).await
        }
    }

    pub async fn reset(&self) -> Result<()> {
        self.store.remove(&self.spec.key).await
    }
}
