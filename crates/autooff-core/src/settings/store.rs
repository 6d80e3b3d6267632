use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// Storage keys shared by the run, the dashboard and the settings commands
pub mod keys {
    pub const USAGE_COUNT: &str = "usage_count";
    pub const LICENSE_KEY: &str = "license_key";
    pub const CURRENT_PLAN: &str = "current_plan";
    pub const SETTINGS: &str = "settings";
    pub const TOTAL_OPERATIONS: &str = "total_operations";
    pub const CHECKBOXES_PROCESSED: &str = "checkboxes_processed";
    pub const LAST_PERFORMANCE: &str = "last_performance";
}

/// Asynchronous key-value storage.
///
/// `get` returns only the keys that exist; `set` merges the given values over
/// what is stored.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>>;

    async fn set(&self, values: Map<String, Value>) -> Result<()>;
}

/// A store persisted as one JSON object on disk
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// `~/.autooff/storage.json`
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Store("Could not determine home directory".to_string()))?;
        Ok(home.join(".autooff").join("storage.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Map<String, Value>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Map::new()),
            Ok(content) => match serde_json::from_str::<Value>(&content)? {
                Value::Object(map) => Ok(map),
                _ => Err(Error::Store(format!(
                    "{} does not contain a JSON object",
                    self.path.display()
                ))),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>> {
        let _guard = self.lock.lock().await;
        let mut all = self.read_all().await?;
        Ok(keys
            .iter()
            .filter_map(|k| all.remove(*k).map(|v| (k.to_string(), v)))
            .collect())
    }

    async fn set(&self, values: Map<String, Value>) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut all = self.read_all().await?;
        all.extend(values);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&Value::Object(all))?;
        tokio::fs::write(&self.path, json).await?;

        tracing::debug!("Wrote storage file: {}", self.path.display());
        Ok(())
    }
}

/// A store kept in memory; can be switched into a failing mode
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<Map<String, Value>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails, as an unavailable or over-quota store would
    pub fn failing() -> Self {
        let store = Self::default();
        store.failing.store(true, Ordering::SeqCst);
        store
    }

    pub async fn snapshot(&self) -> Map<String, Value> {
        self.values.lock().await.clone()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(Error::Store("storage unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>> {
        self.check()?;
        let values = self.values.lock().await;
        Ok(keys
            .iter()
            .filter_map(|k| values.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, values: Map<String, Value>) -> Result<()> {
        self.check()?;
        self.values.lock().await.extend(values);
        Ok(())
    }
}
