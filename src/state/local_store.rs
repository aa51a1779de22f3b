use anyhow::Context;
use async_trait::async_trait;
use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;

pub const LOCAL_MATCHES_KEY: &str = "local_team_matches";
pub const LOCAL_BOOKINGS_KEY: &str = "local_bookings";

/// Durable string storage for on-device entities.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// `Ok(None)` when nothing was ever stored under `key`.
    async fn read(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn write(&self, key: &str, value: &str) -> anyhow::Result<()>;
    async fn remove(&self, key: &str) -> anyhow::Result<()>;
}

/// One `<key>.json` file per key under `dir`.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl KeyValueStore for JsonDirStore {
    async fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    async fn write(&self, key: &str, value: &str) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating {}", self.dir.display()))?;

        // Write-then-rename so a crash never leaves a half-written list.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing {}", path.display())),
        }
    }
}

/// In-memory store, used when no data directory is usable.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes always fail, to exercise best-effort persistence.
    pub fn read_only() -> Self {
        Self { fail_writes: true, ..Self::default() }
    }

    pub async fn insert_raw(&self, key: &str, value: &str) {
        self.entries.lock().await.insert(key.to_owned(), value.to_owned());
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> anyhow::Result<()> {
        if self.fail_writes {
            anyhow::bail!("store is read-only");
        }
        self.entries.lock().await.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        if self.fail_writes {
            anyhow::bail!("store is read-only");
        }
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// A typed list persisted under one key. Every failure is logged and
/// absorbed: a missing or corrupt list loads as empty, a failed save leaves
/// the in-memory state untouched.
pub struct LocalEntities<T> {
    store: Arc<dyn KeyValueStore>,
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> LocalEntities<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn KeyValueStore>, key: &'static str) -> Self {
        Self { store, key, _marker: PhantomData }
    }

    pub async fn load(&self) -> Vec<T> {
        let raw = match self.store.read(self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("could not read {}: {e:#}", self.key);
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(items) => {
                debug!("loaded {} entries from {}", items.len(), self.key);
                items
            }
            Err(e) => {
                warn!("discarding corrupt {}: {e}", self.key);
                Vec::new()
            }
        }
    }

    /// Returns whether the list reached storage.
    pub async fn save(&self, items: &[T]) -> bool {
        let payload = match serde_json::to_string(items) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("could not encode {}: {e}", self.key);
                return false;
            }
        };
        match self.store.write(self.key, &payload).await {
            Ok(()) => true,
            Err(e) => {
                warn!("could not persist {}: {e:#}", self.key);
                false
            }
        }
    }

    pub async fn clear(&self) {
        if let Err(e) = self.store.remove(self.key).await {
            warn!("could not clear {}: {e:#}", self.key);
        }
    }
}
