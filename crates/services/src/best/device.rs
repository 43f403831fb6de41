use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use edu_core::model::GameId;
use edu_core::scoring::BestRecord;

use super::{BestSink, SinkOutcome};
use crate::error::ServiceError;

/// Key under which a game's best is cached on the device.
#[must_use]
pub fn best_key(game_id: &GameId) -> String {
    format!("edutech.game.{game_id}.best")
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeviceStoreError {
    #[error("device storage unavailable: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid device storage key: {0}")]
    InvalidKey(String),
}

/// String key/value storage local to one device.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `DeviceStoreError` if the store cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, DeviceStoreError>;

    /// # Errors
    ///
    /// Returns `DeviceStoreError` if the store cannot be written.
    async fn set(&self, key: &str, value: &str) -> Result<(), DeviceStoreError>;
}

/// Device store kept in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDeviceStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryDeviceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceStore for MemoryDeviceStore {
    async fn get(&self, key: &str) -> Result<Option<String>, DeviceStoreError> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), DeviceStoreError> {
        self.values
            .lock()
            .await
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Device store with one file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileDeviceStore {
    dir: PathBuf,
}

impl FileDeviceStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, DeviceStoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
        if !valid || key.starts_with('.') {
            return Err(DeviceStoreError::InvalidKey(key.to_owned()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl DeviceStore for FileDeviceStore {
    async fn get(&self, key: &str) -> Result<Option<String>, DeviceStoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), DeviceStoreError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, value).await?;
        Ok(())
    }
}

/// Best-score cache on the player's device.
///
/// Never fails: read errors and malformed values count as no stored best,
/// write errors are logged and the presented best stands.
#[derive(Clone)]
pub struct DeviceBestSink {
    store: Arc<dyn DeviceStore>,
}

impl DeviceBestSink {
    #[must_use]
    pub fn new(store: Arc<dyn DeviceStore>) -> Self {
        Self { store }
    }

    async fn read(&self, key: &str) -> Option<BestRecord> {
        let raw = match self.store.get(key).await {
            Ok(raw) => raw?,
            Err(err) => {
                tracing::warn!(key, error = %err, "device best unreadable");
                return None;
            }
        };
        match serde_json::from_str::<BestRecord>(&raw) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(key, error = %err, "ignoring malformed device best");
                None
            }
        }
    }
}

#[async_trait]
impl BestSink for DeviceBestSink {
    fn name(&self) -> &'static str {
        "device"
    }

    async fn best(&self, game_id: &GameId) -> Result<Option<BestRecord>, ServiceError> {
        Ok(self.read(&best_key(game_id)).await)
    }

    async fn offer(
        &self,
        game_id: &GameId,
        result: BestRecord,
    ) -> Result<SinkOutcome, ServiceError> {
        let key = best_key(game_id);
        let stored = self.read(&key).await;
        let (best, replaced) = result.reconcile(stored);

        if replaced {
            match serde_json::to_string(&best) {
                Ok(value) => {
                    if let Err(err) = self.store.set(&key, &value).await {
                        tracing::warn!(key, error = %err, "device best not saved");
                    }
                }
                Err(err) => tracing::warn!(key, error = %err, "device best not encoded"),
            }
        }

        Ok(SinkOutcome { best, replaced })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenStore;

    #[async_trait]
    impl DeviceStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, DeviceStoreError> {
            Err(std::io::Error::other("quota exceeded").into())
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), DeviceStoreError> {
            Err(std::io::Error::other("quota exceeded").into())
        }
    }

    fn game() -> GameId {
        GameId::new("game-logic-quest")
    }

    #[test]
    fn key_matches_browser_layout() {
        assert_eq!(best_key(&game()), "edutech.game.game-logic-quest.best");
    }

    #[tokio::test]
    async fn stores_json_and_applies_the_rule() {
        let store = MemoryDeviceStore::new();
        let sink = DeviceBestSink::new(Arc::new(store.clone()));

        let first = sink.offer(&game(), BestRecord::new(2, 8_000)).await.unwrap();
        assert!(first.replaced);
        let raw = store.get(&best_key(&game())).await.unwrap().unwrap();
        assert_eq!(raw, r#"{"bestScore":2,"bestTimeMs":8000}"#);

        let worse = sink.offer(&game(), BestRecord::new(1, 1_000)).await.unwrap();
        assert!(!worse.replaced);
        assert_eq!(worse.best, BestRecord::new(2, 8_000));

        let faster = sink.offer(&game(), BestRecord::new(2, 6_000)).await.unwrap();
        assert!(faster.replaced);
        assert_eq!(sink.best(&game()).await.unwrap(), Some(BestRecord::new(2, 6_000)));
    }

    #[tokio::test]
    async fn malformed_value_is_ignored() {
        let store = MemoryDeviceStore::new();
        store.set(&best_key(&game()), "{not json").await.unwrap();
        let sink = DeviceBestSink::new(Arc::new(store));

        assert_eq!(sink.best(&game()).await.unwrap(), None);
        let outcome = sink.offer(&game(), BestRecord::new(0, 0)).await.unwrap();
        assert!(outcome.replaced);
    }

    #[tokio::test]
    async fn storage_failures_are_swallowed() {
        let sink = DeviceBestSink::new(Arc::new(BrokenStore));
        let outcome = sink.offer(&game(), BestRecord::new(3, 4_000)).await.unwrap();
        assert_eq!(outcome.best, BestRecord::new(3, 4_000));
        assert_eq!(sink.best(&game()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_store_round_trips_and_rejects_odd_keys() {
        let dir = std::env::temp_dir().join(format!("edu-device-{}", std::process::id()));
        let store = FileDeviceStore::new(&dir);

        assert_eq!(store.get("edutech.game.x.best").await.unwrap(), None);
        store.set("edutech.game.x.best", "{}").await.unwrap();
        assert_eq!(
            store.get("edutech.game.x.best").await.unwrap().as_deref(),
            Some("{}")
        );
        assert!(matches!(
            store.get("../escape").await,
            Err(DeviceStoreError::InvalidKey(_))
        ));

        let _ = std::fs::remove_dir_all(dir);
    }
}
