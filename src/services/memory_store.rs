//! In-memory `ObjectStore` used as a test double.

use crate::services::storage_service::{ObjectStore, SpooledObject, StorageError, StorageResult};
use async_trait::async_trait;
use std::{collections::HashMap, sync::Mutex, time::Duration};

#[derive(Clone, Debug)]
pub struct MemoryObject {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub content_md5: String,
}

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, MemoryObject>>,
    failure: Option<String>,
    delay: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a remote error carrying `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Every put waits `delay` before storing.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn get(&self, key: &str) -> Option<MemoryObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(&self, object: &SpooledObject) -> StorageResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.failure {
            return Err(StorageError::Remote(message.clone()));
        }

        let body = tokio::fs::read(object.path()).await?;
        self.objects.lock().unwrap().insert(
            object.key().to_string(),
            MemoryObject {
                body,
                content_type: object.content_type().map(str::to_string),
                content_md5: object.content_md5(),
            },
        );
        Ok(())
    }

    async fn check_ready(&self) -> StorageResult<()> {
        match &self.failure {
            Some(message) => Err(StorageError::Remote(message.clone())),
            None => Ok(()),
        }
    }
}
