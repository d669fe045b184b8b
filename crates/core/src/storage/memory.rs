//! In-memory object store used by the adapter tests.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::ObjectInfo;
use super::client::{ConnectionConfig, Connector, ListPage, ObjectApi};
use crate::error::{Result, StorageError};

pub(crate) struct MemoryApi {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    page_size: usize,
    fail_gets_after: Mutex<Option<usize>>,
    list_calls: AtomicUsize,
}

impl Default for MemoryApi {
    fn default() -> Self {
        Self::with_page_size(1000)
    }
}

impl MemoryApi {
    pub(crate) fn with_page_size(page_size: usize) -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            page_size,
            fail_gets_after: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn insert(&self, key: &str, data: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), data.to_vec());
    }

    pub(crate) fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    /// Makes every GET write `n` bytes and then fail like a dropped connection.
    pub(crate) fn fail_gets_after(&self, n: usize) {
        *self.fail_gets_after.lock().unwrap() = Some(n);
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectApi for MemoryApi {
    async fn get_object(&self, key: &str, writer: &mut File, local: &Path) -> Result<()> {
        let data = self.get(key).ok_or_else(|| StorageError::RemoteStatus {
            op: "GET",
            key: key.to_string(),
            status: 404,
        })?;
        let fail_after = *self.fail_gets_after.lock().unwrap();
        match fail_after {
            Some(n) => {
                writer
                    .write_all(&data[..n.min(data.len())])
                    .await
                    .map_err(|e| StorageError::local(local, e))?;
                Err(StorageError::remote("GET", key, "connection reset by peer"))
            }
            None => writer
                .write_all(&data)
                .await
                .map_err(|e| StorageError::local(local, e)),
        }
    }

    async fn put_object(&self, key: &str, reader: &mut File, local: &Path) -> Result<u64> {
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .await
            .map_err(|e| StorageError::local(local, e))?;
        let len = data.len() as u64;
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(len)
    }

    async fn list_page(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ListPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let objects = self.objects.lock().unwrap();
        let mut matching = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| {
                continuation_token
                    .as_deref()
                    .is_none_or(|token| key.as_str() > token)
            });

        let page: Vec<ObjectInfo> = matching
            .by_ref()
            .take(self.page_size)
            .map(|(key, data)| ObjectInfo {
                name: key.clone(),
                size: data.len() as u64,
                last_modified: Some(Utc::now()),
            })
            .collect();
        let more = matching.next().is_some();

        Ok(ListPage {
            continuation_token: if more {
                page.last().map(|o| o.name.clone())
            } else {
                None
            },
            objects: page,
        })
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Hands out the shared [`MemoryApi`] and records every config it was given.
pub(crate) struct MemoryConnector {
    api: Arc<MemoryApi>,
    configs: Mutex<Vec<ConnectionConfig>>,
}

impl MemoryConnector {
    pub(crate) fn new(api: Arc<MemoryApi>) -> Self {
        Self {
            api,
            configs: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn configs(&self) -> Vec<ConnectionConfig> {
        self.configs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn ObjectApi>> {
        self.configs.lock().unwrap().push(config.clone());
        Ok(self.api.clone())
    }
}
