// src/sync_client.rs
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Remote key/value store holding one JSON document per key.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetches the document stored under `key`, if any.
    async fn fetch_by_key(&self, key: &str) -> Result<Option<Value>>;

    /// Inserts or replaces the document stored under `key`.
    async fn upsert(&self, key: &str, value: &Value) -> Result<()>;
}

// Row layout of the `user_data` table: one row per (user, key).
#[derive(Serialize, Debug)]
struct UserDataRow<'a> {
    user_id: &'a str,
    key: &'a str,
    value: &'a Value,
}

#[derive(Deserialize, Debug)]
struct ValueRow {
    value: Value,
}

/// `RemoteStore` backed by a PostgREST-style `user_data` table.
pub struct HttpRemoteStore {
    http_client: Client,
    server_url: String,
    api_key: String,
    access_token: String,
    user_id: String,
}

impl HttpRemoteStore {
    pub fn new(server_url: &str, api_key: String, access_token: String, user_id: String) -> Self {
        Self {
            http_client: Client::new(),
            server_url: server_url.trim_end_matches('/').to_string(),
            api_key,
            access_token,
            user_id,
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/user_data", self.server_url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.access_token)
    }
}

async fn error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Could not read error body".to_string())
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch_by_key(&self, key: &str) -> Result<Option<Value>> {
        let url = self.table_url();
        debug!("Fetching '{}' from {}", key, url);

        let response = self
            .authorized(self.http_client.get(&url))
            .query(&[
                ("select", "value".to_string()),
                ("key", format!("eq.{key}")),
                ("user_id", format!("eq.{}", self.user_id)),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to send fetch request for '{key}'"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = error_body(response).await;
            error!("Fetch of '{}' failed with status: {}. Body: {}", key, status, body);
            bail!("Server returned error: {} - {}", status, body);
        }

        let rows: Vec<ValueRow> = response
            .json()
            .await
            .with_context(|| format!("Failed to deserialize server response for '{key}'"))?;
        Ok(rows.into_iter().next().map(|row| row.value))
    }

    async fn upsert(&self, key: &str, value: &Value) -> Result<()> {
        let url = self.table_url();
        let row = UserDataRow {
            user_id: &self.user_id,
            key,
            value,
        };

        let response = self
            .authorized(self.http_client.post(&url))
            .query(&[("on_conflict", "user_id,key")])
            .header("Prefer", "resolution=merge-duplicates")
            .json(&[row])
            .send()
            .await
            .with_context(|| format!("Failed to send upsert request for '{key}'"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = error_body(response).await;
            error!("Upsert of '{}' failed with status: {}. Body: {}", key, status, body);
            bail!("Server returned error: {} - {}", status, body);
        }
        info!("Uploaded '{}' to {}", key, url);
        Ok(())
    }
}

struct PendingWrite {
    value: Value,
    // None when scheduled outside a runtime; only `flush` sends it then.
    handle: Option<JoinHandle<()>>,
}

impl PendingWrite {
    fn is_done(&self) -> bool {
        self.handle.as_ref().is_some_and(JoinHandle::is_finished)
    }

    fn cancel(&self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}

/// Best-effort remote writer with a trailing debounce per key.
///
/// Scheduling a key that already has a write waiting replaces it, so only
/// the newest value is sent once the key has been quiet for `debounce`.
/// Failures are logged and dropped. Without a Tokio runtime the timer can't
/// start, so the write waits for the next `flush`.
pub struct SyncScheduler {
    remote: Arc<dyn RemoteStore>,
    debounce: Duration,
    pending: Arc<Mutex<HashMap<String, PendingWrite>>>,
}

impl SyncScheduler {
    pub fn new(remote: Arc<dyn RemoteStore>, debounce: Duration) -> Self {
        Self {
            remote,
            debounce,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn schedule(&self, key: &str, value: Value) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.remove(key) {
            previous.cancel();
            debug!("Replaced pending upload of '{}'", key);
        }

        let handle = match Handle::try_current() {
            Ok(runtime) => {
                let remote = Arc::clone(&self.remote);
                let delay = self.debounce;
                let task_key = key.to_string();
                let task_value = value.clone();
                Some(runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Err(e) = remote.upsert(&task_key, &task_value).await {
                        error!("Remote save of '{}' failed: {:#}", task_key, e);
                    }
                }))
            }
            Err(_) => {
                warn!("No async runtime; upload of '{}' waits for the next flush", key);
                None
            }
        };
        pending.insert(key.to_string(), PendingWrite { value, handle });
    }

    /// Keys whose upload hasn't run yet, sorted.
    #[must_use]
    pub fn pending_keys(&self) -> Vec<String> {
        let pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = pending
            .iter()
            .filter(|(_, write)| !write.is_done())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Sends every waiting write now instead of after its debounce.
    pub async fn flush(&self) {
        let writes: Vec<(String, PendingWrite)> = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            pending.drain().collect()
        };
        for (key, write) in writes {
            if write.is_done() {
                continue;
            }
            write.cancel();
            if let Err(e) = self.remote.upsert(&key, &write.value).await {
                error!("Remote save of '{}' failed: {:#}", key, e);
            }
        }
    }

    /// Fetches a document, treating any failure as "nothing stored remotely".
    pub async fn fetch(&self, key: &str) -> Option<Value> {
        match self.remote.fetch_by_key(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Remote fetch of '{}' failed: {:#}", key, e);
                None
            }
        }
    }
}
