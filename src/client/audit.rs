//! Client-side audit batching.
//!
//! Entries are shipped to `POST /audit/logs` in batches of up to [`BATCH_SIZE`], either
//! as soon as a full batch is queued or every [`FLUSH_INTERVAL`]. The backlog is capped
//! at [`MAX_BACKLOG`]; when it overflows the oldest entries are dropped. A failed batch
//! goes back to the front of the queue.

use super::{ApiClient, ClientError};
use crate::core::audit::AuditEntry;
use reqwest::Method;
use serde_json::json;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{sync::Notify, task::JoinHandle};
use tracing::{debug, warn};

/// Entries per request.
pub const BATCH_SIZE: usize = 20;
/// Longest an entry waits before a flush is attempted.
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(15);
/// Backlog cap.
pub const MAX_BACKLOG: usize = 500;

const AUDIT_PATH: &str = "/audit/logs";

/// Shared queue of pending audit entries. Clones share the same queue.
#[derive(Clone, Default)]
pub struct AuditQueue {
    entries: Arc<Mutex<VecDeque<AuditEntry>>>,
    batch_ready: Arc<Notify>,
}

impl AuditQueue {
    /// Empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry, dropping the oldest past [`MAX_BACKLOG`].
    pub fn push(&self, entry: AuditEntry) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        entries.push_back(entry);
        let dropped = trim_backlog(&mut entries);
        if dropped > 0 {
            warn!("Audit backlog full, dropped {dropped} oldest entries");
        }
        if entries.len() >= BATCH_SIZE {
            self.batch_ready.notify_one();
        }
    }

    /// Number of queued entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |e| e.len())
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes and returns up to [`BATCH_SIZE`] of the oldest entries.
    #[must_use]
    pub fn take_batch(&self) -> Vec<AuditEntry> {
        self.entries.lock().map_or_else(
            |_| Vec::new(),
            |mut entries| {
                let n = entries.len().min(BATCH_SIZE);
                entries.drain(..n).collect()
            },
        )
    }

    /// Puts a failed batch back at the front, keeping the cap.
    pub fn requeue(&self, batch: Vec<AuditEntry>) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        for entry in batch.into_iter().rev() {
            entries.push_front(entry);
        }
        trim_backlog(&mut entries);
    }

    /// Ships one batch. On failure the batch is requeued and the error returned.
    pub async fn flush(&self, client: &ApiClient) -> Result<usize, ClientError> {
        let batch = self.take_batch();
        if batch.is_empty() {
            return Ok(0);
        }

        let count = batch.len();
        let body = json!({ "entries": batch });
        match client
            .send_unaudited(Method::POST, AUDIT_PATH, Some(body))
            .await
        {
            Ok(_) => {
                debug!(count, "audit batch shipped");
                Ok(count)
            }
            Err(e) => {
                warn!("Audit flush failed ({}), requeueing {count} entries", e.kind());
                self.requeue(batch);
                Err(e)
            }
        }
    }

    /// Flushes until fewer than a batch remains or a flush fails.
    async fn drain(&self, client: &ApiClient) {
        loop {
            match self.flush(client).await {
                Ok(count) if count > 0 && self.len() >= BATCH_SIZE => {}
                _ => break,
            }
        }
    }

    /// Spawns the background flusher. It runs on every full batch and every `interval`.
    pub fn spawn_flusher(&self, client: ApiClient, interval: Duration) -> JoinHandle<()> {
        let queue = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {},
                    () = queue.batch_ready.notified() => {},
                }
                queue.drain(&client).await;
            }
        })
    }
}

fn trim_backlog(entries: &mut VecDeque<AuditEntry>) -> usize {
    let overflow = entries.len().saturating_sub(MAX_BACKLOG);
    entries.drain(..overflow);
    overflow
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::client::tests::{dead_url, fast_config, spawn_server};
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::Value;
    use std::sync::Mutex as StdMutex;

    fn entry(i: usize) -> AuditEntry {
        AuditEntry {
            method: "GET".to_string(),
            path: format!("/call/{i}"),
            status: Some(200),
            latency_ms: 1,
            error: None,
        }
    }

    /// Collects every entry posted to the audit endpoint.
    async fn collector() -> (String, Arc<StdMutex<Vec<AuditEntry>>>) {
        let received = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let router = Router::new().route(
            AUDIT_PATH,
            post(move |Json(body): Json<Value>| {
                let sink = Arc::clone(&sink);
                async move {
                    let entries: Vec<AuditEntry> =
                        serde_json::from_value(body["entries"].clone()).unwrap();
                    let stored = entries.len();
                    sink.lock().unwrap().extend(entries);
                    Json(json!({"code": 0, "message": "ok", "data": {"stored": stored}}))
                }
            }),
        );
        (spawn_server(router).await, received)
    }

    #[test]
    fn test_backlog_is_capped_dropping_oldest() {
        let queue = AuditQueue::new();
        for i in 0..MAX_BACKLOG + 5 {
            queue.push(entry(i));
        }
        assert_eq!(queue.len(), MAX_BACKLOG);
        let first = queue.take_batch();
        assert_eq!(first.len(), BATCH_SIZE);
        assert_eq!(first[0].path, "/call/5");
    }

    #[test]
    fn test_requeue_goes_to_front() {
        let queue = AuditQueue::new();
        for i in 0..3 {
            queue.push(entry(i));
        }
        let batch = queue.take_batch();
        queue.push(entry(3));
        queue.requeue(batch);

        let order: Vec<_> = queue.take_batch().into_iter().map(|e| e.path).collect();
        assert_eq!(order, vec!["/call/0", "/call/1", "/call/2", "/call/3"]);
    }

    #[tokio::test]
    async fn test_flush_ships_one_batch() {
        let (base_url, received) = collector().await;
        let client = ApiClient::new(fast_config(base_url, 0));
        let queue = AuditQueue::new();
        for i in 0..BATCH_SIZE + 3 {
            queue.push(entry(i));
        }

        assert_eq!(queue.flush(&client).await.unwrap(), BATCH_SIZE);
        assert_eq!(queue.len(), 3);
        assert_eq!(received.lock().unwrap().len(), BATCH_SIZE);
    }

    #[tokio::test]
    async fn test_failed_flush_requeues() {
        let client = ApiClient::new(fast_config(dead_url().await, 0));
        let queue = AuditQueue::new();
        queue.push(entry(0));

        assert!(queue.flush(&client).await.is_err());
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_server_error_requeues() {
        let router = Router::new().route(
            AUDIT_PATH,
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"code": 500, "message": "down", "data": null})),
                )
            }),
        );
        let client = ApiClient::new(fast_config(spawn_server(router).await, 0));
        let queue = AuditQueue::new();
        queue.push(entry(0));

        let err = queue.flush(&client).await.unwrap_err();
        assert_eq!(err.kind(), "HTTP");
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_flusher_ships_full_batch_without_waiting() {
        let (base_url, received) = collector().await;
        let client = ApiClient::new(fast_config(base_url, 0));
        let queue = AuditQueue::new();
        let handle = queue.spawn_flusher(client, Duration::from_secs(3600));

        for i in 0..BATCH_SIZE {
            queue.push(entry(i));
        }

        for _ in 0..100 {
            if received.lock().unwrap().len() == BATCH_SIZE {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(received.lock().unwrap().len(), BATCH_SIZE);
        assert!(queue.is_empty());
        handle.abort();
    }

    #[tokio::test]
    async fn test_flusher_ships_partial_batch_on_interval() {
        let (base_url, received) = collector().await;
        let client = ApiClient::new(fast_config(base_url, 0));
        let queue = AuditQueue::new();
        let handle = queue.spawn_flusher(client, Duration::from_millis(50));

        queue.push(entry(0));
        for _ in 0..100 {
            if !received.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(received.lock().unwrap().len(), 1);
        handle.abort();
    }
}
