//! Typed HTTP client for the Ledgerly API.
//!
//! Every call goes through [`ApiClient::request`], which
//!
//! - enforces a per-attempt timeout with `tokio::time::timeout`
//! - retries HTTP 5xx, network errors and timeouts up to `retries` times after a fixed delay
//! - injects `Authorization: Bearer <token>` from the shared token store
//! - unwraps the `{code, message, data}` envelope
//! - records one [`AuditEntry`] per call in the optional [`AuditQueue`]

pub mod audit;

pub use audit::AuditQueue;

use crate::{
    core::{
        audit::AuditEntry,
        reminder::{self, LocalReminder, ReminderView},
    },
    entities::reminder::ReminderType,
};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{
    sync::{Arc, RwLock},
    time::{Duration, Instant},
};
use thiserror::Error;
use tracing::{debug, warn};

/// Client failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// No complete response within the timeout
    #[error("request timed out after {}ms", .after.as_millis())]
    Timeout {
        /// The timeout that elapsed
        after: Duration,
    },

    /// Connection or transport failure
    #[error("network error: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("HTTP {status}: {message}")]
    Http {
        /// Status code
        status: u16,
        /// Envelope message or raw body
        message: String,
    },

    /// Success status but a non-zero envelope code
    #[error("API error {code}: {message}")]
    Api {
        /// Envelope code
        code: i64,
        /// Envelope message
        message: String,
    },

    /// Body did not match the expected shape
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Stable tag for logs and audit entries.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "TIMEOUT",
            Self::Network(_) => "NETWORK",
            Self::Http { .. } => "HTTP",
            Self::Api { .. } => "API",
            Self::Decode(_) => "DECODE",
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network(_) => true,
            Self::Http { status, .. } => *status >= 500,
            Self::Api { .. } | Self::Decode(_) => false,
        }
    }
}

/// Client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, e.g. `http://localhost:3000/api/v1`
    pub base_url: String,
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Extra attempts after the first
    pub retries: u32,
    /// Pause between attempts
    pub retry_delay: Duration,
}

impl ClientConfig {
    /// Defaults: 10 s timeout, 1 retry, 500 ms delay.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(10),
            retries: 1,
            retry_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Deserialize)]
struct WireEnvelope {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Value,
}

/// Ledgerly API client. Cheap to clone; clones share the token store and audit queue.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    token: Arc<RwLock<Option<String>>>,
    audit: Option<AuditQueue>,
}

impl ApiClient {
    /// Creates a client without auditing.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config: Arc::new(config),
            token: Arc::new(RwLock::new(None)),
            audit: None,
        }
    }

    /// Records every call in `queue`.
    #[must_use]
    pub fn with_audit(mut self, queue: AuditQueue) -> Self {
        self.audit = Some(queue);
        self
    }

    /// Replaces the bearer token; `None` stops sending `Authorization`.
    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token;
        }
    }

    fn bearer(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    /// `GET path`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.request(Method::GET, path, None).await
    }

    /// `POST path` with a JSON body.
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let body = serde_json::to_value(body).map_err(|e| ClientError::Decode(e.to_string()))?;
        self.request(Method::POST, path, Some(body)).await
    }

    /// `PATCH path` with a JSON body.
    pub async fn patch<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let body = serde_json::to_value(body).map_err(|e| ClientError::Decode(e.to_string()))?;
        self.request(Method::PATCH, path, Some(body)).await
    }

    /// Sends a request with retries and records it in the audit queue.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ClientError> {
        let started = Instant::now();
        let outcome = self.send_with_retries(&method, path, body.as_ref()).await;

        if let Some(queue) = &self.audit {
            queue.push(AuditEntry {
                method: method.to_string(),
                path: path.to_string(),
                status: match &outcome {
                    Ok((status, _)) => Some(status.as_u16()),
                    Err(ClientError::Http { status, .. }) => Some(*status),
                    Err(_) => None,
                },
                latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                error: outcome.as_ref().err().map(|e| e.kind().to_string()),
            });
        }

        let (_, data) = outcome?;
        serde_json::from_value(data).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Sends without auditing; used by the audit queue itself.
    pub(crate) async fn send_unaudited(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ClientError> {
        self.send_with_retries(&method, path, body.as_ref())
            .await
            .map(|(_, data)| data)
    }

    async fn send_with_retries(
        &self,
        method: &Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<(StatusCode, Value), ClientError> {
        let mut attempt = 0;
        loop {
            match self.send_once(method, path, body).await {
                Err(e) if e.is_retryable() && attempt < self.config.retries => {
                    attempt += 1;
                    debug!(
                        "{method} {path} failed ({}), retry {attempt}/{}",
                        e.kind(),
                        self.config.retries
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                result => return result,
            }
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<(StatusCode, Value), ClientError> {
        let url = format!("{}{path}", self.config.base_url);
        let mut builder = self.http.request(method.clone(), url);
        if let Some(token) = self.bearer() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status();
            let text = response.text().await?;
            Ok::<_, reqwest::Error>((status, text))
        };

        let (status, text) = tokio::time::timeout(self.config.timeout, exchange)
            .await
            .map_err(|_| ClientError::Timeout {
                after: self.config.timeout,
            })?
            .map_err(|e| ClientError::Network(e.to_string()))?;

        decode_envelope(status, &text).map(|data| (status, data))
    }

    /// Resolves the audit reminder: the server's when it is reachable and has one,
    /// otherwise `local`'s heuristic view.
    pub async fn audit_reminder_state(&self, local: &LocalReminder) -> ReminderView {
        let now = chrono::Utc::now();
        let server = match self.get::<Vec<ReminderView>>("/reminders").await {
            Ok(reminders) => reminders
                .into_iter()
                .find(|r| r.reminder_type == ReminderType::Audit),
            Err(e) => {
                warn!("Reminder server unavailable ({}), using local state", e.kind());
                None
            }
        };
        reminder::reconcile(server, local, ReminderType::Audit, now)
    }
}

fn decode_envelope(status: StatusCode, text: &str) -> Result<Value, ClientError> {
    let envelope = serde_json::from_str::<WireEnvelope>(text);

    if !status.is_success() {
        let message = envelope.map_or_else(|_| text.to_string(), |e| e.message);
        return Err(ClientError::Http {
            status: status.as_u16(),
            message,
        });
    }

    let envelope = envelope.map_err(|e| ClientError::Decode(e.to_string()))?;
    if envelope.code != 0 {
        return Err(ClientError::Api {
            code: envelope.code,
            message: envelope.message,
        });
    }
    Ok(envelope.data)
}
