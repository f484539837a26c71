//! LLM access.
//!
//! [`ChatModel`] is the seam between business logic and a concrete provider so the
//! classifier and chat features can run against [`deepseek::DeepSeekClient`] in
//! production and a scripted model in tests.

pub mod deepseek;

use serde::{Deserialize, Serialize};
use std::{future::Future, pin::Pin};
use thiserror::Error;

pub use deepseek::DeepSeekClient;

/// Boxed future returned by [`ChatModel::complete`].
pub type LlmFuture<'a> = Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>>;

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions
    System,
    /// End user
    User,
    /// Model reply
    Assistant,
}

/// One message of a chat-completion conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who said it
    pub role: Role,
    /// What was said
    pub content: String,
}

impl ChatMessage {
    /// System prompt message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// User message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Provider failures. The service never retries these.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport failure
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("LLM API error {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body as returned by the provider
        body: String,
    },

    /// Provider answered without any choice content
    #[error("LLM returned an empty reply")]
    EmptyReply,
}

impl From<LlmError> for crate::errors::Error {
    fn from(value: LlmError) -> Self {
        Self::Llm {
            message: value.to_string(),
        }
    }
}

/// A chat-completion model.
pub trait ChatModel: Send + Sync {
    /// Sends `messages` and returns the text of the first reply.
    fn complete<'a>(&'a self, messages: &'a [ChatMessage]) -> LlmFuture<'a>;
}
