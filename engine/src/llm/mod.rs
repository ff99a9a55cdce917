//! LLM Provider Abstraction Layer
//!
//! Common interface for the hosted chat backends (Gemini, Mistral). Every
//! provider answers with a finite stream of text fragments; the
//! [`chain`] module wraps a provider with the Codify prompt and run callbacks.

use async_trait::async_trait;
use futures::stream::BoxStream;
use sdk::errors::CodifyError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod chain;
pub mod gemini;
pub mod mistral;
pub mod prompt;
pub mod sse;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl LLMError {
    /// Map a non-success HTTP status to an error
    pub fn from_status(provider: &str, status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            400 | 404 => LLMError::InvalidRequest(body),
            401 | 403 => LLMError::AuthenticationFailed(body),
            429 => LLMError::RateLimitExceeded,
            _ => LLMError::ProviderUnavailable(format!(
                "{} API error ({}): {}",
                provider, status, body
            )),
        }
    }

    /// Wrap a transport error, dropping the URL so query-string keys never leak
    pub fn from_transport(error: reqwest::Error) -> Self {
        LLMError::NetworkError(error.without_url().to_string())
    }

    fn from_secret(error: CodifyError) -> Self {
        match error {
            CodifyError::MissingApiKey(key) => LLMError::MissingApiKey(key),
            other => LLMError::AuthenticationFailed(other.to_string()),
        }
    }
}

impl From<LLMError> for CodifyError {
    fn from(error: LLMError) -> Self {
        match error {
            LLMError::MissingApiKey(key) => CodifyError::MissingApiKey(key),
            other => CodifyError::Chain(other.to_string()),
        }
    }
}

/// Message sent to a provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// One streamed fragment of a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatChunk {
    pub text: String,
}

impl ChatChunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Finite, non-restartable stream of response fragments
pub type ChunkStream = BoxStream<'static, Result<ChatChunk>>;

/// LLM Provider trait that all backends implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "gemini", "mistral")
    fn name(&self) -> &str;

    /// Model identifier requests are sent to
    fn model(&self) -> &str;

    /// Send the conversation and stream the answer back.
    ///
    /// Errors before the first fragment (auth, status, transport) are returned
    /// directly; errors mid-stream surface as an `Err` item.
    async fn stream(&self, messages: &[Message]) -> Result<ChunkStream>;

    /// Check if the provider is usable. Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let user_msg = Message::user("Hello");
        assert_eq!(user_msg.role, MessageRole::User);
        assert_eq!(user_msg.content, "Hello");

        assert_eq!(Message::assistant("Hi").role, MessageRole::Assistant);
        assert_eq!(Message::system("Be brief").role, MessageRole::System);
    }

    #[test]
    fn test_status_mapping() {
        use reqwest::StatusCode;

        assert!(matches!(
            LLMError::from_status("Gemini", StatusCode::BAD_REQUEST, "bad".into()),
            LLMError::InvalidRequest(_)
        ));
        assert!(matches!(
            LLMError::from_status("Gemini", StatusCode::FORBIDDEN, "no".into()),
            LLMError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            LLMError::from_status("Mistral", StatusCode::TOO_MANY_REQUESTS, String::new()),
            LLMError::RateLimitExceeded
        ));
        assert!(matches!(
            LLMError::from_status("Mistral", StatusCode::BAD_GATEWAY, String::new()),
            LLMError::ProviderUnavailable(_)
        ));
    }

    #[test]
    fn test_missing_key_keeps_its_category() {
        let err: CodifyError = LLMError::MissingApiKey("gemini_api_key".into()).into();
        assert!(matches!(err, CodifyError::MissingApiKey(_)));

        let err: CodifyError = LLMError::RateLimitExceeded.into();
        assert!(matches!(err, CodifyError::Chain(_)));
    }
}
