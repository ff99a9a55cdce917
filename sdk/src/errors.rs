//! Error types and handling
//!
//! This module provides the error type used throughout Codify. Every error
//! implements the `CodifyErrorExt` trait which provides a user-friendly hint
//! and indicates whether the error is recoverable by user action.
//!
//! # Categories
//!
//! - **Configuration**: missing or placeholder API keys, invalid config file
//! - **Input validation**: prompts over the character limit
//! - **External service**: chain invocation, tracing backend, keychain, network
//! - **Feedback mapping**: scores outside the lookup table, runs that cannot be rated
//!
//! Configuration, validation and feedback errors are shown to the user as
//! warnings and never reach the model. External service errors are not retried;
//! they propagate to the host that started the interaction.
//!
//! # Examples
//!
//! ```
//! use sdk::errors::{CodifyError, CodifyErrorExt, ErrorCategory};
//!
//! let error = CodifyError::InputTooLong { length: 600, limit: 500 };
//! assert_eq!(error.category(), ErrorCategory::InputValidation);
//! assert!(error.is_recoverable());
//!
//! let fatal = CodifyError::Chain("connection reset".to_string());
//! assert_eq!(fatal.category(), ErrorCategory::ExternalService);
//! assert!(!fatal.is_recoverable());
//! ```

use thiserror::Error;

/// Trait for Codify error extensions
pub trait CodifyErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint never contains secrets or raw provider responses.
    fn user_hint(&self) -> &str;

    /// Returns whether the user can recover from the error without a restart
    fn is_recoverable(&self) -> bool;
}

/// Broad error category, used by hosts to decide how an error is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Blocking precondition, shown as a configuration prompt
    Configuration,
    /// Input discarded with a warning
    InputValidation,
    /// Failure of a collaborator outside this process
    ExternalService,
    /// Rating that cannot be submitted
    FeedbackMapping,
}

/// Main Codify error type
#[derive(Debug, Error)]
pub enum CodifyError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    // Input validation errors
    #[error("⚠️ Your input is too long! Please limit your input to {limit} characters.")]
    InputTooLong { length: usize, limit: usize },

    // Feedback errors
    #[error("Invalid feedback score.")]
    UnmappedFeedbackScore { style: String, score: String },

    #[error("There is no response to rate yet.")]
    NoActiveRun,

    #[error("Feedback was already recorded for run {0}")]
    FeedbackAlreadyRecorded(String),

    // External service errors
    #[error("Chain invocation failed: {0}")]
    Chain(String),

    #[error("Tracing backend error: {0}")]
    Tracing(String),

    #[error("Keyring error: {0}")]
    KeyringError(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodifyError {
    /// Category of this error in the Codify error taxonomy
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) | Self::MissingApiKey(_) | Self::UnknownBackend(_) => {
                ErrorCategory::Configuration
            }
            Self::InputTooLong { .. } => ErrorCategory::InputValidation,
            Self::UnmappedFeedbackScore { .. }
            | Self::NoActiveRun
            | Self::FeedbackAlreadyRecorded(_) => ErrorCategory::FeedbackMapping,
            Self::Chain(_)
            | Self::Tracing(_)
            | Self::KeyringError(_)
            | Self::Network(_)
            | Self::Io(_) => ErrorCategory::ExternalService,
        }
    }
}

impl CodifyErrorExt for CodifyError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::MissingApiKey(_) => "Store the key with `codify setup` or enter it in the sidebar",
            Self::UnknownBackend(_) => "Choose either 'mistral' or 'gemini'",

            Self::InputTooLong { .. } => "Shorten your question and try again",

            Self::UnmappedFeedbackScore { .. } => "Pick one of the offered ratings",
            Self::NoActiveRun => "Ask a question first, then rate the answer",
            Self::FeedbackAlreadyRecorded(_) => "Each answer can be rated once",

            Self::Chain(_) => "The language model call failed. Check your API keys and network",
            Self::Tracing(_) => "The tracing service rejected the request. Check your LangSmith key",
            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",
            Self::Network(_) => "Network operation failed. Check your connection",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self.category(), ErrorCategory::ExternalService)
    }
}
