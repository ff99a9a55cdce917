//! Codify SDK
//!
//! Shared domain model and error taxonomy for Codify components.
//! This crate is used by the engine library, its binary and its UI hosts.

/// Error types and handling
pub mod errors;

/// Chat domain types
pub mod types;

// Re-export commonly used types
pub use errors::{CodifyError, CodifyErrorExt, ErrorCategory};
pub use types::{Backend, FeedbackRecord, FeedbackStyle, Role, RunId, RunRecord, Turn};
