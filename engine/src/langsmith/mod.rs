//! Run tracing and feedback
//!
//! Every chain invocation is recorded as a run on a LangSmith-compatible
//! service. The [`TracingBackend`] trait is the seam between the chat
//! orchestrator and that service; [`client::LangSmithClient`] speaks its REST
//! API, and [`collector::RunCollector`] turns chain callbacks into ordered
//! backend calls.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sdk::errors::CodifyError;
use sdk::types::{FeedbackRecord, RunId};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::secrets::SecretString;

pub mod client;
pub mod collector;

pub use client::{LangSmithClient, LangSmithConnector};
pub use collector::RunCollector;

/// Result type for tracing operations
pub type Result<T> = std::result::Result<T, TracingError>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum TracingError {
    #[error("Tracing service rejected the API key: {0}")]
    Unauthorized(String),

    #[error("Run not found: {0}")]
    NotFound(String),

    #[error("Tracing service error ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response: {0}")]
    Parse(String),
}

impl From<TracingError> for CodifyError {
    fn from(error: TracingError) -> Self {
        CodifyError::Tracing(error.to_string())
    }
}

/// New run posted when a chain starts
#[derive(Debug, Clone, Serialize)]
pub struct RunCreate {
    pub id: RunId,
    pub name: String,
    pub run_type: String,
    pub inputs: Value,
    pub start_time: DateTime<Utc>,

    /// Project the run is filed under
    pub session_name: String,

    pub tags: Vec<String>,
    pub extra: Value,
}

/// Completion of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunUpdate {
    pub end_time: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Rating attached to a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackCreate {
    pub run_id: RunId,
    pub key: String,
    pub score: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Service runs and feedback are recorded on
#[async_trait]
pub trait TracingBackend: Send + Sync {
    async fn create_run(&self, run: &RunCreate) -> Result<()>;

    async fn update_run(&self, run_id: RunId, update: &RunUpdate) -> Result<()>;

    /// Publish a run and return its public URL
    async fn share_run(&self, run_id: RunId) -> Result<String>;

    async fn create_feedback(&self, feedback: &FeedbackCreate) -> Result<FeedbackRecord>;
}

/// Builds a backend from the credentials of the current session
pub trait TracingConnector: Send + Sync {
    fn connect(&self, api_key: SecretString) -> Result<Arc<dyn TracingBackend>>;
}
