//! Codify Engine Library
//!
//! Chat orchestration, model backends, LangSmith tracing and the hosts that
//! expose them. It is used by both the `codify` binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// Model backends and the streaming chain
pub mod llm;

/// LangSmith tracing and feedback client
pub mod langsmith;

/// Chat session, memory, feedback and the orchestrator
pub mod chat;

/// Browser chat host
pub mod ui_server;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
