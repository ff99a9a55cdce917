//! Chat domain types shared by the engine and its hosts

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::CodifyError;

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message typed by the user
    User,

    /// Message produced by the model
    Assistant,
}

impl Role {
    /// Map a chat-history message type to a display role.
    ///
    /// Accepts both the display names (`user`, `assistant`) and the
    /// history-store names (`human`, `ai`).
    pub fn from_message_type(kind: &str) -> Option<Self> {
        match kind {
            "human" | "user" => Some(Role::User),
            "ai" | "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }

    /// Avatar shown next to the chat bubble
    pub fn avatar(&self) -> Option<&'static str> {
        match self {
            Role::User => None,
            Role::Assistant => Some("🤖"),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message of the conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Hosted model backend a chain is bound to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Mistral,
    #[default]
    Gemini,
}

impl Backend {
    /// All backends in the order the selector lists them
    pub const ALL: [Backend; 2] = [Backend::Mistral, Backend::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Mistral => "mistral",
            Backend::Gemini => "gemini",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = CodifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mistral" => Ok(Backend::Mistral),
            "gemini" => Ok(Backend::Gemini),
            other => Err(CodifyError::UnknownBackend(other.to_string())),
        }
    }
}

/// Rating widget flavour
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStyle {
    /// 👍 / 👎
    #[default]
    Thumbs,

    /// Five-point emoji scale
    Faces,
}

impl FeedbackStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackStyle::Thumbs => "thumbs",
            FeedbackStyle::Faces => "faces",
        }
    }

    /// The other style, as flipped by the `Thumbs ⇄ Faces` toggle
    pub fn toggled(&self) -> Self {
        match self {
            FeedbackStyle::Thumbs => FeedbackStyle::Faces,
            FeedbackStyle::Faces => FeedbackStyle::Thumbs,
        }
    }
}

impl fmt::Display for FeedbackStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackStyle {
    type Err = CodifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "thumbs" => Ok(FeedbackStyle::Thumbs),
            "faces" => Ok(FeedbackStyle::Faces),
            other => Err(CodifyError::Config(format!(
                "Unknown feedback style '{}'. Must be one of: thumbs, faces",
                other
            ))),
        }
    }
}

/// Opaque identifier of a traced run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Generate a fresh run id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// The run recorded for the latest assistant response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: RunId,

    /// Shareable link, set once the tracing backend has published the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_url: Option<String>,
}

impl RunRecord {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            trace_url: None,
        }
    }
}

/// A rating submitted for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Identifier assigned by the tracing backend
    pub id: String,

    pub run_id: RunId,

    /// Feedback key, e.g. `thumbs 👍`
    pub key: String,

    /// Normalized score in [0, 1]
    pub score: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}
