//! Per-session chat state

use super::feedback;
use super::memory::{display_turns, ConversationMemory};
use crate::config::Config;
use crate::secrets::SecretString;
use sdk::types::{Backend, FeedbackRecord, FeedbackStyle, RunRecord, Turn};
use serde::Serialize;

/// Where the session is in its interaction cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    AwaitingResponse,
    Streaming,
    Completed,
    FeedbackPending,
}

/// Tracing settings chosen in the sidebar
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Use the stored key instead of `manual_api_key`
    pub use_demo_key: bool,

    pub manual_api_key: Option<SecretString>,

    /// LangSmith project runs are filed under
    pub project_name: String,
}

/// Everything one chat session owns
#[derive(Debug)]
pub struct SessionContext {
    pub memory: ConversationMemory,
    pub backend: Backend,
    pub feedback_style: FeedbackStyle,
    pub settings: SessionSettings,

    /// Run of the latest assistant response
    pub run: Option<RunRecord>,

    /// Rating submitted for `run`
    pub feedback: Option<FeedbackRecord>,

    state: SessionState,
    max_input_chars: usize,
}

impl SessionContext {
    pub fn new(config: &Config) -> Self {
        Self {
            memory: ConversationMemory::with_window(config.chat.memory_window_pairs),
            backend: config.llm.default_backend,
            feedback_style: config.chat.default_feedback_style,
            settings: SessionSettings {
                use_demo_key: config.langsmith.use_demo_key,
                manual_api_key: None,
                project_name: config.langsmith.project.clone(),
            },
            run: None,
            feedback: None,
            state: SessionState::Idle,
            max_input_chars: config.chat.max_input_chars,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn transition(&mut self, to: SessionState) {
        if self.state != to {
            tracing::debug!("Session {:?} -> {:?}", self.state, to);
        }
        self.state = to;
    }

    pub fn trace_url(&self) -> Option<&str> {
        self.run.as_ref().and_then(|r| r.trace_url.as_deref())
    }

    /// Forget the conversation, the last run and its rating
    pub fn clear_history(&mut self) {
        self.memory.clear();
        self.run = None;
        self.feedback = None;
        self.transition(SessionState::Idle);
    }

    /// Serializable view used by the browser host
    pub fn snapshot(&self) -> SessionSnapshot {
        let has_messages = !self.memory.is_empty();
        let awaiting_rating = self.run.is_some() && self.feedback.is_none();

        SessionSnapshot {
            messages: display_turns(self.memory.turns()),
            backend: self.backend,
            backends: Backend::ALL.to_vec(),
            feedback_style: self.feedback_style,
            feedback_options: feedback::options(self.feedback_style),
            show_style_toggle: has_messages,
            show_feedback: awaiting_rating,
            run_id: self.run.as_ref().map(|r| r.run_id.to_string()),
            trace_url: self.trace_url().map(str::to_string),
            use_demo_key: self.settings.use_demo_key,
            has_manual_key: self
                .settings
                .manual_api_key
                .as_ref()
                .is_some_and(|k| !k.is_blank()),
            project_name: self.settings.project_name.clone(),
            max_input_chars: self.max_input_chars,
            state: self.state,
        }
    }
}

/// Session as rendered by the chat page
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub messages: Vec<Turn>,
    pub backend: Backend,
    pub backends: Vec<Backend>,
    pub feedback_style: FeedbackStyle,
    pub feedback_options: Vec<&'static str>,

    /// `Thumbs ⇄ Faces` toggle is only offered once there are messages
    pub show_style_toggle: bool,

    pub show_feedback: bool,
    pub run_id: Option<String>,
    pub trace_url: Option<String>,
    pub use_demo_key: bool,
    pub has_manual_key: bool,
    pub project_name: String,
    pub max_input_chars: usize,
    pub state: SessionState,
}
