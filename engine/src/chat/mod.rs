//! Chat session handling
//!
//! - [`orchestrator`]: submit, record_trace, submit_feedback, clear_history
//! - [`memory`]: conversation turns and the bounded window sent to the model
//! - [`feedback`]: rating scales and score mapping
//! - [`session`]: explicit per-session state
//! - [`display`]: rendering targets

pub mod display;
pub mod feedback;
pub mod memory;
pub mod orchestrator;
pub mod session;

pub use display::{DisplayEvent, DisplaySurface, EventLog};
pub use feedback::FeedbackInput;
pub use memory::ConversationMemory;
pub use orchestrator::{ChatOrchestrator, FeedbackOutcome, SubmitOutcome};
pub use session::{SessionContext, SessionState};
