//! Codify prompt template

use super::Message;
use sdk::types::{Role, Turn};

/// Persona the code-generator chain runs with
pub const SYSTEM_PROMPT: &str = "You are Codify, a friendly and precise coding partner. \
Help the user understand and solve programming problems. \
Prefer short explanations followed by complete, runnable code in fenced Markdown blocks \
tagged with the language. Point out edge cases and common mistakes. \
When a question is ambiguous, state the assumption you are making. \
If a request is unrelated to software development, politely steer the conversation back to coding.";

/// System prompt, prior conversation, then the new question
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    system: String,
}

impl PromptTemplate {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
        }
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn format(&self, chat_history: &[Turn], user_query: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(chat_history.len() + 2);
        messages.push(Message::system(self.system.clone()));

        for turn in chat_history {
            messages.push(match turn.role {
                Role::User => Message::user(turn.text.clone()),
                Role::Assistant => Message::assistant(turn.text.clone()),
            });
        }

        messages.push(Message::user(user_query));
        messages
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(SYSTEM_PROMPT)
    }
}
