//! Conversation memory
//!
//! Keeps every turn of the session in order. The model only ever sees a
//! bounded window of the most recent exchanges; the UI sees the full list,
//! filtered by [`display_turns`].

use sdk::types::Turn;

/// Default number of user/assistant pairs passed to the model
pub const DEFAULT_WINDOW_PAIRS: usize = 5;

/// Ordered, append-only conversation history
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    turns: Vec<Turn>,

    /// Pairs returned by [`ConversationMemory::window`]
    window_pairs: usize,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW_PAIRS)
    }

    pub fn with_window(window_pairs: usize) -> Self {
        Self {
            turns: Vec::new(),
            window_pairs,
        }
    }

    /// Record one exchange
    pub fn save_context(&mut self, input: impl Into<String>, output: impl Into<String>) {
        self.turns.push(Turn::user(input));
        self.turns.push(Turn::assistant(output));
    }

    /// The last `window_pairs` exchanges, oldest first
    pub fn window(&self) -> Vec<Turn> {
        let keep = self.window_pairs.saturating_mul(2);
        let start = self.turns.len().saturating_sub(keep);
        self.turns[start..].to_vec()
    }

    /// Every recorded turn
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn window_pairs(&self) -> usize {
        self.window_pairs
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns to render in the chat view.
///
/// A user/assistant pair that exactly repeats the pair right before it is
/// dropped, so an exchange stored twice by a host is rendered once. A trailing
/// unpaired turn is always kept.
pub fn display_turns(turns: &[Turn]) -> Vec<Turn> {
    let mut shown = Vec::with_capacity(turns.len());
    let mut previous: Option<&[Turn]> = None;

    for pair in turns.chunks(2) {
        let repeat = pair.len() == 2 && previous == Some(pair);
        if !repeat {
            shown.extend_from_slice(pair);
        }
        previous = Some(pair);
    }

    shown
}
