//! Rating scales and score mapping

use sdk::types::FeedbackStyle;
use serde::{Deserialize, Serialize};

const THUMBS: [(&str, f64); 2] = [("👍", 1.0), ("👎", 0.0)];

const FACES: [(&str, f64); 5] = [
    ("😀", 1.0),
    ("🙂", 0.75),
    ("😐", 0.5),
    ("🙁", 0.25),
    ("😞", 0.0),
];

fn table(style: FeedbackStyle) -> &'static [(&'static str, f64)] {
    match style {
        FeedbackStyle::Thumbs => &THUMBS,
        FeedbackStyle::Faces => &FACES,
    }
}

/// Normalized score for a raw rating, `None` if the style does not offer it
pub fn score_for(style: FeedbackStyle, raw: &str) -> Option<f64> {
    let raw = raw.trim();
    table(style)
        .iter()
        .find(|(key, _)| *key == raw)
        .map(|(_, score)| *score)
}

/// Ratings offered by a style, in display order
pub fn options(style: FeedbackStyle) -> Vec<&'static str> {
    table(style).iter().map(|(key, _)| *key).collect()
}

/// Feedback key recorded with the score, e.g. `thumbs 👍`
pub fn feedback_key(style: FeedbackStyle, raw: &str) -> String {
    format!("{} {}", style, raw.trim())
}

/// A rating as submitted by the widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackInput {
    pub score: String,

    #[serde(default)]
    pub text: Option<String>,
}

impl FeedbackInput {
    pub fn new(score: impl Into<String>) -> Self {
        Self {
            score: score.into(),
            text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Optional explanation, with blank text treated as absent
    pub fn comment(&self) -> Option<String> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }
}
