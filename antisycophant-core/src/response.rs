//! The three-part output consumed by the presentation layer

use serde::{Deserialize, Serialize};

/// Final answer shown when the query was blank
pub const EMPTY_QUERY_PROMPT: &str = "Please enter a query.";

/// Banner shown when the query was blank
pub const AWAITING_SELECTION_BANNER: &str = "Awaiting selection...";

/// Assembled result of one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Winning text with Markdown stripped
    pub final_answer: String,
    /// Short Markdown banner naming the winner and the judge's reason
    pub winner_banner: String,
    /// Every candidate, normalized, as consecutive Markdown blocks
    pub candidates_view: String,
}

impl Response {
    /// Prompt-for-input triple returned for a blank query
    pub fn awaiting_input() -> Self {
        Self {
            final_answer: EMPTY_QUERY_PROMPT.to_string(),
            winner_banner: AWAITING_SELECTION_BANNER.to_string(),
            candidates_view: String::new(),
        }
    }

    pub fn into_parts(self) -> (String, String, String) {
        (self.final_answer, self.winner_banner, self.candidates_view)
    }
}
