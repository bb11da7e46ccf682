//! The judge's structured verdict
//!
//! The judge model is asked to answer in exactly this shape:
//!
//! ```text
//! WINNER: <candidate name>
//! REASON: <one sentence>
//! RESPONSE: <full winning text>
//! ```
//!
//! [`parse_verdict`] turns that reply into a [`Judgement`], or a
//! [`VerdictParseError`] naming what was wrong with it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CandidateSet, REASON_MARKER, RESPONSE_MARKER, WINNER_MARKER};

/// Final text shown when judging could not produce a selection
pub const JUDGE_FAILURE_MESSAGE: &str =
    "An error occurred during the final judging phase. Unable to select a response.";

/// Reason attached to the safe-default selection
pub const JUDGE_FAILURE_REASON: &str = "The judge did not return a usable verdict.";

/// Reasons a judge reply could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerdictParseError {
    #[error("judge reply is missing the {0} marker")]
    MissingMarker(&'static str),

    #[error("judge reply repeats the {0} marker")]
    DuplicateMarker(&'static str),

    #[error("judge reply markers are out of order (expected WINNER, REASON, RESPONSE)")]
    MarkersOutOfOrder,
}

/// A successfully parsed verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgement {
    /// Name of the winning candidate, as written by the judge
    pub winner: String,
    /// One-sentence justification
    pub reason: String,
    /// Full text of the winning response
    pub response: String,
}

impl Judgement {
    /// Whether the judge named a candidate that actually exists
    pub fn winner_in(&self, candidates: &CandidateSet) -> bool {
        candidates.contains(&self.winner)
    }
}

/// Position of the single occurrence of `marker` in `reply`
fn locate(reply: &str, marker: &'static str) -> Result<usize, VerdictParseError> {
    let mut hits = reply.match_indices(marker).map(|(pos, _)| pos);
    let first = hits.next().ok_or(VerdictParseError::MissingMarker(marker))?;
    if hits.next().is_some() {
        return Err(VerdictParseError::DuplicateMarker(marker));
    }
    Ok(first)
}

/// Parse a judge reply into its three fields.
///
/// Each marker must appear exactly once and in WINNER, REASON, RESPONSE
/// order. Field values are trimmed; text before `WINNER:` is ignored.
pub fn parse_verdict(reply: &str) -> Result<Judgement, VerdictParseError> {
    let winner_at = locate(reply, WINNER_MARKER)?;
    let reason_at = locate(reply, REASON_MARKER)?;
    let response_at = locate(reply, RESPONSE_MARKER)?;

    if !(winner_at < reason_at && reason_at < response_at) {
        return Err(VerdictParseError::MarkersOutOfOrder);
    }

    let winner = &reply[winner_at + WINNER_MARKER.len()..reason_at];
    let reason = &reply[reason_at + REASON_MARKER.len()..response_at];
    let response = &reply[response_at + RESPONSE_MARKER.len()..];

    Ok(Judgement {
        winner: winner.trim().to_string(),
        reason: reason.trim().to_string(),
        response: response.trim().to_string(),
    })
}

/// What the judging stage hands to response assembly.
///
/// `winner` is `None` only for the safe default returned when judging failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub final_text: String,
    pub winner: Option<String>,
    pub reason: String,
}

impl Selection {
    /// The safe default used whenever judging fails
    pub fn fallback() -> Self {
        Self {
            final_text: JUDGE_FAILURE_MESSAGE.to_string(),
            winner: None,
            reason: JUDGE_FAILURE_REASON.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.winner.is_none()
    }
}

impl From<Judgement> for Selection {
    fn from(judgement: Judgement) -> Self {
        Self {
            final_text: judgement.response,
            winner: Some(judgement.winner),
            reason: judgement.reason,
        }
    }
}
