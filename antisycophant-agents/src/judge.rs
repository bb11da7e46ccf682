//! Judge Selector
//!
//! Asks the model to act as an editor over its own candidates and pick the
//! one that is correct and pushes back on flawed premises, rather than the
//! most agreeable one.

use thiserror::Error;
use tracing::{debug, error, info, warn};

use antisycophant_core::{parse_verdict, CandidateSet, Judgement, Selection, VerdictParseError};

use crate::{LlmError, SharedBackend};

/// Framing that precedes the candidate list
const JUDGE_PREAMBLE: &str = r#"
You are a helpful and discerning editor. Your task is to select the single best response to a user's query from a list of candidates.
The best response is one that is factually correct, challenges flawed premises, and is the most helpful and actionable for the user. A response that agrees with a false premise is the worst possible choice.

**Original User Query:** "{query}"

**Candidate Responses:**
"#;

/// Task and output format that follow the candidate list
const JUDGE_INSTRUCTIONS: &str = r#"

---
**Your Task:**
1.  **Analyze:** Carefully compare the candidates. Prioritize correctness and critical thinking over simple agreeableness.
2.  **Select:** Choose the one that is the most helpful and accurate.
3.  **Output Format:** Respond *only* in the following format, with no preamble:
    WINNER: [Name of the winning candidate, e.g., Fact-Checker]
    REASON: [A single sentence explaining your choice.]
    RESPONSE: [The full, unmodified text of the winning response.]
"#;

/// Errors from a judging round
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("judge generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error("judge reply could not be parsed: {0}")]
    Parse(#[from] VerdictParseError),
}

/// Build the meta-prompt embedding the query and every candidate
pub fn build_judge_prompt(query: &str, candidates: &CandidateSet) -> String {
    let mut prompt = JUDGE_PREAMBLE.replace("{query}", query);

    for candidate in candidates {
        prompt.push_str(&format!(
            "\n--- Candidate: {} ---\n{}",
            candidate.persona, candidate.text
        ));
    }

    prompt.push_str(JUDGE_INSTRUCTIONS);
    prompt
}

/// Picks the best candidate with a single model call
pub struct JudgeSelector {
    backend: SharedBackend,
}

impl JudgeSelector {
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }

    /// Run one judging round and parse the verdict
    pub async fn try_select(
        &self,
        query: &str,
        candidates: &CandidateSet,
    ) -> Result<Judgement, JudgeError> {
        let prompt = build_judge_prompt(query, candidates);
        debug!("Judge prompt is {} chars", prompt.len());

        let reply = self.backend.generate(&prompt).await?;
        let judgement = parse_verdict(&reply)?;

        if !judgement.winner_in(candidates) {
            warn!(
                "Judge picked '{}', which is not one of {:?}",
                judgement.winner,
                candidates.names()
            );
        }

        Ok(judgement)
    }

    /// Run one judging round, falling back to a safe default on any failure
    pub async fn select(&self, query: &str, candidates: &CandidateSet) -> Selection {
        match self.try_select(query, candidates).await {
            Ok(judgement) => {
                info!("Judge selected {}: {}", judgement.winner, judgement.reason);
                judgement.into()
            }
            Err(e) => {
                error!("LLM-as-a-Judge failed: {}. Returning a safe default.", e);
                Selection::fallback()
            }
        }
    }
}
