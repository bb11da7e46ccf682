//! Response assembly
//!
//! Turns the judge's selection and the candidate set into the three strings
//! the presentation layer shows: the cleaned final answer, a winner banner,
//! and a view of every candidate.

use antisycophant_core::{normalize, CandidateSet, Response, Selection};

/// Banner for the safe-default selection
const SYSTEM_ERROR_BANNER: &str = "### ⚠️ System Error";

/// Short Markdown banner naming the winner and the judge's reason.
///
/// The reason is model text and is inserted verbatim, without emphasis.
pub fn winner_banner(selection: &Selection, candidates: &CandidateSet) -> String {
    let Some(winner) = &selection.winner else {
        return SYSTEM_ERROR_BANNER.to_string();
    };

    let unlisted = if candidates.contains(winner) {
        ""
    } else {
        " (not one of the generated candidates)"
    };

    format!(
        "### 🧠 AntiSycophant | Selected: **{}**{}\nJudge's reason: {}",
        winner, unlisted, selection.reason
    )
}

/// Every candidate, normalized, as consecutive Markdown blocks
pub fn render_candidates(candidates: &CandidateSet) -> String {
    let mut view = String::new();
    for candidate in candidates {
        view.push_str(&format!(
            "#### Candidate: {}\n\n{}\n\n",
            candidate.persona,
            normalize(&candidate.text)
        ));
    }
    view
}

/// Assemble the presentation triple
pub fn assemble(selection: &Selection, candidates: &CandidateSet) -> Response {
    Response {
        final_answer: normalize(&selection.final_text),
        winner_banner: winner_banner(selection, candidates),
        candidates_view: render_candidates(candidates),
    }
}
