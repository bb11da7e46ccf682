//! AntiSycophant Core - domain model for persona candidates and judging
//!
//! This crate provides the foundational primitives:
//! - Ordered candidate sets, one entry per persona
//! - The judge's structured verdict format and its parser
//! - Markdown normalization for display
//! - The three-part response handed to the presentation layer

pub mod candidates;
pub mod normalize;
pub mod response;
pub mod verdict;

pub use candidates::*;
pub use normalize::*;
pub use response::*;
pub use verdict::*;

/// Marker preceding the winning candidate name in a judge reply
pub const WINNER_MARKER: &str = "WINNER:";

/// Marker preceding the one-sentence reason in a judge reply
pub const REASON_MARKER: &str = "REASON:";

/// Marker preceding the full winning response in a judge reply
pub const RESPONSE_MARKER: &str = "RESPONSE:";
