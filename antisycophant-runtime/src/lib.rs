//! AntiSycophant Runtime
//!
//! Runs a query through persona generation, self-judging and response
//! assembly. See [`Pipeline`].

pub mod assembler;
pub mod pipeline;

pub use assembler::*;
pub use pipeline::*;
