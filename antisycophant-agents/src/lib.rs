//! AntiSycophant Agents
//!
//! The model-facing half of the pipeline:
//! - **Backends**: Gemini, OpenAI-compatible and Anthropic text generation
//! - **Personas**: system prompts that steer how a query is answered
//! - **Generator**: one candidate answer per persona
//! - **Judge**: the model picks the best of its own candidates
//!
//! ## Modular Personas
//!
//! Persona definitions are TOML files in `prompts/`.
//! See [`persona::PersonaCatalog`] for loading and ordering.

pub mod backend;
pub mod generator;
pub mod judge;
pub mod persona;

pub use backend::*;
pub use generator::*;
pub use judge::*;
pub use persona::*;
