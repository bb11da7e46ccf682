//! Request pipeline
//!
//! One request flows through three stages:
//! - Candidate generation, one answer per persona
//! - A single judging call over all candidates
//! - Assembly of the display triple
//!
//! Nothing escapes a request as an error: failed personas become
//! placeholders, a failed judge becomes the safe default, and a blank query
//! short-circuits before any model call.

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use antisycophant_agents::{CandidateGenerator, JudgeSelector, PersonaCatalog, SharedBackend};
use antisycophant_core::{CandidateSet, Response, Selection};

use crate::assembler::assemble;

/// Errors constructing a pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("persona catalog is empty")]
    NoPersonas,
}

/// Pipeline configuration
pub struct PipelineConfig {
    /// LLM backend (pre-constructed)
    pub backend: SharedBackend,
    /// Personas to generate candidates with, in display order
    pub catalog: PersonaCatalog,
    /// Generate candidates concurrently (otherwise one at a time)
    pub concurrent: bool,
}

/// Everything produced for one request
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Correlates log lines for this request
    pub request_id: Uuid,
    pub response: Response,
    /// Empty when the query was blank
    pub candidates: CandidateSet,
    /// `None` when the query was blank
    pub selection: Option<Selection>,
}

/// The generate-judge-assemble pipeline
pub struct Pipeline {
    generator: CandidateGenerator,
    judge: JudgeSelector,
    catalog: PersonaCatalog,
    concurrent: bool,
}

impl Pipeline {
    /// Create a new pipeline with configuration
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        if config.catalog.is_empty() {
            return Err(PipelineError::NoPersonas);
        }

        info!(
            "Pipeline ready: {} personas on {} ({})",
            config.catalog.len(),
            config.backend.model_name(),
            if config.concurrent { "concurrent" } else { "sequential" }
        );

        Ok(Self {
            generator: CandidateGenerator::new(config.backend.clone()),
            judge: JudgeSelector::new(config.backend),
            catalog: config.catalog,
            concurrent: config.concurrent,
        })
    }

    pub fn catalog(&self) -> &PersonaCatalog {
        &self.catalog
    }

    /// Answer a query and return the display triple
    pub async fn run(&self, query: &str) -> Response {
        self.run_with_details(query).await.response
    }

    /// Answer a query, keeping the intermediate candidates and selection
    pub async fn run_with_details(&self, query: &str) -> RunOutput {
        let request_id = Uuid::new_v4();

        if query.trim().is_empty() {
            debug!("Request {}: blank query, awaiting input", request_id);
            return RunOutput {
                request_id,
                response: Response::awaiting_input(),
                candidates: CandidateSet::new(),
                selection: None,
            };
        }

        info!("Request {}: {}", request_id, query);

        let candidates = if self.concurrent {
            self.generator.generate_all(query, &self.catalog).await
        } else {
            self.generator.generate_sequential(query, &self.catalog).await
        };

        let selection = self.judge.select(query, &candidates).await;
        let response = assemble(&selection, &candidates);

        info!(
            "Request {} complete: winner {}",
            request_id,
            selection.winner.as_deref().unwrap_or("<none>")
        );

        RunOutput {
            request_id,
            response,
            candidates,
            selection: Some(selection),
        }
    }
}
