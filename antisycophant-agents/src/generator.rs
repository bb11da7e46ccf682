//! Candidate Generator
//!
//! Answers the user query once per persona. Calls are independent, so they
//! run concurrently; results are collected in catalog order. A failed call
//! becomes a placeholder entry instead of aborting the batch.

use futures::future::join_all;
use tracing::{debug, info, warn};

use antisycophant_core::{Candidate, CandidateSet};

use crate::{Persona, PersonaCatalog, SharedBackend};

/// Generates one candidate answer per persona
pub struct CandidateGenerator {
    backend: SharedBackend,
}

impl CandidateGenerator {
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }

    /// Run every persona concurrently and collect results in catalog order
    pub async fn generate_all(&self, query: &str, catalog: &PersonaCatalog) -> CandidateSet {
        info!(
            "Generating {} candidates with {}",
            catalog.len(),
            self.backend.model_name()
        );

        let futures: Vec<_> = catalog
            .iter()
            .map(|persona| self.run_persona(persona, query))
            .collect();

        let candidates: CandidateSet = join_all(futures).await.into_iter().collect();
        self.log_outcome(&candidates);
        candidates
    }

    /// Run personas one at a time, in catalog order
    pub async fn generate_sequential(
        &self,
        query: &str,
        catalog: &PersonaCatalog,
    ) -> CandidateSet {
        info!(
            "Generating {} candidates sequentially with {}",
            catalog.len(),
            self.backend.model_name()
        );

        let mut candidates = CandidateSet::new();
        for persona in catalog.iter() {
            candidates.insert(self.run_persona(persona, query).await);
        }
        self.log_outcome(&candidates);
        candidates
    }

    /// Run a single persona; never fails
    async fn run_persona(&self, persona: &Persona, query: &str) -> Candidate {
        debug!("Running persona: {}", persona.name());

        let prompt = persona.build_prompt(query);
        match self.backend.generate(&prompt).await {
            Ok(text) => Candidate::generated(persona.name(), text),
            Err(e) => {
                warn!("Persona {} failed: {}", persona.name(), e);
                Candidate::failed(persona.name(), &e.to_string())
            }
        }
    }

    fn log_outcome(&self, candidates: &CandidateSet) {
        let failed = candidates.failure_count();
        if failed > 0 {
            warn!("{} of {} candidates failed", failed, candidates.len());
        } else {
            debug!("All {} candidates generated", candidates.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LlmBackend, LlmError};
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Echoes the prompt back and records every prompt it saw
    struct RecordingBackend {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmBackend for RecordingBackend {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(format!("answer to: {}", prompt))
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    /// Fails every call whose prompt contains `fail_on`
    struct FlakyBackend {
        fail_on: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmBackend for FlakyBackend {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if prompt.contains(self.fail_on) {
                Err(LlmError::Api("quota exceeded".to_string()))
            } else {
                Ok("fine".to_string())
            }
        }

        fn model_name(&self) -> &str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn test_one_entry_per_persona_in_order() {
        let backend = Arc::new(RecordingBackend {
            prompts: Mutex::new(Vec::new()),
        });
        let generator = CandidateGenerator::new(backend.clone());
        let catalog = PersonaCatalog::load_embedded();

        let candidates = generator.generate_all("The earth is flat.", &catalog).await;

        assert_eq!(candidates.names(), catalog.names());
        assert_eq!(candidates.failure_count(), 0);
        assert_eq!(backend.prompts.lock().unwrap().len(), 4);
        assert_eq!(
            candidates.get("Baseline"),
            Some("answer to: The earth is flat.")
        );
    }

    #[tokio::test]
    async fn test_prompts_follow_persona_template() {
        let backend = Arc::new(RecordingBackend {
            prompts: Mutex::new(Vec::new()),
        });
        let generator = CandidateGenerator::new(backend.clone());
        let catalog = PersonaCatalog::load_embedded();

        generator.generate_sequential("Is water a metal?", &catalog).await;

        let prompts = backend.prompts.lock().unwrap();
        assert_eq!(prompts[0], "Is water a metal?");
        for (prompt, persona) in prompts.iter().zip(catalog.iter()).skip(1) {
            assert_eq!(
                *prompt,
                format!("{}\n\nUser query: 'Is water a metal?'", persona.system_prompt())
            );
        }
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_batch() {
        let backend = Arc::new(FlakyBackend {
            fail_on: "fact-checker",
            calls: AtomicUsize::new(0),
        });
        let generator = CandidateGenerator::new(backend.clone());
        let catalog = PersonaCatalog::load_embedded();

        let candidates = generator.generate_all("The earth is flat.", &catalog).await;

        assert_eq!(candidates.len(), 4);
        assert_eq!(candidates.failure_count(), 1);
        assert_eq!(
            candidates.get("Fact-Checker"),
            Some("API Error for Fact-Checker: API error: quota exceeded")
        );
        assert_eq!(candidates.get("Few-Shot"), Some("fine"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_total_failure_still_complete() {
        let backend = Arc::new(FlakyBackend {
            fail_on: "",
            calls: AtomicUsize::new(0),
        });
        let generator = CandidateGenerator::new(backend);
        let catalog = PersonaCatalog::load_embedded();

        let candidates = generator.generate_all("anything", &catalog).await;

        assert_eq!(candidates.names(), catalog.names());
        assert_eq!(candidates.failure_count(), 4);
        assert!(candidates
            .iter()
            .all(|c| c.text.starts_with(&format!("API Error for {}:", c.persona))));
    }

    #[tokio::test]
    async fn test_sequential_matches_concurrent_order() {
        let backend = Arc::new(RecordingBackend {
            prompts: Mutex::new(Vec::new()),
        });
        let generator = CandidateGenerator::new(backend);
        let catalog = PersonaCatalog::load_embedded();

        let concurrent = generator.generate_all("q", &catalog).await;
        let sequential = generator.generate_sequential("q", &catalog).await;

        assert_eq!(concurrent, sequential);
    }

    /// Fails every call whose prompt starts with one of the listed system prompts
    struct MaskedBackend {
        failing: Vec<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmBackend for MaskedBackend {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fails = self
                .failing
                .iter()
                .any(|system| prompt.starts_with(&format!("{}\n", system)));
            if fails {
                Err(LlmError::RateLimited)
            } else {
                Ok(format!("ok: {}", prompt.lines().next().unwrap_or_default()))
            }
        }

        fn model_name(&self) -> &str {
            "masked"
        }
    }

    proptest! {
        #[test]
        fn test_any_failure_mask_keeps_one_entry_per_persona(
            mask in prop::collection::vec(any::<bool>(), 1..8),
            sequential in any::<bool>(),
        ) {
            let catalog: PersonaCatalog = (0..mask.len())
                .map(|i| Persona::new(&format!("p{}", i), &format!("Persona {}", i), &format!("system-{}", i)))
                .collect();
            let backend = Arc::new(MaskedBackend {
                failing: mask
                    .iter()
                    .enumerate()
                    .filter(|(_, fails)| **fails)
                    .map(|(i, _)| format!("system-{}", i))
                    .collect(),
                calls: AtomicUsize::new(0),
            });
            let generator = CandidateGenerator::new(backend.clone());

            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            let candidates = runtime.block_on(async {
                if sequential {
                    generator.generate_sequential("q", &catalog).await
                } else {
                    generator.generate_all("q", &catalog).await
                }
            });

            prop_assert_eq!(candidates.len(), mask.len());
            prop_assert_eq!(candidates.names(), catalog.names());
            prop_assert_eq!(backend.calls.load(Ordering::SeqCst), mask.len());
            prop_assert_eq!(
                candidates.failure_count(),
                mask.iter().filter(|fails| **fails).count()
            );

            for (i, (candidate, fails)) in candidates.iter().zip(&mask).enumerate() {
                prop_assert_eq!(candidate.failed, *fails);
                if *fails {
                    prop_assert_eq!(
                        &candidate.text,
                        &format!("API Error for Persona {}: {}", i, LlmError::RateLimited)
                    );
                } else {
                    prop_assert_eq!(&candidate.text, &format!("ok: system-{}", i));
                }
            }
        }
    }
}
