//! Candidate responses produced under each persona
//!
//! A [`CandidateSet`] keeps exactly one entry per persona, in the order the
//! personas were generated, so display and judge prompts are deterministic.

use serde::{Deserialize, Serialize};

/// A single persona's answer to the user query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Persona display name (e.g. "Fact-Checker")
    pub persona: String,
    /// Generated text, or an error placeholder when generation failed
    pub text: String,
    /// Whether `text` is an error placeholder
    #[serde(default)]
    pub failed: bool,
}

impl Candidate {
    pub fn generated(persona: &str, text: String) -> Self {
        Self {
            persona: persona.to_string(),
            text,
            failed: false,
        }
    }

    /// Placeholder entry for a persona whose generation call failed
    pub fn failed(persona: &str, detail: &str) -> Self {
        Self {
            persona: persona.to_string(),
            text: format!("API Error for {}: {}", persona, detail),
            failed: true,
        }
    }
}

/// Ordered mapping from persona name to candidate text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateSet {
    candidates: Vec<Candidate>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a candidate. A later entry for the same persona replaces the
    /// earlier one in place, keeping the original position.
    pub fn insert(&mut self, candidate: Candidate) {
        match self
            .candidates
            .iter_mut()
            .find(|c| c.persona == candidate.persona)
        {
            Some(existing) => *existing = candidate,
            None => self.candidates.push(candidate),
        }
    }

    /// Look up a candidate's text by persona name
    pub fn get(&self, persona: &str) -> Option<&str> {
        self.candidates
            .iter()
            .find(|c| c.persona == persona)
            .map(|c| c.text.as_str())
    }

    pub fn contains(&self, persona: &str) -> bool {
        self.candidates.iter().any(|c| c.persona == persona)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    /// Persona names in insertion order
    pub fn names(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.persona.as_str()).collect()
    }

    /// Number of candidates whose generation failed
    pub fn failure_count(&self) -> usize {
        self.candidates.iter().filter(|c| c.failed).count()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl FromIterator<Candidate> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = Candidate>>(iter: I) -> Self {
        let mut set = Self::new();
        for candidate in iter {
            set.insert(candidate);
        }
        set
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}
