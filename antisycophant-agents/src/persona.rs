//! Persona catalog
//!
//! Each persona is a system prompt that steers how the same query is
//! answered. Definitions live in TOML files under `prompts/`; the embedded
//! set is compiled in, and a directory of the same files can replace it.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors loading personas from disk
#[derive(Debug, Error)]
pub enum PersonaError {
    #[error("failed to read personas from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid persona file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// A persona definition loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct Persona {
    pub persona: PersonaMetadata,
    pub prompt: PromptConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonaMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    /// The baseline persona receives the raw query with no system prompt
    #[serde(default)]
    pub baseline: bool,
    /// Sort key when loading from a directory
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptConfig {
    pub system: String,
}

impl Persona {
    /// Create a persona in code rather than from TOML
    pub fn new(id: &str, name: &str, system: &str) -> Self {
        Self {
            persona: PersonaMetadata {
                id: id.to_string(),
                name: name.to_string(),
                enabled: true,
                baseline: false,
                order: 0,
                description: None,
            },
            prompt: PromptConfig {
                system: system.to_string(),
            },
        }
    }

    /// Mark this persona as the no-instruction baseline
    pub fn as_baseline(mut self) -> Self {
        self.persona.baseline = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.persona.name
    }

    pub fn is_baseline(&self) -> bool {
        self.persona.baseline
    }

    /// Get the system prompt
    pub fn system_prompt(&self) -> &str {
        &self.prompt.system
    }

    /// Build the prompt sent to the model for `query`.
    ///
    /// The baseline persona forwards the query untouched.
    pub fn build_prompt(&self, query: &str) -> String {
        if self.is_baseline() {
            query.to_string()
        } else {
            format!("{}\n\nUser query: '{}'", self.system_prompt(), query)
        }
    }
}

/// Ordered catalog of enabled personas
#[derive(Debug, Clone, Default)]
pub struct PersonaCatalog {
    personas: Vec<Persona>,
}

impl PersonaCatalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the personas compiled into the binary, in display order
    pub fn load_embedded() -> Self {
        let mut catalog = Self::new();

        let embedded = [
            ("baseline.toml", include_str!("../prompts/baseline.toml")),
            ("fact_checker.toml", include_str!("../prompts/fact_checker.toml")),
            ("chain_of_thought.toml", include_str!("../prompts/chain_of_thought.toml")),
            ("few_shot.toml", include_str!("../prompts/few_shot.toml")),
        ];

        for (file, toml_str) in embedded {
            match toml::from_str::<Persona>(toml_str) {
                Ok(persona) if persona.persona.enabled => catalog.register(persona),
                Ok(persona) => debug!("Skipping disabled persona {}", persona.persona.id),
                Err(e) => warn!("Embedded persona {} is invalid: {}", file, e),
            }
        }

        catalog
    }

    /// Load every `*.toml` persona in `dir`, ordered by `(order, id)`.
    ///
    /// Unlike the embedded set, a malformed file is an error.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, PersonaError> {
        let dir = dir.as_ref();
        let io_err = |source| PersonaError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut loaded = Vec::new();

        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();

            if path.extension().is_some_and(|ext| ext == "toml") {
                let content = std::fs::read_to_string(&path).map_err(|source| PersonaError::Io {
                    path: path.clone(),
                    source,
                })?;
                let persona = toml::from_str::<Persona>(&content)
                    .map_err(|source| PersonaError::Parse { path: path.clone(), source })?;

                if persona.persona.enabled {
                    loaded.push(persona);
                } else {
                    debug!("Skipping disabled persona {}", persona.persona.id);
                }
            }
        }

        loaded.sort_by(|a, b| {
            (a.persona.order, &a.persona.id).cmp(&(b.persona.order, &b.persona.id))
        });

        let mut catalog = Self::new();
        for persona in loaded {
            catalog.register(persona);
        }
        Ok(catalog)
    }

    /// Register a persona at the end of the catalog.
    ///
    /// A persona with the same display name replaces the earlier entry in
    /// place, since candidates are keyed by name.
    pub fn register(&mut self, persona: Persona) {
        match self.personas.iter_mut().find(|p| p.name() == persona.name()) {
            Some(existing) => {
                warn!("Persona '{}' registered twice, keeping the later one", persona.name());
                *existing = persona;
            }
            None => self.personas.push(persona),
        }
    }

    /// Get a persona by display name
    pub fn get(&self, name: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.name() == name)
    }

    /// The baseline persona, if the catalog has one
    pub fn baseline(&self) -> Option<&Persona> {
        self.personas.iter().find(|p| p.is_baseline())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Persona> {
        self.personas.iter()
    }

    /// Display names in catalog order
    pub fn names(&self) -> Vec<&str> {
        self.personas.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

impl FromIterator<Persona> for PersonaCatalog {
    fn from_iter<I: IntoIterator<Item = Persona>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for persona in iter {
            catalog.register(persona);
        }
        catalog
    }
}
