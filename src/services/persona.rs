//! Assistant persona catalog.
//!
//! Personas are static configuration loaded from `data/personas.yaml`. Each
//! carries an explicit storage policy; the chat orchestrator branches on
//! that tag, never on the display title.

use serde::Deserialize;

const BUILTIN_CATALOG: &str = include_str!("../../data/personas.yaml");

#[derive(Debug, thiserror::Error)]
pub enum PersonaError {
    #[error("persona catalog parse failed: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("duplicate persona title: {0}")]
    DuplicateTitle(String),
    #[error("persona title must not be empty")]
    EmptyTitle,
}

/// Whether conversations with a persona are written to the chat store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Storage {
    #[default]
    Durable,
    /// Nothing is persisted; the transcript lives only for the session.
    Ephemeral,
}

/// An assistant persona selected before entering a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Persona {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub storage: Storage,
    /// Extra system-prompt instruction for this persona.
    #[serde(default)]
    pub directive: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl Persona {
    /// An ad-hoc durable persona with no catalog entry.
    #[must_use]
    pub fn custom(title: &str, description: &str) -> Self {
        Self {
            title: title.to_owned(),
            description: description.to_owned(),
            storage: Storage::Durable,
            directive: None,
            capabilities: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_ephemeral(&self) -> bool {
        self.storage == Storage::Ephemeral
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    default: Persona,
    #[serde(default)]
    personas: Vec<Persona>,
}

/// The set of personas offered on the home screen.
#[derive(Debug, Clone)]
pub struct PersonaCatalog {
    default: Persona,
    personas: Vec<Persona>,
}

impl PersonaCatalog {
    /// Parse the catalog embedded in the binary.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded YAML is malformed.
    pub fn builtin() -> Result<Self, PersonaError> {
        Self::from_yaml(BUILTIN_CATALOG)
    }

    /// Parse a catalog from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed YAML, an empty title, or a duplicate
    /// title.
    pub fn from_yaml(text: &str) -> Result<Self, PersonaError> {
        let file: CatalogFile = serde_yaml::from_str(text)?;
        let mut seen = std::collections::HashSet::new();
        for persona in std::iter::once(&file.default).chain(&file.personas) {
            if persona.title.trim().is_empty() {
                return Err(PersonaError::EmptyTitle);
            }
            if !seen.insert(persona.title.as_str()) {
                return Err(PersonaError::DuplicateTitle(persona.title.clone()));
            }
        }
        Ok(Self { default: file.default, personas: file.personas })
    }

    #[must_use]
    pub fn default_persona(&self) -> &Persona {
        &self.default
    }

    /// Every selectable persona, default first.
    pub fn iter(&self) -> impl Iterator<Item = &Persona> {
        std::iter::once(&self.default).chain(&self.personas)
    }

    #[must_use]
    pub fn find(&self, title: &str) -> Option<&Persona> {
        self.iter().find(|p| p.title == title)
    }

    /// Resolve route parameters into the persona for a chat screen.
    ///
    /// A missing or blank title selects the default persona. A catalog title
    /// keeps its storage policy and capabilities; a non-empty `description`
    /// overrides the catalog description. Unknown titles become durable
    /// custom personas.
    #[must_use]
    pub fn resolve(&self, title: Option<&str>, description: Option<&str>) -> Persona {
        let title = title.map(str::trim).filter(|t| !t.is_empty());
        let description = description.map(str::trim).filter(|d| !d.is_empty());

        let mut persona = match title {
            None => self.default.clone(),
            Some(t) => self
                .find(t)
                .cloned()
                .unwrap_or_else(|| Persona::custom(t, "")),
        };
        if let Some(d) = description {
            persona.description = d.to_owned();
        }
        persona
    }

    /// Capability bullets shown on an empty transcript.
    #[must_use]
    pub fn capabilities<'a>(&'a self, persona: &'a Persona) -> &'a [String] {
        if persona.capabilities.is_empty() { &self.default.capabilities } else { &persona.capabilities }
    }
}

#[cfg(test)]
#[path = "persona_test.rs"]
mod tests;
