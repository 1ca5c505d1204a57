//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is built once in `main` and handed to whichever screen the
//! subcommand opens. Services sit behind trait objects so screens and
//! tests can swap implementations.

use std::sync::Arc;

use crate::llm::Generator;
use crate::services::auth::IdentityHandle;
use crate::services::chat::{ChatRoute, ChatSession};
use crate::services::persona::PersonaCatalog;
use crate::services::store::ChatStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ChatStore>,
    /// Optional generation client. `None` when no provider key is set.
    pub generator: Option<Arc<dyn Generator>>,
    pub catalog: Arc<PersonaCatalog>,
    pub identity: IdentityHandle,
}

impl AppState {
    #[must_use]
    pub fn new(
        store: Arc<dyn ChatStore>,
        generator: Option<Arc<dyn Generator>>,
        catalog: PersonaCatalog,
        identity: IdentityHandle,
    ) -> Self {
        Self { store, generator, catalog: Arc::new(catalog), identity }
    }

    /// Open a chat session for a route.
    ///
    /// An existing chat opened without `assistant` takes its persona from
    /// the stored chat row. Returns `None` when no generator is configured.
    #[must_use]
    pub fn open_chat(
        &self,
        route: ChatRoute,
        assistant: Option<&str>,
        description: Option<&str>,
    ) -> Option<ChatSession> {
        let generator = self.generator.clone()?;
        let persona = self.catalog.resolve(assistant, description);
        let adopt_stored = matches!(route, ChatRoute::Existing(_)) && assistant.is_none_or(|a| a.trim().is_empty());
        let session = ChatSession::new(route, persona, self.store.clone(), generator);
        Some(if adopt_stored { session.with_stored_persona(self.catalog.clone()) } else { session })
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
