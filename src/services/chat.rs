//! Chat session — conversation orchestrator for one chat screen.
//!
//! DESIGN
//! ======
//! A `ChatSession` owns the in-memory transcript for one conversation and
//! drives the store and generator around it. It is opened either for a new
//! conversation (created lazily on the first durable send) or for an
//! existing one, which must exist and belong to the signed-in user.
//!
//! Ephemeral personas never touch the store: the prompt goes to the image
//! generator and the transcript lives only as long as the session.
//!
//! ERROR HANDLING
//! ==============
//! Failures never escape as `Err`. They land in a sticky banner
//! (`error()`), and generation failures additionally append a synthetic
//! `Error: ...` bot message that is never persisted.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::auth::IdentityHandle;
use super::persona::{Persona, PersonaCatalog};
use super::store::{ChatStore, NewChat, NewMessage, Sender, StoreError, StoredMessage};
use crate::llm::Generator;
use crate::llm::prompts::assistant_prompt;
use crate::llm::types::{LlmError, Message};

pub const CHAT_NOT_FOUND: &str = "Chat doesn't exist or doesn't belong to user";
pub const CHAT_CHECK_FAILED: &str = "Error checking chat";
pub const HISTORY_LOAD_FAILED: &str = "Error loading chat history";
pub const CHAT_CREATE_FAILED: &str = "Error creating new chat";
pub const DEFAULT_FAILURE_DETAIL: &str = "Failed to get response";

// =============================================================================
// TYPES
// =============================================================================

/// Which conversation a chat screen was opened for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatRoute {
    New,
    Existing(String),
}

impl ChatRoute {
    /// Parse a route parameter; `new` or an empty value opens a new chat.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw == "new" { Self::New } else { Self::Existing(raw.to_owned()) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Ready,
    Errored,
}

/// The conversation a session is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatInfo {
    /// `None` until the conversation has been created.
    pub id: Option<String>,
    pub title: String,
}

/// One message in the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub image_uri: Option<String>,
    pub sender: Sender,
    pub created_at: OffsetDateTime,
}

impl ChatMessage {
    fn new(text: String, sender: Sender, image_uri: Option<String>) -> Self {
        Self { id: Uuid::new_v4().to_string(), text, image_uri, sender, created_at: OffsetDateTime::now_utc() }
    }

    fn from_stored(stored: StoredMessage) -> Self {
        Self {
            id: stored.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            text: stored.text,
            image_uri: stored.image_uri,
            sender: stored.sender,
            created_at: stored.timestamp,
        }
    }

    fn to_new_message(&self) -> NewMessage {
        NewMessage {
            text: self.text.clone(),
            sender: self.sender,
            timestamp: self.created_at,
            image_uri: self.image_uri.clone(),
        }
    }

    fn to_llm_message(&self) -> Message {
        match self.sender {
            Sender::User => Message::user(&self.text),
            Sender::Bot => Message::assistant(&self.text),
        }
    }
}

/// Result of a [`ChatSession::send`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Preconditions not met; nothing changed.
    Ignored,
    /// A bot reply was appended.
    Replied,
    /// The send failed; see the banner.
    Failed,
}

/// Why a durable exchange failed after the conversation existed.
#[derive(Debug, thiserror::Error)]
enum ExchangeError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl ExchangeError {
    fn detail(&self) -> String {
        let detail = match self {
            Self::Store(e) => e.to_string(),
            Self::Llm(e) => e.user_detail(),
        };
        failure_detail(detail)
    }
}

fn failure_detail(detail: String) -> String {
    if detail.trim().is_empty() { DEFAULT_FAILURE_DETAIL.to_owned() } else { detail }
}

// =============================================================================
// SESSION
// =============================================================================

pub struct ChatSession {
    store: Arc<dyn ChatStore>,
    generator: Arc<dyn Generator>,
    route: ChatRoute,
    persona: Persona,
    /// When set, an existing chat's stored persona replaces `persona`.
    catalog: Option<Arc<PersonaCatalog>>,
    phase: Phase,
    chat: ChatInfo,
    messages: Vec<ChatMessage>,
    input: String,
    error: Option<String>,
    sending: bool,
    redirect: bool,
}

impl ChatSession {
    #[must_use]
    pub fn new(route: ChatRoute, persona: Persona, store: Arc<dyn ChatStore>, generator: Arc<dyn Generator>) -> Self {
        let chat = ChatInfo { id: None, title: persona.title.clone() };
        Self {
            store,
            generator,
            route,
            persona,
            catalog: None,
            phase: Phase::Initializing,
            chat,
            messages: Vec::new(),
            input: String::new(),
            error: None,
            sending: false,
            redirect: false,
        }
    }

    /// Take the persona from the stored chat row when an existing chat is
    /// opened without an explicit assistant.
    #[must_use]
    pub fn with_stored_persona(mut self, catalog: Arc<PersonaCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn chat(&self) -> &ChatInfo {
        &self.chat
    }

    #[must_use]
    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: &str) {
        text.clone_into(&mut self.input);
    }

    /// Sticky error banner, cleared on the next accepted send.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn is_sending(&self) -> bool {
        self.sending
    }

    /// Whether the screen should navigate back home.
    #[must_use]
    pub fn should_redirect(&self) -> bool {
        self.redirect
    }

    /// Forget an in-flight send whose future was dropped.
    pub fn abandon_send(&mut self) {
        if self.sending {
            debug!(chat_id = ?self.chat.id, "chat: send abandoned");
            self.sending = false;
        }
    }

    /// Wait for the identity to resolve, then initialize.
    pub async fn initialize_when_ready(&mut self, identity: &IdentityHandle) {
        let owner_id = identity.wait().await;
        self.initialize(&owner_id).await;
    }

    /// Bind the session to its conversation and load history.
    pub async fn initialize(&mut self, owner_id: &str) {
        self.error = None;
        let chat_id = match &self.route {
            ChatRoute::New => {
                self.chat = ChatInfo { id: None, title: self.persona.title.clone() };
                self.phase = Phase::Ready;
                debug!(persona = %self.persona.title, "chat: new conversation ready");
                return;
            }
            ChatRoute::Existing(id) => id.clone(),
        };

        let record = match self.store.check_chat_exists(&chat_id, owner_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(%chat_id, "chat: not found for owner");
                self.error = Some(CHAT_NOT_FOUND.to_owned());
                self.redirect = true;
                self.phase = Phase::Errored;
                return;
            }
            Err(e) => {
                warn!(%chat_id, error = %e, "chat: existence check failed");
                self.error = Some(CHAT_CHECK_FAILED.to_owned());
                self.phase = Phase::Errored;
                return;
            }
        };

        if let Some(catalog) = &self.catalog {
            self.persona = catalog.resolve(Some(&record.assistant_title), Some(&record.assistant_description));
        }
        self.chat = ChatInfo { id: Some(record.id.clone()), title: self.persona.title.clone() };

        match self.store.get_chat_messages(&record.id, owner_id).await {
            Ok(history) => {
                info!(chat_id = %record.id, count = history.len(), "chat: history loaded");
                self.messages = history.into_iter().map(ChatMessage::from_stored).collect();
            }
            Err(e) => {
                warn!(chat_id = %record.id, error = %e, "chat: history load failed");
                self.error = Some(HISTORY_LOAD_FAILED.to_owned());
            }
        }
        self.phase = Phase::Ready;
    }

    /// Send the current input.
    ///
    /// Ignored when the input is blank, identity is absent, a send is in
    /// flight, or the session is not ready.
    pub async fn send(&mut self, owner_id: Option<&str>) -> SendOutcome {
        let Some(owner_id) = owner_id else {
            return SendOutcome::Ignored;
        };
        if self.input.trim().is_empty() || self.sending || self.phase != Phase::Ready {
            return SendOutcome::Ignored;
        }
        let text = self.input.clone();

        self.error = None;
        self.sending = true;
        let outcome = if self.persona.is_ephemeral() {
            self.send_ephemeral(text).await
        } else {
            self.send_durable(text, owner_id).await
        };
        self.sending = false;
        outcome
    }

    async fn send_ephemeral(&mut self, text: String) -> SendOutcome {
        self.push_user(text.clone());
        match self.generator.generate_image(&text).await {
            Ok(reply) => {
                info!(persona = %self.persona.title, "chat: image reply");
                self.messages.push(ChatMessage::new(reply.text, Sender::Bot, Some(reply.image_uri)));
                SendOutcome::Replied
            }
            Err(e) => {
                warn!(error = %e, "chat: image generation failed");
                self.fail_with(failure_detail(e.user_detail()));
                SendOutcome::Failed
            }
        }
    }

    async fn send_durable(&mut self, text: String, owner_id: &str) -> SendOutcome {
        let Some(chat_id) = self.ensure_chat(owner_id).await else {
            return SendOutcome::Failed;
        };

        self.push_user(text);
        match self.exchange(&chat_id, owner_id).await {
            Ok(()) => SendOutcome::Replied,
            Err(e) => {
                warn!(%chat_id, error = %e, "chat: exchange failed");
                self.fail_with(e.detail());
                SendOutcome::Failed
            }
        }
    }

    /// Return the conversation id, creating the conversation on first use.
    async fn ensure_chat(&mut self, owner_id: &str) -> Option<String> {
        if let Some(id) = &self.chat.id {
            return Some(id.clone());
        }
        let new_chat = NewChat {
            title: self.chat.title.clone(),
            assistant_title: self.persona.title.clone(),
            assistant_description: self.persona.description.clone(),
        };
        match self.store.create_chat(new_chat, owner_id).await {
            Ok(record) => {
                info!(chat_id = %record.id, persona = %self.persona.title, "chat: created");
                self.chat.id = Some(record.id.clone());
                Some(record.id)
            }
            Err(e) => {
                warn!(error = %e, "chat: create failed");
                self.error = Some(CHAT_CREATE_FAILED.to_owned());
                None
            }
        }
    }

    /// Persist the latest user message, generate a reply, persist the reply.
    async fn exchange(&mut self, chat_id: &str, owner_id: &str) -> Result<(), ExchangeError> {
        if let Some(user) = self.messages.last() {
            self.store.save_message(chat_id, user.to_new_message(), owner_id).await?;
        }

        let reply = self.generator.generate_text(&self.request()).await?;
        let bot = ChatMessage::new(reply, Sender::Bot, None);
        let record = bot.to_new_message();
        self.messages.push(bot);
        self.store.save_message(chat_id, record, owner_id).await?;
        debug!(chat_id, count = self.messages.len(), "chat: reply saved");
        Ok(())
    }

    /// System prompt followed by the whole transcript.
    fn request(&self) -> Vec<Message> {
        let mut request = Vec::with_capacity(self.messages.len() + 1);
        request.push(Message::system(&assistant_prompt(
            &self.persona.title,
            &self.persona.description,
            self.persona.directive.as_deref(),
        )));
        request.extend(self.messages.iter().map(ChatMessage::to_llm_message));
        request
    }

    fn push_user(&mut self, text: String) {
        self.messages.push(ChatMessage::new(text, Sender::User, None));
        self.input.clear();
    }

    fn fail_with(&mut self, detail: String) {
        self.messages.push(ChatMessage::new(format!("Error: {detail}"), Sender::Bot, None));
        self.error = Some(detail);
    }
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
