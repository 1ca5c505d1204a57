//! Shared helpers for unit tests.

use std::sync::{Mutex, MutexGuard};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Serialize tests that mutate process environment variables.
pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

// =============================================================================
// SERVICE DOUBLES
// =============================================================================

use time::OffsetDateTime;
use uuid::Uuid;

use crate::llm::Generator;
use crate::llm::types::{ImageReply, LlmError, Message};
use crate::services::store::{ChatRecord, ChatStore, NewChat, NewMessage, StoreError, StoredMessage};

/// Owner-scoped chat store held in memory.
#[derive(Default)]
pub struct MemoryStore {
    chats: Mutex<Vec<ChatRecord>>,
    messages: Mutex<Vec<(String, StoredMessage)>>,
}

impl MemoryStore {
    pub fn insert_chat(&self, id: &str, owner_id: &str, assistant_title: &str) {
        self.chats.lock().unwrap().push(ChatRecord {
            id: id.to_owned(),
            owner_id: owner_id.to_owned(),
            title: assistant_title.to_owned(),
            assistant_title: assistant_title.to_owned(),
            assistant_description: String::new(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        });
    }

    pub fn message_count(&self, chat_id: &str) -> usize {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == chat_id)
            .count()
    }

    fn owns(&self, chat_id: &str, owner_id: &str) -> bool {
        self.chats
            .lock()
            .unwrap()
            .iter()
            .any(|c| c.id == chat_id && c.owner_id == owner_id)
    }
}

#[async_trait::async_trait]
impl ChatStore for MemoryStore {
    async fn check_chat_exists(&self, chat_id: &str, owner_id: &str) -> Result<Option<ChatRecord>, StoreError> {
        Ok(self
            .chats
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == chat_id && c.owner_id == owner_id)
            .cloned())
    }

    async fn get_chat_messages(&self, chat_id: &str, owner_id: &str) -> Result<Vec<StoredMessage>, StoreError> {
        if !self.owns(chat_id, owner_id) {
            return Ok(Vec::new());
        }
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == chat_id)
            .map(|(_, m)| m.clone())
            .collect())
    }

    async fn create_chat(&self, chat: NewChat, owner_id: &str) -> Result<ChatRecord, StoreError> {
        let record = ChatRecord {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_owned(),
            title: chat.title,
            assistant_title: chat.assistant_title,
            assistant_description: chat.assistant_description,
            created_at: OffsetDateTime::now_utc(),
        };
        self.chats.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn save_message(&self, chat_id: &str, message: NewMessage, owner_id: &str) -> Result<(), StoreError> {
        if !self.owns(chat_id, owner_id) {
            return Err(StoreError::ChatNotFound(chat_id.to_owned()));
        }
        let stored = StoredMessage {
            id: Some(Uuid::new_v4().to_string()),
            text: message.text,
            sender: message.sender,
            image_uri: message.image_uri,
            timestamp: message.timestamp,
        };
        self.messages.lock().unwrap().push((chat_id.to_owned(), stored));
        Ok(())
    }

    async fn list_chats(&self, owner_id: &str) -> Result<Vec<ChatRecord>, StoreError> {
        Ok(self
            .chats
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect())
    }
}

/// Replies with `echo: <last message>`; images are unavailable.
pub struct EchoGenerator;

#[async_trait::async_trait]
impl Generator for EchoGenerator {
    async fn generate_text(&self, messages: &[Message]) -> Result<String, LlmError> {
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        Ok(format!("echo: {last}"))
    }

    async fn generate_image(&self, _prompt: &str) -> Result<ImageReply, LlmError> {
        Err(LlmError::ImageUnavailable)
    }
}
