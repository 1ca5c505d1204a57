//! Chat store — persisted conversations and their ordered messages.
//!
//! DESIGN
//! ======
//! `ChatStore` is the seam the chat orchestrator talks to. Every operation
//! is scoped by the caller's owner identity: a chat that exists but belongs
//! to someone else is indistinguishable from one that does not exist.
//! `PgChatStore` is the `PostgreSQL` implementation.
//!
//! Message order is insertion order (`chat_messages.seq`), not timestamp.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("chat not found: {0}")]
    ChatNotFound(String),
    #[error("unknown message sender: {0}")]
    InvalidSender(String),
}

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }

    /// Parse the stored column value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidSender`] for anything but `user`/`bot`.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        match raw {
            "user" => Ok(Self::User),
            "bot" => Ok(Self::Bot),
            other => Err(StoreError::InvalidSender(other.to_owned())),
        }
    }
}

/// A persisted conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRecord {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub assistant_title: String,
    pub assistant_description: String,
    pub created_at: OffsetDateTime,
}

/// Fields for creating a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChat {
    pub title: String,
    pub assistant_title: String,
    pub assistant_description: String,
}

/// A message to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub text: String,
    pub sender: Sender,
    pub timestamp: OffsetDateTime,
    pub image_uri: Option<String>,
}

/// A message read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: Option<String>,
    pub text: String,
    pub sender: Sender,
    pub image_uri: Option<String>,
    pub timestamp: OffsetDateTime,
}

// =============================================================================
// TRAIT
// =============================================================================

/// Remote persistence for chats, scoped by owner. Enables mocking in tests.
#[async_trait::async_trait]
pub trait ChatStore: Send + Sync {
    /// Return the chat if it exists and is owned by `owner_id`.
    async fn check_chat_exists(&self, chat_id: &str, owner_id: &str) -> Result<Option<ChatRecord>, StoreError>;

    /// Return the chat's messages in insertion order.
    async fn get_chat_messages(&self, chat_id: &str, owner_id: &str) -> Result<Vec<StoredMessage>, StoreError>;

    /// Create a chat owned by `owner_id`.
    async fn create_chat(&self, chat: NewChat, owner_id: &str) -> Result<ChatRecord, StoreError>;

    /// Append a message to a chat owned by `owner_id`.
    async fn save_message(&self, chat_id: &str, message: NewMessage, owner_id: &str) -> Result<(), StoreError>;

    /// All chats owned by `owner_id`, newest first.
    async fn list_chats(&self, owner_id: &str) -> Result<Vec<ChatRecord>, StoreError>;
}

// =============================================================================
// POSTGRES
// =============================================================================

#[derive(Clone)]
pub struct PgChatStore {
    pool: PgPool,
}

impl PgChatStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Parse a chat id; malformed ids cannot name any chat.
pub(crate) fn parse_chat_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

fn chat_from_row(row: &PgRow) -> Result<ChatRecord, StoreError> {
    Ok(ChatRecord {
        id: row.try_get::<Uuid, _>("id")?.to_string(),
        owner_id: row.try_get("owner_id")?,
        title: row.try_get("title")?,
        assistant_title: row.try_get("assistant_title")?,
        assistant_description: row.try_get("assistant_description")?,
        created_at: row.try_get("created_at")?,
    })
}

fn message_from_row(row: &PgRow) -> Result<StoredMessage, StoreError> {
    let sender: String = row.try_get("sender")?;
    Ok(StoredMessage {
        id: Some(row.try_get::<Uuid, _>("id")?.to_string()),
        text: row.try_get("text")?,
        sender: Sender::parse(&sender)?,
        image_uri: row.try_get("image_uri")?,
        timestamp: row.try_get("created_at")?,
    })
}

const CHAT_COLUMNS: &str = "id, owner_id, title, assistant_title, assistant_description, created_at";

#[async_trait::async_trait]
impl ChatStore for PgChatStore {
    async fn check_chat_exists(&self, chat_id: &str, owner_id: &str) -> Result<Option<ChatRecord>, StoreError> {
        let Some(id) = parse_chat_id(chat_id) else {
            debug!(chat_id, "store: malformed chat id");
            return Ok(None);
        };
        let row = sqlx::query(&format!("SELECT {CHAT_COLUMNS} FROM chats WHERE id = $1 AND owner_id = $2"))
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(chat_from_row).transpose()
    }

    async fn get_chat_messages(&self, chat_id: &str, owner_id: &str) -> Result<Vec<StoredMessage>, StoreError> {
        let Some(id) = parse_chat_id(chat_id) else {
            return Ok(Vec::new());
        };
        let rows = sqlx::query(
            r"SELECT m.id, m.text, m.sender, m.image_uri, m.created_at
              FROM chat_messages m
              JOIN chats c ON c.id = m.chat_id
              WHERE m.chat_id = $1 AND c.owner_id = $2
              ORDER BY m.seq ASC",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        debug!(chat_id, count = rows.len(), "store: loaded messages");
        rows.iter().map(message_from_row).collect()
    }

    async fn create_chat(&self, chat: NewChat, owner_id: &str) -> Result<ChatRecord, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO chats (owner_id, title, assistant_title, assistant_description)
             VALUES ($1, $2, $3, $4)
             RETURNING {CHAT_COLUMNS}"
        ))
        .bind(owner_id)
        .bind(&chat.title)
        .bind(&chat.assistant_title)
        .bind(&chat.assistant_description)
        .fetch_one(&self.pool)
        .await?;
        chat_from_row(&row)
    }

    async fn save_message(&self, chat_id: &str, message: NewMessage, owner_id: &str) -> Result<(), StoreError> {
        let id = parse_chat_id(chat_id).ok_or_else(|| StoreError::ChatNotFound(chat_id.to_owned()))?;
        let result = sqlx::query(
            r"INSERT INTO chat_messages (chat_id, text, sender, image_uri, created_at)
              SELECT c.id, $2, $3, $4, $5 FROM chats c WHERE c.id = $1 AND c.owner_id = $6",
        )
        .bind(id)
        .bind(&message.text)
        .bind(message.sender.as_str())
        .bind(&message.image_uri)
        .bind(message.timestamp)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::ChatNotFound(chat_id.to_owned()));
        }
        Ok(())
    }

    async fn list_chats(&self, owner_id: &str) -> Result<Vec<ChatRecord>, StoreError> {
        let rows =
            sqlx::query(&format!("SELECT {CHAT_COLUMNS} FROM chats WHERE owner_id = $1 ORDER BY created_at DESC"))
                .bind(owner_id)
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(chat_from_row).collect()
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
