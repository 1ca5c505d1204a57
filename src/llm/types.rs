//! LLM types — provider-neutral message types and errors.
//!
//! Shared by the Anthropic and `OpenAI` clients and by the chat
//! orchestrator, which only ever sees [`Generator`].

use serde::{Deserialize, Serialize};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by LLM client operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The required API key environment variable is not set.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    /// The HTTP request to the LLM provider failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The LLM provider returned a non-success HTTP status.
    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    /// The LLM provider response body could not be deserialized.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The provider answered but produced no usable text or image.
    #[error("provider returned an empty response")]
    EmptyResponse,

    /// No image-capable provider is configured.
    #[error("image generation is not configured")]
    ImageUnavailable,

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl LlmError {
    /// Detail string suitable for showing to the user inline.
    ///
    /// Provider error bodies (`{"error": {"message": ...}}` on both `OpenAI`
    /// and Anthropic) are unwrapped so the user sees the provider's wording
    /// rather than a status code.
    #[must_use]
    pub fn user_detail(&self) -> String {
        match self {
            Self::ApiResponse { status, body } => {
                provider_error_message(body).unwrap_or_else(|| format!("request failed with status {status}"))
            }
            other => other.to_string(),
        }
    }
}

fn provider_error_message(body: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(body).ok()?;
    root.get("error")
        .and_then(|e| e.get("message"))
        .and_then(serde_json::Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(str::to_owned)
}

// =============================================================================
// MESSAGE TYPES
// =============================================================================

/// Speaker of a message sent to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single message in a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Text completion returned by a provider, with usage for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResponse {
    pub text: String,
    pub model: String,
    pub stop_reason: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Result of an image generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReply {
    /// Caption shown alongside the image.
    pub text: String,
    /// URL or `data:` URI of the generated image.
    pub image_uri: String,
}

// =============================================================================
// GENERATOR TRAIT
// =============================================================================

/// Provider-neutral async trait for text and image generation. Enables
/// mocking in tests.
#[async_trait::async_trait]
pub trait Generator: Send + Sync {
    /// Generate an assistant reply for an ordered conversation.
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`] if the request fails or the response is
    /// malformed or empty.
    async fn generate_text(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// Generate an image for a prompt.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ImageUnavailable`] when no image provider is
    /// configured, or any transport/parse error from the provider.
    async fn generate_image(&self, prompt: &str) -> Result<ImageReply, LlmError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
