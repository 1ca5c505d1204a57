//! LLM — multi-provider adapter for text and image generation.
//!
//! DESIGN
//! ======
//! Configured from environment variables. `LlmClient` dispatches text to
//! Anthropic or `OpenAI` based on `LLM_PROVIDER`; images always go to the
//! `OpenAI` images endpoint when a key for it is configured.

pub mod anthropic;
pub mod config;
pub mod openai;
pub mod prompts;
pub mod types;

use tracing::info;

use config::{LlmConfig, LlmProviderKind};
pub use types::Generator;
use types::{ChatResponse, ImageReply, LlmError, Message};

// =============================================================================
// CLIENT DISPATCH
// =============================================================================

/// Concrete generation client.
///
/// Configured from environment variables by [`LlmClient::from_env`].
pub struct LlmClient {
    inner: LlmProvider,
    model: String,
    max_tokens: u32,
    images: Option<openai::OpenAiImageClient>,
}

enum LlmProvider {
    Anthropic(anthropic::AnthropicClient),
    OpenAi(openai::OpenAiClient),
}

impl LlmClient {
    /// Build an LLM client from environment variables. See
    /// [`LlmConfig::from_env`] for the variables read.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the HTTP client fails.
    pub fn from_env() -> Result<Self, LlmError> {
        let config = LlmConfig::from_env()?;
        Self::from_config(config)
    }

    /// Build an LLM client from a parsed typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if a provider HTTP client fails to build.
    pub fn from_config(config: LlmConfig) -> Result<Self, LlmError> {
        let inner = match config.provider {
            LlmProviderKind::Anthropic => LlmProvider::Anthropic(anthropic::AnthropicClient::new(
                config.api_key,
                config.anthropic_base_url,
                config.timeouts,
            )?),
            LlmProviderKind::OpenAi => LlmProvider::OpenAi(openai::OpenAiClient::new(
                config.api_key,
                config.openai_mode,
                config.openai_base_url,
                config.timeouts,
            )?),
        };
        let images = config
            .image
            .map(|image| openai::OpenAiImageClient::new(image, config.timeouts))
            .transpose()?;
        Ok(Self { inner, model: config.model, max_tokens: config.max_tokens, images })
    }

    /// Return the configured text model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether an image backend is configured.
    #[must_use]
    pub fn supports_images(&self) -> bool {
        self.images.is_some()
    }

    async fn chat_inner(&self, messages: &[Message]) -> Result<ChatResponse, LlmError> {
        match &self.inner {
            LlmProvider::Anthropic(c) => c.chat(&self.model, self.max_tokens, messages).await,
            LlmProvider::OpenAi(c) => c.chat(&self.model, self.max_tokens, messages).await,
        }
    }
}

#[async_trait::async_trait]
impl Generator for LlmClient {
    async fn generate_text(&self, messages: &[Message]) -> Result<String, LlmError> {
        let response = self.chat_inner(messages).await?;
        info!(
            model = %response.model,
            stop_reason = %response.stop_reason,
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "llm: text response"
        );
        Ok(response.text)
    }

    async fn generate_image(&self, prompt: &str) -> Result<ImageReply, LlmError> {
        let images = self.images.as_ref().ok_or(LlmError::ImageUnavailable)?;
        let reply = images.generate(prompt).await?;
        info!(model = images.model(), prompt_len = prompt.len(), "llm: image response");
        Ok(reply)
    }
}
