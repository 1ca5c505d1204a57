//! OpenAI-compatible API client.
//!
//! Text goes through either `/chat/completions` or `/responses`; images go
//! through `/images/generations`. Response parsing is kept in pure functions
//! so it can be tested without a network.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::config::{ImageConfig, LlmTimeouts, OpenAiApiMode};
use super::types::{ChatResponse, ImageReply, LlmError, Message, Role};

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    mode: OpenAiApiMode,
}

impl OpenAiClient {
    pub fn new(
        api_key: String,
        mode: OpenAiApiMode,
        base_url: String,
        timeouts: LlmTimeouts,
    ) -> Result<Self, LlmError> {
        let http = build_http(timeouts)?;
        Ok(Self { http, api_key, base_url, mode })
    }

    pub async fn chat(&self, model: &str, max_tokens: u32, messages: &[Message]) -> Result<ChatResponse, LlmError> {
        match self.mode {
            OpenAiApiMode::ChatCompletions => {
                let msgs = build_chat_completions_messages(messages);
                let body = CcRequest { model, max_tokens, messages: &msgs };
                let text = post_json(&self.http, &self.base_url, "/chat/completions", &self.api_key, &body).await?;
                parse_chat_completions_response(&text)
            }
            OpenAiApiMode::Responses => {
                let (instructions, input) = build_responses_input(messages);
                let body = RespRequest { model, max_output_tokens: max_tokens, instructions, input: &input };
                let text = post_json(&self.http, &self.base_url, "/responses", &self.api_key, &body).await?;
                parse_responses_response(&text)
            }
        }
    }
}

pub(crate) fn build_http(timeouts: LlmTimeouts) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeouts.request_secs))
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .build()
        .map_err(|e| LlmError::HttpClientBuild(e.to_string()))
}

async fn post_json(
    http: &reqwest::Client,
    base_url: &str,
    path: &str,
    api_key: &str,
    body: &impl Serialize,
) -> Result<String, LlmError> {
    let url = format!("{base_url}{path}");
    let response = http
        .post(url)
        .bearer_auth(api_key)
        .json(body)
        .send()
        .await
        .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| LlmError::ApiRequest(e.to_string()))?;
    if status != 200 {
        return Err(LlmError::ApiResponse { status, body: text });
    }
    Ok(text)
}

// =============================================================================
// IMAGES
// =============================================================================

pub struct OpenAiImageClient {
    http: reqwest::Client,
    config: ImageConfig,
}

impl OpenAiImageClient {
    pub fn new(config: ImageConfig, timeouts: LlmTimeouts) -> Result<Self, LlmError> {
        let http = build_http(timeouts)?;
        Ok(Self { http, config })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub async fn generate(&self, prompt: &str) -> Result<ImageReply, LlmError> {
        let body = ImageRequest { model: &self.config.model, prompt, n: 1, size: &self.config.size };
        let text = post_json(&self.http, &self.config.base_url, "/images/generations", &self.config.api_key, &body)
            .await?;
        parse_image_response(&text, prompt)
    }
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
}

pub(crate) fn parse_image_response(json_text: &str, prompt: &str) -> Result<ImageReply, LlmError> {
    let root: Value = serde_json::from_str(json_text).map_err(|e| LlmError::ApiParse(e.to_string()))?;
    let Some(first) = root
        .get("data")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
    else {
        return Err(LlmError::ApiParse("images: missing data[0]".to_string()));
    };

    let image_uri = if let Some(url) = first.get("url").and_then(Value::as_str) {
        url.to_string()
    } else if let Some(b64) = first.get("b64_json").and_then(Value::as_str) {
        format!("data:image/png;base64,{b64}")
    } else {
        return Err(LlmError::EmptyResponse);
    };

    let text = first
        .get("revised_prompt")
        .and_then(Value::as_str)
        .filter(|p| !p.trim().is_empty())
        .map_or_else(|| format!("Here is the image for \"{prompt}\"."), str::to_owned);

    Ok(ImageReply { text, image_uri })
}

// =============================================================================
// CHAT COMPLETIONS — wire types
// =============================================================================

#[derive(Serialize)]
struct CcRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [CcMessage<'a>],
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub(crate) struct CcMessage<'a> {
    pub(crate) role: &'static str,
    pub(crate) content: &'a str,
}

pub(crate) fn build_chat_completions_messages(messages: &[Message]) -> Vec<CcMessage<'_>> {
    messages
        .iter()
        .filter(|m| !m.content.trim().is_empty())
        .map(|m| CcMessage { role: m.role.as_str(), content: &m.content })
        .collect()
}

// =============================================================================
// RESPONSES — wire types
// =============================================================================

#[derive(Serialize)]
struct RespRequest<'a> {
    model: &'a str,
    max_output_tokens: u32,
    instructions: String,
    input: &'a [RespInputItem<'a>],
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub(crate) struct RespInputItem<'a> {
    #[serde(rename = "type")]
    pub(crate) item_type: &'static str,
    pub(crate) role: &'static str,
    pub(crate) content: &'a str,
}

/// Split messages into the `instructions` string (all system messages, in
/// order) and the conversational input items.
pub(crate) fn build_responses_input(messages: &[Message]) -> (String, Vec<RespInputItem<'_>>) {
    let instructions = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let input = messages
        .iter()
        .filter(|m| m.role != Role::System && !m.content.trim().is_empty())
        .map(|m| RespInputItem { item_type: "message", role: m.role.as_str(), content: &m.content })
        .collect();
    (instructions, input)
}

// =============================================================================
// RESPONSE PARSING
// =============================================================================

pub(crate) fn parse_chat_completions_response(json_text: &str) -> Result<ChatResponse, LlmError> {
    let root: Value = serde_json::from_str(json_text).map_err(|e| LlmError::ApiParse(e.to_string()))?;
    let model = string_field(&root, "model");
    let input_tokens = usage_field(&root, "prompt_tokens");
    let output_tokens = usage_field(&root, "completion_tokens");

    let Some(choice) = root
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
    else {
        return Err(LlmError::ApiParse("chat_completions: missing choices[0]".to_string()));
    };
    let finish_reason = choice
        .get("finish_reason")
        .and_then(Value::as_str)
        .unwrap_or("stop");
    let text = choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }

    let stop_reason = if finish_reason == "length" { "max_tokens" } else { "end_turn" }.to_string();
    Ok(ChatResponse { text, model, stop_reason, input_tokens, output_tokens })
}

pub(crate) fn parse_responses_response(json_text: &str) -> Result<ChatResponse, LlmError> {
    let root: Value = serde_json::from_str(json_text).map_err(|e| LlmError::ApiParse(e.to_string()))?;
    let model = string_field(&root, "model");
    let input_tokens = usage_field(&root, "input_tokens");
    let output_tokens = usage_field(&root, "output_tokens");

    let mut parts: Vec<&str> = Vec::new();
    if let Some(items) = root.get("output").and_then(Value::as_array) {
        for item in items {
            if item.get("type").and_then(Value::as_str) != Some("message") {
                continue;
            }
            let Some(content) = item.get("content").and_then(Value::as_array) else {
                continue;
            };
            for part in content {
                let kind = part.get("type").and_then(Value::as_str);
                let text = part.get("text").and_then(Value::as_str).unwrap_or("");
                if matches!(kind, Some("output_text" | "text")) && !text.is_empty() {
                    parts.push(text);
                }
            }
        }
    } else if let Some(output_text) = root.get("output_text").and_then(Value::as_str) {
        if !output_text.is_empty() {
            parts.push(output_text);
        }
    }

    if parts.is_empty() {
        return Err(LlmError::EmptyResponse);
    }

    let stop_reason = if root
        .get("incomplete_details")
        .and_then(|d| d.get("reason"))
        .and_then(Value::as_str)
        == Some("max_output_tokens")
    {
        "max_tokens"
    } else {
        "end_turn"
    }
    .to_string();

    Ok(ChatResponse { text: parts.join("\n"), model, stop_reason, input_tokens, output_tokens })
}

fn string_field(root: &Value, key: &str) -> String {
    root.get(key)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_default()
}

fn usage_field(root: &Value, key: &str) -> u64 {
    root.get("usage")
        .and_then(|u| u.get(key))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;
