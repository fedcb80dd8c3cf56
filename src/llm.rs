//! Chat-completion boundary.
//!
//! The summarizer only sees [`CompletionClient`]; the concrete
//! [`OpenAiCompatClient`] talks to any `/chat/completions` endpoint that
//! follows the OpenAI wire format (Groq, OpenAI, local servers).

use log::debug;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::error::LlmError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the provider for a JSON object response
    pub json_mode: bool,
}

impl ChatRequest {
    pub fn from_prompt(prompt: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            messages: vec![ChatMessage::user(prompt)],
            temperature,
            max_tokens,
            json_mode: false,
        }
    }

    pub fn json(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    /// Content of the first message, mostly useful in tests
    pub fn prompt(&self) -> &str {
        self.messages.first().map(|m| m.content.as_str()).unwrap_or_default()
    }
}

pub trait CompletionClient {
    /// Send the request and return the text of the first choice
    fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;

    fn model_name(&self) -> &str;

    /// Whether the provider honours `json_mode`
    fn supports_json_mode(&self) -> bool {
        true
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking client for OpenAI-compatible chat-completion APIs.
pub struct OpenAiCompatClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    json_mode: bool,
}

impl OpenAiCompatClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(Duration::from_secs(120)).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            json_mode: true,
        })
    }

    /// Build from config, resolving the key against `fallback_env`
    pub fn from_config(config: &ProviderConfig, fallback_env: &str) -> Result<Self, LlmError> {
        let api_key = config
            .resolved_api_key(fallback_env)
            .ok_or_else(|| LlmError::NotConfigured(format!("no API key for {} (set {})", config.model, fallback_env)))?;
        Ok(Self::new(&config.base_url, &config.model, api_key)?.with_json_mode(config.json_mode))
    }

    /// Disable `response_format` for providers that reject it
    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
    }
}

impl CompletionClient for OpenAiCompatClient {
    fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = WireRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: (request.json_mode && self.json_mode).then_some(ResponseFormat { kind: "json_object" }),
        };

        debug!("POST {} (model {}, max_tokens {})", url, self.model, request.max_tokens);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: WireResponse = response
            .json()
            .map_err(|e| LlmError::ResponseParse(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| LlmError::ResponseParse("response contained no choices".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn supports_json_mode(&self) -> bool {
        self.json_mode
    }
}
