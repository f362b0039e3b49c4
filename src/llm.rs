//! Chat-completion gateway.
//!
//! The profile service and the chat-completion service both speak the
//! OpenAI chat shape: `{model, messages[]}` in, `{choices[0].message.content}`
//! out, bearer auth. [`OpenAiCompatClient`] implements [`ChatClient`] for
//! either of them; the pipeline only sees the trait, so tests substitute
//! wiremock-backed or in-process clients.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::UpstreamConfig;
use crate::error::UpstreamError;

/// One system+user exchange with per-stage sampling settings.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Which stage issued the call, for logging.
    pub caller: &'static str,
}

impl ChatRequest {
    pub fn new(caller: &'static str, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: None,
            max_tokens: None,
            caller,
        }
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Returns the trimmed content of the first choice.
    async fn complete(&self, req: ChatRequest) -> Result<String, UpstreamError>;
}

// ============ OpenAI-compatible client ============

#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    service: &'static str,
    client: reqwest::Client,
    url: String,
    model: String,
}

impl OpenAiCompatClient {
    /// Builds a client for `{base_url}/chat/completions`.
    ///
    /// `service` labels errors and log lines (e.g. `"perplexity"`).
    pub fn new(
        service: &'static str,
        upstream: &UpstreamConfig,
        api_key: &str,
    ) -> Result<Self, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| UpstreamError::Config(format!("{} API key has invalid characters", service)))?;
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(upstream.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| UpstreamError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            service,
            client,
            url: format!("{}/chat/completions", upstream.base_url.trim_end_matches('/')),
            model: upstream.model.clone(),
        })
    }

    pub fn service(&self) -> &'static str {
        self.service
    }
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: [ApiMessage<'a>; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Option<Vec<Choice>>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Pulls `choices[0].message.content` out of a response body.
fn parse_content(service: &'static str, body: &str) -> Result<String, UpstreamError> {
    let parsed: ApiResponse = serde_json::from_str(body)
        .map_err(|e| UpstreamError::parse(service, format!("invalid JSON: {}", e)))?;

    let content = parsed
        .choices
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| UpstreamError::parse(service, "missing choices[0].message.content"))?;

    let content = content.trim();
    if content.is_empty() {
        return Err(UpstreamError::parse(service, "empty message content"));
    }
    Ok(content.to_string())
}

#[async_trait]
impl ChatClient for OpenAiCompatClient {
    async fn complete(&self, req: ChatRequest) -> Result<String, UpstreamError> {
        let body = ApiRequest {
            model: &self.model,
            messages: [
                ApiMessage {
                    role: "system",
                    content: &req.system,
                },
                ApiMessage {
                    role: "user",
                    content: &req.user,
                },
            ],
            temperature: req.temperature,
            max_tokens: req.max_tokens,
        };

        tracing::debug!(service = self.service, caller = req.caller, "chat completion request");

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamError::transport(self.service, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| UpstreamError::transport(self.service, e))?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                service: self.service,
                status: status.as_u16(),
                body: text,
            });
        }

        parse_content(self.service, &text)
    }
}
