// OpenAI API provider implementation
//
// Works for OpenAI and every vendor exposing the same chat completions
// format (Grok, Mistral, Groq, Ollama).

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

use super::types::{ProviderRequest, StreamChunk};
use super::LlmProvider;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const REQUEST_TIMEOUT_SECS: u64 = 120;
const STREAM_CHANNEL_CAPACITY: usize = 16;

/// OpenAI-compatible streaming provider
#[derive(Clone)]
pub struct OpenAIProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    default_model: String,
    provider_name: String,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider
    pub fn new_openai(api_key: String) -> Result<Self> {
        Self::new(
            Some(api_key),
            "https://api.openai.com".to_string(),
            "gpt-4-turbo".to_string(),
            "openai".to_string(),
        )
    }

    /// Create a new Grok provider (uses OpenAI-compatible API)
    pub fn new_grok(api_key: String) -> Result<Self> {
        Self::new(
            Some(api_key),
            "https://api.x.ai".to_string(),
            "grok-2".to_string(),
            "grok".to_string(),
        )
    }

    /// Create a new Mistral provider (uses OpenAI-compatible API)
    pub fn new_mistral(api_key: String) -> Result<Self> {
        Self::new(
            Some(api_key),
            "https://api.mistral.ai".to_string(),
            "mistral-large-latest".to_string(),
            "mistral".to_string(),
        )
    }

    /// Create a new Groq provider (fast inference, uses OpenAI-compatible API)
    /// Note: This is Groq (by Groq Inc), not Grok (by X.AI)
    pub fn new_groq(api_key: String) -> Result<Self> {
        Self::new(
            Some(api_key),
            "https://api.groq.com/openai".to_string(),
            "llama-3.1-70b-versatile".to_string(),
            "groq".to_string(),
        )
    }

    /// Create a provider for a local Ollama server (no API key)
    pub fn new_ollama(base_url: String, model: String) -> Result<Self> {
        Self::new(None, base_url, model, "ollama".to_string())
    }

    /// Set custom model for this provider
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Override the API host (proxies, self-hosted gateways, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn new(
        api_key: Option<String>,
        base_url: String,
        default_model: String,
        provider_name: String,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_model,
            provider_name,
        })
    }

    /// Convert ProviderRequest to OpenAI API format
    fn to_openai_request(&self, request: &ProviderRequest) -> OpenAIRequest {
        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model.clone()
        };

        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        // Prepend system prompt as a {"role":"system"} message (OpenAI convention)
        if let Some(system) = &request.system {
            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }

        messages.extend(request.messages.iter().map(|m| OpenAIMessage {
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
        }));

        OpenAIRequest {
            model,
            messages,
            max_tokens: Some(request.max_tokens),
            temperature: request.temperature,
            stream: true,
        }
    }

    /// Send a message with streaming response. Single attempt, no retry.
    async fn open_stream(&self, request: &ProviderRequest) -> Result<reqwest::Response> {
        let openai_request = self.to_openai_request(request);
        let url = format!("{}/v1/chat/completions", self.base_url);

        tracing::debug!(
            provider = %self.provider_name,
            model = %openai_request.model,
            messages = openai_request.messages.len(),
            "Sending streaming request"
        );

        let mut builder = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&openai_request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("Failed to send streaming request to {}", self.provider_name))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "{} API streaming request failed\n\nStatus: {}\nBody: {}",
                self.provider_name,
                status,
                error_body
            );
        }

        Ok(response)
    }
}

/// Outcome of one SSE line
#[derive(Debug, PartialEq)]
enum SseLine {
    /// Text, plus the finish reason when the same chunk carries one
    Delta(String, Option<String>),
    FinishReason(String),
    Done,
    Error(String),
    Skip,
}

fn parse_sse_line(line: &str) -> SseLine {
    let Some(payload) = line.trim_end().strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let payload = payload.trim();

    if payload == "[DONE]" {
        return SseLine::Done;
    }

    match serde_json::from_str::<OpenAIStreamChunk>(payload) {
        Ok(chunk) => {
            if let Some(error) = chunk.error {
                return SseLine::Error(error.message);
            }
            let Some(choice) = chunk.choices.into_iter().next() else {
                return SseLine::Skip;
            };
            match (choice.delta.content, choice.finish_reason) {
                (Some(content), reason) if !content.is_empty() => SseLine::Delta(content, reason),
                (_, Some(reason)) => SseLine::FinishReason(reason),
                _ => SseLine::Skip,
            }
        }
        Err(e) => {
            tracing::debug!("Skipping unparseable stream line: {}", e);
            SseLine::Skip
        }
    }
}

/// Relay the SSE body into `tx` until `[DONE]`, an error, or the receiver
/// going away. The response is dropped on return, closing the connection.
async fn pump_sse(response: reqwest::Response, tx: mpsc::Sender<Result<StreamChunk>>) {
    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();
    let mut stop_reason: Option<String> = None;

    loop {
        let next = tokio::select! {
            next = stream.next() => next,
            _ = tx.closed() => {
                tracing::debug!("[STREAM] Receiver dropped, abandoning provider stream");
                return;
            }
        };

        let bytes = match next {
            Some(Ok(bytes)) => bytes,
            Some(Err(e)) => {
                tracing::warn!("Stream error: {}", e);
                let _ = tx.send(Err(e.into())).await;
                return;
            }
            None => break,
        };
        buffer.extend_from_slice(&bytes);

        while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = buffer.drain(..=newline_pos).collect();
            let line = String::from_utf8_lossy(&line_bytes);

            let chunk = match parse_sse_line(&line) {
                SseLine::Delta(text, reason) => {
                    if reason.is_some() {
                        stop_reason = reason;
                    }
                    Ok(StreamChunk::TextDelta(text))
                }
                SseLine::FinishReason(reason) => {
                    stop_reason = Some(reason);
                    continue;
                }
                SseLine::Done => {
                    tracing::debug!("[STREAM] Received [DONE]");
                    let _ = tx
                        .send(Ok(StreamChunk::Finished {
                            stop_reason: stop_reason.take(),
                        }))
                        .await;
                    return;
                }
                SseLine::Error(message) => Err(anyhow::anyhow!("Provider error: {}", message)),
                SseLine::Skip => continue,
            };

            let is_err = chunk.is_err();
            if tx.send(chunk).await.is_err() || is_err {
                return;
            }
        }
    }

    // Body ended without [DONE]
    let last = match stop_reason {
        Some(reason) => Ok(StreamChunk::Finished {
            stop_reason: Some(reason),
        }),
        None => Err(anyhow::anyhow!("Provider stream ended before completion")),
    };
    let _ = tx.send(last).await;
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    async fn send_message_stream(
        &self,
        request: &ProviderRequest,
    ) -> Result<mpsc::Receiver<Result<StreamChunk>>> {
        let response = self.open_stream(request).await?;
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            tracing::debug!("[STREAM] Streaming task started");
            pump_sse(response, tx).await;
            tracing::debug!("[STREAM] Streaming task finished");
        });

        Ok(rx)
    }

    fn name(&self) -> &str {
        &self.provider_name
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

// OpenAI API types

#[derive(Debug, Clone, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAIStreamChoice>,
    #[serde(default)]
    error: Option<OpenAIError>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIStreamChoice {
    #[serde(default)]
    delta: OpenAIDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct OpenAIDelta {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIError {
    message: String,
}
