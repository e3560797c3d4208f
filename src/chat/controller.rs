// Chat stream controller
//
// Received -> Validating -> Resolving -> Assembling -> Streaming -> Completed | Failed
//
// Everything up to assembly happens before the response is committed and
// fails with a `ChatError`. Once a `ChatStream` is returned, failures travel
// in-band as `ChatEvent::Error`.

use anyhow::Result;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::error::ChatError;
use super::events::ChatEvent;
use super::request::{ChatRequest, PortfolioSource};
use crate::config::Config;
use crate::instruction::{self, ContentPolicy, Instruction};
use crate::portfolio::{ContextItem, Portfolio, PortfolioFiles, PortfolioStore};
use crate::providers::{LlmProvider, ProviderRequest, StreamChunk};

/// Per-exchange settings taken from configuration
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// Bound on one exchange, counted from request receipt
    pub request_timeout: Duration,
    pub max_tokens: u32,
    /// Model override; provider default when unset
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub content_policy: ContentPolicy,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(crate::config::constants::DEFAULT_REQUEST_TIMEOUT_SECS),
            max_tokens: crate::config::constants::DEFAULT_MAX_TOKENS,
            model: None,
            temperature: None,
            content_policy: ContentPolicy::default(),
        }
    }
}

impl ChatSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            request_timeout: config.server.request_timeout(),
            max_tokens: config.assistant.max_tokens,
            model: config.assistant.model.clone(),
            temperature: config.assistant.temperature,
            content_policy: config.assistant.content_policy(),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Records a chat turn is grounded on
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPortfolio {
    pub portfolio: Portfolio,
    pub contexts: Vec<ContextItem>,
    pub files: PortfolioFiles,
}

/// Drives one chat exchange per request. Holds no per-conversation state.
#[derive(Clone)]
pub struct ChatController {
    store: Arc<dyn PortfolioStore>,
    provider: Arc<dyn LlmProvider>,
    settings: ChatSettings,
}

impl ChatController {
    pub fn new(
        store: Arc<dyn PortfolioStore>,
        provider: Arc<dyn LlmProvider>,
        settings: ChatSettings,
    ) -> Self {
        Self {
            store,
            provider,
            settings,
        }
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Handle a raw `POST /chat` body
    pub async fn handle(&self, body: &[u8]) -> Result<ChatStream, ChatError> {
        let received_at = Instant::now();
        let request = ChatRequest::from_json(body)?;
        self.run(request, received_at).await
    }

    /// Handle an already parsed request
    pub async fn handle_request(&self, request: ChatRequest) -> Result<ChatStream, ChatError> {
        let received_at = Instant::now();
        request.validate()?;
        self.run(request, received_at).await
    }

    /// Resolve a portfolio and its context from the store
    pub async fn resolve(&self, key: &str) -> Result<ResolvedPortfolio, ChatError> {
        let portfolio = self
            .store
            .get_portfolio(key)
            .await
            .map_err(ChatError::store)?
            .ok_or_else(|| ChatError::NotFound {
                key: key.to_string(),
            })?;

        let resume_url = async {
            match portfolio.resume.as_deref() {
                Some(path) => self.store.file_url(path).await,
                None => Ok(None),
            }
        };
        let (contexts, resume_url) =
            tokio::try_join!(self.store.list_contexts(&portfolio.id), resume_url)
                .map_err(ChatError::store)?;

        Ok(ResolvedPortfolio {
            portfolio,
            contexts,
            files: PortfolioFiles { resume_url },
        })
    }

    /// Render the instruction a chat with this portfolio would use
    pub fn instruction_for(&self, resolved: &ResolvedPortfolio) -> Result<Instruction, ChatError> {
        let instruction = instruction::assemble(
            Some(&resolved.portfolio),
            &resolved.contexts,
            &resolved.files,
            &self.settings.content_policy,
        )?;
        Ok(instruction)
    }

    async fn run(&self, request: ChatRequest, received_at: Instant) -> Result<ChatStream, ChatError> {
        let deadline = received_at + self.settings.request_timeout;
        let mode = request.source.mode();

        let resolved = match request.source {
            PortfolioSource::Lookup { key } => {
                tracing::debug!(portfolio = %key, "Resolving portfolio");
                tokio::time::timeout_at(deadline, self.resolve(&key))
                    .await
                    .map_err(|_| ChatError::Timeout {
                        secs: self.settings.request_timeout.as_secs(),
                    })??
            }
            PortfolioSource::Inline {
                portfolio,
                contexts,
                files,
            } => ResolvedPortfolio {
                portfolio,
                contexts,
                files,
            },
        };

        let instruction = self.instruction_for(&resolved)?;
        tracing::info!(
            portfolio = %resolved.portfolio.slug,
            mode,
            contexts = resolved.contexts.len(),
            messages = request.messages.len(),
            guarded = instruction.is_guarded(),
            "Starting chat stream"
        );

        let mut provider_request = ProviderRequest::new(request.messages)
            .with_system(instruction.into_string())
            .with_max_tokens(self.settings.max_tokens);
        if let Some(model) = &self.settings.model {
            provider_request = provider_request.with_model(model.clone());
        }
        if let Some(temperature) = self.settings.temperature {
            provider_request = provider_request.with_temperature(temperature);
        }

        Ok(ChatStream::new(
            Arc::clone(&self.provider),
            provider_request,
            deadline,
            self.settings.request_timeout,
        ))
    }
}

/// Streamed response of one chat exchange.
///
/// Yields at most one `Start`, any number of `TextDelta`s and exactly one
/// terminal `Finished` or `Error`. The provider call is opened on first poll;
/// dropping the stream releases the provider's channel.
pub struct ChatStream {
    message_id: String,
    inner: BoxStream<'static, ChatEvent>,
}

impl ChatStream {
    fn new(
        provider: Arc<dyn LlmProvider>,
        request: ProviderRequest,
        deadline: Instant,
        timeout: Duration,
    ) -> Self {
        let message_id = format!("msg-{}", uuid::Uuid::new_v4().simple());
        let relay = Relay {
            state: RelayState::Opening { provider, request },
            message_id: message_id.clone(),
            deadline,
            timeout,
            increments: 0,
        };
        Self {
            message_id,
            inner: stream::unfold(relay, Relay::step).boxed(),
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }
}

impl Stream for ChatStream {
    type Item = ChatEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

enum RelayState {
    Opening {
        provider: Arc<dyn LlmProvider>,
        request: ProviderRequest,
    },
    Streaming {
        rx: mpsc::Receiver<Result<StreamChunk>>,
    },
    Done,
}

struct Relay {
    state: RelayState,
    message_id: String,
    deadline: Instant,
    timeout: Duration,
    increments: usize,
}

impl Relay {
    async fn step(mut self) -> Option<(ChatEvent, Self)> {
        let event = match &mut self.state {
            RelayState::Done => return None,
            RelayState::Opening { provider, request } => {
                let opened =
                    tokio::time::timeout_at(self.deadline, provider.send_message_stream(request))
                        .await;
                match opened {
                    Ok(Ok(rx)) => {
                        tracing::debug!(message_id = %self.message_id, "Provider stream opened");
                        self.state = RelayState::Streaming { rx };
                        ChatEvent::Start {
                            message_id: self.message_id.clone(),
                        }
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(error = %format!("{:#}", e), "Provider request failed");
                        self.fail("The language model request failed")
                    }
                    Err(_) => self.time_out(),
                }
            }
            RelayState::Streaming { rx } => loop {
                match tokio::time::timeout_at(self.deadline, rx.recv()).await {
                    Ok(Some(Ok(StreamChunk::TextDelta(text)))) => {
                        if text.is_empty() {
                            continue;
                        }
                        self.increments += 1;
                        break ChatEvent::TextDelta(text);
                    }
                    Ok(Some(Ok(StreamChunk::Finished { stop_reason }))) => {
                        tracing::debug!(
                            message_id = %self.message_id,
                            increments = self.increments,
                            "Chat stream completed"
                        );
                        self.state = RelayState::Done;
                        break ChatEvent::Finished {
                            finish_reason: stop_reason.unwrap_or_else(|| "stop".to_string()),
                        };
                    }
                    Ok(Some(Err(e))) => {
                        tracing::warn!(error = %format!("{:#}", e), "Provider stream failed");
                        break self.fail("The language model stream was interrupted");
                    }
                    Ok(None) => {
                        tracing::warn!("Provider stream closed without completing");
                        break self.fail("The language model stream ended unexpectedly");
                    }
                    Err(_) => break self.time_out(),
                }
            },
        };
        Some((event, self))
    }

    fn fail(&mut self, message: &str) -> ChatEvent {
        self.state = RelayState::Done;
        ChatEvent::Error {
            message: message.to_string(),
        }
    }

    fn time_out(&mut self) -> ChatEvent {
        tracing::warn!(
            message_id = %self.message_id,
            timeout_secs = self.timeout.as_secs(),
            increments = self.increments,
            "Chat stream timed out"
        );
        let message = format!("Response timed out after {}s", self.timeout.as_secs());
        self.fail(&message)
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        if !matches!(self.state, RelayState::Done) {
            tracing::debug!(
                message_id = %self.message_id,
                increments = self.increments,
                "Client went away, releasing provider stream"
            );
        }
    }
}
