// Shared fixtures for integration tests
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use folio::chat::{ChatController, ChatSettings};
use folio::portfolio::{ContextItem, MemoryStore, Portfolio, PortfolioStore};
use folio::providers::{LlmProvider, ProviderRequest, StreamChunk};

/// What a `ScriptedProvider` does when asked to stream
#[derive(Clone)]
pub enum Script {
    /// Send each increment, then finish with `stop`
    Reply(Vec<&'static str>),
    /// Fail to open the stream
    FailOpen(&'static str),
    /// Send the increments, then an error item
    BreakAfter(Vec<&'static str>, &'static str),
    /// Send the increments, then close without finishing
    CloseAfter(Vec<&'static str>),
    /// Open a stream that never produces anything
    Hang,
    /// Produce `count` increments through a one-slot channel
    Endless { count: usize },
}

/// Fake provider that replays a script and records what it was sent
pub struct ScriptedProvider {
    script: Script,
    calls: AtomicUsize,
    requests: Mutex<Vec<ProviderRequest>>,
    /// Senders held open for `Script::Hang`
    held: Mutex<Vec<mpsc::Sender<Result<StreamChunk>>>>,
    /// Increments accepted by the channel (`Script::Endless`)
    pub sent: Arc<AtomicUsize>,
    /// Set once the producer saw its receiver disappear
    pub closed: Arc<AtomicBool>,
}

impl ScriptedProvider {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            held: Mutex::new(Vec::new()),
            sent: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn reply(increments: Vec<&'static str>) -> Arc<Self> {
        Self::new(Script::Reply(increments))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_system(&self) -> String {
        self.requests()
            .last()
            .and_then(|r| r.system.clone())
            .expect("provider was not called")
    }
}

fn spawn_chunks(
    tx: mpsc::Sender<Result<StreamChunk>>,
    increments: Vec<&'static str>,
    tail: Option<Result<StreamChunk>>,
) {
    tokio::spawn(async move {
        for text in increments {
            if tx.send(Ok(StreamChunk::TextDelta(text.to_string()))).await.is_err() {
                return;
            }
        }
        if let Some(item) = tail {
            let _ = tx.send(item).await;
        }
    });
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn send_message_stream(
        &self,
        request: &ProviderRequest,
    ) -> Result<mpsc::Receiver<Result<StreamChunk>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        match self.script.clone() {
            Script::FailOpen(message) => Err(anyhow!(message)),
            Script::Reply(increments) => {
                let (tx, rx) = mpsc::channel(8);
                let finished = StreamChunk::Finished {
                    stop_reason: Some("stop".to_string()),
                };
                spawn_chunks(tx, increments, Some(Ok(finished)));
                Ok(rx)
            }
            Script::BreakAfter(increments, message) => {
                let (tx, rx) = mpsc::channel(8);
                spawn_chunks(tx, increments, Some(Err(anyhow!(message))));
                Ok(rx)
            }
            Script::CloseAfter(increments) => {
                let (tx, rx) = mpsc::channel(8);
                spawn_chunks(tx, increments, None);
                Ok(rx)
            }
            Script::Hang => {
                let (tx, rx) = mpsc::channel(1);
                self.held.lock().unwrap().push(tx);
                Ok(rx)
            }
            Script::Endless { count } => {
                let (tx, rx) = mpsc::channel(1);
                let sent = Arc::clone(&self.sent);
                let closed = Arc::clone(&self.closed);
                tokio::spawn(async move {
                    for i in 0..count {
                        let chunk = StreamChunk::TextDelta(format!("w{} ", i));
                        if tx.send(Ok(chunk)).await.is_err() {
                            closed.store(true, Ordering::SeqCst);
                            return;
                        }
                        sent.fetch_add(1, Ordering::SeqCst);
                    }
                    let _ = tx
                        .send(Ok(StreamChunk::Finished { stop_reason: None }))
                        .await;
                });
                Ok(rx)
            }
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-1"
    }
}

/// Store wrapper that counts every call made to it
pub struct CountingStore {
    inner: MemoryStore,
    calls: AtomicUsize,
    fail: bool,
}

impl CountingStore {
    pub fn new(inner: MemoryStore) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
            fail: false,
        })
    }

    /// A store whose every call fails
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(),
            calls: AtomicUsize::new(0),
            fail: true,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.inner
    }

    fn record(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl PortfolioStore for CountingStore {
    async fn get_portfolio(&self, key: &str) -> Result<Option<Portfolio>> {
        self.record()?;
        self.inner.get_portfolio(key).await
    }

    async fn list_contexts(&self, portfolio_id: &str) -> Result<Vec<ContextItem>> {
        self.record()?;
        self.inner.list_contexts(portfolio_id).await
    }

    async fn file_url(&self, path: &str) -> Result<Option<String>> {
        self.record()?;
        self.inner.file_url(path).await
    }

    fn name(&self) -> &str {
        "counting"
    }
}

pub const ADA_SEED: &str = r#"
[[portfolios]]
id = "p-ada"
slug = "ada"
name = "Ada Lovelace"
about = "Mathematician who wrote the first published algorithm."
github = "https://github.com/ada"
resume = "resumes/ada.pdf"

[[portfolios.contexts]]
name = "Role"
value = "Analyst of the Analytical Engine"

[[portfolios.contexts]]
name = "Notes"
value = "Translated Menabrea's paper.\nAdded notes A to G."

[[portfolios]]
id = "p-blank"
slug = "blank"
name = "Blank Owner"
about = "   "

[files]
"resumes/ada.pdf" = "https://files.example.com/ada.pdf"
"#;

pub fn seeded_store() -> Arc<CountingStore> {
    CountingStore::new(MemoryStore::from_seed_str(ADA_SEED).expect("seed parses"))
}

pub fn controller(store: Arc<CountingStore>, provider: Arc<ScriptedProvider>) -> ChatController {
    controller_with_timeout(store, provider, Duration::from_secs(30))
}

pub fn controller_with_timeout(
    store: Arc<CountingStore>,
    provider: Arc<ScriptedProvider>,
    timeout: Duration,
) -> ChatController {
    ChatController::new(
        store,
        provider,
        ChatSettings::default().with_request_timeout(timeout),
    )
}

pub fn chat_body(key: &str, question: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "messages": [{ "role": "user", "content": question }],
        "portfolioId": key,
    }))
    .expect("body serializes")
}
