// Portfolio records and the store they are read from
//
// Portfolios and their context items are owned by an external data store.
// The chat path only ever reads them, through the `PortfolioStore` trait.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::StoreEntry;

pub mod instant;
pub mod memory;

pub use instant::InstantStore;
pub use memory::MemoryStore;

/// A portfolio owner's public profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    /// Store-assigned identifier
    pub id: String,
    /// Unique human-readable key (used in URLs)
    pub slug: String,
    pub name: String,
    pub about: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Path of the uploaded resume file, resolved to a URL via `PortfolioStore::file_url`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume: Option<String>,
}

impl Portfolio {
    /// Minimal portfolio with only the required fields set.
    pub fn new(
        id: impl Into<String>,
        slug: impl Into<String>,
        name: impl Into<String>,
        about: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            slug: slug.into(),
            name: name.into(),
            about: about.into(),
            linkedin: None,
            github: None,
            email: None,
            resume: None,
        }
    }
}

/// A named snippet of grounding knowledge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextItem {
    pub name: String,
    pub value: String,
}

impl ContextItem {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// File URLs resolved for a portfolio at request time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortfolioFiles {
    pub resume_url: Option<String>,
}

/// Read access to portfolio records.
///
/// Implementations must return context items in insertion order and must not
/// cache across calls: an edit made by the owner is expected on the next
/// chat turn.
#[async_trait]
pub trait PortfolioStore: Send + Sync {
    /// Look up a portfolio by id or slug
    async fn get_portfolio(&self, key: &str) -> Result<Option<Portfolio>>;

    /// All context items of a portfolio, oldest first
    async fn list_contexts(&self, portfolio_id: &str) -> Result<Vec<ContextItem>>;

    /// Public URL of a stored file, if the path is known
    async fn file_url(&self, path: &str) -> Result<Option<String>>;

    /// Store name for logging
    fn name(&self) -> &str;
}

/// Open the portfolio store selected by configuration
pub fn create_store(entry: &StoreEntry) -> Result<Arc<dyn PortfolioStore>> {
    let store: Arc<dyn PortfolioStore> = match entry {
        StoreEntry::Memory { seed_path: None } => Arc::new(MemoryStore::new()),
        StoreEntry::Memory {
            seed_path: Some(path),
        } => Arc::new(MemoryStore::from_seed_file(path)?),
        StoreEntry::Instant {
            app_id,
            admin_token,
            base_url,
        } => {
            let mut store = InstantStore::new(app_id.clone(), admin_token.clone())?;
            if let Some(url) = base_url {
                store = store.with_base_url(url.clone());
            }
            Arc::new(store)
        }
    };

    tracing::info!(store = store.name(), "Portfolio store ready");
    Ok(store)
}
