// In-memory portfolio store
//
// Seeded from a TOML file at startup. Useful for self-hosting a single
// portfolio without a hosted database, and as the store behind tests.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ContextItem, Portfolio, PortfolioStore};

#[derive(Default)]
struct Records {
    /// Kept in insertion order so slug collisions resolve to the oldest entry
    portfolios: Vec<Portfolio>,
    /// Context items keyed by portfolio id
    contexts: HashMap<String, Vec<ContextItem>>,
    /// File path -> public URL
    files: HashMap<String, String>,
}

/// Portfolio store backed by process memory
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Records>,
}

/// Seed file layout.
///
/// ```toml
/// [[portfolios]]
/// slug = "ada"
/// name = "Ada Lovelace"
/// about = "Analyst of engines."
/// resume = "resumes/ada.pdf"
///
/// [[portfolios.contexts]]
/// name = "Notes"
/// value = "Wrote the first published algorithm."
///
/// [files]
/// "resumes/ada.pdf" = "https://files.example.com/ada.pdf"
/// ```
#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    portfolios: Vec<SeedPortfolio>,
    #[serde(default)]
    files: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SeedPortfolio {
    #[serde(default)]
    id: Option<String>,
    slug: String,
    name: String,
    #[serde(default)]
    about: String,
    #[serde(default)]
    linkedin: Option<String>,
    #[serde(default)]
    github: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    resume: Option<String>,
    #[serde(default)]
    contexts: Vec<ContextItem>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a TOML seed file
    pub fn from_seed_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read portfolio seed from {}", path.display()))?;
        Self::from_seed_str(&contents)
            .with_context(|| format!("Failed to load portfolio seed {}", path.display()))
    }

    /// Parse a TOML seed document
    pub fn from_seed_str(contents: &str) -> Result<Self> {
        let seed: SeedFile = toml::from_str(contents).context("Failed to parse seed TOML")?;

        let mut records = Records {
            files: seed.files,
            ..Records::default()
        };

        for entry in seed.portfolios {
            if records.portfolios.iter().any(|p| p.slug == entry.slug) {
                bail!("Duplicate portfolio slug in seed: {}", entry.slug);
            }
            let portfolio = Portfolio {
                id: entry.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                slug: entry.slug,
                name: entry.name,
                about: entry.about,
                linkedin: entry.linkedin,
                github: entry.github,
                email: entry.email,
                resume: entry.resume,
            };
            records
                .contexts
                .insert(portfolio.id.clone(), entry.contexts);
            records.portfolios.push(portfolio);
        }

        tracing::debug!(
            portfolios = records.portfolios.len(),
            files = records.files.len(),
            "Loaded portfolio seed"
        );

        Ok(Self {
            records: RwLock::new(records),
        })
    }

    /// Insert or replace a portfolio (matched by id)
    pub async fn insert_portfolio(&self, portfolio: Portfolio) {
        let mut records = self.records.write().await;
        records.contexts.entry(portfolio.id.clone()).or_default();
        match records.portfolios.iter_mut().find(|p| p.id == portfolio.id) {
            Some(existing) => *existing = portfolio,
            None => records.portfolios.push(portfolio),
        }
    }

    /// Append a context item to a portfolio
    pub async fn push_context(&self, portfolio_id: &str, item: ContextItem) -> Result<()> {
        let mut records = self.records.write().await;
        if !records.portfolios.iter().any(|p| p.id == portfolio_id) {
            bail!("Unknown portfolio id: {}", portfolio_id);
        }
        records
            .contexts
            .entry(portfolio_id.to_string())
            .or_default()
            .push(item);
        Ok(())
    }

    /// Register a public URL for a file path
    pub async fn put_file(&self, path: impl Into<String>, url: impl Into<String>) {
        self.records.write().await.files.insert(path.into(), url.into());
    }

    pub async fn portfolio_count(&self) -> usize {
        self.records.read().await.portfolios.len()
    }
}

#[async_trait]
impl PortfolioStore for MemoryStore {
    async fn get_portfolio(&self, key: &str) -> Result<Option<Portfolio>> {
        let records = self.records.read().await;
        // An exact id match wins over a slug that happens to look like an id
        let found = records
            .portfolios
            .iter()
            .find(|p| p.id == key)
            .or_else(|| records.portfolios.iter().find(|p| p.slug == key));
        Ok(found.cloned())
    }

    async fn list_contexts(&self, portfolio_id: &str) -> Result<Vec<ContextItem>> {
        let records = self.records.read().await;
        Ok(records.contexts.get(portfolio_id).cloned().unwrap_or_default())
    }

    async fn file_url(&self, path: &str) -> Result<Option<String>> {
        Ok(self.records.read().await.files.get(path).cloned())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
