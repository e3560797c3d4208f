// InstantDB portfolio store
//
// Reads portfolios, contexts and file URLs through the InstantDB admin HTTP
// API. Only queries are issued; this store never writes.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

use super::{ContextItem, Portfolio, PortfolioStore};

pub const DEFAULT_INSTANT_API: &str = "https://api.instantdb.com";

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// File name resumes are uploaded under, below the portfolio's slug or id
const RESUME_FILE: &str = "resume.pdf";

/// Portfolio store backed by an InstantDB app
#[derive(Clone)]
pub struct InstantStore {
    client: Client,
    base_url: String,
    app_id: String,
    admin_token: String,
}

impl InstantStore {
    pub fn new(app_id: String, admin_token: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: DEFAULT_INSTANT_API.to_string(),
            app_id,
            admin_token,
        })
    }

    /// Point the store at a different API host (self-hosted Instant, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Run an InstaQL query and return the raw result document
    async fn query(&self, query: Value) -> Result<Value> {
        let url = format!("{}/admin/query", self.base_url);

        tracing::debug!(query = %query, "Sending InstantDB admin query");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.admin_token))
            .header("app-id", &self.app_id)
            .header("content-type", "application/json")
            .json(&json!({ "query": query }))
            .send()
            .await
            .context("Failed to send query to InstantDB")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "InstantDB query failed\n\nStatus: {}\nBody: {}",
                status,
                error_body
            );
        }

        response
            .json()
            .await
            .context("Failed to parse InstantDB query response")
    }

    /// Pull the entity list for `namespace` out of a query result
    fn entities<T: DeserializeOwned>(result: Value, namespace: &str) -> Result<Vec<T>> {
        let rows = result
            .get(namespace)
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));
        serde_json::from_value(rows)
            .with_context(|| format!("Unexpected shape for InstantDB namespace '{}'", namespace))
    }

    /// Upload paths the portfolio app uses for a resume, slug path first
    fn resume_paths(portfolio: &Portfolio) -> [String; 2] {
        [
            format!("{}/{}", portfolio.slug, RESUME_FILE),
            format!("{}/{}", portfolio.id, RESUME_FILE),
        ]
    }

    /// Find which of the conventional resume paths has an uploaded file
    async fn find_resume(&self, portfolio: &Portfolio) -> Result<Option<String>> {
        #[derive(serde::Deserialize)]
        struct FileRow {
            path: String,
        }

        let candidates = Self::resume_paths(portfolio);
        let result = self
            .query(json!({ "$files": { "$": { "where": { "path": { "$in": &candidates } } } } }))
            .await?;
        let files: Vec<FileRow> = Self::entities(result, "$files")?;

        Ok(candidates
            .into_iter()
            .find(|candidate| files.iter().any(|f| &f.path == candidate)))
    }
}

#[async_trait]
impl PortfolioStore for InstantStore {
    async fn get_portfolio(&self, key: &str) -> Result<Option<Portfolio>> {
        // Instant rejects non-UUID values for `id`, so only UUID keys are tried as ids
        let filter = if Uuid::parse_str(key).is_ok() {
            json!({ "id": key })
        } else {
            json!({ "slug": key })
        };

        let result = self
            .query(json!({ "portfolios": { "$": { "where": filter, "limit": 1 } } }))
            .await?;
        let portfolios: Vec<Portfolio> = Self::entities(result, "portfolios")?;
        let Some(mut portfolio) = portfolios.into_iter().next() else {
            return Ok(None);
        };

        // Portfolio entities carry no resume attribute; the file lives at a fixed path
        if portfolio.resume.is_none() {
            portfolio.resume = self.find_resume(&portfolio).await?;
        }
        Ok(Some(portfolio))
    }

    async fn list_contexts(&self, portfolio_id: &str) -> Result<Vec<ContextItem>> {
        let result = self
            .query(json!({
                "contexts": {
                    "$": {
                        "where": { "portfolio.id": portfolio_id },
                        "order": { "serverCreatedAt": "asc" }
                    }
                }
            }))
            .await?;
        Self::entities(result, "contexts")
    }

    async fn file_url(&self, path: &str) -> Result<Option<String>> {
        #[derive(serde::Deserialize)]
        struct FileRow {
            url: Option<String>,
        }

        let result = self
            .query(json!({ "$files": { "$": { "where": { "path": path } } } }))
            .await?;
        let files: Vec<FileRow> = Self::entities(result, "$files")?;
        Ok(files.into_iter().find_map(|f| f.url))
    }

    fn name(&self) -> &str {
        "instant"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entities_missing_namespace_is_empty() {
        let rows: Vec<ContextItem> = InstantStore::entities(json!({}), "contexts").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_entities_ignores_extra_fields() {
        let rows: Vec<ContextItem> = InstantStore::entities(
            json!({ "contexts": [{ "id": "c1", "name": "Role", "value": "Engineer" }] }),
            "contexts",
        )
        .unwrap();
        assert_eq!(rows, vec![ContextItem::new("Role", "Engineer")]);
    }

    #[test]
    fn test_resume_paths_slug_first() {
        let portfolio = Portfolio::new("p-1", "ada", "Ada", "");
        assert_eq!(
            InstantStore::resume_paths(&portfolio),
            ["ada/resume.pdf".to_string(), "p-1/resume.pdf".to_string()]
        );
    }

    #[test]
    fn test_with_base_url_trims_slash() {
        let store = InstantStore::new("app".into(), "token".into())
            .unwrap()
            .with_base_url("http://localhost:8888/");
        assert_eq!(store.base_url, "http://localhost:8888");
    }
}
