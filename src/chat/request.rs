// Chat request parsing and validation
//
// A request carries the visitor's full transcript plus either a portfolio
// key to resolve server-side or an already-resolved portfolio payload.

use serde::Deserialize;

use super::error::ChatError;
use crate::portfolio::{ContextItem, Portfolio, PortfolioFiles};
use crate::providers::{Message, Role};

/// Where the portfolio for a chat comes from
#[derive(Debug, Clone, PartialEq)]
pub enum PortfolioSource {
    /// Fetch by id or slug from the portfolio store
    Lookup { key: String },
    /// Caller supplied the records directly
    Inline {
        portfolio: Portfolio,
        contexts: Vec<ContextItem>,
        files: PortfolioFiles,
    },
}

impl PortfolioSource {
    pub fn mode(&self) -> &'static str {
        match self {
            PortfolioSource::Lookup { .. } => "lookup",
            PortfolioSource::Inline { .. } => "inline",
        }
    }
}

/// A validated chat request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub source: PortfolioSource,
}

/// Body of `POST /chat` as sent on the wire
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequestBody {
    messages: Vec<Message>,
    #[serde(default)]
    portfolio_id: Option<String>,
    #[serde(default)]
    portfolio: Option<InlinePortfolio>,
    #[serde(default)]
    contexts: Option<Vec<ContextItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlinePortfolio {
    #[serde(default)]
    id: Option<String>,
    slug: String,
    name: String,
    about: String,
    #[serde(default)]
    linkedin: Option<String>,
    #[serde(default)]
    github: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    resume_url: Option<String>,
}

impl ChatRequest {
    /// Lookup-mode request
    pub fn lookup(messages: Vec<Message>, key: impl Into<String>) -> Self {
        Self {
            messages,
            source: PortfolioSource::Lookup { key: key.into() },
        }
    }

    /// Inline-mode request
    pub fn inline(messages: Vec<Message>, portfolio: Portfolio, contexts: Vec<ContextItem>) -> Self {
        Self {
            messages,
            source: PortfolioSource::Inline {
                portfolio,
                contexts,
                files: PortfolioFiles::default(),
            },
        }
    }

    /// Parse and validate a JSON request body
    pub fn from_json(body: &[u8]) -> Result<Self, ChatError> {
        let body: ChatRequestBody = serde_json::from_slice(body)
            .map_err(|e| ChatError::invalid(format!("Malformed request body: {}", e)))?;

        let source = match (body.portfolio_id, body.portfolio, body.contexts) {
            (Some(_), Some(_), _) => {
                return Err(ChatError::invalid(
                    "Supply either portfolioId or portfolio, not both",
                ))
            }
            (Some(key), None, _) => PortfolioSource::Lookup { key },
            (None, Some(_), None) => {
                return Err(ChatError::invalid(
                    "contexts is required when portfolio is supplied inline",
                ))
            }
            (None, Some(inline), Some(contexts)) => {
                let files = PortfolioFiles {
                    resume_url: inline.resume_url,
                };
                let portfolio = Portfolio {
                    id: inline.id.unwrap_or_else(|| inline.slug.clone()),
                    slug: inline.slug,
                    name: inline.name,
                    about: inline.about,
                    linkedin: inline.linkedin,
                    github: inline.github,
                    email: inline.email,
                    resume: None,
                };
                PortfolioSource::Inline {
                    portfolio,
                    contexts,
                    files,
                }
            }
            (None, None, _) => {
                return Err(ChatError::invalid(
                    "One of portfolioId or portfolio is required",
                ))
            }
        };

        let request = Self {
            messages: body.messages,
            source,
        };
        request.validate()?;
        Ok(request)
    }

    /// Check the transcript and source are usable
    pub fn validate(&self) -> Result<(), ChatError> {
        let Some(last) = self.messages.last() else {
            return Err(ChatError::invalid("messages must not be empty"));
        };
        if last.role != Role::User {
            return Err(ChatError::invalid(
                "The last message must come from the user",
            ));
        }
        if last.content.trim().is_empty() {
            return Err(ChatError::invalid("The last user message is empty"));
        }

        match &self.source {
            PortfolioSource::Lookup { key } if key.trim().is_empty() => {
                Err(ChatError::invalid("portfolioId must not be blank"))
            }
            PortfolioSource::Inline { portfolio, .. } if portfolio.name.trim().is_empty() => {
                Err(ChatError::invalid("portfolio.name must not be blank"))
            }
            _ => Ok(()),
        }
    }
}
