// Provider and store entries
//
// Tagged TOML tables selecting the LLM provider and the portfolio store.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

/// The LLM provider the assistant streams from.
///
/// Serializes with a `type` tag, e.g.:
/// ```toml
/// [provider]
/// type = "openai"
/// api_key = "sk-..."
/// model = "gpt-4-turbo"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderEntry {
    Openai {
        api_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
    },
    Grok {
        api_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
    },
    Mistral {
        api_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
    },
    Groq {
        api_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        model: String,
    },
}

impl ProviderEntry {
    /// Human-readable name for logs.
    pub fn display_name(&self) -> &str {
        match self {
            Self::Openai { .. } => "OpenAI",
            Self::Grok { .. } => "Grok",
            Self::Mistral { .. } => "Mistral",
            Self::Groq { .. } => "Groq",
            Self::Ollama { .. } => "Ollama",
        }
    }

    /// API key for hosted providers; `None` for local ones.
    pub fn api_key(&self) -> Option<&str> {
        match self {
            Self::Openai { api_key, .. }
            | Self::Grok { api_key, .. }
            | Self::Mistral { api_key, .. }
            | Self::Groq { api_key, .. } => Some(api_key),
            Self::Ollama { .. } => None,
        }
    }
}

/// Where portfolio records are read from.
///
/// ```toml
/// [store]
/// type = "instant"
/// app_id = "..."
/// admin_token = "..."
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreEntry {
    /// In-process store, optionally seeded from a TOML file
    Memory {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seed_path: Option<PathBuf>,
    },
    /// InstantDB app read through the admin API
    Instant {
        app_id: String,
        admin_token: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
    },
}

impl Default for StoreEntry {
    fn default() -> Self {
        Self::Memory { seed_path: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_entry_from_toml() {
        let entry: ProviderEntry = toml::from_str(
            r#"
type = "openai"
api_key = "sk-test"
model = "gpt-4o"
"#,
        )
        .unwrap();
        assert_eq!(
            entry,
            ProviderEntry::Openai {
                api_key: "sk-test".to_string(),
                model: Some("gpt-4o".to_string()),
                base_url: None,
            }
        );
        assert_eq!(entry.api_key(), Some("sk-test"));
    }

    #[test]
    fn test_ollama_default_url() {
        let entry: ProviderEntry = toml::from_str("type = \"ollama\"\nmodel = \"llama3.1\"").unwrap();
        match entry {
            ProviderEntry::Ollama { base_url, .. } => {
                assert_eq!(base_url, "http://localhost:11434")
            }
            other => panic!("unexpected entry: {:?}", other),
        }
    }

    #[test]
    fn test_store_entry_instant() {
        let entry: StoreEntry = toml::from_str(
            r#"
type = "instant"
app_id = "app-1"
admin_token = "tok"
"#,
        )
        .unwrap();
        assert!(matches!(entry, StoreEntry::Instant { ref app_id, .. } if app_id == "app-1"));
    }
}
