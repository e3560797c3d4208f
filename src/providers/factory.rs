// Provider factory
//
// Creates LLM providers from configuration entries

use anyhow::Result;

use super::openai::OpenAIProvider;
use super::LlmProvider;
use crate::config::ProviderEntry;

/// Create an `LlmProvider` from a `ProviderEntry`.
pub fn create_provider(entry: &ProviderEntry) -> Result<Box<dyn LlmProvider>> {
    let provider = match entry {
        ProviderEntry::Openai {
            api_key,
            model,
            base_url,
        } => {
            let mut provider = OpenAIProvider::new_openai(api_key.clone())?;
            if let Some(url) = base_url {
                provider = provider.with_base_url(url.clone());
            }
            with_model(provider, model)
        }

        ProviderEntry::Grok { api_key, model } => {
            with_model(OpenAIProvider::new_grok(api_key.clone())?, model)
        }

        ProviderEntry::Mistral { api_key, model } => {
            with_model(OpenAIProvider::new_mistral(api_key.clone())?, model)
        }

        ProviderEntry::Groq { api_key, model } => {
            with_model(OpenAIProvider::new_groq(api_key.clone())?, model)
        }

        ProviderEntry::Ollama { base_url, model } => {
            OpenAIProvider::new_ollama(base_url.clone(), model.clone())?
        }
    };

    tracing::debug!(
        provider = provider.name(),
        model = provider.default_model(),
        "Created LLM provider"
    );

    Ok(Box::new(provider))
}

fn with_model(provider: OpenAIProvider, model: &Option<String>) -> OpenAIProvider {
    match model {
        Some(m) => provider.with_model(m.clone()),
        None => provider,
    }
}
