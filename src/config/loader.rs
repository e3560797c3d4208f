// Configuration loader
// Loads ~/.folio/config.toml (or an explicit path) with environment fallback

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::constants::{CONFIG_DIR, CONFIG_ENV, CONFIG_FILE};
use super::provider::{ProviderEntry, StoreEntry};
use super::settings::Config;

/// Load configuration.
///
/// Resolution order: `explicit` path, `$FOLIO_CONFIG`, `~/.folio/config.toml`,
/// then provider/store credentials from the environment.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return load_from_file(path);
    }

    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return load_from_file(Path::new(&path));
        }
    }

    if let Some(path) = default_config_path() {
        if path.exists() {
            return load_from_file(&path);
        }
    }

    if let Some(config) = config_from_env(|key| std::env::var(key).ok())? {
        return Ok(config);
    }

    bail!(
        "No configuration found. Create ~/{}/{} or set:\n\n\
        export OPENAI_API_KEY=\"sk-...\"\n\n\
        Optionally point at a hosted store with INSTANT_APP_ID and INSTANT_APP_ADMIN_TOKEN.",
        CONFIG_DIR,
        CONFIG_FILE
    );
}

/// `~/.folio/config.toml`, when a home directory exists
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Parse and validate a TOML config file
pub fn load_from_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file {}", path.display()))?;

    let mut config: Config = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse configuration file {}", path.display()))?;

    // Seed paths are relative to the config file, not the working directory
    if let StoreEntry::Memory {
        seed_path: Some(seed),
    } = &mut config.store
    {
        if seed.is_relative() {
            if let Some(dir) = path.parent() {
                *seed = dir.join(&*seed);
            }
        }
    }

    config
        .validate()
        .context("Configuration validation failed")?;

    tracing::debug!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

/// Build a configuration from environment variables.
///
/// Returns `Ok(None)` when no provider key is set. Accepts the variable
/// names used by the hosted web app as aliases.
pub fn config_from_env<F>(lookup: F) -> Result<Option<Config>>
where
    F: Fn(&str) -> Option<String>,
{
    let first = |keys: &[&str]| {
        keys.iter()
            .filter_map(|k| lookup(*k))
            .find(|v| !v.trim().is_empty())
    };

    let Some(api_key) = first(&["OPENAI_API_KEY", "OPEN_AI_API_KEY"]) else {
        return Ok(None);
    };

    let mut config = Config::with_provider(ProviderEntry::Openai {
        api_key,
        model: first(&["OPENAI_MODEL"]),
        base_url: first(&["OPENAI_BASE_URL"]),
    });

    let app_id = first(&["INSTANT_APP_ID", "NEXT_PUBLIC_INSTANT_APP_ID"]);
    let admin_token = first(&["INSTANT_APP_ADMIN_TOKEN"]);
    config.store = match (app_id, admin_token) {
        (Some(app_id), Some(admin_token)) => StoreEntry::Instant {
            app_id,
            admin_token,
            base_url: None,
        },
        (Some(_), None) => {
            bail!("INSTANT_APP_ADMIN_TOKEN is not defined in environment variables")
        }
        _ => StoreEntry::Memory {
            seed_path: first(&["FOLIO_SEED"]).map(PathBuf::from),
        },
    };

    if let Some(addr) = first(&["FOLIO_BIND"]) {
        config.server.bind_address = addr;
    }

    config.validate().context("Configuration validation failed")?;
    Ok(Some(config))
}
