// Configuration module
// Public interface for configuration loading

pub mod constants;
mod loader;
mod provider;
mod settings;

pub use loader::{config_from_env, default_config_path, load_config, load_from_file};
pub use provider::{ProviderEntry, StoreEntry};
pub use settings::{AssistantConfig, Config, ServerConfig};
