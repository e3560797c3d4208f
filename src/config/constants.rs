// Project-wide constants
//
// Centralised here so port numbers and other magic values have one
// source of truth. Import via `use crate::config::constants::*;`.

/// Default bind address for the HTTP server (localhost only).
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8000";

/// Hard bound on one chat exchange, from request receipt to the last byte.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default maximum tokens for one assistant reply.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Request bodies above this are rejected before parsing.
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Config file location under the home directory.
pub const CONFIG_DIR: &str = ".folio";
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding the config file path.
pub const CONFIG_ENV: &str = "FOLIO_CONFIG";
