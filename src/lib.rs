// Folio - Context-grounded portfolio assistant
// Library exports

pub mod chat;
pub mod config;
pub mod instruction;
pub mod portfolio;
pub mod providers;
pub mod server;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default `folio=info,tower_http=info` filter.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("folio=info,tower_http=info"));

    // A subscriber may already be installed (tests, embedding); keep it
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
