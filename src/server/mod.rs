// Folio - HTTP server module
// Serves the chat stream to browser clients

mod handlers;

pub use handlers::{create_router, handle_chat, handle_opener, health_check};

use anyhow::Result;
use std::sync::Arc;

use crate::chat::ChatController;
use crate::config::ServerConfig;

/// Shared handler state
pub struct AppState {
    pub controller: ChatController,
    /// Maximum accepted request body size
    pub body_limit_bytes: usize,
}

/// HTTP front end for one chat controller
pub struct ChatServer {
    controller: ChatController,
    config: ServerConfig,
}

impl ChatServer {
    pub fn new(controller: ChatController, config: ServerConfig) -> Self {
        Self { controller, config }
    }

    /// Router with all layers applied, as served
    pub fn router(&self) -> axum::Router {
        create_router(Arc::new(AppState {
            controller: self.controller.clone(),
            body_limit_bytes: self.config.body_limit_bytes,
        }))
    }

    /// Start the HTTP server
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.socket_addr()?;
        let app = self.router();

        tracing::info!(
            provider = self.controller.provider_name(),
            timeout_secs = self.config.request_timeout_secs,
            "Starting folio server on {}",
            addr
        );

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
