// Context-grounded chat exchange

mod controller;
mod error;
mod events;
mod request;

pub use controller::{ChatController, ChatSettings, ChatStream, ResolvedPortfolio};
pub use error::ChatError;
pub use events::{ChatEvent, DATA_STREAM_HEADER, DATA_STREAM_VERSION};
pub use request::{ChatRequest, PortfolioSource};

/// One turn of the visitor's transcript
pub use crate::providers::Message as ConversationMessage;
