// Chat stream events and their wire framing
//
// Frames follow the line-oriented data-stream protocol used by the web chat
// client: a one-character type code, a colon, a JSON payload, a newline.

use serde_json::{json, Value};

/// Response header announcing the data-stream framing
pub const DATA_STREAM_HEADER: &str = "x-vercel-ai-data-stream";
pub const DATA_STREAM_VERSION: &str = "v1";

/// One event of a streamed chat response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Provider accepted the request; the assistant message begins
    Start { message_id: String },
    /// Incremental assistant text
    TextDelta(String),
    /// Completion marker
    Finished { finish_reason: String },
    /// Terminal error marker
    Error { message: String },
}

impl ChatEvent {
    /// True for the events that end a stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatEvent::Finished { .. } | ChatEvent::Error { .. })
    }

    /// Encode as one data-stream line
    pub fn to_frame(&self) -> String {
        match self {
            ChatEvent::Start { message_id } => {
                format!("f:{}\n", json!({ "messageId": message_id }))
            }
            ChatEvent::TextDelta(text) => format!("0:{}\n", Value::String(text.clone())),
            ChatEvent::Error { message } => format!("3:{}\n", Value::String(message.clone())),
            ChatEvent::Finished { finish_reason } => {
                format!("d:{}\n", json!({ "finishReason": finish_reason }))
            }
        }
    }
}
