// Public modules
pub mod chat_message;
pub mod run_request;
pub mod saved_chat;
pub mod session_id;
pub mod stream_payload;
pub mod text_unit;

// Re-exports
pub use chat_message::{ChatMessage, Role};
pub use run_request::{NewMessage, RunRequest, RunTurn, TextPart};
pub use saved_chat::SavedChat;
pub use session_id::{SessionCreated, SessionId};
pub use stream_payload::{ContentPart, StreamContent, StreamDelta, StreamPayload};
pub use text_unit::TextUnit;
