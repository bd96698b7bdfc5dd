// Public modules
pub mod archive;
pub mod chat;
pub mod client;
pub mod error;
pub mod export;
pub mod session;
pub mod sse;
pub mod types;
pub mod utils;

mod observability;

// Re-exports
pub use archive::{ARCHIVE_KEY, ChatArchive, FileStorage, MemoryStorage, Storage};
pub use client::{AgentApi, PungdeClient, StreamSummary};
pub use error::{Error, Result};
pub use export::{AssetFetcher, HttpAssetFetcher, export_transcript};
pub use observability::register_biometrics;
pub use session::{GUEST_USER, SessionStore};
pub use sse::{LineOutcome, classify_line, process_sse};
pub use types::*;
