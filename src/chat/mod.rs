//! Chat application module for interactive farming consultations.
//!
//! This module provides a streaming REPL chat surface built on top of the
//! client library. It supports:
//!
//! - Streaming replies with real-time token display
//! - Saving, browsing and deleting chats
//! - PDF export of the transcript
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: transcript state, agent turns and saved chats
//! - [`commands`]: slash command parsing
//! - [`render`]: terminal output

mod commands;
mod config;
mod render;
mod session;

pub use commands::{ChatCommand, ChatRef, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use render::{PlainTextRenderer, Renderer};
pub use session::{ChatSession, GREETING, SessionStats};
