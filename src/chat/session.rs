//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the visible
//! transcript, streams replies from the agent, and manages saved chats.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::archive::{ChatArchive, Storage};
use crate::chat::commands::ChatRef;
use crate::client::{AgentApi, StreamSummary};
use crate::error::{Error, Result};
use crate::export::{AssetFetcher, export_to_dir};
use crate::session::SessionStore;
use crate::types::{ChatMessage, RunTurn, SavedChat, SessionId, TextUnit};

use super::render::Renderer;

/// The assistant's opening message of every new chat.
pub const GREETING: &str = "Namaste 👋 I am Pungda. How can I support your farming today?";

fn greeting() -> ChatMessage {
    ChatMessage::assistant(GREETING)
}

/// Messages of one reply, in arrival order.
///
/// Consecutive deltas build a single message. A full message closes any
/// delta message and stands on its own.
#[derive(Debug, Default)]
struct Reply {
    messages: Vec<ChatMessage>,
    streaming: bool,
}

impl Reply {
    fn push(&mut self, unit: TextUnit) {
        match unit {
            TextUnit::Delta(text) => {
                if self.streaming
                    && let Some(last) = self.messages.last_mut()
                {
                    last.content.push_str(&text);
                } else {
                    self.messages.push(ChatMessage::assistant(text));
                    self.streaming = true;
                }
            }
            TextUnit::Full(text) => {
                self.messages.push(ChatMessage::assistant(text));
                self.streaming = false;
            }
        }
    }
}

/// Snapshot of the chat state for `/status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// The active agent session, if any.
    pub session_id: Option<SessionId>,
    pub user_id: String,
    /// The number of messages in the transcript.
    pub message_count: usize,
    /// Name of the saved chat being viewed.
    pub viewing: Option<String>,
    /// Turns sent in this process.
    pub turns: u64,
    /// Turns that ended in an error.
    pub failed_turns: u64,
    /// The last session failure, rendered.
    pub last_error: Option<String>,
}

/// A chat surface: the visible transcript, its agent session, and the archive.
pub struct ChatSession<A: AgentApi, S: Storage> {
    api: Arc<A>,
    sessions: SessionStore<A>,
    archive: ChatArchive<S>,
    messages: Vec<ChatMessage>,
    viewing: Option<SavedChat>,
    turns: u64,
    failed_turns: u64,
}

impl<A: AgentApi, S: Storage> ChatSession<A, S> {
    /// Creates a chat session. No agent session exists until [`start`](Self::start).
    pub fn new(api: Arc<A>, user_id: impl Into<String>, archive: ChatArchive<S>) -> Self {
        Self {
            sessions: SessionStore::new(api.clone(), user_id),
            api,
            archive,
            messages: vec![greeting()],
            viewing: None,
            turns: 0,
            failed_turns: 0,
        }
    }

    /// Shows the greeting and acquires an agent session.
    ///
    /// On failure the chat stays usable for saved chats; `/retry` tries again.
    pub async fn start(&mut self) -> Result<()> {
        self.messages = vec![greeting()];
        self.viewing = None;
        self.sessions.acquire().await.map(|_| ())
    }

    /// A cancellation token for the next turn.
    pub fn turn_token(&self) -> CancellationToken {
        self.sessions.turn_token()
    }

    /// Sends a user message and streams the reply.
    ///
    /// The user message and every reply message received before a failure
    /// stay in the transcript.
    ///
    /// # Errors
    ///
    /// Returns an error for empty input, while viewing a saved chat, without
    /// a session, or if the request or stream fails.
    pub async fn send_streaming(
        &mut self,
        user_input: &str,
        renderer: &mut dyn Renderer,
        cancel: &CancellationToken,
    ) -> Result<StreamSummary> {
        let text = user_input.trim();
        if text.is_empty() {
            return Err(Error::validation(
                "message is empty",
                Some("text".to_string()),
            ));
        }
        if let Some(chat) = &self.viewing {
            return Err(Error::session(format!(
                "viewing saved chat \"{}\"; start a new chat to continue",
                chat.name
            )));
        }
        let Some(session_id) = self.sessions.session_id().cloned() else {
            return Err(Error::session("not connected; use /retry to reconnect"));
        };

        let turn = RunTurn::new(self.sessions.user_id(), session_id, text);
        self.messages.push(ChatMessage::user(text));
        self.turns += 1;

        let mut reply = Reply::default();
        let result = {
            let mut on_text = |unit: TextUnit| {
                match &unit {
                    TextUnit::Delta(delta) => renderer.print_text(delta),
                    TextUnit::Full(full) => {
                        renderer.print_message(&ChatMessage::assistant(full.as_str()))
                    }
                }
                reply.push(unit);
            };
            self.api.send_message(&turn, cancel, &mut on_text).await
        };
        self.messages.append(&mut reply.messages);

        match &result {
            Ok(summary) if summary.cancelled => renderer.print_interrupted(),
            Ok(_) => renderer.finish_response(),
            Err(_) => {
                self.failed_turns += 1;
                renderer.finish_response();
            }
        }
        if let Ok(summary) = &result {
            tracing::debug!(
                session_id = %turn.session_id,
                units = summary.units,
                malformed = summary.malformed,
                cancelled = summary.cancelled,
                "turn finished"
            );
        }
        result
    }

    /// Starts over: leaves any saved chat, shows the greeting, and replaces the session.
    pub async fn new_chat(&mut self) -> Result<()> {
        self.viewing = None;
        self.messages = vec![greeting()];
        self.sessions.replace().await.map(|_| ())
    }

    /// Retries acquiring a session after a failure.
    pub async fn retry_session(&mut self) -> Result<SessionId> {
        self.sessions.acquire().await.cloned()
    }

    /// Saves the transcript under `name`.
    pub fn save(&mut self, name: &str) -> Result<SavedChat> {
        if let Some(chat) = &self.viewing {
            return Err(Error::session(format!(
                "\"{}\" is already saved; start a new chat to save another",
                chat.name
            )));
        }
        self.archive.save(name.trim(), &self.messages)
    }

    /// Every saved chat, most recent first.
    pub fn saved_chats(&self) -> Result<Vec<SavedChat>> {
        self.archive.list()
    }

    /// Resolves a `/load` or `/delete` argument to a saved chat id.
    pub fn resolve(&self, reference: &ChatRef) -> Result<String> {
        match reference {
            ChatRef::Id(id) => Ok(id.clone()),
            ChatRef::Index(n) => self
                .saved_chats()?
                .into_iter()
                .nth(n.saturating_sub(1))
                .map(|chat| chat.id)
                .ok_or_else(|| Error::not_found(format!("no saved chat #{n}"))),
        }
    }

    /// Opens the saved chat `id` read-only.
    pub fn load(&mut self, id: &str) -> Result<&SavedChat> {
        let chat = self
            .archive
            .get(id)?
            .ok_or_else(|| Error::not_found(format!("no saved chat with id {id}")))?;
        self.messages = chat.messages.clone();
        Ok(self.viewing.insert(chat))
    }

    /// Deletes the saved chat `id`; returns false if there was none.
    ///
    /// Deleting while viewing a saved chat returns to a new chat. The result
    /// only reflects the archive: a failed session replacement is left in
    /// [`SessionStats::last_error`] and the chat stays unready until `/retry`.
    pub async fn delete(&mut self, id: &str) -> Result<bool> {
        let deleted = self.archive.delete(id)?;
        if deleted
            && self.viewing.is_some()
            && let Err(err) = self.new_chat().await
        {
            tracing::debug!(chat_id = id, error = %err, "deleted chat, new session pending");
        }
        Ok(deleted)
    }

    /// Exports the transcript as a PDF into `dir`.
    pub async fn export_pdf(&self, fetcher: &dyn AssetFetcher, dir: &Path) -> Result<PathBuf> {
        let today = OffsetDateTime::now_utc().date();
        export_to_dir(&self.messages, fetcher, dir, today).await
    }

    /// The visible transcript.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The saved chat being viewed, if any.
    pub fn viewing(&self) -> Option<&SavedChat> {
        self.viewing.as_ref()
    }

    /// Returns true if messages can be sent.
    pub fn is_ready(&self) -> bool {
        self.sessions.is_ready() && self.viewing.is_none()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            session_id: self.sessions.session_id().cloned(),
            user_id: self.sessions.user_id().to_string(),
            message_count: self.messages.len(),
            viewing: self.viewing.as_ref().map(|chat| chat.name.clone()),
            turns: self.turns,
            failed_turns: self.failed_turns,
            last_error: self.sessions.last_error().map(ToString::to_string),
        }
    }
}
