//! Ownership of the agent session for one chat surface.
//!
//! [`SessionStore`] is created once at startup and is the only thing that
//! changes the active session identifier.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::client::AgentApi;
use crate::error::{Error, Result};
use crate::types::SessionId;

/// Default user for anonymous use.
pub const GUEST_USER: &str = "guest";

/// Holds the current agent session and hands out per-turn cancellation tokens.
///
/// Tokens returned by [`SessionStore::turn_token`] are children of a root token
/// that is cancelled whenever the session is replaced, so replies of a
/// discarded conversation stop streaming.
pub struct SessionStore<A: AgentApi> {
    api: Arc<A>,
    user_id: String,
    session_id: Option<SessionId>,
    last_error: Option<Error>,
    root: CancellationToken,
}

impl<A: AgentApi> SessionStore<A> {
    /// Creates an empty store. No session exists until [`acquire`](Self::acquire).
    pub fn new(api: Arc<A>, user_id: impl Into<String>) -> Self {
        Self {
            api,
            user_id: user_id.into(),
            session_id: None,
            last_error: None,
            root: CancellationToken::new(),
        }
    }

    /// Ensures a session exists, creating one if needed.
    ///
    /// A failure leaves the session unset and is remembered in
    /// [`last_error`](Self::last_error); calling `acquire` again retries.
    pub async fn acquire(&mut self) -> Result<&SessionId> {
        if self.session_id.is_none() {
            self.create().await?;
        }
        self.current()
    }

    /// Discards the current session and creates a fresh one.
    ///
    /// In-flight turns of the previous session are cancelled first.
    pub async fn replace(&mut self) -> Result<&SessionId> {
        self.root.cancel();
        self.root = CancellationToken::new();
        if let Some(previous) = self.session_id.take() {
            tracing::debug!(session_id = %previous, "discarding session");
        }
        self.create().await?;
        self.current()
    }

    /// A cancellation token for one turn of the current session.
    pub fn turn_token(&self) -> CancellationToken {
        self.root.child_token()
    }

    /// The current session, if one was acquired.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// The user the sessions belong to.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The error of the most recent failed acquisition, cleared on success.
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// Returns true if a session is available.
    pub fn is_ready(&self) -> bool {
        self.session_id.is_some()
    }

    async fn create(&mut self) -> Result<()> {
        match self.api.create_session(&self.user_id).await {
            Ok(id) => {
                tracing::info!(session_id = %id, user_id = %self.user_id, "session ready");
                self.session_id = Some(id);
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(user_id = %self.user_id, error = %err, "could not acquire session");
                self.session_id = None;
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    fn current(&self) -> Result<&SessionId> {
        self.session_id
            .as_ref()
            .ok_or_else(|| Error::session("no session has been acquired"))
    }
}
