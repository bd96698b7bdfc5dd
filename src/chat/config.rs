//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved
//! configuration the chat session and binary run with.

use std::path::PathBuf;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::client::{DEFAULT_APP_NAME, DEFAULT_TIMEOUT};
use crate::session::GUEST_USER;

/// Directory under `$HOME` holding saved chats when no directory is given.
const DEFAULT_ARCHIVE_SUBDIR: &str = ".pungde";

/// Command-line arguments for the pungde-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Base URL of the agent service.
    #[arrrg(optional, "Agent service base URL (default: $PUNGDE_API_BASE)", "URL")]
    pub base_url: Option<String>,

    /// Agent application name.
    #[arrrg(optional, "Agent application name (default: pungde_agent)", "NAME")]
    pub app_name: Option<String>,

    /// User the sessions are created for.
    #[arrrg(optional, "User id (default: guest)", "USER")]
    pub user: Option<String>,

    /// Directory holding saved chats.
    #[arrrg(optional, "Saved chat directory (default: ~/.pungde)", "DIR")]
    pub archive_dir: Option<String>,

    /// Directory PDF exports are written to.
    #[arrrg(optional, "PDF export directory (default: .)", "DIR")]
    pub export_dir: Option<String>,

    /// Connect and session-creation timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECONDS")]
    pub timeout: Option<u64>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Base URL override; `None` uses the environment or the production default.
    pub base_url: Option<String>,

    /// Agent application name.
    pub app_name: String,

    /// User the sessions belong to.
    pub user_id: String,

    /// Directory of the file-backed chat archive.
    pub archive_dir: PathBuf,

    /// Directory PDF exports are written to.
    pub export_dir: PathBuf,

    /// Timeout for connecting and for session creation. Streams are not bounded.
    pub timeout: Duration,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    pub fn new() -> Self {
        Self {
            base_url: None,
            app_name: DEFAULT_APP_NAME.to_string(),
            user_id: GUEST_USER.to_string(),
            archive_dir: default_archive_dir(),
            export_dir: PathBuf::from("."),
            timeout: DEFAULT_TIMEOUT,
            use_color: true,
        }
    }

    /// Sets the agent service base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the application name.
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    /// Sets the user id.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn with_archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = dir.into();
        self
    }

    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let defaults = ChatConfig::new();
        ChatConfig {
            base_url: args.base_url,
            app_name: args.app_name.unwrap_or(defaults.app_name),
            user_id: args.user.unwrap_or(defaults.user_id),
            archive_dir: args
                .archive_dir
                .map(PathBuf::from)
                .unwrap_or(defaults.archive_dir),
            export_dir: args
                .export_dir
                .map(PathBuf::from)
                .unwrap_or(defaults.export_dir),
            timeout: args
                .timeout
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            use_color: !args.no_color,
        }
    }
}

fn default_archive_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(DEFAULT_ARCHIVE_SUBDIR),
        None => PathBuf::from(DEFAULT_ARCHIVE_SUBDIR),
    }
}
