//! Error types for the Pungde client.
//!
//! Every fallible operation in the crate (session creation, streaming, archive
//! access and PDF export) reports failures through [`Error`].

use std::error;
use std::fmt;
use std::io;
use std::sync::Arc;

/// The main error type for the Pungde client.
#[derive(Clone, Debug)]
pub enum Error {
    /// The agent API returned a non-success status that has no more specific variant.
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Human-readable error message, usually the response body.
        message: String,
    },

    /// Authentication error.
    Authentication {
        message: String,
    },

    /// Resource not found.
    NotFound {
        message: String,
    },

    /// Rate limit exceeded.
    RateLimit {
        message: String,
        /// Time to wait before retrying, in seconds.
        retry_after: Option<u64>,
    },

    /// Bad request due to invalid parameters.
    BadRequest {
        message: String,
    },

    /// Request timed out.
    Timeout {
        message: String,
        /// Duration of the timeout in seconds.
        duration: Option<f64>,
    },

    /// Connection error.
    Connection {
        message: String,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Server returned a 500 internal error.
    InternalServer {
        message: String,
    },

    /// Server is overloaded or unavailable.
    ServiceUnavailable {
        message: String,
        /// Time to wait before retrying, in seconds.
        retry_after: Option<u64>,
    },

    /// Error during JSON serialization or deserialization.
    Serialization {
        message: String,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// I/O error.
    Io {
        message: String,
        source: Arc<io::Error>,
    },

    /// HTTP client error.
    HttpClient {
        message: String,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// An argument or state check failed before any work was done.
    Validation {
        message: String,
        /// Parameter that failed validation.
        param: Option<String>,
    },

    /// A URL parsing or manipulation error.
    Url {
        message: String,
        source: Option<url::ParseError>,
    },

    /// A streaming error occurred.
    Streaming {
        message: String,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// No agent session is available.
    Session {
        message: String,
    },

    /// An image or emoji asset could not be fetched or decoded during export.
    Asset {
        message: String,
        /// The asset location.
        url: String,
    },

    /// The PDF document could not be produced.
    Pdf {
        message: String,
    },
}

impl Error {
    /// Creates a new API error.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Error::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a new authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Error::Authentication {
            message: message.into(),
        }
    }

    /// Creates a new not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound {
            message: message.into(),
        }
    }

    /// Creates a new rate limit error.
    pub fn rate_limit(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        Error::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    /// Creates a new bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest {
            message: message.into(),
        }
    }

    /// Creates a new timeout error.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    /// Creates a new connection error.
    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new internal server error.
    pub fn internal_server(message: impl Into<String>) -> Self {
        Error::InternalServer {
            message: message.into(),
        }
    }

    /// Creates a new service unavailable error.
    pub fn service_unavailable(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        Error::ServiceUnavailable {
            message: message.into(),
            retry_after,
        }
    }

    /// Creates a new serialization error.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a new HTTP client error.
    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// Creates a new URL error.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Creates a new streaming error.
    pub fn streaming(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Streaming {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new session error.
    pub fn session(message: impl Into<String>) -> Self {
        Error::Session {
            message: message.into(),
        }
    }

    /// Creates a new asset error.
    pub fn asset(message: impl Into<String>, url: impl Into<String>) -> Self {
        Error::Asset {
            message: message.into(),
            url: url.into(),
        }
    }

    /// Creates a new PDF error.
    pub fn pdf(message: impl Into<String>) -> Self {
        Error::Pdf {
            message: message.into(),
        }
    }

    /// Returns true if this error is related to authentication.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication { .. })
    }

    /// Returns true if this error is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Returns true if this error is related to rate limiting.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Error::RateLimit { .. })
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Returns true if this error is a connection error.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    /// Returns true if the response stream failed after it started.
    pub fn is_streaming(&self) -> bool {
        matches!(self, Error::Streaming { .. })
    }

    /// Returns true if this error is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Error::InternalServer { .. } | Error::ServiceUnavailable { .. }
        )
    }

    /// Returns true if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Returns true if no session was available.
    pub fn is_session(&self) -> bool {
        matches!(self, Error::Session { .. })
    }

    /// Returns true if an export asset failed.
    pub fn is_asset(&self) -> bool {
        matches!(self, Error::Asset { .. })
    }

    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Api { status_code, .. } => {
                matches!(status_code, 408 | 409 | 429 | 500..=599)
            }
            Error::Timeout { .. } => true,
            Error::Connection { .. } => true,
            Error::RateLimit { .. } => true,
            Error::ServiceUnavailable { .. } => true,
            Error::InternalServer { .. } => true,
            _ => false,
        }
    }

    /// Returns the status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status_code, .. } => Some(*status_code),
            Error::Authentication { .. } => Some(401),
            Error::NotFound { .. } => Some(404),
            Error::RateLimit { .. } => Some(429),
            Error::BadRequest { .. } => Some(400),
            Error::InternalServer { .. } => Some(500),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (label, message) = match self {
            Error::Api {
                status_code,
                message,
            } => {
                return write!(f, "API error ({status_code}): {message}");
            }
            Error::Authentication { message } => ("Authentication error", message),
            Error::NotFound { message } => ("Resource not found", message),
            Error::RateLimit {
                message,
                retry_after,
            }
            | Error::ServiceUnavailable {
                message,
                retry_after,
            } => {
                let label = if matches!(self, Error::RateLimit { .. }) {
                    "Rate limit exceeded"
                } else {
                    "Service unavailable"
                };
                return match retry_after {
                    Some(secs) => write!(f, "{label}: {message} (retry after {secs} seconds)"),
                    None => write!(f, "{label}: {message}"),
                };
            }
            Error::BadRequest { message } => ("Bad request", message),
            Error::Timeout { message, duration } => {
                return match duration {
                    Some(secs) => write!(f, "Timeout error: {message} ({secs} seconds)"),
                    None => write!(f, "Timeout error: {message}"),
                };
            }
            Error::Validation { message, param } => {
                return match param {
                    Some(param) => write!(f, "Validation error: {message} (parameter: {param})"),
                    None => write!(f, "Validation error: {message}"),
                };
            }
            Error::Asset { message, url } => {
                return write!(f, "Asset error: {message} ({url})");
            }
            Error::Connection { message, .. } => ("Connection error", message),
            Error::InternalServer { message } => ("Internal server error", message),
            Error::Serialization { message, .. } => ("Serialization error", message),
            Error::Io { message, .. } => ("I/O error", message),
            Error::HttpClient { message, .. } => ("HTTP client error", message),
            Error::Url { message, .. } => ("URL error", message),
            Error::Streaming { message, .. } => ("Streaming error", message),
            Error::Session { message } => ("Session error", message),
            Error::Pdf { message } => ("PDF error", message),
        };
        write!(f, "{label}: {message}")
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Connection { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Serialization { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Io { source, .. } => Some(source),
            Error::HttpClient { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            Error::Streaming { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

/// A specialized Result type for Pungde operations.
pub type Result<T> = std::result::Result<T, Error>;
