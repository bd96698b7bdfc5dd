use std::env;
use std::time::{Duration, Instant};

use futures::{Stream, StreamExt};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, SESSIONS_CREATED,
    STREAM_CANCELLED, STREAM_DURATION, STREAM_ERRORS, STREAM_MALFORMED, STREAM_TEXT_UNITS,
    STREAM_TTFB,
};
use crate::sse::{LineOutcome, process_sse};
use crate::types::{RunRequest, RunTurn, SessionCreated, SessionId, TextUnit};

/// Production deployment of the agent service.
pub const DEFAULT_API_BASE: &str = "https://pungde-ai-802772821263.us-central1.run.app";
/// Agent application the client talks to.
pub const DEFAULT_APP_NAME: &str = "pungde_agent";
/// Environment variable overriding the API base URL.
pub const API_BASE_ENV: &str = "PUNGDE_API_BASE";
/// Connect and session-creation timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// What happened while consuming one streamed reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSummary {
    /// Number of text units delivered to the callback.
    pub units: usize,
    /// Number of `data:` lines whose payload could not be decoded.
    pub malformed: usize,
    /// True if the stream was abandoned through the cancellation token.
    pub cancelled: bool,
}

/// The remote agent operations the rest of the crate depends on.
#[async_trait::async_trait]
pub trait AgentApi: Send + Sync {
    /// Create a new conversation session for `user_id`.
    async fn create_session(&self, user_id: &str) -> Result<SessionId>;

    /// Send one user message and deliver the reply text as it streams in.
    ///
    /// `on_text` is invoked once per extracted [`TextUnit`], in arrival order.
    /// It is never invoked when the request itself fails.
    async fn send_message(
        &self,
        turn: &RunTurn,
        cancel: &CancellationToken,
        on_text: &mut (dyn FnMut(TextUnit) + Send),
    ) -> Result<StreamSummary>;
}

/// Client for the Pungde agent service.
#[derive(Debug, Clone)]
pub struct PungdeClient {
    client: ReqwestClient,
    base_url: Url,
    app_name: String,
    timeout: Duration,
}

impl PungdeClient {
    /// Create a new client.
    ///
    /// The base URL can be provided directly or read from the PUNGDE_API_BASE
    /// environment variable; otherwise the production service is used.
    pub fn new(base_url: Option<String>) -> Result<Self> {
        Self::with_options(base_url, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        base_url: Option<String>,
        app_name: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let base_url = match base_url {
            Some(url) => url,
            None => env::var(API_BASE_ENV).unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
        };
        let base_url = parse_base_url(&base_url)?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        // No overall timeout: a streamed reply may legitimately outlive it.
        let client = ReqwestClient::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            app_name: app_name.unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
            timeout,
        })
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The agent application name.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// The URL of an endpoint below the base URL, one path segment per element.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::url(format!("{} cannot be a base URL", self.base_url), None))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {e}"),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };

        // The service answers errors with either {"detail": ...} or plain text.
        let message = serde_json::from_str::<serde_json::Value>(&error_body)
            .ok()
            .and_then(|value| {
                value
                    .get("detail")
                    .or_else(|| value.get("error"))
                    .and_then(|detail| detail.as_str().map(String::from))
            })
            .unwrap_or(error_body);

        match status_code {
            400 => Error::bad_request(message),
            401 | 403 => Error::authentication(message),
            404 => Error::not_found(message),
            408 => Error::timeout(message, None),
            429 => Error::rate_limit(message, retry_after),
            500 => Error::internal_server(message),
            502..=504 => Error::service_unavailable(message, retry_after),
            _ => Error::api(status_code, message),
        }
    }

    /// Create a new session for `user_id` and return its identifier.
    pub async fn create_session(&self, user_id: &str) -> Result<SessionId> {
        let url = self.endpoint(&["apps", &self.app_name, "users", user_id, "sessions"])?;
        CLIENT_REQUESTS.click();
        let start = Instant::now();

        let result = async {
            let response = self
                .client
                .post(url.clone())
                .headers(self.default_headers())
                .timeout(self.timeout)
                .body("{}")
                .send()
                .await
                .map_err(|e| self.map_send_error(e))?;

            if !response.status().is_success() {
                return Err(Self::process_error_response(response).await);
            }

            response
                .json::<SessionCreated>()
                .await
                .map(SessionId::from)
                .map_err(|e| {
                    Error::serialization(
                        format!("Failed to parse session response: {e}"),
                        Some(Box::new(e)),
                    )
                })
        }
        .await;

        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        match &result {
            Ok(id) => {
                SESSIONS_CREATED.click();
                tracing::debug!(session_id = %id, user_id, "created session");
            }
            Err(err) => {
                CLIENT_REQUEST_ERRORS.click();
                tracing::error!(%url, error = %err, "session creation failed");
            }
        }
        result
    }

    /// Submit `turn` and return the stream of classified reply lines.
    pub async fn stream_run(
        &self,
        turn: &RunTurn,
    ) -> Result<impl Stream<Item = Result<LineOutcome>> + Send> {
        let url = self.endpoint(&["run_sse"])?;
        let body = RunRequest::new(&self.app_name, turn);

        let mut headers = self.default_headers();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        CLIENT_REQUESTS.click();
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        Ok(process_sse(response.bytes_stream()))
    }

    /// Send one user message and deliver reply text to `on_text` as it arrives.
    ///
    /// Malformed payload lines are skipped. The stream ends when the server
    /// closes the connection or `cancel` fires. Request failures are logged and
    /// returned without `on_text` ever being called.
    pub async fn send_message<F>(
        &self,
        turn: &RunTurn,
        cancel: &CancellationToken,
        mut on_text: F,
    ) -> Result<StreamSummary>
    where
        F: FnMut(TextUnit) + Send,
    {
        let start = Instant::now();
        let stream = match self.stream_run(turn).await {
            Ok(stream) => stream,
            Err(err) => {
                CLIENT_REQUEST_ERRORS.click();
                tracing::error!(
                    session_id = %turn.session_id,
                    error = %err,
                    "streaming request failed"
                );
                return Err(err);
            }
        };
        futures::pin_mut!(stream);

        let mut summary = StreamSummary::default();
        let mut first_byte = true;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    summary.cancelled = true;
                    STREAM_CANCELLED.click();
                    break;
                }
                next = stream.next() => next,
            };
            if first_byte {
                STREAM_TTFB.add(start.elapsed().as_secs_f64());
                first_byte = false;
            }
            match next {
                Some(Ok(LineOutcome::Text(unit))) => {
                    summary.units += 1;
                    STREAM_TEXT_UNITS.click();
                    on_text(unit);
                }
                Some(Ok(LineOutcome::Malformed { reason })) => {
                    summary.malformed += 1;
                    STREAM_MALFORMED.click();
                    tracing::debug!(%reason, "skipping malformed stream payload");
                }
                Some(Ok(LineOutcome::Done | LineOutcome::Ignored)) => {}
                Some(Err(err)) => {
                    STREAM_ERRORS.click();
                    tracing::error!(
                        session_id = %turn.session_id,
                        error = %err,
                        delivered = summary.units,
                        "stream interrupted"
                    );
                    return Err(err);
                }
                None => break,
            }
        }

        STREAM_DURATION.add(start.elapsed().as_secs_f64());
        tracing::debug!(
            session_id = %turn.session_id,
            units = summary.units,
            malformed = summary.malformed,
            cancelled = summary.cancelled,
            "stream finished"
        );
        Ok(summary)
    }
}

#[async_trait::async_trait]
impl AgentApi for PungdeClient {
    async fn create_session(&self, user_id: &str) -> Result<SessionId> {
        PungdeClient::create_session(self, user_id).await
    }

    async fn send_message(
        &self,
        turn: &RunTurn,
        cancel: &CancellationToken,
        on_text: &mut (dyn FnMut(TextUnit) + Send),
    ) -> Result<StreamSummary> {
        PungdeClient::send_message(self, turn, cancel, |unit| on_text(unit)).await
    }
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    let url = Url::parse(base_url)?;
    if url.cannot_be_a_base() {
        return Err(Error::url(format!("{base_url} cannot be a base URL"), None));
    }
    Ok(url)
}
