//! Integration tests for the Pungde client against an in-process HTTP responder.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio_util::sync::CancellationToken;

    use pungde::{AgentApi, PungdeClient, RunTurn, SessionId, TextUnit};

    /// A request as the responder saw it.
    #[derive(Debug, Clone)]
    struct Captured {
        request_line: String,
        headers: Vec<(String, String)>,
        body: String,
    }

    impl Captured {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        }
    }

    /// What the responder sends back: a status, then body pieces with a pause between them.
    #[derive(Clone)]
    struct Reply {
        status: &'static str,
        content_type: &'static str,
        pieces: Vec<&'static str>,
        /// Keep the connection open this long after the last piece.
        linger: Duration,
        /// Advertised body length; `None` means close-delimited.
        content_length: Option<usize>,
    }

    impl Reply {
        fn json(status: &'static str, body: &'static str) -> Self {
            Self {
                status,
                content_type: "application/json",
                pieces: vec![body],
                linger: Duration::ZERO,
                content_length: None,
            }
        }

        fn events(pieces: Vec<&'static str>) -> Self {
            Self {
                status: "200 OK",
                content_type: "text/event-stream",
                pieces,
                linger: Duration::ZERO,
                content_length: None,
            }
        }
    }

    /// Serves one scripted reply per connection, in order, and records the requests.
    async fn serve(replies: Vec<Reply>) -> (String, Arc<Mutex<Vec<Captured>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let captured = Arc::new(Mutex::new(Vec::new()));
        let log = captured.clone();
        tokio::spawn(async move {
            for reply in replies {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let request = read_request(&mut socket).await;
                log.lock().unwrap().push(request);
                write_reply(socket, reply).await;
            }
        });
        (base, captured)
    }

    async fn read_request(socket: &mut TcpStream) -> Captured {
        let mut data = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers");
            data.extend_from_slice(&chunk[..n]);
            if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&data[..header_end]).into_owned();
        let mut lines = head.split("\r\n");
        let request_line = lines.next().unwrap_or_default().to_string();
        let headers: Vec<(String, String)> = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .collect();
        let length = headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.parse::<usize>().ok())
            .unwrap_or(0);
        while data.len() < header_end + length {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..n]);
        }
        let body = String::from_utf8_lossy(&data[header_end..]).into_owned();
        Captured {
            request_line,
            headers,
            body,
        }
    }

    async fn write_reply(mut socket: TcpStream, reply: Reply) {
        let length = reply
            .content_length
            .map(|n| format!("content-length: {n}\r\n"))
            .unwrap_or_default();
        let head = format!(
            "HTTP/1.1 {}\r\ncontent-type: {}\r\n{length}connection: close\r\n\r\n",
            reply.status, reply.content_type
        );
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        for piece in reply.pieces {
            if socket.write_all(piece.as_bytes()).await.is_err() {
                return;
            }
            let _ = socket.flush().await;
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(reply.linger).await;
        let _ = socket.shutdown().await;
    }

    fn client(base: &str) -> PungdeClient {
        PungdeClient::with_options(
            Some(base.to_string()),
            Some("pungde_agent".to_string()),
            Some(Duration::from_secs(5)),
        )
        .unwrap()
    }

    fn turn(text: &str) -> RunTurn {
        RunTurn::new("guest", SessionId::new("session-1"), text)
    }

    #[tokio::test]
    async fn create_session_returns_the_id() {
        let (base, captured) = serve(vec![Reply::json(
            "200 OK",
            r#"{"id":"abc-123","appName":"pungde_agent","state":{}}"#,
        )])
        .await;

        let id = client(&base).create_session("guest").await.unwrap();
        assert_eq!(id.as_str(), "abc-123");

        let requests = captured.lock().unwrap();
        assert_eq!(
            requests[0].request_line,
            "POST /apps/pungde_agent/users/guest/sessions HTTP/1.1"
        );
        assert_eq!(requests[0].body, "{}");
        assert_eq!(requests[0].header("content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn create_session_maps_status_codes() {
        let (base, _) = serve(vec![
            Reply::json("404 Not Found", r#"{"detail":"App not found"}"#),
            Reply::json("503 Service Unavailable", "warming up"),
        ])
        .await;
        let client = client(&base);

        let err = client.create_session("guest").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("App not found"));

        let err = client.create_session("guest").await.unwrap_err();
        assert!(err.is_server_error());
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn failed_run_never_invokes_callback() {
        let (base, _) = serve(vec![Reply::json(
            "500 Internal Server Error",
            r#"{"detail":"boom"}"#,
        )])
        .await;

        let mut calls = 0;
        let err = client(&base)
            .send_message(&turn("Hello"), &CancellationToken::new(), |_| calls += 1)
            .await
            .unwrap_err();
        assert!(err.is_server_error());
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn unreachable_service_is_a_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let mut calls = 0;
        let err = client(&base)
            .send_message(&turn("Hello"), &CancellationToken::new(), |_| calls += 1)
            .await
            .unwrap_err();
        assert!(err.is_connection());
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn streamed_units_arrive_in_order_and_malformed_lines_are_skipped() {
        let (base, captured) = serve(vec![Reply::events(vec![
            ": keep-alive\n",
            "data: {\"delta\":{\"text\":\"Irrigate \"}}\n",
            "data: {not json}\n",
            "data: {\"delta\":{\"te",
            "xt\":\"at dawn.\"}}\n\n",
            "data: {\"partial\":true,\"content\":{\"parts\":[{\"text\":\"ignored\"}]}}\n",
            "data: {\"partial\":false,\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"Irrigate at dawn.\"}]}}\n",
            "data: [DONE]\n",
        ])])
        .await;

        let mut units = Vec::new();
        let summary = client(&base)
            .send_message(&turn("When should I water?"), &CancellationToken::new(), |unit| {
                units.push(unit)
            })
            .await
            .unwrap();

        assert_eq!(
            units,
            vec![
                TextUnit::Delta("Irrigate ".to_string()),
                TextUnit::Delta("at dawn.".to_string()),
                TextUnit::Full("Irrigate at dawn.".to_string()),
            ]
        );
        assert_eq!(summary.units, 3);
        assert_eq!(summary.malformed, 1);
        assert!(!summary.cancelled);

        let requests = captured.lock().unwrap();
        let request = &requests[0];
        assert_eq!(request.request_line, "POST /run_sse HTTP/1.1");
        assert_eq!(request.header("accept"), Some("text/event-stream"));
        assert_eq!(request.header("cache-control"), Some("no-cache"));
        let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "app_name": "pungde_agent",
                "user_id": "guest",
                "session_id": "session-1",
                "newMessage": {"role": "user", "parts": [{"text": "When should I water?"}]}
            })
        );
    }

    #[tokio::test]
    async fn cancellation_stops_an_open_stream() {
        let mut reply = Reply::events(vec!["data: {\"delta\":{\"text\":\"first\"}}\n"]);
        reply.linger = Duration::from_secs(30);
        let (base, _) = serve(vec![reply]).await;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let mut units = Vec::new();
        let summary = tokio::time::timeout(
            Duration::from_secs(10),
            client(&base).send_message(&turn("Hi"), &cancel, |unit| {
                units.push(unit);
                trigger.cancel();
            }),
        )
        .await
        .expect("cancelled stream should return promptly")
        .unwrap();

        assert!(summary.cancelled);
        assert_eq!(units, vec![TextUnit::Delta("first".to_string())]);
    }

    #[tokio::test]
    async fn body_cut_short_is_a_streaming_error() {
        let mut reply = Reply::events(vec!["data: {\"delta\":{\"text\":\"Sow \"}}\n"]);
        reply.content_length = Some(4096);
        let (base, _) = serve(vec![reply]).await;

        let mut units = Vec::new();
        let err = client(&base)
            .send_message(&turn("When to sow?"), &CancellationToken::new(), |unit| {
                units.push(unit)
            })
            .await
            .unwrap_err();

        assert!(err.is_streaming(), "unexpected error: {err}");
        assert_eq!(units, vec![TextUnit::Delta("Sow ".to_string())]);
    }

    #[tokio::test]
    async fn trait_object_delivers_the_same_units() {
        let (base, _) = serve(vec![Reply::events(vec![
            "data: {\"delta\":{\"text\":\"नमस्ते\"}}\n",
        ])])
        .await;

        let api: Arc<dyn AgentApi> = Arc::new(client(&base));
        let mut units = Vec::new();
        let mut on_text = |unit: TextUnit| units.push(unit);
        api.send_message(&turn("Hi"), &CancellationToken::new(), &mut on_text)
            .await
            .unwrap();
        assert_eq!(units, vec![TextUnit::Delta("नमस्ते".to_string())]);
    }
}
