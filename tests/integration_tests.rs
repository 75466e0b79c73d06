//! Integration tests for the parley library.
//!
//! Most tests run the real client against a throwaway local HTTP server that
//! speaks just enough of the Gemini streaming protocol.  The live test
//! requires an API key in the environment and is skipped without one.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use futures::StreamExt;
    use serde_json::Value;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use parley::chat::{ChatController, ERROR_SUFFIX, Renderer, SendOutcome};
    use parley::{
        ConnectionStatus, FileStore, GeminiAdapter, Message, MemoryStore, ModelAdapter, Role,
        SessionConfig, api_key_from_env,
    };

    /// Ignores everything.
    struct QuietRenderer;

    impl Renderer for QuietRenderer {
        fn print_text(&mut self, _: &str) {}
        fn print_error(&mut self, _: &str) {}
        fn print_info(&mut self, _: &str) {}
        fn print_message(&mut self, _: &Message) {}
        fn finish_response(&mut self) {}
    }

    /// A canned HTTP response.
    struct Canned {
        status: &'static str,
        content_type: &'static str,
        body: String,
    }

    fn sse(fragments: &[&str]) -> Canned {
        let mut body = String::new();
        for fragment in fragments {
            let chunk = serde_json::json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": fragment}]},
                    "index": 0
                }]
            });
            body.push_str(&format!("data: {chunk}\r\n\r\n"));
        }
        Canned {
            status: "200 OK",
            content_type: "text/event-stream",
            body,
        }
    }

    fn failure(status: &'static str, code: u16, message: &str) -> Canned {
        Canned {
            status,
            content_type: "application/json",
            body: serde_json::json!({
                "error": {"code": code, "message": message, "status": "UNAVAILABLE"}
            })
            .to_string(),
        }
    }

    /// Serves `responses` in order, one per connection, and records each
    /// request's path and JSON body.
    async fn serve(responses: Vec<Canned>) -> (String, Arc<Mutex<Vec<(String, Value)>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);
        tokio::spawn(async move {
            for canned in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let (path, body) = read_request(&mut socket).await;
                seen.lock().unwrap().push((path, body));
                let head = format!(
                    "HTTP/1.1 {}\r\ncontent-type: {}\r\nconnection: close\r\n\r\n",
                    canned.status, canned.content_type
                );
                socket.write_all(head.as_bytes()).await.unwrap();
                socket.write_all(canned.body.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
        });
        (format!("http://{addr}/v1beta/"), requests)
    }

    async fn read_request(socket: &mut TcpStream) -> (String, Value) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let path = head
            .split_whitespace()
            .nth(1)
            .unwrap_or_default()
            .to_string();
        let length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())?
            })
            .unwrap_or(0);
        while buf.len() < header_end + length {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending body");
            buf.extend_from_slice(&chunk[..n]);
        }
        let body = serde_json::from_slice(&buf[header_end..header_end + length]).unwrap();
        (path, body)
    }

    fn adapter(base_url: &str) -> GeminiAdapter {
        GeminiAdapter::new(SessionConfig::default())
            .with_api_key("test-key")
            .with_base_url(base_url)
            .with_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn conversation_streams_and_replays_history() {
        let (base_url, requests) =
            serve(vec![sse(&["Hi", " there", "!"]), sse(&["Still ", "here."])]).await;
        let store = MemoryStore::new();
        let mut controller =
            ChatController::new(adapter(&base_url), store).with_connect_delay(Duration::ZERO);
        let mut renderer = QuietRenderer;

        assert_eq!(
            controller.connect(&mut renderer).await,
            ConnectionStatus::Connected
        );
        assert_eq!(
            controller.send_message("Hello", &mut renderer).await,
            SendOutcome::Completed
        );
        assert_eq!(controller.messages()[1].content, "Hi there!");
        assert!(!controller.messages()[1].is_streaming);

        assert_eq!(
            controller.send_message("Are you there?", &mut renderer).await,
            SendOutcome::Completed
        );
        assert_eq!(controller.messages()[3].content, "Still here.");

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        let (path, first) = &requests[0];
        assert_eq!(
            path,
            "/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse"
        );
        assert_eq!(first["contents"].as_array().unwrap().len(), 1);
        assert!(first["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("witty"));

        let contents = requests[1].1["contents"].as_array().unwrap();
        let texts: Vec<&str> = contents
            .iter()
            .map(|c| c["parts"][0]["text"].as_str().unwrap())
            .collect();
        assert_eq!(texts, vec!["Hello", "Hi there!", "Are you there?"]);
        let roles: Vec<&str> = contents
            .iter()
            .map(|c| c["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["user", "model", "user"]);
    }

    #[tokio::test]
    async fn server_error_tags_reply_and_keeps_connection() {
        let (base_url, _) = serve(vec![
            failure("503 Service Unavailable", 503, "overloaded"),
            sse(&["Back."]),
        ])
        .await;
        let mut controller = ChatController::new(adapter(&base_url), MemoryStore::new())
            .with_connect_delay(Duration::ZERO);
        let mut renderer = QuietRenderer;
        controller.connect(&mut renderer).await;

        let outcome = controller.send_message("Hello", &mut renderer).await;
        assert_eq!(outcome, SendOutcome::Failed);
        let reply = &controller.messages()[1];
        assert_eq!(reply.content, ERROR_SUFFIX);
        assert!(reply.is_error);
        assert_eq!(controller.status(), ConnectionStatus::Connected);

        // The failed turn was not committed, so the next request starts fresh.
        assert_eq!(
            controller.send_message("Again", &mut renderer).await,
            SendOutcome::Completed
        );
        assert_eq!(controller.messages()[3].content, "Back.");
    }

    #[tokio::test]
    async fn error_event_mid_stream_keeps_partial_text() {
        let mut canned = sse(&["Partial"]);
        canned
            .body
            .push_str("data: {\"error\":{\"code\":500,\"message\":\"internal\"}}\r\n\r\n");
        let (base_url, _) = serve(vec![canned]).await;
        let mut controller = ChatController::new(adapter(&base_url), MemoryStore::new())
            .with_connect_delay(Duration::ZERO);
        let mut renderer = QuietRenderer;
        controller.connect(&mut renderer).await;

        assert_eq!(
            controller.send_message("Hello", &mut renderer).await,
            SendOutcome::Failed
        );
        let reply = &controller.messages()[1];
        assert_eq!(reply.content, format!("Partial{ERROR_SUFFIX}"));
        assert!(reply.is_error);
        assert!(!reply.is_streaming);
    }

    #[tokio::test]
    async fn missing_credential_is_error_status() {
        let adapter = GeminiAdapter::new(SessionConfig::default()).with_api_key("");
        let mut controller =
            ChatController::new(adapter, MemoryStore::new()).with_connect_delay(Duration::ZERO);
        let mut renderer = QuietRenderer;

        assert_eq!(
            controller.connect(&mut renderer).await,
            ConnectionStatus::Error
        );
        assert!(!controller.can_send());
        assert!(
            !controller
                .send_message("Hello", &mut renderer)
                .await
                .was_sent()
        );
        assert!(controller.messages().is_empty());
    }

    #[tokio::test]
    async fn history_survives_restart_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let (base_url, _) = serve(vec![sse(&["Hi", " there", "!"])]).await;

        let mut controller = ChatController::new(adapter(&base_url), FileStore::new(dir.path()))
            .with_connect_delay(Duration::ZERO);
        let mut renderer = QuietRenderer;
        controller.connect(&mut renderer).await;
        controller.send_message("Hello", &mut renderer).await;
        let before = controller.messages().to_vec();
        drop(controller);

        let restarted = ChatController::new(adapter(&base_url), FileStore::new(dir.path()));
        assert_eq!(restarted.messages(), before.as_slice());
        assert_eq!(restarted.messages()[0].role, Role::User);
        assert_eq!(restarted.messages()[1].content, "Hi there!");

        let mut restarted = restarted;
        restarted.clear_chat(&mut renderer);
        let reopened = ChatController::new(adapter(&base_url), FileStore::new(dir.path()));
        assert!(reopened.messages().is_empty());
    }

    #[tokio::test]
    async fn live_stream_from_gemini() {
        let Some(api_key) = api_key_from_env() else {
            eprintln!("Skipping test: GEMINI_API_KEY not set");
            return;
        };

        let mut adapter = GeminiAdapter::new(SessionConfig::default()).with_api_key(api_key);
        adapter
            .initialize()
            .await
            .expect("Failed to initialize adapter");
        let mut stream = adapter
            .send_stream("Reply with the single word: ready")
            .await
            .expect("Stream request should succeed");

        let mut reply = String::new();
        while let Some(fragment) = stream.next().await {
            reply.push_str(&fragment.expect("fragment").text);
        }
        assert!(!reply.trim().is_empty());
    }
}
