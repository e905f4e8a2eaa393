//! Runs the real client against a minimal HTTP/1.1 stub on a local socket.

use std::time::Duration;

use counsel_api_client::{ApiClient, ApiError};
use counsel_core::{ChatRequest, ClientId, EventStreamDecoder, SessionId, StreamEvent};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Accept one connection, capture the request, answer with `head` and then
/// each body chunk in turn, then close the connection.
async fn serve_once(head: String, chunks: Vec<Vec<u8>>) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let base_url = format!("http://{}", listener.local_addr().expect("local addr"));

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let request = read_request(&mut socket).await;

        socket.write_all(head.as_bytes()).await.expect("write head");
        for chunk in chunks {
            socket.write_all(&chunk).await.expect("write chunk");
            socket.flush().await.expect("flush");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let _ = socket.shutdown().await;
        request
    });

    (base_url, handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 1024];
    loop {
        let n = socket.read(&mut tmp).await.expect("read request");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn json_head(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn client(base_url: &str) -> ApiClient {
    ApiClient::new(base_url, Some(Duration::from_secs(5)), Duration::from_secs(2))
        .expect("build client")
}

#[tokio::test]
async fn history_decodes_roster_and_hits_client_path() {
    let body = r#"[{"session_id":"s1","title":"임금 문의","issues":[],"is_terminal":false}]"#;
    let (base_url, server) = serve_once(json_head("200 OK", body), Vec::new()).await;

    let roster = client(&base_url)
        .history(&ClientId::new("client_abc123xyz"))
        .await
        .expect("history");

    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].session_id, SessionId::new("s1"));
    let request = server.await.expect("server task");
    assert!(request.starts_with("GET /api/history/client_abc123xyz "));
}

#[tokio::test]
async fn chat_history_non_success_is_a_status_error() {
    let body = r#"{"detail":"Session not found"}"#;
    let (base_url, server) = serve_once(json_head("404 Not Found", body), Vec::new()).await;

    let err = client(&base_url)
        .chat_history(&ClientId::new("c"), &SessionId::new("missing"))
        .await
        .expect_err("404 should fail");

    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status, 404);
            assert!(body.contains("Session not found"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let request = server.await.expect("server task");
    assert!(request.starts_with("GET /api/chat-history/c/missing "));
}

#[tokio::test]
async fn open_chat_maps_403_to_quota_exceeded() {
    let (base_url, server) =
        serve_once(json_head("403 Forbidden", r#"{"detail":"limit"}"#), Vec::new()).await;

    let req = ChatRequest {
        message: "hello".to_string(),
        client_id: ClientId::new("c"),
        session_id: None,
    };
    let err = client(&base_url).open_chat(&req).await.err().expect("403");
    assert!(matches!(err, ApiError::QuotaExceeded));

    let request = server.await.expect("server task");
    assert!(request.starts_with("POST /api/chat "));
    assert!(request.to_ascii_lowercase().contains("accept: text/event-stream"));
    assert!(request.contains(r#""session_id":null"#));
}

#[tokio::test]
async fn open_chat_streams_body_chunks_in_order() {
    let head = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n"
        .to_string();
    let chunks = vec![
        b"data: {\"type\":\"message\",\"payload\":{\"te".to_vec(),
        b"xt\":\"hi\",\"session_id\":\"s9\"}}\n\n".to_vec(),
        b"data: {\"type\":\"done\",\"payload\":{\"is_terminal\":true}}\n\n".to_vec(),
    ];
    let (base_url, server) = serve_once(head, chunks).await;

    let req = ChatRequest {
        message: "hello".to_string(),
        client_id: ClientId::new("c"),
        session_id: Some(SessionId::new("s9")),
    };
    let mut stream = client(&base_url).open_chat(&req).await.expect("stream");

    let mut decoder = EventStreamDecoder::new();
    let mut events = Vec::new();
    while let Some(chunk) = stream.next_chunk().await.expect("chunk") {
        events.extend(decoder.feed(&chunk));
    }

    let kinds: Vec<_> = events.iter().map(StreamEvent::kind).collect();
    assert_eq!(kinds, vec!["message", "done"]);
    server.await.expect("server task");
}

#[tokio::test]
async fn reset_session_posts_client_and_session() {
    let (base_url, server) = serve_once(
        json_head("200 OK", r#"{"status":"success","message":"Session reset"}"#),
        Vec::new(),
    )
    .await;

    client(&base_url)
        .reset_session(&ClientId::new("c"), &SessionId::new("s1"))
        .await
        .expect("reset");

    let request = server.await.expect("server task");
    assert!(request.starts_with("POST /api/reset "));
    assert!(request.contains(r#""session_id":"s1""#));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = client(&format!("http://{addr}"))
        .history(&ClientId::new("c"))
        .await
        .expect_err("connection refused");
    assert!(matches!(err, ApiError::Http(_)), "got {err:?}");
}

#[test]
fn non_http_base_url_is_rejected() {
    let err = ApiClient::new("localhost:8000", None, Duration::from_secs(2))
        .err()
        .expect("scheme required");
    assert!(matches!(err, ApiError::Other(ref msg) if msg.contains("localhost:8000")));
}
