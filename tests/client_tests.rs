use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::Router;
use forvo_relay::config::ForvoConfig;
use forvo_relay::forvo::{FetchError, ForvoClient, HttpForvoClient};

#[derive(Default)]
struct Upstream {
    hits: AtomicUsize,
    /// Number of leading requests answered with 503
    failures: usize,
}

async fn flaky(State(upstream): State<Arc<Upstream>>) -> (StatusCode, &'static str) {
    let hit = upstream.hits.fetch_add(1, Ordering::SeqCst);
    if hit < upstream.failures {
        (StatusCode::SERVICE_UNAVAILABLE, "busy")
    } else {
        (StatusCode::OK, "<html>ok</html>")
    }
}

async fn missing(State(upstream): State<Arc<Upstream>>) -> StatusCode {
    upstream.hits.fetch_add(1, Ordering::SeqCst);
    StatusCode::NOT_FOUND
}

async fn echo_headers(headers: HeaderMap) -> String {
    format!(
        "{}|{}",
        headers["user-agent"].to_str().unwrap(),
        headers["accept-language"].to_str().unwrap()
    )
}

async fn upstream(failures: usize) -> (Arc<Upstream>, ForvoConfig) {
    let upstream = Arc::new(Upstream {
        failures,
        ..Default::default()
    });
    let app = Router::new()
        .route("/word/:term/", get(flaky))
        .route("/missing/", get(missing))
        .route("/headers/", get(echo_headers))
        .route("/audio.mp3", get(|| async { "ID3" }))
        .with_state(Arc::clone(&upstream));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = ForvoConfig {
        host: format!("http://{addr}"),
        audio_host: format!("http://{addr}"),
        retry_backoff_ms: 1,
        ..Default::default()
    };
    (upstream, config)
}

#[tokio::test]
async fn test_retries_transient_status() {
    let (upstream, config) = upstream(2).await;
    let client = HttpForvoClient::new(&config).unwrap();

    let html = client.fetch_page("/word/neko/").await.unwrap();

    assert_eq!(html, "<html>ok</html>");
    assert_eq!(upstream.hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    let (upstream, config) = upstream(10).await;
    let client = HttpForvoClient::new(&config).unwrap();

    let result = client.fetch_page("/word/neko/").await;

    assert!(matches!(
        result.unwrap_err(),
        FetchError::Status { status: 503, .. }
    ));
    assert_eq!(upstream.hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let (upstream, config) = upstream(0).await;
    let client = HttpForvoClient::new(&config).unwrap();

    let result = client.fetch_page("/missing/").await;

    assert!(matches!(
        result.unwrap_err(),
        FetchError::Status { status: 404, .. }
    ));
    assert_eq!(upstream.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_sends_browser_headers() {
    let (_upstream, config) = upstream(0).await;
    let client = HttpForvoClient::new(&config).unwrap();

    let echoed = client.fetch_page("/headers/").await.unwrap();

    assert_eq!(echoed, format!("{}|en-US,en;q=0.5", config.user_agent));
}

#[tokio::test]
async fn test_fetch_audio() {
    let (_upstream, config) = upstream(0).await;
    let client = HttpForvoClient::new(&config).unwrap();

    let data = client
        .fetch_audio(&format!("{}/audio.mp3", config.audio_host))
        .await
        .unwrap();

    assert_eq!(data.as_ref(), b"ID3");
}

#[tokio::test]
async fn test_connection_failure_is_an_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ForvoConfig {
        host: format!("http://{addr}"),
        retry_backoff_ms: 1,
        request_timeout_secs: 2,
        ..Default::default()
    };
    let client = HttpForvoClient::new(&config).unwrap();

    let result = client.fetch_page("/word/neko/").await;
    assert!(matches!(result.unwrap_err(), FetchError::Http(_)));
}

#[tokio::test]
async fn test_dropped_connection_retries_on_fresh_session() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));

    let seen = Arc::clone(&connections);
    tokio::spawn(async move {
        loop {
            let (mut socket, _) = listener.accept().await.unwrap();
            let n = seen.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                // First connection is closed without an answer
                drop(socket);
                continue;
            }
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let read = socket.read(&mut buf).await.unwrap();
                    if read == 0 {
                        return;
                    }
                    request.extend_from_slice(&buf[..read]);
                }
                let body = "<html>ok</html>";
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.unwrap();
            });
        }
    });

    let config = ForvoConfig {
        host: format!("http://{addr}"),
        retry_backoff_ms: 1,
        request_timeout_secs: 5,
        ..Default::default()
    };
    let client = HttpForvoClient::new(&config).unwrap();

    let html = client.fetch_page("/word/neko/").await.unwrap();

    assert_eq!(html, "<html>ok</html>");
    assert_eq!(connections.load(Ordering::SeqCst), 2);
}
