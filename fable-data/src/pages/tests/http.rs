//! `HttpPageSource` against a loopback listener serving canned responses.

use super::super::{HttpPageSource, HttpPageSourceConfig, PageSource, PageUrl, TransportError};
use crate::test_support::block_on_for_tests;
use rstest::rstest;
use std::time::Duration;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

/// How the listener answers its single connection.
enum Reply {
    Respond(String),
    Stall,
}

fn response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// Accept one connection on an ephemeral port and answer it with `reply`.
async fn serve_once(reply: Reply) -> PageUrl {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback listener");
    let address = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        let mut request = [0_u8; 4096];
        if stream.read(&mut request).await.is_err() {
            return;
        }
        match reply {
            Reply::Respond(raw) => {
                if stream.write_all(raw.as_bytes()).await.is_ok() {
                    let _ = stream.shutdown().await;
                }
            }
            Reply::Stall => tokio::time::sleep(Duration::from_secs(30)).await,
        }
    });
    PageUrl::parse(&format!("http://{address}/books/")).expect("loopback URL")
}

fn source(timeout: Duration) -> HttpPageSource {
    HttpPageSource::with_config(HttpPageSourceConfig::default().with_timeout(timeout))
        .expect("build HTTP source")
}

#[rstest]
fn returns_body_of_successful_response() {
    let body = r#"{"results": [], "next": null}"#;
    let fetched = block_on_for_tests(async {
        let url = serve_once(Reply::Respond(response("200 OK", body))).await;
        source(Duration::from_secs(5)).fetch(&url).await
    })
    .expect("fetch succeeds");
    assert_eq!(fetched, body.as_bytes());
}

#[rstest]
#[case::not_found("404 Not Found", 404)]
#[case::server_error("503 Service Unavailable", 503)]
fn maps_error_status_to_http_error(#[case] status: &str, #[case] expected: u16) {
    let (url, result) = block_on_for_tests(async {
        let url = serve_once(Reply::Respond(response(status, "{}"))).await;
        let result = source(Duration::from_secs(5)).fetch(&url).await;
        (url, result)
    });
    match result {
        Err(TransportError::Http {
            url: failed,
            status: code,
            ..
        }) => {
            assert_eq!(code, expected);
            assert_eq!(failed, url.to_string());
        }
        other => panic!("expected an HTTP status error, got {other:?}"),
    }
}

#[rstest]
fn maps_elapsed_deadline_to_timeout() {
    let result = block_on_for_tests(async {
        let url = serve_once(Reply::Stall).await;
        source(Duration::from_millis(200)).fetch(&url).await
    });
    match result {
        Err(TransportError::Timeout { timeout_secs, .. }) => assert_eq!(timeout_secs, 0),
        other => panic!("expected a timeout, got {other:?}"),
    }
}

#[rstest]
fn maps_refused_connection_to_network_error() {
    let result = block_on_for_tests(async {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback listener");
        let address = listener.local_addr().expect("listener address");
        drop(listener);
        let url = PageUrl::parse(&format!("http://{address}/books/")).expect("loopback URL");
        source(Duration::from_secs(5)).fetch(&url).await
    });
    match result {
        Err(TransportError::Network { url, .. }) => assert!(url.starts_with("http://127.0.0.1:")),
        other => panic!("expected a network error, got {other:?}"),
    }
}
