//! HTTP push transport against a throwaway local server.
mod common;

use std::time::Duration;

use common::FakeDashboard;
use hudpush_agent::error::TransportError;
use hudpush_agent::push::{HttpTransport, PushClient, PushTransport};
use hudpush_proto::{PushRequest, VisualType, WidgetData};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

/// Serve exactly one request with `status` and `body`; returns the endpoint
/// and a handle yielding the JSON body that was posted.
async fn one_shot(status: &'static str, body: &'static str, delay: Duration) -> (Url, tokio::task::JoinHandle<Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let posted = loop {
            let n = sock.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(split) = text.find("\r\n\r\n") {
                let len = text[..split]
                    .lines()
                    .find_map(|l| {
                        let (k, v) = l.split_once(':')?;
                        k.eq_ignore_ascii_case("content-length")
                            .then(|| v.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= split + 4 + len {
                    break serde_json::from_slice(&buf[split + 4..split + 4 + len])
                        .unwrap_or(Value::Null);
                }
            }
            if n == 0 {
                break Value::Null;
            }
        };
        tokio::time::sleep(delay).await;
        let resp = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = sock.write_all(resp.as_bytes()).await;
        let _ = sock.shutdown().await;
        posted
    });
    let url = Url::parse(&format!("http://{addr}/api/widget")).unwrap();
    (url, handle)
}

fn text_update() -> PushRequest {
    PushRequest::data(
        "gpu.0.pcie",
        WidgetData::Text {
            value: "12 KB/s".into(),
            label: Some("PCIe RX".into()),
            props: None,
        },
    )
}

#[tokio::test]
async fn posts_json_and_reads_props() {
    let (url, server) = one_shot("200 OK", r#"{"status":"ok","props":{"unit":"MB/s"}}"#, Duration::ZERO).await;
    let t = HttpTransport::new(url, Duration::from_secs(2)).unwrap();
    let resp = t.send(&text_update()).await.unwrap();
    assert_eq!(resp.status.as_deref(), Some("ok"));
    assert_eq!(resp.into_props()["unit"], "MB/s");

    let posted = server.await.unwrap();
    assert_eq!(posted["module_id"], "gpu.0.pcie");
    assert_eq!(posted["data"], json!({"value": "12 KB/s", "label": "PCIe RX"}));
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let (url, _server) = one_shot("500 Internal Server Error", "{}", Duration::ZERO).await;
    let t = HttpTransport::new(url, Duration::from_secs(2)).unwrap();
    assert!(matches!(t.send(&text_update()).await, Err(TransportError::Status(500))));
}

#[tokio::test]
async fn unparsable_body_is_malformed() {
    let (url, _server) = one_shot("200 OK", "<html>", Duration::ZERO).await;
    let t = HttpTransport::new(url, Duration::from_secs(2)).unwrap();
    assert!(matches!(t.send(&text_update()).await, Err(TransportError::Malformed(_))));
}

#[tokio::test]
async fn slow_service_times_out() {
    let (url, _server) = one_shot("200 OK", "{}", Duration::from_millis(800)).await;
    let t = HttpTransport::new(url, Duration::from_millis(100)).unwrap();
    assert!(matches!(t.send(&text_update()).await, Err(TransportError::Timeout)));
}

#[tokio::test]
async fn refused_connection_is_a_request_error() {
    // bind then drop to get a port nobody listens on
    let addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
    let url = Url::parse(&format!("http://{addr}/api/widget")).unwrap();
    let client = PushClient::new(HttpTransport::new(url, Duration::from_secs(1)).unwrap());
    let req = PushRequest::data("gpu.0", WidgetData::placeholder(VisualType::Sparkline));
    assert!(matches!(client.push(&req).await, Err(TransportError::Request(_))));
}

#[tokio::test]
async fn push_returns_current_props() {
    let dash = FakeDashboard::new();
    dash.script(Ok(json!({"max_procs": 3})));
    dash.script(Ok(json!("not an object")));
    let client = PushClient::new(dash);
    let req = PushRequest::data("gpu.0.procs", WidgetData::placeholder(VisualType::BarList));

    let props = client.push(&req).await.unwrap();
    assert_eq!(props.number("max_procs"), Some(3.0));
    let props = client.push(&req).await.unwrap();
    assert!(props.is_empty());
    assert_eq!(client.transport().calls.get(), 2);
}
