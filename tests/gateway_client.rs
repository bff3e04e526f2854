//! Gateway client and push policy against a mock gateway.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use http_relay::config::RetryConfig;
use http_relay::gateway::{push_with_retry, GatewayClient, PushOutcome};
use http_relay::stream::DEFAULT_BUFFER_LIMIT;

mod common;

fn fast_retries(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        base_delay_ms: 1,
        max_delay_ms: 5,
    }
}

#[tokio::test]
async fn push_sends_json_put() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let gateway = common::start_programmable_backend(move |request| {
        let tx = tx.clone();
        async move {
            tx.send(request).unwrap();
            Some((200, "stored".to_string()))
        }
    })
    .await;

    let mut client = GatewayClient::connect(common::address(gateway), DEFAULT_BUFFER_LIMIT)
        .await
        .unwrap();
    let record = serde_json::json!({"hotel": "Seaside", "score": 4.5});
    let (code, body) = client.push("hotel_review", &record, "mysql").await.unwrap();
    assert_eq!(code, 200);
    assert_eq!(&body[..], b"stored");

    let request = rx.recv().await.unwrap();
    assert_eq!(request.method, "PUT");
    assert_eq!(request.target, "/");
    assert_eq!(request.headers.get("content-type"), Some("application/json"));
    assert_eq!(request.headers.get("Host"), Some(client.address().name().as_str()));
    let envelope: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(envelope["key"], "hotel_review");
    assert_eq!(envelope["storage"], "mysql");
    assert_eq!(envelope["data"], record);

    // Connection is kept alive for the next push.
    assert!(client.is_connected());
    let (code, _) = client.push("hotel_review", &record, "mysql").await.unwrap();
    assert_eq!(code, 200);
    client.close().await;
    assert!(!client.is_connected());
}

#[tokio::test]
async fn rejected_record_is_not_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let gateway = common::start_programmable_backend(move |_| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Some((409, "duplicate".to_string()))
        }
    })
    .await;

    let mut client = GatewayClient::new(common::address(gateway), DEFAULT_BUFFER_LIMIT);
    let outcome = push_with_retry(&mut client, "k", &[1, 2], "mysql", &fast_retries(3)).await;
    match outcome {
        PushOutcome::Rejected { code, body } => {
            assert_eq!(code, 409);
            assert_eq!(&body[..], b"duplicate");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn dropped_connection_is_retried_after_reconnect() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let gateway = common::start_programmable_backend(move |_| {
        let counter = counter.clone();
        async move {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                None
            } else {
                Some((200, String::new()))
            }
        }
    })
    .await;

    let mut client = GatewayClient::connect(common::address(gateway), DEFAULT_BUFFER_LIMIT)
        .await
        .unwrap();
    let outcome = push_with_retry(&mut client, "k", "v", "s", &fast_retries(2)).await;
    assert_eq!(outcome, PushOutcome::Accepted);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(client.is_connected());
}

#[tokio::test]
async fn unreachable_gateway_fails_after_budget() {
    let dead = common::dead_address().await;
    let mut client = GatewayClient::new(common::address(dead), DEFAULT_BUFFER_LIMIT);
    let outcome = push_with_retry(&mut client, "k", "v", "s", &fast_retries(2)).await;
    assert_eq!(outcome, PushOutcome::Failed { attempts: 2 });
}

#[tokio::test]
async fn chunked_reply_body_is_resolved() {
    let gateway = common::start_raw_backend(
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n2\r\nde\r\n0\r\n\r\n",
    )
    .await;
    let mut client = GatewayClient::connect(common::address(gateway), DEFAULT_BUFFER_LIMIT)
        .await
        .unwrap();
    let (code, body) = client.push("k", "v", "s").await.unwrap();
    assert_eq!(code, 200);
    assert_eq!(&body[..], b"abcde");
}
