//! Tunnel tests over real sockets.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use http_relay::stream::{DuplexStream, DEFAULT_BUFFER_LIMIT};
use http_relay::Tunnel;

mod common;

/// Accepted client side as a DuplexStream plus the raw socket driving it.
async fn accepted_pair() -> (TcpStream, DuplexStream) {
    let (listener, addr) = common::bind().await;
    let (raw, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
    let stream = DuplexStream::from_tcp(accepted.unwrap().0, DEFAULT_BUFFER_LIMIT).unwrap();
    (raw.unwrap(), stream)
}

#[tokio::test]
async fn relays_through_dialed_endpoint() {
    let echo = common::start_echo_server().await;
    let (mut client, left) = accepted_pair().await;
    let right = DuplexStream::connect(common::address(echo), DEFAULT_BUFFER_LIMIT)
        .await
        .unwrap();

    let relay = tokio::spawn(async move { Tunnel::new(left, right).run().await });

    client.write_all(b"ping over the tunnel").await.unwrap();
    let mut reply = [0u8; 20];
    client.read_exact(&mut reply).await.unwrap();
    assert_eq!(&reply, b"ping over the tunnel");

    client.shutdown().await.unwrap();
    assert!(common::drain(&mut client).await.is_empty());

    let stats = relay.await.unwrap().unwrap();
    assert_eq!(stats.left_to_right, 20);
    assert_eq!(stats.right_to_left, 20);
}

#[tokio::test]
async fn many_small_writes_arrive_in_order() {
    let echo = common::start_echo_server().await;
    let (client, left) = accepted_pair().await;
    let right = DuplexStream::connect(common::address(echo), DEFAULT_BUFFER_LIMIT)
        .await
        .unwrap();
    let relay = tokio::spawn(async move { Tunnel::new(left, right).with_chunk_size(3).run().await });

    let (mut rd, mut wr) = client.into_split();
    let writer = tokio::spawn(async move {
        for i in 0..200u32 {
            wr.write_all(format!("{i};").as_bytes()).await.unwrap();
        }
        wr.shutdown().await.unwrap();
    });

    let mut echoed = String::new();
    rd.read_to_string(&mut echoed).await.unwrap();
    writer.await.unwrap();

    let expected: String = (0..200u32).map(|i| format!("{i};")).collect();
    assert_eq!(echoed, expected);
    let stats = relay.await.unwrap().unwrap();
    assert_eq!(stats.left_to_right, expected.len() as u64);
}

#[tokio::test]
async fn reset_peer_ends_relay_with_error_or_close() {
    let (mut a, left) = accepted_pair().await;
    let (b, right) = accepted_pair().await;
    let relay = tokio::spawn(async move { Tunnel::new(left, right).run().await });

    drop(b);
    a.shutdown().await.unwrap();
    let _ = common::drain(&mut a).await;

    // Either a clean double close or an I/O error; never a hang.
    let finished = tokio::time::timeout(std::time::Duration::from_secs(5), relay).await;
    assert!(finished.is_ok());
}
