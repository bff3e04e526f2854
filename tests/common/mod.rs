//! Shared utilities for integration tests.
//!
//! Every server binds 127.0.0.1:0 and returns its address, so tests can run
//! in parallel.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use http_relay::http::{Request, Response};
use http_relay::stream::{DuplexStream, DEFAULT_BUFFER_LIMIT};
use http_relay::Address;

pub async fn bind() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// A port with nothing listening on it.
pub async fn dead_address() -> SocketAddr {
    let (listener, addr) = bind().await;
    drop(listener);
    addr
}

/// Echoes every byte back and closes once the peer half-closes.
pub async fn start_echo_server() -> SocketAddr {
    let (listener, addr) = bind().await;
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut rd, mut wr) = socket.split();
                let _ = tokio::io::copy(&mut rd, &mut wr).await;
                let _ = wr.shutdown().await;
            });
        }
    });
    addr
}

/// Reads one request head per connection, then writes `reply` verbatim and closes.
pub async fn start_raw_backend(reply: &'static [u8]) -> SocketAddr {
    let (listener, addr) = bind().await;
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut peer) = DuplexStream::from_tcp(socket, DEFAULT_BUFFER_LIMIT) else {
                    return;
                };
                if peer.input().read_request().await.is_ok() {
                    let _ = peer.output().write(reply).await;
                }
                peer.close().await;
            });
        }
    });
    addr
}

/// Keep-alive HTTP backend driven by `f`.
///
/// Chunked request bodies are read before `f` sees the request. When `f`
/// returns `None` the connection is dropped without a reply.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<(u16, String)>> + Send + 'static,
{
    let (listener, addr) = bind().await;
    let f = Arc::new(f);
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let Ok(mut peer) = DuplexStream::from_tcp(socket, DEFAULT_BUFFER_LIMIT) else {
                    return;
                };
                loop {
                    let Ok(mut request) = peer.input().read_request().await else {
                        break;
                    };
                    if request.body_pending && request.is_chunked() {
                        let Ok(body) = peer.input().read_chunked_body().await else {
                            break;
                        };
                        request.body = body;
                        request.body_pending = false;
                    }
                    let Some((code, body)) = f(request).await else {
                        break;
                    };
                    let status = http::StatusCode::from_u16(code).unwrap();
                    let mut response = Response::new(status);
                    response.set_body(body);
                    if peer.output().write_message(&response).await.is_err() {
                        break;
                    }
                }
                peer.close().await;
            });
        }
    });
    addr
}

/// Sends `raw` over a fresh connection and returns the connection for reading.
pub async fn send_raw(addr: SocketAddr, raw: &[u8]) -> DuplexStream {
    let socket = TcpStream::connect(addr).await.unwrap();
    let mut stream = DuplexStream::from_tcp(socket, DEFAULT_BUFFER_LIMIT).unwrap();
    stream.output().write(raw).await.unwrap();
    stream
}

/// Reads everything a raw socket sends until it closes.
pub async fn drain(socket: &mut TcpStream) -> Vec<u8> {
    let mut out = Vec::new();
    socket.read_to_end(&mut out).await.unwrap();
    out
}

pub fn address(addr: SocketAddr) -> Address {
    Address::from(addr)
}
