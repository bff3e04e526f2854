//! One HTTP connection to a data gateway.

use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

use crate::error::StreamError;
use crate::http::{Request, Response};
use crate::net::Address;
use crate::stream::DuplexStream;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Body of every push.
#[derive(Debug, Serialize)]
struct PushEnvelope<'a, T: ?Sized> {
    key: &'a str,
    data: &'a T,
    storage: &'a str,
}

#[derive(Debug)]
pub struct GatewayClient {
    address: Address,
    stream: DuplexStream,
    connect_timeout: Option<Duration>,
}

impl GatewayClient {
    /// A client that has not dialed yet; the first push through
    /// [`push_with_retry`](crate::gateway::push_with_retry) connects it.
    pub fn new(address: Address, buffer_limit: usize) -> Self {
        Self {
            address,
            stream: DuplexStream::new(buffer_limit),
            connect_timeout: None,
        }
    }

    /// Bounds every dial made by [`reconnect`](Self::reconnect).
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub async fn connect(address: Address, buffer_limit: usize) -> Result<Self, GatewayError> {
        let mut client = Self::new(address, buffer_limit);
        client.reconnect().await?;
        Ok(client)
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Drops any current connection and dials the gateway again.
    pub async fn reconnect(&mut self) -> Result<(), GatewayError> {
        let address = self.address.clone();
        match self.connect_timeout {
            Some(timeout) => self.stream.open_within(address, timeout).await?,
            None => self.stream.open(address).await?,
        }
        Ok(())
    }

    pub async fn close(&mut self) {
        self.stream.close().await;
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_open()
    }

    /// Sends `record` under `key` and returns the gateway's status code and body.
    ///
    /// Reply bodies larger than the buffer limit fail with
    /// [`StreamError::BodyTooLong`].
    pub async fn push<T: Serialize + ?Sized>(
        &mut self,
        key: &str,
        record: &T,
        storage: &str,
    ) -> Result<(u16, Bytes), GatewayError> {
        let request = self.compose(key, record, storage)?;
        self.stream.output().write_message(&request).await?;

        let mut response = self.stream.input().read_response().await?;
        self.resolve_body(&mut response).await?;
        tracing::debug!(
            gateway = %self.address,
            key,
            code = response.code,
            "record pushed"
        );
        Ok((response.code, response.message.body))
    }

    fn compose<T: Serialize + ?Sized>(
        &self,
        key: &str,
        record: &T,
        storage: &str,
    ) -> Result<Request, GatewayError> {
        let body = serde_json::to_vec(&PushEnvelope {
            key,
            data: record,
            storage,
        })?;
        let mut request = Request::new("PUT", "/");
        request.headers.append("Host", self.address.name());
        request.headers.append("Content-Type", "application/json");
        request.set_body(body);
        Ok(request)
    }

    async fn resolve_body(&mut self, response: &mut Response) -> Result<(), StreamError> {
        if !response.body_pending || response.is_bodyless() {
            response.body_pending = false;
            return Ok(());
        }
        let input = self.stream.input();
        let limit = input.limit();
        response.body = if response.is_chunked() {
            input.read_chunked_body_within(limit).await?
        } else if let Some(length) = response.content_length()? {
            if length > limit as u64 {
                return Err(StreamError::BodyTooLong { limit });
            }
            input.read(length as usize).await?
        } else {
            // Close-delimited: the connection is spent afterwards.
            let body = input.read_to_end_within(limit).await?;
            self.stream.close().await;
            body
        };
        response.body_pending = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;
    use crate::http::HttpMessage;
    use crate::stream::DEFAULT_BUFFER_LIMIT;

    #[derive(Serialize)]
    struct Review {
        id: u32,
        text: &'static str,
    }

    #[test]
    fn composes_put_with_json_envelope() {
        let client = GatewayClient::new(Address::new("gw", 8086), DEFAULT_BUFFER_LIMIT);
        let req = client
            .compose("hotel_review", &Review { id: 7, text: "ok" }, "mysql")
            .unwrap();
        assert_eq!(req.start_line(), "PUT / HTTP/1.1");
        assert_eq!(req.headers.get("host"), Some("gw:8086"));
        assert_eq!(req.headers.get("Content-Type"), Some("application/json"));

        let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"key": "hotel_review", "data": {"id": 7, "text": "ok"}, "storage": "mysql"})
        );
        assert_eq!(req.content_length().unwrap(), Some(req.body.len() as u64));
    }

    #[tokio::test]
    async fn push_reads_close_delimited_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = Address::from(listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut peer = DuplexStream::from_tcp(socket, DEFAULT_BUFFER_LIMIT).unwrap();
            let req = peer.input().read_request().await.unwrap();
            assert!(!req.body_pending);
            peer.output()
                .write(b"HTTP/1.1 500 Internal Server Error\r\n\r\nduplicate key")
                .await
                .unwrap();
            peer.close().await;
        });

        let mut client = GatewayClient::connect(addr, DEFAULT_BUFFER_LIMIT).await.unwrap();
        let (code, body) = client.push("k", &[1, 2, 3], "mysql").await.unwrap();
        assert_eq!(code, 500);
        assert_eq!(&body[..], b"duplicate key");
        assert!(!client.is_connected());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn oversized_reply_body_is_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = Address::from(listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut peer = DuplexStream::from_tcp(socket, DEFAULT_BUFFER_LIMIT).unwrap();
            peer.input().read_request().await.unwrap();
            peer.output().write(b"HTTP/1.1 200 OK\r\n\r\n").await.unwrap();
            peer.output().write(&[b'x'; 500]).await.unwrap();
            peer.close().await;
        });

        let mut client = GatewayClient::connect(addr, 64).await.unwrap();
        assert!(matches!(
            client.push("k", "v", "s").await,
            Err(GatewayError::Stream(StreamError::BodyTooLong { limit: 64 }))
        ));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn connect_timeout_bounds_the_dial() {
        let started = std::time::Instant::now();
        let result = GatewayClient::new(Address::new("10.255.255.1", 8086), DEFAULT_BUFFER_LIMIT)
            .with_connect_timeout(Duration::from_millis(100))
            .reconnect()
            .await;
        assert!(matches!(result, Err(GatewayError::Stream(StreamError::Io(_)))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn push_without_connection_fails() {
        let mut client = GatewayClient::new(Address::new("127.0.0.1", 9), DEFAULT_BUFFER_LIMIT);
        assert!(!client.is_connected());
        assert!(matches!(
            client.push("k", "v", "s").await,
            Err(GatewayError::Stream(StreamError::NotConnected))
        ));
    }
}
