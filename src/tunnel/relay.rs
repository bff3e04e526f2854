//! Blind byte relay between two connections.

use crate::error::Result;
use crate::observability::metrics;
use crate::stream::DuplexStream;

/// Largest piece forwarded per readiness event: 16 KiB.
pub const RELAY_CHUNK_SIZE: usize = 16 * 1024;

/// Bytes forwarded in each direction by [`Tunnel::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TunnelStats {
    pub left_to_right: u64,
    pub right_to_left: u64,
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// Two open endpoints relayed to each other until both close.
#[derive(Debug)]
pub struct Tunnel {
    left: DuplexStream,
    right: DuplexStream,
    chunk_size: usize,
}

impl Tunnel {
    pub fn new(left: DuplexStream, right: DuplexStream) -> Self {
        Self {
            left,
            right,
            chunk_size: RELAY_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Relays bytes in both directions.
    ///
    /// Bytes either side had already buffered are delivered first. When one
    /// side reaches EOF its peer's write half is shut down so the peer sees the
    /// close; the other direction keeps flowing until it closes as well. I/O
    /// errors end the relay and are returned.
    pub async fn run(&mut self) -> Result<TunnelStats> {
        let mut stats = TunnelStats::default();
        let left = &mut self.left;
        let right = &mut self.right;

        let early = left.input().take_pending();
        if !early.is_empty() {
            stats.left_to_right += right.output().write(&early).await? as u64;
        }
        let early = right.input().take_pending();
        if !early.is_empty() {
            stats.right_to_left += left.output().write(&early).await? as u64;
        }

        tracing::debug!(
            left = ?left.address().map(|a| a.fullname()),
            right = ?right.address().map(|a| a.fullname()),
            "tunnel started"
        );
        let _active = metrics::TunnelGauge::enter();

        let chunk = self.chunk_size;
        let mut left_open = true;
        let mut right_open = true;
        while left_open || right_open {
            // Both reads are cancel safe, so the losing branch drops nothing.
            let (side, data) = tokio::select! {
                data = left.input().read_some(chunk), if left_open => (Side::Left, data?),
                data = right.input().read_some(chunk), if right_open => (Side::Right, data?),
            };

            let (dst, open, counter) = match side {
                Side::Left => (&mut *right, &mut left_open, &mut stats.left_to_right),
                Side::Right => (&mut *left, &mut right_open, &mut stats.right_to_left),
            };
            if data.is_empty() {
                tracing::debug!(side = ?side, "tunnel endpoint closed");
                *open = false;
                if let Err(err) = dst.output().close().await {
                    tracing::trace!(error = %err, "ignoring error on half-close");
                }
                continue;
            }
            dst.output().write(&data).await?;
            *counter += data.len() as u64;
        }

        metrics::record_tunnel_bytes(stats.left_to_right, stats.right_to_left);
        tracing::debug!(
            left_to_right = stats.left_to_right,
            right_to_left = stats.right_to_left,
            "tunnel finished"
        );
        Ok(stats)
    }

    pub fn into_inner(self) -> (DuplexStream, DuplexStream) {
        (self.left, self.right)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use super::*;
    use crate::stream::DEFAULT_BUFFER_LIMIT;

    /// A connected pair: the far end as a raw socket, the near end as a DuplexStream.
    async fn pair() -> (TcpStream, DuplexStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (far, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        let near = DuplexStream::from_tcp(accepted.unwrap().0, DEFAULT_BUFFER_LIMIT).unwrap();
        (far.unwrap(), near)
    }

    #[tokio::test]
    async fn close_propagates_after_data() {
        let (mut a, left) = pair().await;
        let (mut b, right) = pair().await;
        let relay = tokio::spawn(async move { Tunnel::new(left, right).run().await });

        a.write_all(b"X").await.unwrap();
        a.shutdown().await.unwrap();

        let mut received = Vec::new();
        b.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"X");

        drop(b);
        let mut rest = Vec::new();
        a.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());

        let stats = relay.await.unwrap().unwrap();
        assert_eq!(stats.left_to_right, 1);
        assert_eq!(stats.right_to_left, 0);
    }

    #[tokio::test]
    async fn relays_both_directions_without_loss() {
        let (mut a, left) = pair().await;
        let (mut b, right) = pair().await;
        let relay =
            tokio::spawn(async move { Tunnel::new(left, right).with_chunk_size(7).run().await });

        let payload: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
        let expected = payload.clone();
        let (mut a_read, mut a_write) = a.split();
        let send = async {
            a_write.write_all(&payload).await.unwrap();
            a_write.shutdown().await.unwrap();
        };
        let echo = async {
            let mut got = Vec::new();
            b.read_to_end(&mut got).await.unwrap();
            b.write_all(b"done").await.unwrap();
            b.shutdown().await.unwrap();
            got
        };
        let reply = async {
            let mut got = Vec::new();
            a_read.read_to_end(&mut got).await.unwrap();
            got
        };
        let ((), got, reply) = tokio::join!(send, echo, reply);
        assert_eq!(got, expected);
        assert_eq!(reply, b"done");

        let stats = relay.await.unwrap().unwrap();
        assert_eq!(stats.left_to_right, 50_000);
        assert_eq!(stats.right_to_left, 4);
    }

    #[tokio::test]
    async fn flushes_prebuffered_bytes_first() {
        let (mut a, mut left) = pair().await;
        let (mut b, right) = pair().await;

        a.write_all(b"CONNECT x:1 HTTP/1.1\r\n\r\nearly").await.unwrap();
        let req = left.input().read_request().await.unwrap();
        assert!(req.is_connect());
        // "early" may or may not have arrived with the request head
        let buffered = left.pending().to_vec();

        let relay = tokio::spawn(async move { Tunnel::new(left, right).run().await });
        a.shutdown().await.unwrap();

        let mut received = Vec::new();
        b.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"early");
        assert!(b"early".starts_with(&buffered));

        drop(b);
        let stats = relay.await.unwrap().unwrap();
        assert_eq!(stats.left_to_right, 5);
    }
}
