//! Outbound HTTP octet stream.
//!
//! Writes go straight to the connection; nothing is buffered here. The copy
//! operations stream a body from an [`InputStream`] without holding all of it.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, StreamError};
use crate::http::HttpMessage;
use crate::stream::input::{parse_chunk_size, InputStream};

const CRLF: &[u8] = b"\r\n";

#[derive(Debug)]
pub struct OutputStream<W> {
    writer: Option<W>,
    bytes_out: u64,
}

impl<W: AsyncWrite + Unpin> OutputStream<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
            bytes_out: 0,
        }
    }

    pub(crate) fn detached() -> Self {
        Self {
            writer: None,
            bytes_out: 0,
        }
    }

    /// Total bytes written to the connection.
    pub fn bytes_out(&self) -> u64 {
        self.bytes_out
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// One send; may write less than `data`.
    pub async fn write_some(&mut self, data: &[u8]) -> Result<usize> {
        let writer = self.writer.as_mut().ok_or(StreamError::NotConnected)?;
        let n = writer.write(data).await?;
        self.bytes_out += n as u64;
        tracing::trace!(bytes = n, total = self.bytes_out, "wrote to connection");
        Ok(n)
    }

    /// All of `data`.
    pub async fn write(&mut self, data: &[u8]) -> Result<usize> {
        let mut written = 0;
        while written < data.len() {
            let n = self.write_some(&data[written..]).await?;
            if n == 0 {
                return Err(StreamError::WriteZero {
                    written,
                    expected: data.len(),
                });
            }
            written += n;
        }
        Ok(written)
    }

    /// `data` followed by CRLF.
    pub async fn write_line(&mut self, data: &[u8]) -> Result<usize> {
        Ok(self.write(data).await? + self.write(CRLF).await?)
    }

    /// `data` framed as one chunk with a hexadecimal size line.
    pub async fn write_chunk(&mut self, data: &[u8]) -> Result<usize> {
        let size = format!("{:x}", data.len());
        Ok(self.write_line(size.as_bytes()).await? + self.write_line(data).await?)
    }

    pub async fn write_message<M: HttpMessage>(&mut self, m: &M) -> Result<usize> {
        let bytes: Bytes = m.to_bytes();
        self.write(&bytes).await
    }

    /// Streams exactly `count` bytes from `src`.
    pub async fn copy_bytes<R: AsyncRead + Unpin>(
        &mut self,
        src: &mut InputStream<R>,
        count: u64,
    ) -> Result<u64> {
        let mut copied = 0u64;
        while copied < count {
            let want = usize::try_from(count - copied).unwrap_or(usize::MAX);
            let data = src.read_some(want).await?;
            if data.is_empty() {
                return Err(StreamError::UnexpectedEof {
                    expected: count,
                    received: copied,
                });
            }
            self.write(&data).await?;
            copied += data.len() as u64;
        }
        Ok(copied)
    }

    /// Forwards a chunked body up to and including the zero-size chunk line.
    ///
    /// Trailers that follow are left for [`copy_lines`]. Returns the bytes
    /// written including framing.
    ///
    /// [`copy_lines`]: OutputStream::copy_lines
    pub async fn copy_chunks<R: AsyncRead + Unpin>(
        &mut self,
        src: &mut InputStream<R>,
    ) -> Result<u64> {
        let mut count = 0u64;
        loop {
            let header = src.read_line().await?;
            let size = parse_chunk_size(&header)?;
            if size == 0 {
                break;
            }
            count += self.write_line(header.as_bytes()).await? as u64;
            count += self.copy_bytes(src, size as u64 + CRLF.len() as u64).await?;
        }
        count += self.write_line(b"0").await? as u64;
        Ok(count)
    }

    /// Forwards trailer lines up to and including the blank line.
    pub async fn copy_lines<R: AsyncRead + Unpin>(
        &mut self,
        src: &mut InputStream<R>,
    ) -> Result<u64> {
        let mut count = 0u64;
        loop {
            let line = src.read_line().await?;
            count += self.write_line(line.as_bytes()).await? as u64;
            if line.is_empty() {
                return Ok(count);
            }
        }
    }

    /// Forwards everything until `src` reaches EOF.
    pub async fn copy_all<R: AsyncRead + Unpin>(
        &mut self,
        src: &mut InputStream<R>,
    ) -> Result<u64> {
        let mut count = 0u64;
        loop {
            let data = src.read_some(src.limit()).await?;
            if data.is_empty() {
                return Ok(count);
            }
            self.write(&data).await?;
            count += data.len() as u64;
        }
    }

    /// Shuts down the write half, signalling EOF to the peer.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.shutdown().await?;
            tracing::trace!(bytes_out = self.bytes_out, "output stream closed");
        }
        Ok(())
    }

    pub fn into_inner(self) -> Option<W> {
        self.writer
    }
}
