//! Buffered inbound HTTP octet stream.
//!
//! Turns a byte-oriented reader into line, block, chunk and message reads.
//! Every read from the connection is bounded by the stream's buffer limit, so
//! a peer that never sends a line terminator cannot grow memory without bound.

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{FormatError, Result, StreamError};
use crate::http::{HttpMessage, Request, Response};

const CRLF: &[u8] = b"\r\n";

/// Inbound half of a connection with its read buffer.
///
/// The buffer belongs to this stream alone; bytes read ahead of what the
/// caller consumed stay here and can be drained with [`take_pending`].
///
/// [`take_pending`]: InputStream::take_pending
#[derive(Debug)]
pub struct InputStream<R> {
    reader: Option<R>,
    buf: BytesMut,
    limit: usize,
    bytes_in: u64,
}

impl<R: AsyncRead + Unpin> InputStream<R> {
    pub fn new(reader: R, limit: usize) -> Self {
        Self {
            reader: Some(reader),
            buf: BytesMut::new(),
            limit: limit.max(1),
            bytes_in: 0,
        }
    }

    /// A stream with no connection behind it.
    pub(crate) fn detached(limit: usize) -> Self {
        Self {
            reader: None,
            buf: BytesMut::new(),
            limit: limit.max(1),
            bytes_in: 0,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Total bytes read from the connection.
    pub fn bytes_in(&self) -> u64 {
        self.bytes_in
    }

    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Bytes read from the connection but not consumed yet.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    pub fn take_pending(&mut self) -> Bytes {
        self.buf.split().freeze()
    }

    /// Fills the buffer with a single read if it is empty.
    ///
    /// Returns the number of buffered bytes; zero means the peer closed.
    /// Cancel safe: bytes land in the buffer only when the read completes.
    pub async fn wait(&mut self) -> Result<usize> {
        if self.buf.is_empty() {
            let reader = self.reader.as_mut().ok_or(StreamError::NotConnected)?;
            self.buf.reserve(self.limit);
            let n = reader
                .take(self.limit as u64)
                .read_buf(&mut self.buf)
                .await?;
            self.bytes_in += n as u64;
            tracing::trace!(bytes = n, total = self.bytes_in, "read from connection");
        }
        Ok(self.buf.len())
    }

    /// Up to `max_count` bytes; empty on EOF.
    pub async fn read_some(&mut self, max_count: usize) -> Result<Bytes> {
        if self.wait().await? == 0 {
            return Ok(Bytes::new());
        }
        let n = max_count.min(self.buf.len());
        Ok(self.buf.split_to(n).freeze())
    }

    /// Exactly `n` bytes.
    pub async fn read(&mut self, n: usize) -> Result<Bytes> {
        if self.buf.len() >= n {
            return Ok(self.buf.split_to(n).freeze());
        }
        let mut out = BytesMut::with_capacity(n.min(self.limit));
        while out.len() < n {
            if self.wait().await? == 0 {
                return Err(StreamError::UnexpectedEof {
                    expected: n as u64,
                    received: out.len() as u64,
                });
            }
            let take = (n - out.len()).min(self.buf.len());
            out.extend_from_slice(&self.buf.split_to(take));
        }
        Ok(out.freeze())
    }

    /// Everything up to clean EOF.
    pub async fn read_to_end(&mut self) -> Result<Bytes> {
        self.read_to_end_within(usize::MAX).await
    }

    /// Everything up to clean EOF, failing once more than `max` bytes arrive.
    pub async fn read_to_end_within(&mut self, max: usize) -> Result<Bytes> {
        let mut out = BytesMut::new();
        while self.wait().await? != 0 {
            if out.len().saturating_add(self.buf.len()) > max {
                return Err(StreamError::BodyTooLong { limit: max });
            }
            out.extend_from_slice(&self.buf.split());
        }
        Ok(out.freeze())
    }

    /// A line without its CRLF.
    ///
    /// The terminator may straddle two reads. Fails with
    /// [`StreamError::LineTooLong`] once the line content reaches the buffer
    /// limit.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = BytesMut::new();
        loop {
            // A trailing CR may be the first half of the terminator.
            let content = line.len() - usize::from(line.last() == Some(&b'\r'));
            if content >= self.limit {
                return Err(StreamError::LineTooLong { limit: self.limit });
            }
            if self.wait().await? == 0 {
                return Err(StreamError::EofInLine);
            }
            if line.last() == Some(&b'\r') && self.buf[0] == b'\n' {
                line.truncate(line.len() - 1);
                self.buf.advance(1);
                break;
            }
            match find_crlf(&self.buf) {
                Some(pos) => {
                    line.extend_from_slice(&self.buf.split_to(pos));
                    self.buf.advance(CRLF.len());
                    break;
                }
                None => line.extend_from_slice(&self.buf.split()),
            }
        }
        Ok(String::from_utf8(line.to_vec()).map_err(FormatError::from)?)
    }

    /// One chunk of a chunked body: size line, payload, CRLF.
    ///
    /// A zero-size chunk also consumes the CRLF closing an empty trailer section.
    pub async fn read_chunk(&mut self) -> Result<Bytes> {
        let size = parse_chunk_size(&self.read_line().await?)?;
        let data = self.read(size).await?;
        if self.read(CRLF.len()).await? != CRLF {
            return Err(StreamError::CorruptChunk);
        }
        Ok(data)
    }

    /// A complete chunked body with trailers discarded.
    pub async fn read_chunked_body(&mut self) -> Result<Bytes> {
        self.read_chunked_body_within(usize::MAX).await
    }

    /// Like [`read_chunked_body`](Self::read_chunked_body), failing once the
    /// payload would exceed `max` bytes.
    pub async fn read_chunked_body_within(&mut self, max: usize) -> Result<Bytes> {
        let mut body = BytesMut::new();
        loop {
            let size = parse_chunk_size(&self.read_line().await?)?;
            if size == 0 {
                break;
            }
            if body.len().saturating_add(size) > max {
                return Err(StreamError::BodyTooLong { limit: max });
            }
            body.extend_from_slice(&self.read(size).await?);
            if self.read(CRLF.len()).await? != CRLF {
                return Err(StreamError::CorruptChunk);
            }
        }
        while !self.read_line().await?.is_empty() {}
        Ok(body.freeze())
    }

    /// Reads start line, headers and, when its length is known and within the
    /// buffer limit, the body.
    ///
    /// Otherwise the body is left on the wire and `body_pending` is set.
    pub async fn read_message<M: HttpMessage>(&mut self, m: &mut M) -> Result<()> {
        self.read_head(m).await?;
        let message = m.message_mut();
        match message.content_length()? {
            Some(length) if length <= self.limit as u64 => {
                message.body = self.read(length as usize).await?;
                message.body_pending = false;
            }
            _ => {}
        }
        tracing::debug!(
            headers = message.headers.len(),
            body = message.body.len(),
            pending = message.body_pending,
            "read message"
        );
        Ok(())
    }

    /// Reads start line and headers only; the body, if any, stays on the wire
    /// and `body_pending` is set.
    pub async fn read_head<M: HttpMessage>(&mut self, m: &mut M) -> Result<()> {
        let start = self.read_line().await?;
        m.parse_start_line(&start)?;

        let message = m.message_mut();
        let mut field = String::new();
        loop {
            let line = self.read_line().await?;
            if line.is_empty() {
                break;
            }
            if line.starts_with([' ', '\t']) {
                field.push_str(line.trim_matches([' ', '\t']));
                continue;
            }
            if !field.is_empty() {
                let (key, value) = split_header(&field)?;
                message.headers.append(key, value);
            }
            field = line;
        }
        if !field.is_empty() {
            let (key, value) = split_header(&field)?;
            message.headers.append(key, value);
        }

        message.body = Bytes::new();
        message.body_pending = true;
        tracing::trace!(start = %start, "read message head");
        Ok(())
    }

    pub async fn read_request(&mut self) -> Result<Request> {
        let mut request = Request::default();
        self.read_message(&mut request).await?;
        if request.is_bodyless() {
            request.body_pending = false;
        }
        Ok(request)
    }

    pub async fn read_response(&mut self) -> Result<Response> {
        let mut response = Response::default();
        self.read_message(&mut response).await?;
        Ok(response)
    }

    /// Detaches the read half locally. Nothing is sent to the peer and the
    /// write half of the connection is untouched.
    pub fn close(&mut self) {
        if self.reader.take().is_some() {
            tracing::trace!(bytes_in = self.bytes_in, "input stream closed");
        }
    }

    pub fn into_inner(self) -> Option<R> {
        self.reader
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(CRLF.len()).position(|w| w == CRLF)
}

/// Hexadecimal chunk size, ignoring any chunk extension.
pub(crate) fn parse_chunk_size(line: &str) -> Result<usize, FormatError> {
    let size = line
        .split(';')
        .next()
        .unwrap_or_default()
        .trim_matches([' ', '\t']);
    usize::from_str_radix(size, 16).map_err(|_| FormatError::BadChunkSize(line.to_string()))
}

fn split_header(field: &str) -> Result<(&str, &str), FormatError> {
    let (key, value) = field
        .split_once(':')
        .ok_or_else(|| FormatError::BadHeader(field.to_string()))?;
    let key = key.trim_matches([' ', '\t']);
    if key.is_empty() {
        return Err(FormatError::BadHeader(field.to_string()));
    }
    Ok((key, value.trim_matches([' ', '\t'])))
}
