//! A connection viewed as one input and one output stream.
//!
//! # Responsibilities
//! - Dial an [`Address`] or adopt an accepted `TcpStream`
//! - Own the connection lifecycle: open, close, reconnect
//! - Expose the buffered-but-unread bytes of the input side

use std::io;
use std::time::Duration;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::error::{Result, StreamError};
use crate::net::Address;
use crate::stream::{InputStream, OutputStream};

#[derive(Debug)]
pub struct DuplexStream {
    input: InputStream<OwnedReadHalf>,
    output: OutputStream<OwnedWriteHalf>,
    address: Option<Address>,
    limit: usize,
}

impl DuplexStream {
    /// A stream with no connection; call [`open`](Self::open) before use.
    pub fn new(limit: usize) -> Self {
        Self {
            input: InputStream::detached(limit),
            output: OutputStream::detached(),
            address: None,
            limit,
        }
    }

    /// Dials `address`.
    pub async fn connect(address: Address, limit: usize) -> Result<Self> {
        let mut stream = Self::new(limit);
        stream.open(address).await?;
        Ok(stream)
    }

    /// Adopts an established connection, e.g. one returned by `accept`.
    pub fn from_tcp(stream: TcpStream, limit: usize) -> Result<Self> {
        let peer = stream.peer_addr()?;
        let mut duplex = Self::new(limit);
        duplex.attach(stream, Address::from(peer));
        Ok(duplex)
    }

    /// Closes any current connection, then dials `address`.
    pub async fn open(&mut self, address: Address) -> Result<()> {
        self.close().await;
        let stream = TcpStream::connect((address.host(), address.port())).await?;
        tracing::debug!(address = %address, "connection opened");
        self.attach(stream, address);
        Ok(())
    }

    /// Like [`open`](Self::open), failing with `TimedOut` once `timeout` elapses.
    pub async fn open_within(&mut self, address: Address, timeout: Duration) -> Result<()> {
        let fullname = address.fullname();
        match tokio::time::timeout(timeout, self.open(address)).await {
            Ok(opened) => opened,
            Err(_) => Err(StreamError::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connect to {fullname} timed out"),
            ))),
        }
    }

    /// Dials `address`, giving up after `timeout`.
    pub async fn connect_within(address: Address, limit: usize, timeout: Duration) -> Result<Self> {
        let mut stream = Self::new(limit);
        stream.open_within(address, timeout).await?;
        Ok(stream)
    }

    fn attach(&mut self, stream: TcpStream, address: Address) {
        let (reader, writer) = stream.into_split();
        self.input = InputStream::new(reader, self.limit);
        self.output = OutputStream::new(writer);
        self.address = Some(address);
    }

    /// Closes and dials the last address again.
    pub async fn reconnect(&mut self) -> Result<()> {
        let address = self.address.clone().ok_or(StreamError::NotConnected)?;
        self.open(address).await
    }

    /// Shuts down both halves. Errors during teardown are ignored.
    pub async fn close(&mut self) {
        if !self.is_open() {
            return;
        }
        if let Err(err) = self.output.close().await {
            tracing::trace!(error = %err, "ignoring error while closing connection");
        }
        self.input.close();
        self.input = InputStream::detached(self.limit);
        self.output = OutputStream::detached();
        tracing::debug!(address = ?self.address.as_ref().map(Address::name), "connection closed");
    }

    pub fn is_open(&self) -> bool {
        self.input.is_open() || self.output.is_open()
    }

    /// The peer: the dialed address, or the remote end of an adopted connection.
    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    /// Unread bytes already pulled off the connection.
    pub fn pending(&self) -> &[u8] {
        self.input.pending()
    }

    pub fn input(&mut self) -> &mut InputStream<OwnedReadHalf> {
        &mut self.input
    }

    pub fn output(&mut self) -> &mut OutputStream<OwnedWriteHalf> {
        &mut self.output
    }

    /// Both halves at once, for copying a body from this connection onto itself
    /// or for relaying between two connections.
    pub fn split(&mut self) -> (&mut InputStream<OwnedReadHalf>, &mut OutputStream<OwnedWriteHalf>) {
        (&mut self.input, &mut self.output)
    }
}
