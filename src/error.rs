//! Error types shared by the message model and the stream layer.
//!
//! # Taxonomy
//! - I/O: the connection failed, or its framing is corrupt (bad chunk
//!   terminator, a line longer than the buffer limit). Fatal to the connection.
//! - End of stream: the peer closed before a promised number of bytes arrived.
//!   A clean EOF (an empty `read_some`) is not an error.
//! - Format: a malformed start line, header, or a non-numeric value where a
//!   number was requested. Fatal to the message being parsed.
//!
//! Nothing in the core retries. Every failure is returned to the caller.

use std::io;
use std::num::{ParseFloatError, ParseIntError};
use std::string::FromUtf8Error;

use thiserror::Error;

/// Result alias used across the stream layer.
pub type Result<T, E = StreamError> = std::result::Result<T, E>;

/// A value on the wire could not be interpreted.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Bad HTTP request line: {0:?}")]
    BadRequestLine(String),

    #[error("Bad HTTP status line: {0:?}")]
    BadStatusLine(String),

    #[error("Malformed header field: {0:?}")]
    BadHeader(String),

    #[error("Invalid port in address {address:?}")]
    BadPort {
        address: String,
        #[source]
        source: ParseIntError,
    },

    #[error("Address is empty")]
    EmptyAddress,

    #[error("Header {key} is not an integer: {value:?}")]
    NotAnInteger {
        key: String,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("Header {key} is not a number: {value:?}")]
    NotAFloat {
        key: String,
        value: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("Invalid chunk size line: {0:?}")]
    BadChunkSize(String),

    #[error("Line is not valid UTF-8")]
    Encoding(#[from] FromUtf8Error),
}

/// Failure of a stream operation.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Line exceeds buffer limit of {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("Body exceeds limit of {limit} bytes")]
    BodyTooLong { limit: usize },

    #[error("Corrupted chunk stream: inconsistent chunk size")]
    CorruptChunk,

    #[error("Connection closed before write complete ({written} of {expected} bytes)")]
    WriteZero { written: usize, expected: usize },

    #[error("Connection closed unexpectedly: expected {expected} bytes, got {received}")]
    UnexpectedEof { expected: u64, received: u64 },

    #[error("Connection closed before end of line")]
    EofInLine,

    #[error("Stream is not connected")]
    NotConnected,

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Coarse classification of a [`StreamError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Io,
    EndOfStream,
    Format,
}

impl StreamError {
    pub fn class(&self) -> ErrorClass {
        match self {
            StreamError::Io(_)
            | StreamError::LineTooLong { .. }
            | StreamError::BodyTooLong { .. }
            | StreamError::CorruptChunk
            | StreamError::WriteZero { .. }
            | StreamError::NotConnected => ErrorClass::Io,
            StreamError::UnexpectedEof { .. } | StreamError::EofInLine => ErrorClass::EndOfStream,
            StreamError::Format(_) => ErrorClass::Format,
        }
    }

    /// True when the peer went away before the operation could complete.
    pub fn is_eof(&self) -> bool {
        self.class() == ErrorClass::EndOfStream
    }
}
