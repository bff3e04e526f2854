//! Wire-level HTTP/1.1 streams.
//!
//! # Data Flow
//! ```text
//! TcpStream
//!     → into_split()
//!     → input.rs  (InputStream: buffered reads, lines, chunks, messages)
//!     → output.rs (OutputStream: direct writes, chunk framing, body copies)
//!     → duplex.rs (DuplexStream: both halves plus open/close/reconnect)
//! ```
//!
//! # Design Decisions
//! - One task owns a stream for its whole life; no locking
//! - The read buffer limit is a constructor argument, not a global
//! - Bodies of unknown length stay on the wire until the caller copies them

pub mod duplex;
pub mod input;
pub mod output;

pub use duplex::DuplexStream;
pub use input::InputStream;
pub use output::OutputStream;

/// Default bound on a single read and on a line: 128 KiB.
pub const DEFAULT_BUFFER_LIMIT: usize = 128 * 1024;
