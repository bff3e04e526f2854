//! HTTP/1.1 message model.
//!
//! # Data Flow
//! ```text
//! InputStream::read_message
//!     → start line  → Request / Response (HttpMessage::parse_start_line)
//!     → header lines → HeaderSet (folded continuation lines merged)
//!     → body        → Message::body, or body_pending when length is unknown
//!
//! OutputStream::write_message
//!     → HttpMessage::to_bytes → wire
//! ```
//!
//! # Design Decisions
//! - Structured fields instead of free-form attribute access
//! - Header casing preserved exactly as received or appended

pub mod headers;
pub mod message;
pub mod request;
pub mod response;

pub use headers::HeaderSet;
pub use message::{HttpMessage, Message};
pub use request::Request;
pub use response::Response;
