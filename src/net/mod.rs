//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (id for tracing, active-connection tracking)
//!     → Hand off to the stream layer as a DuplexStream
//!
//! Outbound connection
//!     → address.rs (host[:port] → Address)
//!     → DuplexStream::open
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection tracked so shutdown can drain them

pub mod address;
pub mod connection;
pub mod listener;

pub use address::Address;
pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{ConnectionPermit, Listener, ListenerError};
