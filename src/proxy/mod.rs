//! HTTP relay subsystem.
//!
//! # Data Flow
//! ```text
//! Listener::accept
//!     → server.rs  (per-connection task, tracing span, shutdown, drain)
//!     → handler.rs (read request)
//!         CONNECT host:port → dial → "200 Connection established" → Tunnel
//!         other methods     → dial Host → stream request and response bodies
//! ```
//!
//! # Design Decisions
//! - Bodies are streamed with the copy operations, never held whole
//! - One upstream connection per forwarded request
//! - A malformed request gets a 400 and the connection is closed

pub mod handler;
pub mod server;

pub use server::RelayServer;
