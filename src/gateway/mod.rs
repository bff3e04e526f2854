//! Data gateway push client.
//!
//! # Data Flow
//! ```text
//! record (any Serialize)
//!     → client.rs (JSON envelope → PUT / → DuplexStream → Response)
//!     → push.rs   (reconnect / backoff / retry policy, outcome metrics)
//! ```
//!
//! # Design Decisions
//! - The client reports status codes as-is; interpreting them is push.rs' job
//! - A failed exchange leaves the connection closed so the next push redials

pub mod client;
pub mod push;

pub use client::{GatewayClient, GatewayError};
pub use push::{push_with_retry, PushOutcome};
