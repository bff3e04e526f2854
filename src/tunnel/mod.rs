//! Tunnel subsystem.
//!
//! # Data Flow
//! ```text
//! DuplexStream (accepted client) ─┐
//!                                 ├─ relay.rs: flush pre-read bytes,
//! DuplexStream (dialed target) ───┘   then select! on both reads and forward
//! ```
//!
//! # Design Decisions
//! - No HTTP interpretation once tunnelling starts
//! - Readiness waits use `tokio::select!`; nothing polls in a loop
//! - EOF on one side half-closes the other; errors end the relay

pub mod relay;

pub use relay::{Tunnel, TunnelStats, RELAY_CHUNK_SIZE};
