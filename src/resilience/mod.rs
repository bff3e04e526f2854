//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Gateway push fails:
//!     → backoff.rs (exponential delay with jitter)
//!     → reconnect and retry, up to the configured attempts
//! ```
//!
//! # Design Decisions
//! - Delays are capped; jitter is at most 10% of the capped delay
//! - Only transport failures are retried, never a rejected record

pub mod backoff;

pub use backoff::calculate_backoff;
