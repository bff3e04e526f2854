//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! stream / tunnel / proxy / gateway
//!     → logging.rs (structured tracing events, EnvFilter)
//!     → metrics.rs (counters and gauges, optional Prometheus endpoint)
//! ```
//!
//! # Design Decisions
//! - Library code only emits events; binaries install the subscriber
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
