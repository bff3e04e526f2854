//! HTTP/1.1 transport, blind tunnel relay and data gateway client.

pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod proxy;
pub mod resilience;
pub mod stream;
pub mod tunnel;

pub use config::schema::RelayConfig;
pub use error::{ErrorClass, FormatError, Result, StreamError};
pub use gateway::{GatewayClient, GatewayError, PushOutcome};
pub use lifecycle::Shutdown;
pub use net::Address;
pub use proxy::RelayServer;
pub use stream::{DuplexStream, InputStream, OutputStream};
pub use tunnel::Tunnel;
