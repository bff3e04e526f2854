//! Host/port addressing.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::FormatError;

/// Port assumed when an address carries none.
pub const DEFAULT_PORT: u16 = 80;

/// A host and port pair, as written in a `Host` header or a CONNECT target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    host: String,
    port: u16,
}

impl Address {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parses `host[:port]`, defaulting the port to 80.
    ///
    /// Returns `Ok(None)` for empty input. A port that is not a number is an error.
    pub fn parse(text: &str) -> Result<Option<Self>, FormatError> {
        if text.is_empty() {
            return Ok(None);
        }
        let address = match text.split_once(':') {
            Some((host, port)) => {
                let port = port.parse().map_err(|source| FormatError::BadPort {
                    address: text.to_string(),
                    source,
                })?;
                Self::new(host, port)
            }
            None => Self::new(text, DEFAULT_PORT),
        };
        Ok(Some(address))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Always `host:port`.
    pub fn fullname(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `host` on port 80, `host:port` otherwise. Suitable for a `Host` header.
    pub fn name(&self) -> String {
        if self.port == DEFAULT_PORT {
            self.host.clone()
        } else {
            self.fullname()
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for Address {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)?.ok_or(FormatError::EmptyAddress)
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}
