//! Request model.
//!
//! # Design Decisions
//! - Method, target and version stay plain strings; the target is not parsed
//!   beyond what CONNECT and Host routing need
//! - Dereferences to [`Message`] so headers and body are reached directly

use std::ops::{Deref, DerefMut};

use http::Method;

use crate::error::FormatError;
use crate::http::{HttpMessage, Message};

pub const HTTP_11: &str = "HTTP/1.1";

/// Methods whose requests never carry a body.
const BODYLESS_METHODS: [Method; 5] = [
    Method::GET,
    Method::HEAD,
    Method::DELETE,
    Method::CONNECT,
    Method::TRACE,
];

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub target: String,
    pub version: String,
    pub message: Message,
}

impl Request {
    pub fn new(method: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            target: target.into(),
            version: HTTP_11.to_string(),
            message: Message::default(),
        }
    }

    /// True for GET, HEAD, DELETE, CONNECT and TRACE.
    pub fn is_bodyless(&self) -> bool {
        BODYLESS_METHODS.iter().any(|m| m.as_str() == self.method)
    }

    pub fn is_connect(&self) -> bool {
        self.method == Method::CONNECT.as_str()
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new(Method::GET.as_str(), "/")
    }
}

impl HttpMessage for Request {
    fn start_line(&self) -> String {
        format!("{} {} {}", self.method, self.target, self.version)
    }

    fn parse_start_line(&mut self, line: &str) -> Result<(), FormatError> {
        let bad = || FormatError::BadRequestLine(line.to_string());
        let (first, last) = match (line.find(' '), line.rfind(' ')) {
            (Some(a), Some(b)) if a < b => (a, b),
            _ => return Err(bad()),
        };
        let method = line[..first].trim_matches([' ', '\t']);
        let target = line[first + 1..last].trim_matches([' ', '\t']);
        let version = line[last + 1..].trim_matches([' ', '\t']);
        if method.is_empty() || target.is_empty() || version.is_empty() {
            return Err(bad());
        }
        self.method = method.to_string();
        self.target = target.to_string();
        self.version = version.to_string();
        Ok(())
    }

    fn message(&self) -> &Message {
        &self.message
    }

    fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }
}

impl Deref for Request {
    type Target = Message;
    fn deref(&self) -> &Self::Target {
        &self.message
    }
}

impl DerefMut for Request {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.message
    }
}
