//! Common message model shared by requests and responses.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::FormatError;
use crate::http::HeaderSet;

/// Headers and body of an HTTP message.
///
/// When `body_pending` is set the body has not been taken off the wire yet and
/// the caller must consume it (or drop the connection) before reusing the stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub headers: HeaderSet,
    pub body: Bytes,
    pub body_pending: bool,
}

impl Message {
    /// Integer value of `key`, or `default` when absent.
    pub fn get_int(&self, key: &str, default: i64) -> Result<i64, FormatError> {
        match self.headers.get(key) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|source| FormatError::NotAnInteger {
                    key: key.to_string(),
                    value: value.to_string(),
                    source,
                }),
            None => Ok(default),
        }
    }

    /// Float value of `key`, or `default` when absent.
    pub fn get_float(&self, key: &str, default: f64) -> Result<f64, FormatError> {
        match self.headers.get(key) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|source| FormatError::NotAFloat {
                    key: key.to_string(),
                    value: value.to_string(),
                    source,
                }),
            None => Ok(default),
        }
    }

    /// Declared `Content-Length`; negative values count as absent.
    pub fn content_length(&self) -> Result<Option<u64>, FormatError> {
        let length = self.get_int("Content-Length", -1)?;
        Ok(u64::try_from(length).ok())
    }

    pub fn is_chunked(&self) -> bool {
        self.headers.has_token("Transfer-Encoding", "chunked")
    }

    /// Replaces the body and keeps `Content-Length` in step with it.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
        self.body_pending = false;
        self.headers
            .set_all("Content-Length", self.body.len().to_string());
    }
}

/// A message with a start line.
pub trait HttpMessage {
    /// The start line without its CRLF.
    fn start_line(&self) -> String;

    /// Replaces the start-line fields from `line`.
    fn parse_start_line(&mut self, line: &str) -> Result<(), FormatError>;

    fn message(&self) -> &Message;

    fn message_mut(&mut self) -> &mut Message;

    /// Serializes start line, headers, blank line and any body.
    fn to_bytes(&self) -> Bytes {
        let message = self.message();
        let mut out = BytesMut::new();
        out.put_slice(self.start_line().as_bytes());
        out.put_slice(b"\r\n");
        for (key, value) in message.headers.iter() {
            out.put_slice(key.as_bytes());
            out.put_slice(b": ");
            out.put_slice(value.as_bytes());
            out.put_slice(b"\r\n");
        }
        out.put_slice(b"\r\n");
        out.put_slice(&message.body);
        out.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors() {
        let mut m = Message::default();
        m.headers.append("Content-Length", "13");
        m.headers.append("Q", " 0.5 ");
        m.headers.append("Bad", "twelve");

        assert_eq!(m.get_int("content-length", 0).unwrap(), 13);
        assert_eq!(m.get_int("Missing", 7).unwrap(), 7);
        assert_eq!(m.get_float("q", 0.0).unwrap(), 0.5);
        assert!(matches!(
            m.get_int("Bad", 0),
            Err(FormatError::NotAnInteger { .. })
        ));
        assert!(matches!(
            m.get_float("Bad", 0.0),
            Err(FormatError::NotAFloat { .. })
        ));
    }

    #[test]
    fn content_length_ignores_negative() {
        let mut m = Message::default();
        assert_eq!(m.content_length().unwrap(), None);
        m.headers.append("Content-Length", "-5");
        assert_eq!(m.content_length().unwrap(), None);
        m.headers.set("Content-Length", "0");
        assert_eq!(m.content_length().unwrap(), Some(0));
    }

    #[test]
    fn set_body_updates_length() {
        let mut m = Message::default();
        m.headers.append("Content-Length", "1");
        m.headers.append("Content-Length", "2");
        m.set_body("hello");
        assert_eq!(m.headers.get_all("Content-Length"), vec!["5"]);
        assert!(!m.body_pending);
    }

    #[test]
    fn chunked_detection() {
        let mut m = Message::default();
        assert!(!m.is_chunked());
        m.headers.append("Transfer-Encoding", "gzip, chunked");
        assert!(m.is_chunked());
    }
}
