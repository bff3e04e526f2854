//! Response model.

use std::ops::{Deref, DerefMut};

use http::StatusCode;

use crate::error::FormatError;
use crate::http::request::HTTP_11;
use crate::http::{HttpMessage, Message};

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub version: String,
    pub code: u16,
    pub phrase: String,
    pub message: Message,
}

impl Response {
    /// A response with the canonical reason phrase for `status`.
    pub fn new(status: StatusCode) -> Self {
        Self::with_phrase(status, status.canonical_reason().unwrap_or(""))
    }

    pub fn with_phrase(status: StatusCode, phrase: impl Into<String>) -> Self {
        Self {
            version: HTTP_11.to_string(),
            code: status.as_u16(),
            phrase: phrase.into(),
            message: Message::default(),
        }
    }

    /// Compares the numeric code only.
    pub fn status_is(&self, status: impl Into<u16>) -> bool {
        self.code == status.into()
    }

    /// Responses that never carry a body, whatever their headers say.
    pub fn is_bodyless(&self) -> bool {
        (100..200).contains(&self.code)
            || self.status_is(StatusCode::NO_CONTENT)
            || self.status_is(StatusCode::NOT_MODIFIED)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

impl HttpMessage for Response {
    fn start_line(&self) -> String {
        format!("{} {} {}", self.version, self.code, self.phrase)
    }

    fn parse_start_line(&mut self, line: &str) -> Result<(), FormatError> {
        let bad = || FormatError::BadStatusLine(line.to_string());
        let (version, rest) = line.split_once(' ').ok_or_else(bad)?;
        let rest = rest.trim_start_matches(' ');
        let (code, phrase) = rest.split_once(' ').unwrap_or((rest, ""));
        if version.is_empty() || code.is_empty() {
            return Err(bad());
        }
        self.code = code.parse().map_err(|_| bad())?;
        self.version = version.to_string();
        self.phrase = phrase.trim_matches([' ', '\t']).to_string();
        Ok(())
    }

    fn message(&self) -> &Message {
        &self.message
    }

    fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }
}

impl Deref for Response {
    type Target = Message;
    fn deref(&self) -> &Self::Target {
        &self.message
    }
}

impl DerefMut for Response {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_phrase() {
        let res = Response::new(StatusCode::BAD_GATEWAY);
        assert_eq!(res.start_line(), "HTTP/1.1 502 Bad Gateway");
        assert!(res.status_is(502u16));
        assert!(res.status_is(StatusCode::BAD_GATEWAY));
        assert!(!res.status_is(StatusCode::OK));
    }

    #[test]
    fn parse_status_line() {
        let mut res = Response::default();
        res.parse_start_line("HTTP/1.0  404 Not  Found ").unwrap();
        assert_eq!(res.version, "HTTP/1.0");
        assert_eq!(res.code, 404);
        assert_eq!(res.phrase, "Not  Found");
    }

    #[test]
    fn parse_status_line_without_phrase() {
        let mut res = Response::default();
        res.parse_start_line("HTTP/1.1 204").unwrap();
        assert_eq!(res.code, 204);
        assert_eq!(res.phrase, "");
        assert!(res.is_bodyless());
    }

    #[test]
    fn parse_status_line_rejects_non_numeric_code() {
        let mut res = Response::default();
        assert!(matches!(
            res.parse_start_line("HTTP/1.1 OK fine"),
            Err(FormatError::BadStatusLine(_))
        ));
        assert!(res.parse_start_line("HTTP/1.1").is_err());
    }
}
