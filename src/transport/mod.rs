//! Boundary between the request engine and the HTTP transport.
//!
//! A [`Transport`] opens one [`TransportHandle`] per request. The engine
//! drives the handle by calling [`TransportHandle::advance`] with a
//! [`TransferSink`]; the handle pulls request body bytes from the sink and
//! pushes the response status line, headers and body bytes into it. A
//! blocking driver calls `advance` in a loop; a request context calls it once
//! per round for every registered request.

use std::{error::Error as StdError, fmt};

use http::Method;

use crate::types::TransportFailure;

pub(crate) mod blocking_transport;
#[cfg(feature = "rustls")]
pub(crate) mod tls;

pub use blocking_transport::UreqTransport;

/// Marker returned by a sink that wants the transfer stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Abort;

/// Fully built request handed to the transport.
#[derive(Clone, Debug)]
pub struct OutgoingRequest {
    pub(crate) method: Method,
    pub(crate) uri: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body_length: Option<u64>,
}

impl OutgoingRequest {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Header list in send order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First value of the named header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Declared request body length; `None` for requests without a body.
    pub fn body_length(&self) -> Option<u64> {
        self.body_length
    }
}

/// Receives the transfer events of one request.
///
/// Implemented by the engine's in-flight request; transports call it and
/// must stop the transfer as soon as any method returns [`Abort`].
pub trait TransferSink {
    /// Response status line arrived.
    fn status_line(&mut self, code: u16);

    /// One response header arrived.
    fn header(&mut self, name: &str, value: &str) -> Result<(), Abort>;

    /// The response header block is complete.
    fn headers_complete(&mut self) -> Result<(), Abort>;

    /// Fills `buf` with request body bytes and returns how many were written;
    /// `Ok(0)` means the body is complete.
    fn supply(&mut self, buf: &mut [u8]) -> Result<usize, Abort>;

    /// Delivers response body bytes.
    fn receive(&mut self, data: &[u8]) -> Result<(), Abort>;
}

/// Result of one [`TransportHandle::advance`] call.
#[derive(Debug)]
pub enum Progress {
    /// More work remains.
    Pending,
    /// The transfer is over, successfully or not.
    Done(Result<(), TransportError>),
}

/// Per-request transport state, exclusively owned by one in-flight request.
pub trait TransportHandle {
    fn advance(&mut self, sink: &mut dyn TransferSink) -> Progress;
}

/// Creates per-request handles. Shared by every request of an engine.
pub trait Transport: Send + Sync {
    fn open(&self, request: &OutgoingRequest) -> Result<Box<dyn TransportHandle>, TransportError>;
}

/// Failure reported by a transport.
pub struct TransportError {
    kind: TransportFailure,
    message: String,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl TransportError {
    pub fn new(kind: TransportFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> TransportFailure {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let request = OutgoingRequest {
            method: Method::GET,
            uri: "https://s3.amazonaws.com/".to_string(),
            headers: vec![("Content-Length".to_string(), "5".to_string())],
            body_length: None,
        };
        assert_eq!(request.header("content-length"), Some("5"));
        assert_eq!(request.header("date"), None);
    }

    #[test]
    fn transport_error_exposes_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = TransportError::new(TransportFailure::Connect, "send failed").with_source(io);
        assert_eq!(err.kind(), TransportFailure::Connect);
        assert_eq!(err.to_string(), "connection failed: send failed");
        assert!(StdError::source(&err).is_some());
    }
}
