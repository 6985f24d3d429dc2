//! Sinks that consume response headers and error bodies.

use crate::{
    types::{ErrorDetails, ResponseHeaders},
    util::headers::METADATA_PREFIX,
};

/// Upper bound on the total size of response headers a request accepts.
pub const MAX_RESPONSE_HEADERS_SIZE: usize = 64 * 1024;
/// Error bodies are buffered up to this many bytes; the rest is discarded.
pub const MAX_ERROR_BODY_SIZE: usize = 64 * 1024;

/// Whether a sink wants to keep receiving input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Accumulates S3-specific fields from response headers, one header at a time.
#[derive(Debug, Default)]
pub struct ResponseHeadersHandler {
    headers: ResponseHeaders,
    observed_bytes: usize,
    finalized: bool,
}

impl ResponseHeadersHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, name: &str, value: &str) -> Flow {
        if self.finalized {
            return Flow::Continue;
        }

        self.observed_bytes += name.len() + value.len() + 4;
        if self.observed_bytes > MAX_RESPONSE_HEADERS_SIZE {
            return Flow::Stop;
        }

        let value = value.trim();
        let lower = name.trim().to_ascii_lowercase();
        match lower.as_str() {
            "x-amz-request-id" => self.headers.request_id = Some(value.to_string()),
            "x-amz-id-2" => self.headers.request_id2 = Some(value.to_string()),
            "content-type" => self.headers.content_type = Some(value.to_string()),
            "content-length" => self.headers.content_length = value.parse().ok(),
            "server" => self.headers.server = Some(value.to_string()),
            "etag" => self.headers.etag = Some(value.to_string()),
            "last-modified" => self.headers.last_modified = Some(value.to_string()),
            other => {
                if let Some(meta) = other.strip_prefix(METADATA_PREFIX) {
                    if !meta.is_empty() {
                        self.headers
                            .metadata
                            .push((meta.to_string(), value.to_string()));
                    }
                }
            }
        }

        Flow::Continue
    }

    /// Marks the header block complete and returns the collected fields.
    ///
    /// Headers observed afterwards are ignored.
    pub fn finalize(&mut self) -> &ResponseHeaders {
        self.finalized = true;
        &self.headers
    }
}

/// Buffers the body of an error response and turns it into [`ErrorDetails`].
#[derive(Debug, Default)]
pub struct ErrorParser {
    body: Vec<u8>,
    discarded: usize,
}

impl ErrorParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts a chunk of the error body. Always reports the full chunk as
    /// accepted; bytes beyond [`MAX_ERROR_BODY_SIZE`] are dropped.
    pub fn observe(&mut self, data: &[u8]) -> usize {
        let room = MAX_ERROR_BODY_SIZE.saturating_sub(self.body.len());
        let take = room.min(data.len());
        self.body.extend_from_slice(&data[..take]);
        self.discarded += data.len() - take;
        data.len()
    }

    /// Number of body bytes dropped because the buffer was full.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Parses the buffered body. Returns `None` when the body is empty or is
    /// not an S3 error document.
    pub fn finalize(&mut self) -> Option<ErrorDetails> {
        let body = std::mem::take(&mut self.body);
        #[cfg(feature = "tracing")]
        if self.discarded > 0 {
            tracing::debug!(discarded = self.discarded, "error body truncated");
        }
        let body = String::from_utf8_lossy(&body);
        crate::util::xml::parse_error_xml(&body)
    }
}
