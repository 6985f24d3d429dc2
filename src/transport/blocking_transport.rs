use std::{
    fmt,
    io::{self, Read},
    time::Duration,
};

use http::Method;
use url::Url;

use crate::{
    transport::{
        Abort, OutgoingRequest, Progress, TransferSink, Transport, TransportError,
        TransportHandle,
    },
    types::TransportFailure,
};

const CHUNK_SIZE: usize = 16 * 1024;

/// Default transport backed by a blocking `ureq` agent.
///
/// Each handle sends the request (streaming the body from the sink) on its
/// first step and then delivers one body chunk per step, so requests driven
/// by a context interleave at chunk granularity.
pub struct UreqTransport {
    agent: ureq::Agent,
    timeout: Option<Duration>,
}

impl UreqTransport {
    pub fn new(timeout: Option<Duration>) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .build();

        Self {
            agent: ureq::Agent::new_with_config(config),
            timeout,
        }
    }
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Transport for UreqTransport {
    fn open(&self, request: &OutgoingRequest) -> Result<Box<dyn TransportHandle>, TransportError> {
        let url = Url::parse(&request.uri).map_err(|e| {
            TransportError::new(TransportFailure::Io, "request uri is not a valid URL")
                .with_source(e)
        })?;

        Ok(Box::new(UreqHandle {
            agent: self.agent.clone(),
            timeout: self.timeout,
            method: request.method.clone(),
            url,
            headers: request.headers.clone(),
            body_length: request.body_length,
            state: State::Request,
            buf: vec![0; CHUNK_SIZE],
        }))
    }
}

enum State {
    Request,
    Body(ureq::BodyReader<'static>),
    Finished,
}

struct UreqHandle {
    agent: ureq::Agent,
    timeout: Option<Duration>,
    method: Method,
    url: Url,
    headers: Vec<(String, String)>,
    body_length: Option<u64>,
    state: State,
    buf: Vec<u8>,
}

impl TransportHandle for UreqHandle {
    fn advance(&mut self, sink: &mut dyn TransferSink) -> Progress {
        match std::mem::replace(&mut self.state, State::Finished) {
            State::Request => match self.send(sink) {
                Ok(reader) => {
                    self.state = State::Body(reader);
                    Progress::Pending
                }
                Err(err) => Progress::Done(Err(err)),
            },
            State::Body(mut reader) => match reader.read(&mut self.buf) {
                Ok(0) => Progress::Done(Ok(())),
                Ok(n) => match sink.receive(&self.buf[..n]) {
                    Ok(()) => {
                        self.state = State::Body(reader);
                        Progress::Pending
                    }
                    Err(Abort) => Progress::Done(Err(stopped_by_sink())),
                },
                Err(err) => Progress::Done(Err(TransportError::new(
                    TransportFailure::Io,
                    format!(
                        "failed reading response body: {}",
                        request_context(&self.method, &self.url)
                    ),
                )
                .with_source(err))),
            },
            State::Finished => Progress::Done(Ok(())),
        }
    }
}

impl UreqHandle {
    fn send(
        &mut self,
        sink: &mut dyn TransferSink,
    ) -> Result<ureq::BodyReader<'static>, TransportError> {
        #[cfg(feature = "tracing")]
        let _guard = tracing::debug_span!(
            "s3.http",
            method = %self.method,
            host = self.url.host_str().unwrap_or(""),
            path = self.url.path(),
        )
        .entered();

        let streams_body = self.body_length.is_some_and(|len| len > 0);
        let url = self.url.as_str();

        let result = match self.method.as_str() {
            "GET" => apply_headers(self.agent.get(url), &self.headers, false, self.timeout).call(),
            "HEAD" => {
                apply_headers(self.agent.head(url), &self.headers, false, self.timeout).call()
            }
            "DELETE" => {
                apply_headers(self.agent.delete(url), &self.headers, false, self.timeout).call()
            }
            "PUT" => {
                let req = apply_headers(
                    self.agent.put(url),
                    &self.headers,
                    streams_body,
                    self.timeout,
                );
                match self.body_length {
                    Some(len) if len > 0 => {
                        let mut reader = SupplyReader {
                            sink: &mut *sink,
                            remaining: len,
                            short: false,
                            aborted: false,
                        };
                        let result = req.send(ureq::SendBody::from_reader(&mut reader));
                        if reader.aborted {
                            return Err(stopped_by_sink());
                        }
                        if reader.short {
                            return Err(TransportError::new(
                                TransportFailure::ShortBody,
                                format!(
                                    "request body ended {} bytes early: {}",
                                    reader.remaining,
                                    request_context(&self.method, &self.url)
                                ),
                            ));
                        }
                        result
                    }
                    _ => req.send_empty(),
                }
            }
            _ => {
                return Err(TransportError::new(
                    TransportFailure::Io,
                    "unsupported HTTP method",
                ));
            }
        };

        let resp = result.map_err(|err| map_ureq_error(err, &self.method, &self.url))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(status = %resp.status(), "response head received");

        sink.status_line(resp.status().as_u16());
        for (name, value) in resp.headers() {
            let Ok(value) = value.to_str() else {
                continue;
            };
            sink.header(name.as_str(), value)
                .map_err(|Abort| stopped_by_sink())?;
        }
        sink.headers_complete().map_err(|Abort| stopped_by_sink())?;

        Ok(resp.into_body().into_reader())
    }
}

/// Adapts the sink's supply side to `io::Read` for the request body.
struct SupplyReader<'a> {
    sink: &'a mut dyn TransferSink,
    remaining: u64,
    short: bool,
    aborted: bool,
}

impl Read for SupplyReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }

        let cap = buf
            .len()
            .min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        match self.sink.supply(&mut buf[..cap]) {
            Ok(0) => {
                self.short = true;
                Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "request body ended before its declared length",
                ))
            }
            Ok(n) => {
                let n = n.min(cap);
                self.remaining -= n as u64;
                Ok(n)
            }
            Err(Abort) => {
                self.aborted = true;
                Err(io::Error::other("request body aborted"))
            }
        }
    }
}

fn stopped_by_sink() -> TransportError {
    TransportError::new(TransportFailure::Io, "transfer stopped by receiver")
}

fn map_ureq_error(err: ureq::Error, method: &Method, url: &Url) -> TransportError {
    let kind = match &err {
        ureq::Error::Timeout(_) => TransportFailure::Timeout,
        ureq::Error::HostNotFound => TransportFailure::NameLookup,
        ureq::Error::ConnectionFailed => TransportFailure::Connect,
        ureq::Error::Io(io_err)
            if matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::NotConnected
            ) =>
        {
            TransportFailure::Connect
        }
        ureq::Error::Io(_) => TransportFailure::Io,
        ureq::Error::Tls(_) => TransportFailure::Tls,
        #[cfg(feature = "rustls")]
        ureq::Error::Rustls(_) => TransportFailure::Tls,
        _ => TransportFailure::Io,
    };

    TransportError::new(
        kind,
        format!("request failed: {}", request_context(method, url)),
    )
    .with_source(err)
}

fn request_context(method: &Method, url: &Url) -> String {
    let authority = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    };

    if authority.is_empty() {
        format!("{method} {}", url.path())
    } else {
        format!("{method} {authority}{}", url.path())
    }
}

fn apply_headers<B>(
    mut req: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
    keep_content_length: bool,
    timeout: Option<Duration>,
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        // ureq derives Host from the URL and sizes empty bodies itself.
        if name.eq_ignore_ascii_case("host")
            || (!keep_content_length && name.eq_ignore_ascii_case("content-length"))
        {
            continue;
        }
        req = req.header(name.as_str(), value.as_str());
    }

    if let Some(timeout) = timeout {
        req = req.config().timeout_global(Some(timeout)).build();
    }

    req
}
