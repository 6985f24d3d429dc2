//! Request descriptors, callbacks, and the in-flight request they become.

use std::fmt;

use time::OffsetDateTime;

use crate::{
    auth::Credentials,
    transport::{Abort, OutgoingRequest},
    types::{ErrorDetails, Operation, Protocol, ResponseHeaders, Status, UriStyle},
    util::{
        self,
        url::{ComposedUri, UriTarget},
    },
};

mod headers;
mod in_flight;

pub use headers::{MAX_METADATA_SIZE, RequestHeaders};
pub(crate) use in_flight::InFlightRequest;

/// Called once the response headers of a successful response are known.
/// Returning anything but [`Status::Ok`] aborts the request with that status.
pub type ResponseHeadersCallback = Box<dyn FnMut(&ResponseHeaders) -> Status>;

/// Fills the buffer with request body bytes and returns how many were
/// written; `Ok(0)` ends the body and `Err(Abort)` aborts the request.
pub type SupplyCallback = Box<dyn FnMut(&mut [u8]) -> Result<usize, Abort>>;

/// Receives response body bytes and must return `data.len()`; any other
/// value aborts the request.
pub type ReceiveCallback = Box<dyn FnMut(&[u8]) -> usize>;

/// Receives the final status, the HTTP response code (0 when no response
/// arrived), and the parsed error document if there was one.
pub type CompleteCallback = Box<dyn FnOnce(Status, u16, Option<&ErrorDetails>)>;

/// Everything a request reports back to its caller.
///
/// The completion callback is mandatory and is invoked exactly once per
/// [`Engine::perform`](crate::Engine::perform) call. The other slots are
/// optional; an absent slot is simply not used.
pub struct Callbacks {
    pub(crate) response_headers: Option<ResponseHeadersCallback>,
    pub(crate) supply: Option<SupplyCallback>,
    pub(crate) receive: Option<ReceiveCallback>,
    pub(crate) complete: CompleteCallback,
}

impl Callbacks {
    pub fn new(complete: impl FnOnce(Status, u16, Option<&ErrorDetails>) + 'static) -> Self {
        Self {
            response_headers: None,
            supply: None,
            receive: None,
            complete: Box::new(complete),
        }
    }

    pub fn on_response_headers(
        mut self,
        callback: impl FnMut(&ResponseHeaders) -> Status + 'static,
    ) -> Self {
        self.response_headers = Some(Box::new(callback));
        self
    }

    pub fn supply(mut self, callback: impl FnMut(&mut [u8]) -> Result<usize, Abort> + 'static) -> Self {
        self.supply = Some(Box::new(callback));
        self
    }

    pub fn receive(mut self, callback: impl FnMut(&[u8]) -> usize + 'static) -> Self {
        self.receive = Some(Box::new(callback));
        self
    }

    /// Completes a request that never reached the transport.
    pub(crate) fn fail(self, status: Status) {
        (self.complete)(status, 0, None);
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("response_headers", &self.response_headers.is_some())
            .field("supply", &self.supply.is_some())
            .field("receive", &self.receive.is_some())
            .finish_non_exhaustive()
    }
}

/// Describes one S3 operation.
///
/// A borrowed, read-only view: the engine copies what it needs while
/// building the request and keeps no reference to it afterwards.
#[derive(Clone, Copy, Debug)]
pub struct RequestParams<'a> {
    pub(crate) operation: Operation,
    pub(crate) protocol: Protocol,
    pub(crate) uri_style: UriStyle,
    pub(crate) bucket: Option<&'a str>,
    pub(crate) key: Option<&'a str>,
    pub(crate) query_params: Option<&'a str>,
    pub(crate) sub_resource: Option<&'a str>,
    pub(crate) credentials: &'a Credentials,
    pub(crate) request_headers: Option<&'a RequestHeaders>,
    pub(crate) to_s3_total_size: u64,
}

impl<'a> RequestParams<'a> {
    pub fn new(operation: Operation, credentials: &'a Credentials) -> Self {
        Self {
            operation,
            protocol: Protocol::default(),
            uri_style: UriStyle::default(),
            bucket: None,
            key: None,
            query_params: None,
            sub_resource: None,
            credentials,
            request_headers: None,
            to_s3_total_size: 0,
        }
    }

    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn uri_style(mut self, uri_style: UriStyle) -> Self {
        self.uri_style = uri_style;
        self
    }

    pub fn bucket(mut self, bucket: &'a str) -> Self {
        self.bucket = Some(bucket);
        self
    }

    pub fn key(mut self, key: &'a str) -> Self {
        self.key = Some(key);
        self
    }

    /// Query string appended verbatim, without the leading `?`.
    pub fn query_params(mut self, query_params: &'a str) -> Self {
        self.query_params = Some(query_params);
        self
    }

    /// Sub-resource such as `acl` or `location`, without the leading `?`.
    pub fn sub_resource(mut self, sub_resource: &'a str) -> Self {
        self.sub_resource = Some(sub_resource);
        self
    }

    pub fn request_headers(mut self, headers: &'a RequestHeaders) -> Self {
        self.request_headers = Some(headers);
        self
    }

    /// Total number of bytes the supply callback will produce.
    pub fn to_s3_total_size(mut self, size: u64) -> Self {
        self.to_s3_total_size = size;
        self
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }
}

/// Settings shared by every request of an engine.
#[derive(Debug)]
pub(crate) struct BuildSettings {
    pub(crate) host: String,
    pub(crate) user_agent: String,
}

/// Validates, addresses and signs a request. Performs no I/O.
pub(crate) fn prepare(
    params: &RequestParams<'_>,
    settings: &BuildSettings,
    now: OffsetDateTime,
) -> Result<OutgoingRequest, Status> {
    let ComposedUri {
        uri,
        canonical_resource,
    } = util::url::compose_uri(&UriTarget {
        protocol: params.protocol,
        uri_style: params.uri_style,
        host: &settings.host,
        bucket: params.bucket,
        key: params.key,
        sub_resource: params.sub_resource,
        query_params: params.query_params,
    })?;

    if let Some(extra) = params.request_headers {
        extra.validate()?;
    }

    let host = match (params.bucket.filter(|b| !b.is_empty()), params.uri_style) {
        (Some(bucket), UriStyle::VirtualHost) => format!("{bucket}.{}", settings.host),
        _ => settings.host.clone(),
    };

    let body_length = match params.operation {
        Operation::Put => Some(params.to_s3_total_size),
        Operation::Copy => Some(0),
        Operation::Get | Operation::Head | Operation::Delete => None,
    };

    let mut headers = Vec::with_capacity(8);
    headers.push(("Host".to_string(), host));
    headers.push(("User-Agent".to_string(), settings.user_agent.clone()));
    if let Some(len) = body_length {
        headers.push(("Content-Length".to_string(), len.to_string()));
    }
    if let Some(extra) = params.request_headers {
        headers.extend(
            extra
                .iter()
                .map(|(name, value)| (name.to_string(), value.trim().to_string())),
        );
    }

    let method = params.operation.method();
    util::signing::sign_headers(
        &method,
        &canonical_resource,
        &mut headers,
        params.credentials,
        now,
    )
    .map_err(|_| Status::SigningFailed)?;

    Ok(OutgoingRequest {
        method,
        uri,
        headers,
        body_length,
    })
}
