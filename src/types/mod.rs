//! Shared request and response types.

use std::fmt;

use http::Method;
use serde::Deserialize;

/// Kind of HTTP request the engine issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Head,
    Put,
    /// Server-side copy; sent as `PUT` with an `x-amz-copy-source` header.
    Copy,
    Delete,
}

impl Operation {
    /// HTTP verb used on the wire.
    pub fn method(self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Head => Method::HEAD,
            Self::Put | Self::Copy => Method::PUT,
            Self::Delete => Method::DELETE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Put => "PUT",
            Self::Copy => "COPY",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheme used to reach the service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Protocol {
    #[default]
    Https,
    Http,
}

impl Protocol {
    pub fn scheme(self) -> &'static str {
        match self {
            Self::Https => "https",
            Self::Http => "http",
        }
    }
}

/// Bucket addressing convention.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UriStyle {
    /// `https://bucket.host/key`
    #[default]
    VirtualHost,
    /// `https://host/bucket/key`
    Path,
}

/// Canned access control list sent as `x-amz-acl`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CannedAcl {
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
    BucketOwnerRead,
    BucketOwnerFullControl,
}

impl CannedAcl {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::PublicRead => "public-read",
            Self::PublicReadWrite => "public-read-write",
            Self::AuthenticatedRead => "authenticated-read",
            Self::BucketOwnerRead => "bucket-owner-read",
            Self::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }
}

/// Whether a copy keeps the source metadata or replaces it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetadataDirective {
    Copy,
    Replace,
}

impl MetadataDirective {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Copy => "COPY",
            Self::Replace => "REPLACE",
        }
    }
}

/// Transport-level failure kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransportFailure {
    /// Host name could not be resolved.
    NameLookup,
    /// Connection could not be established or was lost.
    Connect,
    /// TLS handshake or certificate verification failed.
    Tls,
    /// The transport gave up waiting.
    Timeout,
    /// The request body ended before its declared length.
    ShortBody,
    /// Any other I/O failure.
    Io,
}

impl TransportFailure {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NameLookup => "name lookup failed",
            Self::Connect => "connection failed",
            Self::Tls => "tls failure",
            Self::Timeout => "timed out",
            Self::ShortBody => "request body shorter than declared length",
            Self::Io => "i/o failure",
        }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broad classification of a [`Status`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusFamily {
    Success,
    /// Rejected before any transport I/O.
    Validation,
    Transport,
    /// The service answered with a failure or broke the response contract.
    Protocol,
    /// Stopped by a callback or by the owner of a request context.
    Aborted,
}

impl StatusFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Validation => "validation",
            Self::Transport => "transport",
            Self::Protocol => "protocol",
            Self::Aborted => "aborted",
        }
    }
}

/// Final outcome of a request, as reported to the completion callback.
///
/// The same type is returned by the response-headers callback: any value
/// other than [`Status::Ok`] aborts the request with that status.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Ok,

    UriTooLong,
    KeyTooLong,
    InvalidBucketName,
    BadHeader,
    MetadataTooLong,
    SigningFailed,

    Transport(TransportFailure),

    /// Error response carrying an S3 error document.
    Service(ErrorCode),
    /// Error response without a usable error document.
    HttpError(u16),
    /// A successful response carried a body nobody asked to receive.
    UnexpectedResponseBody,
    ResponseHeadersTooLarge,

    AbortedByCallback,
    /// The request context was dropped while the request was pending.
    Interrupted,
}

impl Status {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Classifies by variant, not by where the status came from: a status
    /// returned from a headers callback reports its own family.
    pub fn family(&self) -> StatusFamily {
        match self {
            Self::Ok => StatusFamily::Success,
            Self::UriTooLong
            | Self::KeyTooLong
            | Self::InvalidBucketName
            | Self::BadHeader
            | Self::MetadataTooLong
            | Self::SigningFailed => StatusFamily::Validation,
            Self::Transport(_) => StatusFamily::Transport,
            Self::Service(_)
            | Self::HttpError(_)
            | Self::UnexpectedResponseBody
            | Self::ResponseHeadersTooLarge => StatusFamily::Protocol,
            Self::AbortedByCallback | Self::Interrupted => StatusFamily::Aborted,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("ok"),
            Self::UriTooLong => f.write_str("request uri too long"),
            Self::KeyTooLong => f.write_str("object key too long"),
            Self::InvalidBucketName => f.write_str("invalid bucket name"),
            Self::BadHeader => f.write_str("invalid request header"),
            Self::MetadataTooLong => f.write_str("metadata headers too long"),
            Self::SigningFailed => f.write_str("request signing failed"),
            Self::Transport(kind) => write!(f, "transport error: {kind}"),
            Self::Service(code) => write!(f, "service error: {code}"),
            Self::HttpError(code) => write!(f, "http error: {code}"),
            Self::UnexpectedResponseBody => f.write_str("unexpected response body"),
            Self::ResponseHeadersTooLarge => f.write_str("response headers too large"),
            Self::AbortedByCallback => f.write_str("aborted by callback"),
            Self::Interrupted => f.write_str("interrupted"),
        }
    }
}

macro_rules! error_codes {
    ($($variant:ident),+ $(,)?) => {
        /// Error code reported in an S3 error document.
        #[non_exhaustive]
        #[derive(Clone, Debug, PartialEq, Eq, Hash)]
        pub enum ErrorCode {
            $($variant,)+
            /// Code not known to this crate.
            Other(String),
        }

        impl ErrorCode {
            pub fn from_code(code: &str) -> Self {
                match code {
                    $(stringify!($variant) => Self::$variant,)+
                    other => Self::Other(other.to_string()),
                }
            }

            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant),)+
                    Self::Other(code) => code,
                }
            }
        }
    };
}

error_codes!(
    AccessDenied,
    AccountProblem,
    AmbiguousGrantByEmailAddress,
    BadDigest,
    BucketAlreadyExists,
    BucketAlreadyOwnedByYou,
    BucketNotEmpty,
    CredentialsNotSupported,
    EntityTooLarge,
    EntityTooSmall,
    ExpiredToken,
    IncompleteBody,
    InternalError,
    InvalidAccessKeyId,
    InvalidArgument,
    InvalidBucketName,
    InvalidDigest,
    InvalidObjectState,
    InvalidPart,
    InvalidRange,
    InvalidRequest,
    InvalidToken,
    KeyTooLongError,
    MalformedXML,
    MetadataTooLarge,
    MethodNotAllowed,
    MissingContentLength,
    MissingSecurityHeader,
    NoSuchBucket,
    NoSuchKey,
    NoSuchUpload,
    NotImplemented,
    NotSignedUp,
    PermanentRedirect,
    PreconditionFailed,
    Redirect,
    RequestTimeTooSkewed,
    RequestTimeout,
    ServiceUnavailable,
    SignatureDoesNotMatch,
    SlowDown,
    TemporaryRedirect,
    TooManyBuckets,
);

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured details from an S3 error response body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorDetails {
    /// Error code, e.g. `NoSuchKey`.
    pub code: Option<String>,
    /// Human readable message.
    pub message: Option<String>,
    /// Resource the error refers to.
    pub resource: Option<String>,
    /// Request id assigned by the service.
    pub request_id: Option<String>,
    /// Extended request id assigned by the service.
    pub host_id: Option<String>,
    /// Additional explanation some services send as `<FurtherDetails>`.
    pub further_details: Option<String>,
    /// Remaining child elements of `<Error>`, e.g. `Key` or `BucketName`,
    /// in document order.
    pub extra_details: Vec<(String, String)>,
}

/// S3-specific fields collected from the response headers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    /// `x-amz-request-id`.
    pub request_id: Option<String>,
    /// `x-amz-id-2`.
    pub request_id2: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub server: Option<String>,
    pub etag: Option<String>,
    /// Raw `Last-Modified` value.
    pub last_modified: Option<String>,
    /// `x-amz-meta-*` headers with the prefix stripped and names lowercased.
    pub metadata: Vec<(String, String)>,
}

impl ResponseHeaders {
    /// Looks up a metadata value by name (case-insensitive).
    pub fn metadata_value(&self, name: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct XmlError {
    #[serde(rename = "Code")]
    pub(crate) code: Option<String>,
    #[serde(rename = "Message")]
    pub(crate) message: Option<String>,
    #[serde(rename = "Resource")]
    pub(crate) resource: Option<String>,
    #[serde(rename = "RequestId")]
    pub(crate) request_id: Option<String>,
    #[serde(rename = "HostId")]
    pub(crate) host_id: Option<String>,
    #[serde(rename = "FurtherDetails")]
    pub(crate) further_details: Option<String>,
}

impl From<XmlError> for ErrorDetails {
    fn from(value: XmlError) -> Self {
        Self {
            code: value.code,
            message: value.message,
            resource: value.resource,
            request_id: value.request_id,
            host_id: value.host_id,
            further_details: value.further_details,
            extra_details: Vec::new(),
        }
    }
}
