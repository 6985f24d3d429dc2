//! Request execution core for Amazon S3.
//!
//! An [`Engine`] turns a [`RequestParams`] descriptor into a signed HTTP
//! request, runs it over a [`Transport`](transport::Transport), and reports
//! the outcome through [`Callbacks`]: response headers, streamed upload and
//! download bytes, and exactly one completion call carrying a [`Status`].
//!
//! ## Quick start (blocking)
//!
//! ```no_run
//! # fn demo() -> Result<(), s3_request::Error> {
//! use s3_request::{Callbacks, Credentials, Engine, Operation, RequestParams};
//!
//! let engine = Engine::initialize("my-app/1.0")?;
//! let creds = Credentials::from_env()?;
//!
//! let params = RequestParams::new(Operation::Get, &creds)
//!     .bucket("my-bucket")
//!     .key("path/to/object.txt");
//! let callbacks = Callbacks::new(|status, http_status, _details| {
//!     println!("finished: {status} (HTTP {http_status})");
//! })
//! .receive(|data| {
//!     println!("{} bytes", data.len());
//!     data.len()
//! });
//!
//! engine.perform(params, callbacks, None);
//! engine.deinitialize();
//! # Ok(())
//! # }
//! ```
//!
//! ## Multiplexing
//!
//! ```no_run
//! # fn demo() -> Result<(), s3_request::Error> {
//! use s3_request::{Callbacks, Credentials, Engine, Operation, RequestContext, RequestParams};
//!
//! let engine = Engine::initialize("my-app/1.0")?;
//! let creds = Credentials::from_env()?;
//! let mut context = RequestContext::new();
//!
//! for key in ["a.txt", "b.txt"] {
//!     let params = RequestParams::new(Operation::Head, &creds)
//!         .bucket("my-bucket")
//!         .key(key);
//!     engine.perform(params, Callbacks::new(|status, _, _| println!("{status}")), Some(&mut context));
//! }
//!
//! while context.perform() > 0 {}
//! # Ok(())
//! # }
//! ```

/// Status codes and request/response value types.
pub mod types;
/// Transport boundary and the built-in `ureq` transport.
pub mod transport;

mod auth;
mod context;
mod engine;
mod error;
mod request;
mod response;
mod util;

pub use auth::Credentials;
pub use context::RequestContext;
pub use engine::{DEFAULT_HOST, Engine, EngineBuilder};
pub use error::{Error, Result};
pub use request::{
    Callbacks, CompleteCallback, MAX_METADATA_SIZE, ReceiveCallback, RequestHeaders,
    RequestParams, ResponseHeadersCallback, SupplyCallback,
};
pub use response::{
    ErrorParser, Flow, MAX_ERROR_BODY_SIZE, MAX_RESPONSE_HEADERS_SIZE, ResponseHeadersHandler,
};
pub use types::{
    CannedAcl, ErrorCode, ErrorDetails, MetadataDirective, Operation, Protocol, ResponseHeaders,
    Status, StatusFamily, TransportFailure, UriStyle,
};
pub use util::url::{MAX_BUCKET_NAME_SIZE, MAX_HOSTNAME_SIZE, MAX_KEY_SIZE, MAX_URI_SIZE};
