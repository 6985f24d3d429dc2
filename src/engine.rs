use std::{fmt, sync::Arc, time::Duration};

use time::OffsetDateTime;

use crate::{
    context::RequestContext,
    error::{Error, Result},
    request::{self, BuildSettings, Callbacks, InFlightRequest, RequestParams},
    transport::{Transport, UreqTransport},
    types::Status,
    util::url::MAX_HOSTNAME_SIZE,
};

/// Host used when none is configured.
pub const DEFAULT_HOST: &str = "s3.amazonaws.com";

/// Process-wide request engine.
///
/// Holds the user agent, the default S3 host and the transport shared by
/// every request. Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

struct Inner {
    settings: BuildSettings,
    transport: Arc<dyn Transport>,
}

impl Engine {
    /// Sets up an engine with default settings. `user_agent_info` is folded
    /// into the `User-Agent` header of every request.
    pub fn initialize(user_agent_info: impl Into<String>) -> Result<Self> {
        Self::builder().user_agent_info(user_agent_info).build()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn user_agent(&self) -> &str {
        &self.inner.settings.user_agent
    }

    pub fn default_host(&self) -> &str {
        &self.inner.settings.host
    }

    /// Releases the engine. No request may still be in flight.
    pub fn deinitialize(self) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            shared = Arc::strong_count(&self.inner),
            "request engine deinitialized"
        );
        drop(self);
    }

    /// Builds, signs and executes one request.
    ///
    /// Without a context the request runs to completion on the calling
    /// thread before this returns. With a context the request is registered
    /// there and makes progress as the context is driven.
    ///
    /// The completion callback of `callbacks` runs exactly once in every
    /// case, including when the request is rejected before any I/O.
    pub fn perform(
        &self,
        params: RequestParams<'_>,
        callbacks: Callbacks,
        context: Option<&mut RequestContext>,
    ) {
        #[cfg(feature = "tracing")]
        let _guard = tracing::debug_span!(
            "s3.request",
            operation = %params.operation,
            bucket = params.bucket.unwrap_or(""),
            key = params.key.unwrap_or(""),
            access_key = %crate::util::redact::redact_value(&params.credentials.access_key_id),
        )
        .entered();

        let outgoing =
            match request::prepare(&params, &self.inner.settings, OffsetDateTime::now_utc()) {
                Ok(outgoing) => outgoing,
                Err(status) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(status = %status, "request rejected before dispatch");
                    callbacks.fail(status);
                    return;
                }
            };

        let handle = match self.inner.transport.open(&outgoing) {
            Ok(handle) => handle,
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(error = %err, "transport refused request");
                callbacks.fail(Status::Transport(err.kind()));
                return;
            }
        };

        let request = InFlightRequest::new(params.operation, outgoing, handle, callbacks);
        match context {
            Some(context) => context.register(request),
            None => request.run(),
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("user_agent", &self.inner.settings.user_agent)
            .field("default_host", &self.inner.settings.host)
            .finish_non_exhaustive()
    }
}

/// Configures an [`Engine`].
#[derive(Default)]
pub struct EngineBuilder {
    user_agent_info: Option<String>,
    default_host: Option<String>,
    timeout: Option<Duration>,
    transport: Option<Arc<dyn Transport>>,
}

impl EngineBuilder {
    pub fn user_agent_info(mut self, info: impl Into<String>) -> Self {
        self.user_agent_info = Some(info.into());
        self
    }

    /// Host (optionally with `:port`) requests are addressed to.
    pub fn default_host(mut self, host: impl Into<String>) -> Self {
        self.default_host = Some(host.into());
        self
    }

    /// Overall timeout per request for the built-in transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replaces the built-in `ureq` transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Engine> {
        let host = match self.default_host {
            Some(host) => validate_host(host)?,
            None => DEFAULT_HOST.to_string(),
        };

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                #[cfg(feature = "rustls")]
                crate::transport::tls::ensure_rustls_crypto_provider()?;
                Arc::new(UreqTransport::new(self.timeout)) as Arc<dyn Transport>
            }
        };

        let user_agent = user_agent(self.user_agent_info.as_deref());

        #[cfg(feature = "tracing")]
        tracing::debug!(host = %host, user_agent = %user_agent, "request engine initialized");

        Ok(Engine {
            inner: Arc::new(Inner {
                settings: BuildSettings { host, user_agent },
                transport,
            }),
        })
    }
}

impl fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("user_agent_info", &self.user_agent_info)
            .field("default_host", &self.default_host)
            .field("timeout", &self.timeout)
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}

fn validate_host(host: String) -> Result<String> {
    let host = host.trim().to_string();
    if host.is_empty() {
        return Err(Error::invalid_config("default_host must not be empty"));
    }
    if host.len() > MAX_HOSTNAME_SIZE {
        return Err(Error::invalid_config("default_host is too long"));
    }
    if host.contains(['/', '?', '#']) || host.chars().any(char::is_whitespace) {
        return Err(Error::invalid_config(
            "default_host must be a bare host name, optionally with a port",
        ));
    }
    Ok(host)
}

fn user_agent(info: Option<&str>) -> String {
    let version = env!("CARGO_PKG_VERSION");
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    match info.map(str::trim).filter(|i| !i.is_empty()) {
        Some(info) => format!("s3-request/{version} ({info}; {os}; {arch})"),
        None => format!("s3-request/{version} ({os}; {arch})"),
    }
}
