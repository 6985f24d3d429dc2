use crate::{
    request::Callbacks,
    response::{ErrorParser, Flow, ResponseHeadersHandler},
    transport::{
        Abort, OutgoingRequest, Progress, TransferSink, TransportError, TransportHandle,
    },
    types::{ErrorCode, Operation, Status, TransportFailure},
    util::headers::is_success,
};

/// Lifecycle of an in-flight request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    Building,
    Submitted,
    /// Driven to completion on the caller's thread.
    Active,
    /// Registered with a request context.
    Queued,
    HeadersReceived,
    BodyTransferring,
    Finalizing,
    Finalized,
}

/// A request that has been built, signed and handed to a transport.
///
/// Owns its transport handle and callbacks; [`InFlightRequest::finish`]
/// consumes it, so the completion callback can only run once.
pub(crate) struct InFlightRequest {
    handle: Box<dyn TransportHandle>,
    request: OutgoingRequest,
    exchange: Exchange,
}

/// Per-request state the transport reports into.
struct Exchange {
    operation: Operation,
    status: Option<Status>,
    phase: Phase,
    http_response_code: u16,
    response_headers: ResponseHeadersHandler,
    headers_callback_made: bool,
    error_parser: ErrorParser,
    to_s3_remaining: u64,
    callbacks: Callbacks,
    #[cfg(feature = "metrics")]
    started: std::time::Instant,
}

impl InFlightRequest {
    pub(crate) fn new(
        operation: Operation,
        request: OutgoingRequest,
        handle: Box<dyn TransportHandle>,
        callbacks: Callbacks,
    ) -> Self {
        let mut exchange = Exchange::new(operation, request.body_length.unwrap_or(0), callbacks);
        exchange.phase = Phase::Submitted;
        Self {
            handle,
            request,
            exchange,
        }
    }

    pub(crate) fn mark_queued(&mut self) {
        self.exchange.phase = Phase::Queued;
    }

    /// Drives the transfer on the calling thread until it finishes.
    pub(crate) fn run(mut self) {
        self.exchange.phase = Phase::Active;
        loop {
            if let Some(outcome) = self.advance() {
                self.finish(outcome);
                return;
            }
        }
    }

    /// Performs one transport step. Returns the transport outcome once the
    /// transfer is over.
    pub(crate) fn advance(&mut self) -> Option<Result<(), TransportError>> {
        match self.handle.advance(&mut self.exchange) {
            Progress::Pending => None,
            Progress::Done(outcome) => Some(outcome),
        }
    }

    /// Finishes a request that will not be driven any further.
    pub(crate) fn interrupt(mut self) {
        if self.exchange.status.is_none() {
            self.exchange.status = Some(Status::Interrupted);
        }
        self.finish(Ok(()));
    }

    /// Computes the final status and invokes the completion callback.
    pub(crate) fn finish(self, outcome: Result<(), TransportError>) {
        let Self {
            handle,
            request,
            mut exchange,
        } = self;
        debug_assert_ne!(exchange.phase, Phase::Finalized);
        exchange.phase = Phase::Finalizing;

        if exchange.status.is_none() && outcome.is_ok() {
            let _ = exchange.make_headers_callback();
        }

        let code = exchange.http_response_code;
        let details = if code != 0 && !is_success(code) {
            exchange.error_parser.finalize()
        } else {
            None
        };

        let status = match (exchange.status.take(), outcome) {
            (Some(recorded), _) => recorded,
            (None, Err(err)) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(error = %err, "transport failed");
                Status::Transport(err.kind())
            }
            (None, Ok(())) if code == 0 => Status::Transport(TransportFailure::Io),
            (None, Ok(())) if is_success(code) => Status::Ok,
            (None, Ok(())) => match details.as_ref().and_then(|d| d.code.as_deref()) {
                Some(error_code) => Status::Service(ErrorCode::from_code(error_code)),
                None => Status::HttpError(code),
            },
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            operation = %exchange.operation,
            uri = %request.uri,
            status = %status,
            http_status = code,
            "request finished"
        );

        #[cfg(feature = "metrics")]
        {
            metrics::counter!(
                "s3_requests_total",
                "operation" => exchange.operation.as_str(),
                "family" => status.family().as_str(),
            )
            .increment(1);
            metrics::histogram!(
                "s3_request_duration_seconds",
                "operation" => exchange.operation.as_str(),
            )
            .record(exchange.started.elapsed().as_secs_f64());
        }

        drop(handle);
        drop(request);
        exchange.phase = Phase::Finalized;
        (exchange.callbacks.complete)(status, code, details.as_ref());
    }
}

impl Exchange {
    fn new(operation: Operation, to_s3_total_size: u64, callbacks: Callbacks) -> Self {
        Self {
            operation,
            status: None,
            phase: Phase::Building,
            http_response_code: 0,
            response_headers: ResponseHeadersHandler::new(),
            headers_callback_made: false,
            error_parser: ErrorParser::new(),
            to_s3_remaining: to_s3_total_size,
            callbacks,
            #[cfg(feature = "metrics")]
            started: std::time::Instant::now(),
        }
    }

    fn check(&self) -> Result<(), Abort> {
        match self.status {
            Some(_) => Err(Abort),
            None => Ok(()),
        }
    }

    fn abort(&mut self, status: Status) -> Result<(), Abort> {
        self.status = Some(status);
        Err(Abort)
    }

    /// Runs the response-headers callback at most once, and only for a
    /// successful response.
    fn make_headers_callback(&mut self) -> Result<(), Abort> {
        if self.headers_callback_made {
            return Ok(());
        }
        self.headers_callback_made = true;

        let headers = self.response_headers.finalize();
        if !is_success(self.http_response_code) {
            return Ok(());
        }
        let Some(callback) = self.callbacks.response_headers.as_mut() else {
            return Ok(());
        };
        match callback(headers) {
            Status::Ok => Ok(()),
            status => self.abort(status),
        }
    }
}

impl TransferSink for Exchange {
    fn status_line(&mut self, code: u16) {
        self.http_response_code = code;
    }

    fn header(&mut self, name: &str, value: &str) -> Result<(), Abort> {
        self.check()?;
        match self.response_headers.observe(name, value) {
            Flow::Continue => Ok(()),
            Flow::Stop => self.abort(Status::ResponseHeadersTooLarge),
        }
    }

    fn headers_complete(&mut self) -> Result<(), Abort> {
        self.check()?;
        self.phase = Phase::HeadersReceived;
        self.make_headers_callback()
    }

    fn supply(&mut self, buf: &mut [u8]) -> Result<usize, Abort> {
        self.check()?;
        if self.to_s3_remaining == 0 {
            return Ok(0);
        }
        let Some(callback) = self.callbacks.supply.as_mut() else {
            return Ok(0);
        };

        let cap = buf
            .len()
            .min(usize::try_from(self.to_s3_remaining).unwrap_or(usize::MAX));
        match callback(&mut buf[..cap]) {
            Ok(0) => {
                self.to_s3_remaining = 0;
                Ok(0)
            }
            Ok(n) => {
                let n = n.min(cap);
                self.to_s3_remaining -= n as u64;
                Ok(n)
            }
            Err(Abort) => self.abort(Status::AbortedByCallback).map(|()| 0),
        }
    }

    fn receive(&mut self, data: &[u8]) -> Result<(), Abort> {
        self.check()?;
        if data.is_empty() {
            return Ok(());
        }
        self.make_headers_callback()?;
        self.phase = Phase::BodyTransferring;

        if !is_success(self.http_response_code) {
            self.error_parser.observe(data);
            return Ok(());
        }

        match self.callbacks.receive.as_mut() {
            None => self.abort(Status::UnexpectedResponseBody),
            Some(callback) => {
                if callback(data) == data.len() {
                    Ok(())
                } else {
                    self.abort(Status::AbortedByCallback)
                }
            }
        }
    }
}
