use std::fmt;

use crate::request::InFlightRequest;

/// Cooperative multiplexer for requests started with a context.
///
/// [`Engine::perform`](crate::Engine::perform) registers the request here and
/// returns immediately. Each call to [`RequestContext::perform`] advances every
/// registered request by one transport step on the calling thread and
/// finishes the ones that completed. A context is not shared across threads.
///
/// Steps are as coarse as the transport makes them. With the built-in `ureq`
/// transport a request's first step blocks until its upload is sent and the
/// response head has arrived, so requests interleave only at response body
/// chunk granularity.
///
/// Dropping a context with requests still pending finishes each of them with
/// [`Status::Interrupted`](crate::Status::Interrupted).
#[derive(Default)]
pub struct RequestContext {
    requests: Vec<InFlightRequest>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests still in flight.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub(crate) fn register(&mut self, mut request: InFlightRequest) {
        request.mark_queued();
        self.requests.push(request);
    }

    /// Runs one round over the registered requests and returns how many are
    /// still pending.
    ///
    /// Completion callbacks of requests that finished in this round run
    /// before this returns, in registration order.
    pub fn perform(&mut self) -> usize {
        let mut index = 0;
        while index < self.requests.len() {
            match self.requests[index].advance() {
                None => index += 1,
                Some(outcome) => {
                    let request = self.requests.remove(index);
                    request.finish(outcome);
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(pending = self.requests.len(), "context round complete");

        self.requests.len()
    }

    /// Drives every registered request to completion.
    pub fn run_all(&mut self) {
        while self.perform() > 0 {}
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("pending", &self.requests.len())
            .finish()
    }
}

impl Drop for RequestContext {
    fn drop(&mut self) {
        if self.requests.is_empty() {
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            pending = self.requests.len(),
            "request context dropped with pending requests"
        );

        for request in self.requests.drain(..) {
            request.interrupt();
        }
    }
}
