//! Per-attempt telemetry decorator.

use std::time::Instant;

use async_trait::async_trait;

use super::{OutboundRequest, Transport, UpstreamResponse};
use crate::Result;
use crate::context;
use crate::telemetry::RequestLabels;

/// Decorator that observes every attempt passing through it.
///
/// Order per attempt: capture the start instant, attach the ambient
/// correlation id (if the caller set one and the request has none), run the
/// inner transport, record one latency sample. The result is returned
/// unchanged.
pub struct InstrumentedTransport<T> {
    inner: T,
}

impl<T: Transport> InstrumentedTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for InstrumentedTransport<T> {
    fn target(&self) -> &str {
        self.inner.target()
    }

    async fn execute(&self, request: &OutboundRequest) -> Result<UpstreamResponse> {
        let start = Instant::now();

        let propagated;
        let request = match (&request.request_id, context::current_request_id()) {
            (None, Some(id)) => {
                propagated = OutboundRequest {
                    request_id: Some(id),
                    ..request.clone()
                };
                &propagated
            }
            _ => request,
        };

        let result = self.inner.execute(request).await;

        let status = match &result {
            Ok(response) => response.status,
            Err(e) => e.status().unwrap_or(0),
        };
        RequestLabels::new(self.target(), request.method.as_str(), status).record(start.elapsed());

        result
    }
}
