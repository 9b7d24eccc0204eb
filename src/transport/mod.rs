//! Resilient transport to the upstream rate provider.
//!
//! The transport is a stack of decorators over a single [`Transport`] trait:
//!
//! ```text
//! UpstreamClient
//!   └─ RetryingTransport      retries transient failures, counts surfaced errors
//!        └─ InstrumentedTransport   start instant, x-request-id, latency sample
//!             └─ HttpTransport      reqwest: keep-alive, timeout, no redirects
//! ```
//!
//! Instrumentation sits below retry so that every attempt is observed
//! individually.

pub mod client;
pub mod http;
pub mod instrument;
pub mod retry;

pub use client::UpstreamClient;
pub use http::HttpTransport;
pub use instrument::InstrumentedTransport;
pub use retry::{RetryConfig, RetryingTransport};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::{CambioError, Result};

/// A single outbound GET request, relative to the transport's base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub method: reqwest::Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Correlation id to send as `x-request-id`.
    pub request_id: Option<String>,
}

impl OutboundRequest {
    /// Build a GET request, flattening `query` into string pairs.
    ///
    /// `None` fields are omitted from the query string.
    pub fn get<Q>(path: impl Into<String>, query: &Q) -> Result<Self>
    where
        Q: Serialize + ?Sized,
    {
        Ok(Self {
            method: reqwest::Method::GET,
            path: path.into(),
            query: query_pairs(query)?,
            request_id: None,
        })
    }
}

/// Raw upstream response with a successful status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// One attempt against the upstream.
///
/// Implementations return `Err` for anything other than a 2xx response,
/// so decorators can classify failures without inspecting bodies.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Upstream host used as the `target` metric label.
    fn target(&self) -> &str;

    async fn execute(&self, request: &OutboundRequest) -> Result<UpstreamResponse>;
}

fn query_pairs<Q>(query: &Q) -> Result<Vec<(String, String)>>
where
    Q: Serialize + ?Sized,
{
    let value = serde_json::to_value(query)?;
    let Value::Object(fields) = value else {
        return Err(CambioError::InvalidInput(
            "query parameters must serialize to a flat object".into(),
        ));
    };
    let mut pairs = Vec::with_capacity(fields.len());
    for (name, value) in fields {
        let rendered = match value {
            Value::Null => continue,
            Value::String(s) => s,
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            other => {
                return Err(CambioError::InvalidInput(format!(
                    "query parameter '{name}' is not a scalar: {other}"
                )));
            }
        };
        pairs.push((name, rendered));
    }
    Ok(pairs)
}
