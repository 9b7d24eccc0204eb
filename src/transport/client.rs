//! Typed GET client over the decorated transport stack.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{
    HttpTransport, InstrumentedTransport, OutboundRequest, RetryConfig, RetryingTransport,
    Transport, UpstreamResponse,
};
use crate::Result;

/// Client for the upstream rate provider.
///
/// Cheap to clone; all clones share the same connection pool.
#[derive(Clone)]
pub struct UpstreamClient {
    transport: Arc<dyn Transport>,
}

impl UpstreamClient {
    /// Build the full stack: retry over instrumentation over reqwest.
    pub fn new(
        base_url: &str,
        timeout: Option<Duration>,
        user_agent: &str,
        retry: RetryConfig,
    ) -> Result<Self> {
        let http = HttpTransport::new(base_url, timeout, user_agent)?;
        let stack = RetryingTransport::new(InstrumentedTransport::new(http), retry);
        Ok(Self::from_transport(Arc::new(stack)))
    }

    /// Use an already composed transport as-is.
    pub fn from_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Upstream host.
    pub fn target(&self) -> &str {
        self.transport.target()
    }

    /// GET `path` and decode the body into `T`.
    pub async fn get_json<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let response = self.get(path, query).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    /// GET `path` and return the payload untouched.
    ///
    /// JSON bodies are parsed; a non-JSON UTF-8 body is returned as a
    /// JSON string.
    pub async fn get_value<Q>(&self, path: &str, query: &Q) -> Result<Value>
    where
        Q: Serialize + ?Sized,
    {
        let response = self.get(path, query).await?;
        match serde_json::from_slice(&response.body) {
            Ok(value) => Ok(value),
            Err(e) => match String::from_utf8(response.body) {
                Ok(text) => Ok(Value::String(text)),
                Err(_) => Err(e.into()),
            },
        }
    }

    async fn get<Q>(&self, path: &str, query: &Q) -> Result<UpstreamResponse>
    where
        Q: Serialize + ?Sized,
    {
        let request = OutboundRequest::get(path, query)?;
        self.transport.execute(&request).await
    }
}
