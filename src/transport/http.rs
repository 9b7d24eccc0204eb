//! reqwest-backed base transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, LOCATION, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, Url, redirect};
use tracing::debug;

use super::{OutboundRequest, Transport, UpstreamResponse};
use crate::context::REQUEST_ID_HEADER;
use crate::{CambioError, Result};

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(8000);

/// Idle keep-alive connections retained per host.
const POOL_MAX_IDLE_PER_HOST: usize = 16;

/// Base transport: one HTTP attempt, no retries, no metrics.
///
/// Connections are pooled and kept alive; redirects are never followed
/// and surface as [`CambioError::Redirect`]. The timeout applies to each
/// call of [`Transport::execute`], so every retry gets a full budget.
#[derive(Clone)]
pub struct HttpTransport {
    http: Client,
    base_url: Url,
    target: String,
}

impl HttpTransport {
    /// Build a transport for `base_url`.
    ///
    /// `timeout` falls back to [`DEFAULT_TIMEOUT`] when `None`.
    pub fn new(base_url: &str, timeout: Option<Duration>, user_agent: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            CambioError::Configuration(format!("invalid upstream base URL {base_url:?}: {e}"))
        })?;
        let target = target_of(&base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent).map_err(|e| {
                CambioError::Configuration(format!("invalid user agent {user_agent:?}: {e}"))
            })?,
        );

        let http = Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .redirect(redirect::Policy::none())
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .tcp_keepalive(Duration::from_secs(60))
            .default_headers(headers)
            .build()
            .map_err(|e| CambioError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            target,
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn target(&self) -> &str {
        &self.target
    }

    async fn execute(&self, request: &OutboundRequest) -> Result<UpstreamResponse> {
        let url = self.url_for(&request.path);
        debug!(target_host = %self.target, method = %request.method, %url, "sending upstream request");

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .query(&request.query);
        if let Some(id) = &request.request_id {
            builder = builder.header(REQUEST_ID_HEADER, id);
        }

        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            let body = response.bytes().await?;
            return Ok(UpstreamResponse {
                status: status.as_u16(),
                body: body.to_vec(),
            });
        }

        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            return Err(CambioError::Redirect {
                status: status.as_u16(),
                location,
            });
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(CambioError::RateLimited { retry_after });
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("").to_owned());
        Err(CambioError::from_status(status.as_u16(), message))
    }
}

/// `host[:port]` of the base URL.
fn target_of(url: &Url) -> Result<String> {
    let host = url.host_str().ok_or_else(|| {
        CambioError::Configuration(format!("upstream base URL {url} has no host"))
    })?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    })
}
