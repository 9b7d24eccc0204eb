//! Retry configuration, delay calculation, and the retrying transport.
//!
//! Provides [`RetryConfig`] for controlling retry behaviour and
//! [`RetryingTransport`], a decorator that re-issues transiently failed
//! attempts. Retry logic lives in the shared `with_retry()` helper.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::warn;

use super::{OutboundRequest, Transport, UpstreamResponse};
use crate::telemetry::{self, ErrorLabels};
use crate::Result;

/// Configuration for retry behaviour on transient errors.
///
/// Uses exponential backoff: retry `n` (1-based) waits `base_delay * 2^n`.
///
/// ```rust
/// # use cambio::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_retries(5)
///     .base_delay(Duration::from_millis(200))
///     .jitter(true);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the initial attempt. 0 = no retry. Default: 3.
    pub max_retries: u32,
    /// Backoff unit. Default: 100ms (first retry waits 200ms).
    pub base_delay: Duration,
    /// Maximum delay between retries (caps exponential growth and
    /// `Retry-After` hints). Default: 30s.
    pub max_delay: Duration,
    /// Whether to add up to 20% random jitter to delays. Default: false.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            jitter: false,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Set the number of retries after the initial attempt.
    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Set the backoff unit.
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enable or disable jitter.
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Total attempts for one logical call.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based), without jitter.
    ///
    /// `base_delay * 2^retry`, capped at `max_delay`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let delay = self.base_delay.saturating_mul(2u32.saturating_pow(retry));
        delay.min(self.max_delay)
    }

    /// Calculate the effective delay, respecting `Retry-After` hints.
    ///
    /// A hint takes precedence over the computed backoff but is still
    /// capped at `max_delay`.
    pub fn effective_delay(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(hint) => hint.min(self.max_delay),
            None => {
                let delay = self.delay_for_retry(retry);
                if self.jitter {
                    delay + delay.mul_f64(rand::thread_rng().gen_range(0.0..0.2))
                } else {
                    delay
                }
            }
        }
    }
}

// ============================================================================
// Shared retry helper
// ============================================================================

/// Execute an async operation with retry logic.
///
/// Retries on transient errors (as classified by
/// [`CambioError::is_transient()`](crate::CambioError::is_transient)) up to `config.max_retries` times.
/// Attempts are strictly sequential. Permanent errors are returned
/// immediately. A failure leaving this function increments the error
/// counter exactly once.
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    target: &str,
    method: &str,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retry = 0;
    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() && retry < config.max_retries => {
                retry += 1;
                telemetry::record_retry(target, method);
                let delay = config.effective_delay(retry, e.retry_after());
                warn!(
                    target_host = target,
                    method,
                    retry,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying after transient error"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                ErrorLabels::from_error(target, method, &e).record();
                return Err(e);
            }
        }
    }
}

/// Decorator that wraps a [`Transport`] with retry logic.
///
/// Transient failures (network errors, 429, 5xx) are retried with
/// exponential backoff; everything else is returned immediately.
pub struct RetryingTransport<T> {
    inner: T,
    config: RetryConfig,
}

impl<T: Transport> RetryingTransport<T> {
    pub fn new(inner: T, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

#[async_trait]
impl<T: Transport> Transport for RetryingTransport<T> {
    fn target(&self) -> &str {
        self.inner.target()
    }

    async fn execute(&self, request: &OutboundRequest) -> Result<UpstreamResponse> {
        with_retry(
            &self.config,
            self.inner.target(),
            request.method.as_str(),
            || self.inner.execute(request),
        )
        .await
    }
}
