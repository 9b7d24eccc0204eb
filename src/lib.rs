//! Cambio - resilient access to the pydolarve exchange-rate API
//!
//! This crate wraps an unreliable upstream rate provider with a retrying
//! HTTP transport, per-attempt telemetry and single-entry TTL caches. The
//! host service validates inbound parameters, calls [`RatesService`] and
//! renders whatever it returns, errors included.
//!
//! # Example
//!
//! ```rust,no_run
//! use cambio::{CambioConfig, RatesService};
//! use cambio::rates::{Currency, ExchangeRateQuery, FormatDate};
//!
//! #[tokio::main]
//! async fn main() -> cambio::Result<()> {
//!     let config = CambioConfig::new("https://pydolarve.org/api/v2");
//!     let rates = RatesService::from_config(&config)?;
//!
//!     let query = ExchangeRateQuery::new(Currency::Usd)
//!         .format_date(FormatDate::Default)
//!         .rounded_price(false);
//!     let payload = cambio::context::with_request_id("req-1", rates.exchange_rate(&query)).await?;
//!
//!     println!("{payload}");
//!     Ok(())
//! }
//! ```
//!
//! # Metrics
//!
//! Telemetry goes through the `metrics` facade; see [`telemetry`] for metric
//! names and labels. Enable the `prometheus` feature for a preconfigured
//! exporter builder.

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod rates;
pub mod telemetry;
pub mod transport;
mod version;

// Re-export main types at crate root
pub use cache::{CacheKey, CacheSlot};
pub use config::CambioConfig;
pub use error::{CambioError, Result, TransportErrorKind};
pub use rates::RatesService;
pub use transport::{RetryConfig, Transport, UpstreamClient};
pub use version::{PKG_VERSION, default_user_agent};
