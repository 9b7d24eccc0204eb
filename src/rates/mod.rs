//! Rate query orchestration.
//!
//! [`RatesService`] maps each operation onto one upstream GET endpoint and
//! decides whether the upstream needs to be called at all:
//!
//! | Operation | Endpoint | Cached |
//! |---|---|---|
//! | [`exchange_rate`](RatesService::exchange_rate) | `/tipo-cambio` | own slot |
//! | [`monitors`](RatesService::monitors) | `/monitors` | own slot |
//! | [`convert`](RatesService::convert) | `/convert` | never |
//!
//! Conversion results are point-in-time computations and always fetched.

pub mod params;
pub mod types;

pub use params::{
    ConvertQuery, ConvertType, Currency, CurrencyPath, ExchangeRateQuery, FormatDate,
    MonitorsQuery, Page,
};
pub use types::{ExchangeRate, Monitor, MonitorDatetime, MonitorsResponse};

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use crate::cache::{CacheKey, CacheSlot};
use crate::config::CambioConfig;
use crate::transport::UpstreamClient;
use crate::Result;

const EXCHANGE_RATE_PATH: &str = "/tipo-cambio";
const MONITORS_PATH: &str = "/monitors";
const CONVERT_PATH: &str = "/convert";

#[derive(Serialize)]
struct ExchangeRateParams {
    currency: &'static str,
    format_date: Option<&'static str>,
    rounded_price: Option<bool>,
}

/// The upstream only takes these three; `monitor` and `rounded_price`
/// still participate in the cache key.
#[derive(Serialize)]
struct MonitorsParams {
    currency: &'static str,
    page: Option<&'static str>,
    format_date: Option<&'static str>,
}

#[derive(Serialize)]
struct ConvertParams<'a> {
    currency: &'a str,
    #[serde(rename = "type")]
    convert_type: &'a str,
    value: &'a str,
    page: &'a str,
    monitor: &'a str,
}

/// Exchange-rate queries against the upstream provider.
///
/// Owns one cache slot per cached operation; share it behind an `Arc`.
pub struct RatesService {
    client: UpstreamClient,
    exchange_rates: CacheSlot<Value>,
    monitors: CacheSlot<Value>,
}

impl RatesService {
    /// Create a service whose cache slots expire after `ttl`.
    ///
    /// `ttl` is used as given; derive it with
    /// [`jittered_ttl`](crate::cache::jittered_ttl) or
    /// [`CambioConfig::cache_ttl`].
    pub fn new(client: UpstreamClient, ttl: Duration) -> Self {
        Self {
            client,
            exchange_rates: CacheSlot::new("exchange_rate", ttl),
            monitors: CacheSlot::new("monitors", ttl),
        }
    }

    /// Build the client and the jittered TTL from configuration.
    pub fn from_config(config: &CambioConfig) -> Result<Self> {
        let client = UpstreamClient::new(
            &config.upstream.base_url,
            Some(config.timeout()),
            &config.user_agent(),
            config.retry.clone().into(),
        )?;
        Ok(Self::new(client, config.cache_ttl()))
    }

    /// TTL shared by both cache slots.
    pub fn ttl(&self) -> Duration {
        self.exchange_rates.ttl()
    }

    pub fn client(&self) -> &UpstreamClient {
        &self.client
    }

    /// Exchange rate for a currency (`/tipo-cambio`), cached.
    #[instrument(skip(self), fields(operation = "exchange_rate"))]
    pub async fn exchange_rate(&self, query: &ExchangeRateQuery) -> Result<Value> {
        let key = CacheKey::from_params(query)?;
        self.exchange_rates
            .get_or_fetch(key, || {
                let client = self.client.clone();
                let params = ExchangeRateParams {
                    currency: query.currency.as_str(),
                    format_date: query.format_date.map(FormatDate::as_str),
                    rounded_price: query.rounded_price,
                };
                async move { client.get_value(EXCHANGE_RATE_PATH, &params).await }
            })
            .await
    }

    /// Monitor listing for a currency path (`/monitors`), cached.
    #[instrument(skip(self), fields(operation = "monitors"))]
    pub async fn monitors(&self, query: &MonitorsQuery) -> Result<Value> {
        let key = CacheKey::from_params(query)?;
        self.monitors
            .get_or_fetch(key, || {
                let client = self.client.clone();
                let params = MonitorsParams {
                    currency: query.currency_path.as_str(),
                    page: query.page.map(Page::as_str),
                    format_date: query.format_date.map(FormatDate::as_str),
                };
                async move { client.get_value(MONITORS_PATH, &params).await }
            })
            .await
    }

    /// Currency conversion (`/convert`), always fetched.
    #[instrument(skip(self), fields(operation = "convert"))]
    pub async fn convert(&self, query: &ConvertQuery) -> Result<Value> {
        let params = ConvertParams {
            currency: query.currency_path().as_str(),
            convert_type: query.convert_type().as_str(),
            value: query.value(),
            page: query.page().as_str(),
            monitor: query.monitor(),
        };
        self.client.get_value(CONVERT_PATH, &params).await
    }
}
