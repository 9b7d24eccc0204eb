//! Response models published by the upstream.
//!
//! The rate operations return payloads untouched as [`serde_json::Value`];
//! these types are for callers that want a typed view:
//!
//! ```rust
//! # use cambio::rates::ExchangeRate;
//! let raw = serde_json::json!({
//!     "change": 0.1, "color": "green", "image": "", "last_update": "",
//!     "last_update_old": "", "percent": 0.2, "price": 36.5,
//!     "price_old": 36.4, "symbol": "▲", "title": "BCV"
//! });
//! let rate: ExchangeRate = serde_json::from_value(raw).unwrap();
//! assert_eq!(rate.price, 36.5);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Exchange-rate lookup (`/tipo-cambio`) response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub change: f64,
    pub color: String,
    pub image: String,
    pub last_update: String,
    pub last_update_old: String,
    pub percent: f64,
    pub price: f64,
    pub price_old: f64,
    pub symbol: String,
    pub title: String,
}

/// One entry of the monitor listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    pub change: f64,
    pub color: String,
    pub image: Option<String>,
    pub last_update: String,
    pub last_update_old: String,
    pub percent: f64,
    pub price: f64,
    pub price_old: f64,
    pub symbol: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorDatetime {
    pub date: String,
    pub time: String,
}

/// Monitor listing (`/monitors`) response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorsResponse {
    pub datetime: MonitorDatetime,
    pub monitors: BTreeMap<String, Monitor>,
}
