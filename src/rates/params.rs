//! Query parameters accepted by the rate operations.
//!
//! Validation happens at the edge (the HTTP layer of the host service);
//! these types make invalid combinations unrepresentable once it has run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CambioError;

/// Declares a string-valued parameter enum with `FromStr` / `Display`.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $what:literal { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// All accepted values, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire representation sent upstream.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CambioError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(CambioError::InvalidInput(format!(
                        concat!("unknown ", $what, " '{}'"),
                        other
                    ))),
                }
            }
        }
    };
}

string_enum! {
    /// Currency for the exchange-rate lookup.
    Currency, "currency" {
        Usd => "usd",
        Eur => "eur",
    }
}

string_enum! {
    /// Currency path segment used by monitor listing and conversion.
    CurrencyPath, "currency path" {
        Dollar => "dollar",
        Euro => "euro",
    }
}

string_enum! {
    /// Date format of the upstream response.
    FormatDate, "date format" {
        Default => "default",
        Iso => "iso",
        Timestamp => "timestamp",
    }
}

string_enum! {
    /// Rate source published by the upstream.
    Page, "page" {
        Alcambio => "alcambio",
        Bcv => "bcv",
        Criptodolar => "criptodolar",
        Dolartoday => "dolartoday",
        Enparalelovzla => "enparalelovzla",
        Italcambio => "italcambio",
        Zoom => "zoom",
        Binance => "binance",
        Bybit => "bybit",
        Yadio => "yadio",
    }
}

string_enum! {
    /// Currency the conversion amount is expressed in.
    ConvertType, "conversion type" {
        Ves => "VES",
        Usd => "USD",
        Eur => "EUR",
    }
}

/// Parameters of the exchange-rate lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangeRateQuery {
    pub currency: Currency,
    #[serde(default)]
    pub format_date: Option<FormatDate>,
    #[serde(default)]
    pub rounded_price: Option<bool>,
}

impl ExchangeRateQuery {
    pub fn new(currency: Currency) -> Self {
        Self {
            currency,
            format_date: None,
            rounded_price: None,
        }
    }

    pub fn format_date(mut self, format: FormatDate) -> Self {
        self.format_date = Some(format);
        self
    }

    pub fn rounded_price(mut self, rounded: bool) -> Self {
        self.rounded_price = Some(rounded);
        self
    }
}

/// Parameters of the monitor listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonitorsQuery {
    pub currency_path: CurrencyPath,
    #[serde(default)]
    pub page: Option<Page>,
    #[serde(default)]
    pub monitor: Option<String>,
    #[serde(default)]
    pub format_date: Option<FormatDate>,
    #[serde(default)]
    pub rounded_price: Option<bool>,
}

impl MonitorsQuery {
    pub fn new(currency_path: CurrencyPath) -> Self {
        Self {
            currency_path,
            page: None,
            monitor: None,
            format_date: None,
            rounded_price: None,
        }
    }

    pub fn page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    pub fn monitor(mut self, monitor: impl Into<String>) -> Self {
        self.monitor = Some(monitor.into());
        self
    }

    pub fn format_date(mut self, format: FormatDate) -> Self {
        self.format_date = Some(format);
        self
    }

    pub fn rounded_price(mut self, rounded: bool) -> Self {
        self.rounded_price = Some(rounded);
        self
    }
}

/// Parameters of a currency conversion.
///
/// The amount is kept as the decimal string the caller supplied and is
/// forwarded verbatim, so no precision is lost on the way upstream. Fields
/// are private; [`ConvertQuery::new`] (and deserialization, which goes
/// through it) is the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ConvertFields")]
pub struct ConvertQuery {
    currency_path: CurrencyPath,
    #[serde(rename = "type")]
    convert_type: ConvertType,
    value: String,
    page: Page,
    monitor: String,
}

#[derive(Deserialize)]
struct ConvertFields {
    currency_path: CurrencyPath,
    #[serde(rename = "type")]
    convert_type: ConvertType,
    value: String,
    page: Page,
    monitor: String,
}

impl TryFrom<ConvertFields> for ConvertQuery {
    type Error = CambioError;

    fn try_from(f: ConvertFields) -> Result<Self, Self::Error> {
        Self::new(f.currency_path, f.convert_type, f.value, f.page, f.monitor)
    }
}

impl ConvertQuery {
    /// Rejects amounts that are not plain decimal numbers
    /// (`[+-]digits[.digits]`, no exponent, no `NaN`/`inf`).
    pub fn new(
        currency_path: CurrencyPath,
        convert_type: ConvertType,
        value: impl Into<String>,
        page: Page,
        monitor: impl Into<String>,
    ) -> crate::Result<Self> {
        let value = value.into();
        if !is_decimal_string(&value) {
            return Err(CambioError::InvalidInput(format!(
                "conversion value must be a decimal number, got {value:?}"
            )));
        }
        Ok(Self {
            currency_path,
            convert_type,
            value,
            page,
            monitor: monitor.into(),
        })
    }

    pub fn currency_path(&self) -> CurrencyPath {
        self.currency_path
    }

    pub fn convert_type(&self) -> ConvertType {
        self.convert_type
    }

    /// Amount exactly as supplied.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn monitor(&self) -> &str {
        &self.monitor
    }
}

/// `^[+-]?([0-9]*\.)?[0-9]+$`
fn is_decimal_string(s: &str) -> bool {
    let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
    let (int, frac) = unsigned.split_once('.').unwrap_or(("", unsigned));
    !frac.is_empty()
        && frac.bytes().all(|b| b.is_ascii_digit())
        && int.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip_wire_names() {
        for page in Page::ALL {
            assert_eq!(page.as_str().parse::<Page>().unwrap(), *page);
        }
        assert_eq!("VES".parse::<ConvertType>().unwrap(), ConvertType::Ves);
        assert_eq!(CurrencyPath::Euro.to_string(), "euro");
    }

    #[test]
    fn unknown_value_is_invalid_input() {
        let err = "gbp".parse::<Currency>().unwrap_err();
        assert!(matches!(err, CambioError::InvalidInput(ref m) if m.contains("gbp")));
        // Wire names are case-sensitive, as upstream expects them.
        assert!("ves".parse::<ConvertType>().is_err());
    }

    #[test]
    fn serde_uses_wire_names() {
        let q = ExchangeRateQuery::new(Currency::Usd).format_date(FormatDate::Iso);
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["currency"], "usd");
        assert_eq!(json["format_date"], "iso");
    }

    #[test]
    fn convert_keeps_value_verbatim() {
        let q = ConvertQuery::new(
            CurrencyPath::Dollar,
            ConvertType::Ves,
            "100.50",
            Page::Bcv,
            "usd",
        )
        .unwrap();
        assert_eq!(q.value(), "100.50");

        let big = "12345678901234567890";
        let q = ConvertQuery::new(CurrencyPath::Dollar, ConvertType::Ves, big, Page::Bcv, "usd")
            .unwrap();
        assert_eq!(q.value(), big);
    }

    #[test]
    fn decimal_string_grammar() {
        for ok in ["0", "100", "100.50", "-1.5", "+2", ".5"] {
            assert!(is_decimal_string(ok), "{ok}");
        }
        for bad in ["", "NaN", "inf", "1e5", "100.", "1.2.3", "12a", " 1", "-", "."] {
            assert!(!is_decimal_string(bad), "{bad}");
        }
    }

    #[test]
    fn convert_rejects_non_numeric_values() {
        for bad in ["NaN", "inf", "abc"] {
            let err =
                ConvertQuery::new(CurrencyPath::Dollar, ConvertType::Usd, bad, Page::Bcv, "usd")
                    .unwrap_err();
            assert!(matches!(err, CambioError::InvalidInput(_)));
        }
    }

    #[test]
    fn deserialization_validates_value() {
        let ok: ConvertQuery = serde_json::from_value(serde_json::json!({
            "currency_path": "euro", "type": "EUR", "value": "7.25",
            "page": "bcv", "monitor": "eur"
        }))
        .unwrap();
        assert_eq!(ok.value(), "7.25");
        assert_eq!(ok.convert_type(), ConvertType::Eur);

        let bad = serde_json::from_value::<ConvertQuery>(serde_json::json!({
            "currency_path": "euro", "type": "EUR", "value": "NaN",
            "page": "bcv", "monitor": "eur"
        }));
        assert!(bad.is_err());
    }
}
