//! cambio - exchange-rate CLI
//!
//! Runs the cached rate operations once against the configured upstream and
//! prints the payload as JSON.

use std::path::PathBuf;

use cambio::rates::{
    ConvertQuery, ConvertType, Currency, CurrencyPath, ExchangeRateQuery, FormatDate,
    MonitorsQuery, Page,
};
use cambio::{CambioConfig, RatesService};
use clap::{Parser, Subcommand};

/// Cambio CLI
#[derive(Parser)]
#[command(name = "cambio")]
#[command(version = cambio::PKG_VERSION)]
#[command(about = "Query exchange rates through the resilient upstream client")]
struct Args {
    /// Config file (default: ~/.cambio/config.toml, then /etc/cambio/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Upstream base URL, overrides the config file
    #[arg(long, env = "PYDOLARVE_BASE_URL")]
    base_url: Option<String>,

    /// Correlation id forwarded as x-request-id
    #[arg(long)]
    request_id: Option<String>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Exchange rate for a currency
    Rate {
        /// usd | eur
        #[arg(default_value = "usd")]
        currency: Currency,
        /// default | iso | timestamp
        #[arg(long)]
        format_date: Option<FormatDate>,
        #[arg(long)]
        rounded_price: Option<bool>,
    },

    /// Monitor listing for a currency path
    Monitors {
        /// dollar | euro
        #[arg(default_value = "dollar")]
        currency: CurrencyPath,
        #[arg(long)]
        page: Option<Page>,
        #[arg(long)]
        monitor: Option<String>,
        #[arg(long)]
        format_date: Option<FormatDate>,
        #[arg(long)]
        rounded_price: Option<bool>,
    },

    /// Convert an amount
    Convert {
        /// Amount to convert, as a decimal number
        value: String,
        /// VES | USD | EUR
        #[arg(short = 't', long = "type")]
        convert_type: ConvertType,
        #[arg(long, default_value = "dollar")]
        currency: CurrencyPath,
        #[arg(long, default_value = "bcv")]
        page: Page,
        #[arg(long, default_value = "usd")]
        monitor: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let Args {
        config,
        base_url,
        request_id,
        pretty,
        command,
    } = Args::parse();
    let config = load_config(config.as_deref(), base_url)?;
    let rates = RatesService::from_config(&config)?;

    let request = async {
        match command {
            Command::Rate {
                currency,
                format_date,
                rounded_price,
            } => {
                let mut query = ExchangeRateQuery::new(currency);
                query.format_date = format_date;
                query.rounded_price = rounded_price;
                rates.exchange_rate(&query).await
            }

            Command::Monitors {
                currency,
                page,
                monitor,
                format_date,
                rounded_price,
            } => {
                let mut query = MonitorsQuery::new(currency);
                query.page = page;
                query.monitor = monitor;
                query.format_date = format_date;
                query.rounded_price = rounded_price;
                rates.monitors(&query).await
            }

            Command::Convert {
                value,
                convert_type,
                currency,
                page,
                monitor,
            } => {
                let query = ConvertQuery::new(currency, convert_type, value, page, monitor)?;
                rates.convert(&query).await
            }
        }
    };

    let payload = match request_id {
        Some(id) => cambio::context::with_request_id(id, request).await?,
        None => request.await?,
    };

    let rendered = if pretty {
        serde_json::to_string_pretty(&payload)?
    } else {
        serde_json::to_string(&payload)?
    };
    println!("{rendered}");
    Ok(())
}

/// Config file if one is given or found, otherwise just the base URL.
fn load_config(
    path: Option<&std::path::Path>,
    base_url: Option<String>,
) -> cambio::Result<CambioConfig> {
    let mut config = match (path, &base_url) {
        (Some(path), _) => CambioConfig::load(Some(path))?,
        (None, Some(url)) => CambioConfig::load(None).unwrap_or_else(|_| CambioConfig::new(url)),
        (None, None) => CambioConfig::load(None)?,
    };
    if let Some(url) = base_url {
        config.upstream.base_url = url;
    }
    config.validate()?;
    Ok(config)
}
