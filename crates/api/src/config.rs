//! Application configuration loaded from environment variables.

use std::path::PathBuf;

use pricing::{CommissionRates, InsuranceRates};
use rust_decimal::Decimal;

/// Operators registered with an in-memory gateway when `BOOKING_PROVIDERS` is unset.
const DEFAULT_PROVIDERS: &[&str] = &["aeroflot", "s7", "rzd", "lenaturflot", "yakutavtotrans"];

/// Server and pricing configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default `"0.0.0.0"`)
/// - `PORT`: listen port (default `3000`)
/// - `RUST_LOG`: tracing filter directive (default `"info"`)
/// - `BOOKING_CURRENCY`: payment currency (default `"RUB"`)
/// - `BOOKING_PROVIDERS`: comma-separated operator names
/// - `ROUTES_FILE`: JSON array of priced routes loaded at startup
/// - `INSURANCE_BASE_RATE`: base premium rate as a fraction (default `0.05`)
/// - `COMMISSION_RATE_{AIR,RAIL,BUS,RIVER,TAXI,WALK,DEFAULT}`: commission
///   rates as fractions
///
/// Values that do not parse fall back to the default.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub currency: String,
    pub providers: Vec<String>,
    pub routes_file: Option<PathBuf>,
    pub commission_rates: CommissionRates,
    pub insurance_rates: InsuranceRates,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let rate = |key: &str, fallback: Decimal| {
            lookup(key)
                .and_then(|v| v.trim().parse::<Decimal>().ok())
                .filter(|r| !r.is_sign_negative())
                .unwrap_or(fallback)
        };

        let commission = &defaults.commission_rates;
        let commission_rates = CommissionRates {
            air: rate("COMMISSION_RATE_AIR", commission.air),
            rail: rate("COMMISSION_RATE_RAIL", commission.rail),
            bus: rate("COMMISSION_RATE_BUS", commission.bus),
            river: rate("COMMISSION_RATE_RIVER", commission.river),
            taxi: rate("COMMISSION_RATE_TAXI", commission.taxi),
            walk: rate("COMMISSION_RATE_WALK", commission.walk),
            default: rate("COMMISSION_RATE_DEFAULT", commission.default),
        };

        let insurance_rates = InsuranceRates {
            base_rate: rate("INSURANCE_BASE_RATE", defaults.insurance_rates.base_rate),
            ..defaults.insurance_rates.clone()
        };

        let providers = lookup("BOOKING_PROVIDERS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|p| !p.is_empty())
            .unwrap_or(defaults.providers);

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            currency: lookup("BOOKING_CURRENCY")
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty())
                .unwrap_or(defaults.currency),
            providers,
            routes_file: lookup("ROUTES_FILE")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            commission_rates,
            insurance_rates,
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            currency: "RUB".to_string(),
            providers: DEFAULT_PROVIDERS.iter().map(|p| p.to_string()).collect(),
            routes_file: None,
            commission_rates: CommissionRates::default(),
            insurance_rates: InsuranceRates::default(),
        }
    }
}
