//! Application configuration loaded from environment variables.

use chrono::TimeDelta;
use checkout::CheckoutConfig;
use common::Money;
use domain::{CartPolicy, PricingPolicy};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Server and storefront configuration.
///
/// Reads from environment variables, each falling back to its default when
/// unset or unparsable:
/// - `HOST` (`"0.0.0.0"`), `PORT` (`3000`)
/// - `RUST_LOG` (`"info"`), `LOG_FORMAT` (`text` or `json`)
/// - `CURRENCY` (`"usd"`)
/// - `TAX_RATE_BPS` (`800`), `FREE_SHIPPING_THRESHOLD_CENTS` (`5000`),
///   `FLAT_SHIPPING_CENTS` (`999`)
/// - `GUEST_CART_TTL_DAYS` (`30`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub currency: String,
    pub pricing: PricingPolicy,
    pub guest_cart_ttl_days: i64,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<i64>().ok());

        let pricing = PricingPolicy {
            tax_rate_bps: lookup("TAX_RATE_BPS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.pricing.tax_rate_bps),
            free_shipping_threshold: parsed("FREE_SHIPPING_THRESHOLD_CENTS")
                .filter(|cents| *cents >= 0)
                .map(Money::from_cents)
                .unwrap_or(defaults.pricing.free_shipping_threshold),
            flat_shipping: parsed("FLAT_SHIPPING_CENTS")
                .filter(|cents| *cents >= 0)
                .map(Money::from_cents)
                .unwrap_or(defaults.pricing.flat_shipping),
        };

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.log_format),
            currency: lookup("CURRENCY")
                .map(|c| c.trim().to_lowercase())
                .filter(|c| !c.is_empty())
                .unwrap_or(defaults.currency),
            pricing,
            guest_cart_ttl_days: parsed("GUEST_CART_TTL_DAYS")
                .filter(|days| *days > 0)
                .unwrap_or(defaults.guest_cart_ttl_days),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cart_policy(&self) -> CartPolicy {
        CartPolicy {
            guest_ttl: TimeDelta::days(self.guest_cart_ttl_days),
            ..CartPolicy::default()
        }
    }

    pub fn checkout_config(&self) -> CheckoutConfig {
        CheckoutConfig {
            pricing: self.pricing,
            cart_policy: self.cart_policy(),
            currency: self.currency.clone(),
            ..CheckoutConfig::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            currency: "usd".to_string(),
            pricing: PricingPolicy::default(),
            guest_cart_ttl_days: 30,
        }
    }
}
