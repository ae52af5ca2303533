//! Runtime configuration, read from the environment (and `.env` when present).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::aggregates::DEFAULT_MAX_COMBINATIONS;
use crate::domain::pricing::PricingPolicy;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Filter used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Root directory holding one cart file per session.
    pub data_dir: PathBuf,
    pub pricing: PricingPolicy,
    pub max_variant_combinations: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8083)),
            log_level: "info".to_string(),
            data_dir: PathBuf::from("./data"),
            pricing: PricingPolicy::default(),
            max_variant_combinations: DEFAULT_MAX_COMBINATIONS,
        }
    }
}

/// Loads `.env` (if any) and then reads the process environment.
///
/// # Errors
///
/// Returns `ConfigError` when a value cannot be parsed or is out of range.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    build_app_config(|key| std::env::var(key))
}

/// Builds the configuration from an arbitrary lookup so tests need no env mutation.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    fn parse<T>(var: &str, raw: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    }

    let money = |var: &str, default: &str| -> Result<Decimal, ConfigError> {
        let value: Decimal = parse(var, &or_default(var, default))?;
        if value.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar { var: var.to_string(), reason: "must not be negative".to_string() });
        }
        Ok(value)
    };

    let bind_addr: SocketAddr = parse("BAZAR_BIND_ADDR", &or_default("BAZAR_BIND_ADDR", "0.0.0.0:8083"))?;
    let log_level = or_default("BAZAR_LOG_LEVEL", "info");
    let data_dir = PathBuf::from(or_default("BAZAR_DATA_DIR", "./data"));

    let tax_rate: Decimal = parse("BAZAR_TAX_RATE", &or_default("BAZAR_TAX_RATE", "0.05"))?;
    if tax_rate < Decimal::ZERO || tax_rate > Decimal::ONE {
        return Err(ConfigError::InvalidEnvVar {
            var: "BAZAR_TAX_RATE".to_string(),
            reason: format!("must be between 0 and 1, got {tax_rate}"),
        });
    }
    let pricing = PricingPolicy {
        free_delivery_threshold: money("BAZAR_FREE_DELIVERY_THRESHOLD", "500")?,
        delivery_fee: money("BAZAR_DELIVERY_FEE", "25")?,
        handling_fee: money("BAZAR_HANDLING_FEE", "2")?,
        tax_rate,
    };

    let max_variant_combinations: usize = parse(
        "BAZAR_MAX_VARIANT_COMBINATIONS",
        &or_default("BAZAR_MAX_VARIANT_COMBINATIONS", &DEFAULT_MAX_COMBINATIONS.to_string()),
    )?;
    if max_variant_combinations == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "BAZAR_MAX_VARIANT_COMBINATIONS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    Ok(AppConfig { bind_addr, log_level, data_dir, pricing, max_variant_combinations })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Result<String, std::env::VarError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned().ok_or(std::env::VarError::NotPresent)
    }

    #[test]
    fn test_defaults() {
        let config = build_app_config(lookup_from(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.pricing.tax_rate, Decimal::new(5, 2));
    }

    #[test]
    fn test_overrides() {
        let config = build_app_config(lookup_from(&[
            ("BAZAR_BIND_ADDR", "127.0.0.1:9000"),
            ("BAZAR_DATA_DIR", "/var/lib/bazarxpress"),
            ("BAZAR_FREE_DELIVERY_THRESHOLD", "999"),
            ("BAZAR_DELIVERY_FEE", "40"),
            ("BAZAR_HANDLING_FEE", "0"),
            ("BAZAR_TAX_RATE", "0.18"),
            ("BAZAR_MAX_VARIANT_COMBINATIONS", "250"),
        ])).unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/bazarxpress"));
        assert_eq!(config.pricing.free_delivery_threshold, Decimal::from(999));
        assert_eq!(config.pricing.delivery_fee, Decimal::from(40));
        assert_eq!(config.pricing.handling_fee, Decimal::ZERO);
        assert_eq!(config.pricing.tax_rate, Decimal::new(18, 2));
        assert_eq!(config.max_variant_combinations, 250);
    }

    #[test]
    fn test_invalid_values() {
        let cases = [
            ("BAZAR_BIND_ADDR", "not-an-addr"),
            ("BAZAR_TAX_RATE", "1.5"),
            ("BAZAR_TAX_RATE", "five percent"),
            ("BAZAR_DELIVERY_FEE", "-25"),
            ("BAZAR_MAX_VARIANT_COMBINATIONS", "0"),
        ];
        for (var, value) in cases {
            let err = build_app_config(lookup_from(&[(var, value)])).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidEnvVar { var: ref v, .. } if v == var), "{var}={value}");
        }
    }
}
