//! Configuration for the credit issuer

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Issuer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuerConfig {
    /// Default credit period length (seconds)
    pub default_period_seconds: i64,

    /// Default grace window (seconds)
    pub default_grace_seconds: i64,

    /// Default transfer fee rate (1.0 = 100%)
    pub default_fee_rate: Decimal,

    /// Default minimum income-to-debt ratio (1.0 = 100%)
    pub default_min_itd: Decimal,

    /// Actor mailbox capacity
    pub mailbox_capacity: usize,

    /// Event broadcast channel capacity
    pub event_capacity: usize,

    /// Principals granted the issuer role at startup
    pub issuers: Vec<String>,

    /// Principals granted the operator role at startup
    pub operators: Vec<String>,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            default_period_seconds: 90 * 86_400, // 90 days
            default_grace_seconds: 30 * 86_400,  // 30 days
            default_fee_rate: Decimal::new(5, 2), // 5%
            default_min_itd: Decimal::new(10, 2), // 10%
            mailbox_capacity: 256,
            event_capacity: 256,
            issuers: Vec::new(),
            operators: Vec::new(),
        }
    }
}

impl IssuerConfig {
    /// Default period length as a duration
    pub fn default_period(&self) -> Duration {
        Duration::seconds(self.default_period_seconds)
    }

    /// Default grace window as a duration
    pub fn default_grace(&self) -> Duration {
        Duration::seconds(self.default_grace_seconds)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: IssuerConfig = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = IssuerConfig::default();

        if let Ok(period) = std::env::var("CREDIT_ISSUER_PERIOD_SECONDS") {
            config.default_period_seconds = period
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid period seconds: {}", e)))?;
        }

        if let Ok(grace) = std::env::var("CREDIT_ISSUER_GRACE_SECONDS") {
            config.default_grace_seconds = grace
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid grace seconds: {}", e)))?;
        }

        if let Ok(min_itd) = std::env::var("CREDIT_ISSUER_MIN_ITD") {
            config.default_min_itd = min_itd
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid minimum ITD: {}", e)))?;
        }

        Ok(config)
    }
}
