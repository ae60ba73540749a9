// =============================================================================
// Engine Configuration — JSON settings file plus environment secrets
// =============================================================================
//
// Central configuration hub for the Meridian signal engine.  The JSON file is
// read once at startup and is immutable afterwards; there is no hot reload
// and no runtime mutation path.
//
// All fields carry `#[serde(default)]` so that a partial config file (or no
// file at all) still produces a runnable engine.  Credentials never live in
// the JSON file; they come from the environment via dotenv.
//
// =============================================================================

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::ConfigError;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_symbols() -> Vec<String> {
    [
        "AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "NVDA", "BRK.B", "META", "XOM", "UNH",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_rate_budgets() -> HashMap<String, u32> {
    HashMap::from([
        ("finnhub".to_string(), 150),
        ("alpha_vantage".to_string(), 75),
    ])
}

fn default_cycle_interval_secs() -> u64 {
    300
}

fn default_chunk_size() -> usize {
    10
}

fn default_decay_window_days() -> i64 {
    7
}

fn default_high_risk_terms() -> Vec<String> {
    [
        "sec investigation",
        "lawsuit",
        "fraud",
        "regulatory action",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_credible_sources() -> Vec<String> {
    ["Reuters", "Bloomberg", "CNBC", "WSJ"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_price_flex() -> f64 {
    0.95
}

fn default_sentiment_threshold() -> f64 {
    25.0
}

fn default_account_balance() -> f64 {
    10_000.0
}

fn default_atr_period() -> usize {
    14
}

fn default_base_risk_fraction() -> f64 {
    0.02
}

fn default_atr_multiplier() -> f64 {
    2.0
}

// =============================================================================
// RiskAllocation
// =============================================================================

/// Read-only risk allocation parameters consumed by the risk model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAllocation {
    /// Fraction of the account balance risked per trade before any
    /// confidence scaling (0.02 = 2 %).
    #[serde(default = "default_base_risk_fraction")]
    pub base_risk_fraction: f64,

    /// ATR multiplier for stop distance and risk-per-share.
    #[serde(default = "default_atr_multiplier")]
    pub atr_multiplier: f64,

    /// Scale the risk fraction by signal confidence when true.
    #[serde(default = "default_true")]
    pub adaptive_risk: bool,
}

impl Default for RiskAllocation {
    fn default() -> Self {
        Self {
            base_risk_fraction: default_base_risk_fraction(),
            atr_multiplier: default_atr_multiplier(),
            adaptive_risk: true,
        }
    }
}

// =============================================================================
// EngineConfig
// =============================================================================

/// Top-level configuration for the Meridian engine.
///
/// Every field has a serde default so that older JSON files missing new
/// fields will still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    // --- Universe & cadence --------------------------------------------------

    /// Symbols the engine scans each cycle.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Seconds between pipeline cycles.
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,

    // --- Acquisition ---------------------------------------------------------

    /// Requests-per-minute budget per upstream source name.
    #[serde(default = "default_rate_budgets")]
    pub rate_budgets: HashMap<String, u32>,

    /// Maximum quote requests in flight at once within a batch.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    // --- Sentiment scoring ---------------------------------------------------

    /// Days over which a news item's influence decays to zero.
    #[serde(default = "default_decay_window_days")]
    pub decay_window_days: i64,

    /// Lower-cased substrings that disqualify a headline outright.
    #[serde(default = "default_high_risk_terms")]
    pub high_risk_terms: Vec<String>,

    /// Publishers granted full credibility weight; everyone else gets 0.5.
    #[serde(default = "default_credible_sources")]
    pub credible_sources: Vec<String>,

    // --- Signal generation ---------------------------------------------------

    /// A quote qualifies when current_price > high_price * price_flex.
    /// 0.95 is the loosened revision of the earlier 0.98 policy.
    #[serde(default = "default_price_flex")]
    pub price_flex: f64,

    /// Minimum influence score for a signal.  25 is the loosened revision
    /// of the earlier 60 policy.
    #[serde(default = "default_sentiment_threshold")]
    pub sentiment_threshold: f64,

    // --- Sizing --------------------------------------------------------------

    /// Account balance used for position sizing.
    #[serde(default = "default_account_balance")]
    pub account_balance: f64,

    /// Look-back window for the ATR calculation.
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,

    /// Risk allocation parameters.
    #[serde(default)]
    pub risk: RiskAllocation,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            cycle_interval_secs: default_cycle_interval_secs(),
            rate_budgets: default_rate_budgets(),
            chunk_size: default_chunk_size(),
            decay_window_days: default_decay_window_days(),
            high_risk_terms: default_high_risk_terms(),
            credible_sources: default_credible_sources(),
            price_flex: default_price_flex(),
            sentiment_threshold: default_sentiment_threshold(),
            account_balance: default_account_balance(),
            atr_period: default_atr_period(),
            risk: RiskAllocation::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse engine config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbols = config.symbols.len(),
            cycle_interval_secs = config.cycle_interval_secs,
            "engine config loaded"
        );

        Ok(config)
    }

    /// Check every field the engine depends on.  Called once in `main`;
    /// any violation aborts startup.
    ///
    /// Rate budget values are validated by the rate limiter, which consumes
    /// them; this method covers everything else.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::Empty("symbols"));
        }
        if self.rate_budgets.is_empty() {
            return Err(ConfigError::Empty("rate_budgets"));
        }
        if self.cycle_interval_secs == 0 {
            return Err(ConfigError::OutOfRange {
                field: "cycle_interval_secs",
                min: 1.0,
                max: f64::MAX,
                value: 0.0,
            });
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::OutOfRange {
                field: "chunk_size",
                min: 1.0,
                max: f64::MAX,
                value: 0.0,
            });
        }
        if self.decay_window_days < 1 {
            return Err(ConfigError::OutOfRange {
                field: "decay_window_days",
                min: 1.0,
                max: f64::MAX,
                value: self.decay_window_days as f64,
            });
        }
        if !(self.price_flex > 0.0 && self.price_flex <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "price_flex",
                min: 0.0,
                max: 1.0,
                value: self.price_flex,
            });
        }
        if !(self.sentiment_threshold >= 0.0 && self.sentiment_threshold <= 100.0) {
            return Err(ConfigError::OutOfRange {
                field: "sentiment_threshold",
                min: 0.0,
                max: 100.0,
                value: self.sentiment_threshold,
            });
        }
        if !(self.account_balance > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "account_balance",
                min: 0.0,
                max: f64::MAX,
                value: self.account_balance,
            });
        }
        if self.atr_period == 0 {
            return Err(ConfigError::OutOfRange {
                field: "atr_period",
                min: 1.0,
                max: f64::MAX,
                value: 0.0,
            });
        }
        if !(self.risk.base_risk_fraction > 0.0 && self.risk.base_risk_fraction <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "risk.base_risk_fraction",
                min: 0.0,
                max: 1.0,
                value: self.risk.base_risk_fraction,
            });
        }
        if !(self.risk.atr_multiplier > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "risk.atr_multiplier",
                min: 0.0,
                max: f64::MAX,
                value: self.risk.atr_multiplier,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Secrets
// =============================================================================

/// API credentials pulled from the environment, never from the config file.
#[derive(Clone)]
pub struct Secrets {
    pub finnhub_api_key: String,
    pub alpha_vantage_api_key: String,
    /// Telegram is optional; without both values, alerting degrades to logs.
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}

impl Secrets {
    /// Read credentials from the environment (dotenv has already run).
    ///
    /// The two market-data keys are required; the engine cannot fetch
    /// anything without them.
    pub fn from_env() -> Result<Self> {
        let finnhub_api_key =
            std::env::var("FINNHUB_API_KEY").context("FINNHUB_API_KEY must be set")?;
        let alpha_vantage_api_key =
            std::env::var("ALPHA_VANTAGE_API_KEY").context("ALPHA_VANTAGE_API_KEY must be set")?;

        Ok(Self {
            finnhub_api_key,
            alpha_vantage_api_key,
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN").ok(),
            telegram_chat_id: std::env::var("TELEGRAM_CHAT_ID").ok(),
        })
    }

    pub fn telegram_configured(&self) -> bool {
        self.telegram_bot_token.is_some() && self.telegram_chat_id.is_some()
    }
}

// Custom Debug so credentials never appear in logs.
impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("finnhub_api_key", &"<redacted>")
            .field("alpha_vantage_api_key", &"<redacted>")
            .field("telegram_bot_token", &"<redacted>")
            .field("telegram_chat_id", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.symbols.len(), 10);
        assert_eq!(cfg.symbols[0], "AAPL");
        assert_eq!(cfg.rate_budgets.get("finnhub"), Some(&150));
        assert_eq!(cfg.rate_budgets.get("alpha_vantage"), Some(&75));
        assert_eq!(cfg.chunk_size, 10);
        assert_eq!(cfg.decay_window_days, 7);
        assert!((cfg.price_flex - 0.95).abs() < f64::EPSILON);
        assert!((cfg.sentiment_threshold - 25.0).abs() < f64::EPSILON);
        assert!((cfg.risk.base_risk_fraction - 0.02).abs() < f64::EPSILON);
        assert!((cfg.risk.atr_multiplier - 2.0).abs() < f64::EPSILON);
        assert!(cfg.risk.adaptive_risk);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.symbols.len(), 10);
        assert_eq!(cfg.decay_window_days, 7);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "symbols": ["NVDA"], "sentiment_threshold": 60.0 }"#;
        let cfg: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.symbols, vec!["NVDA"]);
        assert!((cfg.sentiment_threshold - 60.0).abs() < f64::EPSILON);
        assert!((cfg.price_flex - 0.95).abs() < f64::EPSILON);
    }

    #[test]
    fn validate_rejects_empty_symbols() {
        let cfg = EngineConfig {
            symbols: vec![],
            ..EngineConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::Empty("symbols")));
    }

    #[test]
    fn validate_rejects_price_flex_above_one() {
        let cfg = EngineConfig {
            price_flex: 1.5,
            ..EngineConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::OutOfRange {
                field: "price_flex",
                ..
            })
        ));
    }

    #[test]
    fn validate_rejects_zero_chunk_size() {
        let cfg = EngineConfig {
            chunk_size: 0,
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_threshold() {
        let cfg = EngineConfig {
            sentiment_threshold: 101.0,
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn roundtrip_serialisation() {
        let cfg = EngineConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let cfg2: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.symbols, cfg2.symbols);
        assert_eq!(cfg.chunk_size, cfg2.chunk_size);
        assert_eq!(cfg.high_risk_terms, cfg2.high_risk_terms);
    }

    #[test]
    fn secrets_debug_redacts_keys() {
        let secrets = Secrets {
            finnhub_api_key: "fh-key-123".into(),
            alpha_vantage_api_key: "av-key-456".into(),
            telegram_bot_token: Some("tg-token".into()),
            telegram_chat_id: Some("42".into()),
        };
        let dbg = format!("{secrets:?}");
        assert!(!dbg.contains("fh-key-123"));
        assert!(!dbg.contains("av-key-456"));
        assert!(!dbg.contains("tg-token"));
        assert!(dbg.contains("<redacted>"));
    }
}
