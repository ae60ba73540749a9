// =============================================================================
// Shared types used across the Meridian signal engine
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of one symbol's market state, parsed and validated at the source
/// boundary. Field ordering (low <= current <= high) is upstream data and is
/// never assumed by consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub current_price: f64,
    /// Session high.
    pub high_price: f64,
    /// Session low.
    pub low_price: f64,
    /// Previous session close, when the upstream provides it.
    #[serde(default)]
    pub previous_close: Option<f64>,
}

/// One news item attributed to a symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub headline: String,
    /// Publisher name as reported by the upstream ("Reuters", "Bloomberg", ...).
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub symbol: String,
}

/// OHLCV bar from the quote upstream's candle endpoint (oldest first in any
/// slice we hand around). Timestamp is unix seconds, as delivered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Direction of an emitted signal. Only long entries exist here; exits and
/// shorts belong to downstream position management.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAction {
    Buy,
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
        }
    }
}

/// Actionable output of one pipeline cycle for one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct TradeSignal {
    /// Unique identifier for this signal (UUID v4).
    pub id: String,

    pub symbol: String,

    pub action: TradeAction,

    /// Suggested entry band as (low, high).
    pub entry_range: (f64, f64),

    pub stop_loss: f64,

    pub take_profit: f64,

    /// Influence score that produced the signal, carried through verbatim.
    pub confidence: f64,

    /// ISO 8601 timestamp of when this signal was generated.
    pub generated_at: String,
}

impl TradeSignal {
    /// Build a BUY signal with a fresh id and timestamp.
    pub fn buy(
        symbol: impl Into<String>,
        entry_range: (f64, f64),
        stop_loss: f64,
        take_profit: f64,
        confidence: f64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: symbol.into(),
            action: TradeAction::Buy,
            entry_range,
            stop_loss,
            take_profit,
            confidence,
            generated_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Observational counters for the last completed pipeline cycle.
///
/// Read by logging and any future status surface; never an input to a cycle,
/// so cycles stay independent of each other.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleStats {
    /// Monotonic cycle counter since startup.
    pub sequence: u64,
    pub quotes_ok: usize,
    pub quotes_failed: usize,
    /// Symbols that had at least one news item this cycle.
    pub news_symbols: usize,
    pub signals_emitted: usize,
    pub duration_ms: u64,
}
