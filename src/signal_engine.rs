// =============================================================================
// Signal Engine — Breakout-plus-sentiment BUY signal generation
// =============================================================================
//
// A symbol earns a BUY signal only when both legs agree:
//
//   price leg:     current_price > high_price * price_flex
//   sentiment leg: influence_score > sentiment_threshold
//
// Both comparisons are strict.  The emitted levels are fixed multiples of
// the quote: entry band from the current price up to 2 % above the session
// high, stop 2 % under the session low, target 3 % above current.  The
// influence score rides along unchanged as the signal's confidence.
//
// A quote carrying junk prices (non-finite or non-positive) produces no
// signal and no panic; the rest of the batch is none the wiser.
// =============================================================================

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::types::{Quote, TradeSignal};

/// Entry band ceiling relative to the session high.
const ENTRY_BAND_FACTOR: f64 = 1.02;

/// Stop placement relative to the session low.
const STOP_FACTOR: f64 = 0.98;

/// Profit target relative to the current price.
const TAKE_PROFIT_FACTOR: f64 = 1.03;

#[derive(Debug, Clone)]
pub struct SignalEngine {
    price_flex: f64,
    sentiment_threshold: f64,
}

impl SignalEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            price_flex: config.price_flex,
            sentiment_threshold: config.sentiment_threshold,
        }
    }

    /// Evaluate one symbol.  `None` is the no-trade verdict, whether from a
    /// failed condition or an unusable quote.
    pub fn generate(&self, quote: &Quote, influence_score: f64) -> Option<TradeSignal> {
        if !usable(quote) {
            debug!(symbol = %quote.symbol, "quote has unusable prices, no signal");
            return None;
        }

        let breakout = quote.current_price > quote.high_price * self.price_flex;
        let sentiment = influence_score > self.sentiment_threshold;
        if !breakout || !sentiment {
            debug!(
                symbol = %quote.symbol,
                breakout,
                sentiment,
                influence_score,
                "conditions not met"
            );
            return None;
        }

        let signal = TradeSignal::buy(
            quote.symbol.clone(),
            (quote.current_price, quote.high_price * ENTRY_BAND_FACTOR),
            quote.low_price * STOP_FACTOR,
            quote.current_price * TAKE_PROFIT_FACTOR,
            influence_score,
        );

        info!(
            symbol = %signal.symbol,
            entry_low = signal.entry_range.0,
            entry_high = signal.entry_range.1,
            stop_loss = signal.stop_loss,
            take_profit = signal.take_profit,
            confidence = signal.confidence,
            "BUY signal generated"
        );

        Some(signal)
    }
}

fn usable(quote: &Quote) -> bool {
    [quote.current_price, quote.high_price, quote.low_price]
        .iter()
        .all(|p| p.is_finite() && *p > 0.0)
}
