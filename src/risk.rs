// =============================================================================
// Risk Model — ATR-based stops, adaptive sizing, trailing ratchet
// =============================================================================
//
// Four pure calculations over explicit inputs:
//   1. Stop loss        — entry minus a configured number of ATRs.
//   2. Position size    — balance * risk fraction / risk per share, where the
//                         fraction optionally scales with signal confidence.
//   3. Trailing stop    — ratchets up with price, anchored above entry.
//   4. Volatility guard — halves the risk fraction on high-volatility days.
//
// The model holds only its immutable allocation parameters.  Anything
// time-varying (ATR, price, confidence) arrives as an argument, so every
// result is reproducible from its inputs.
// =============================================================================

use tracing::debug;

use crate::config::RiskAllocation;
use crate::errors::ZeroVolatilityError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// ATR multiple the trailing stop sits above the entry price.
const TRAILING_ATR_FACTOR: f64 = 1.5;

/// ATR-percent level above which a session counts as high volatility.
const HIGH_VOLATILITY_THRESHOLD: f64 = 3.0;

/// Fraction the risk allocation shrinks to on high-volatility sessions.
const HIGH_VOLATILITY_HAIRCUT: f64 = 0.5;

// ---------------------------------------------------------------------------
// Risk Model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RiskModel {
    allocation: RiskAllocation,
}

impl RiskModel {
    pub fn new(allocation: RiskAllocation) -> Self {
        Self { allocation }
    }

    /// Stop price `atr_multiplier` ATRs below the current price, floored at
    /// zero so a wide ATR on a cheap stock cannot produce a negative stop.
    pub fn stop_loss(&self, atr: f64, current_price: f64) -> f64 {
        (current_price - atr * self.allocation.atr_multiplier).max(0.0)
    }

    /// Shares to buy for this signal.
    ///
    /// `risk_fraction = base_risk_fraction * confidence / 100` when adaptive
    /// risk is on, otherwise the base fraction unchanged.  The share count is
    /// `balance * risk_fraction / (atr * atr_multiplier)`, truncated, with a
    /// floor of one share.
    ///
    /// An ATR that is zero, negative, or non-finite cannot price risk, so
    /// sizing refuses with `ZeroVolatilityError` instead of dividing by it.
    pub fn position_size(
        &self,
        account_balance: f64,
        atr: f64,
        confidence: f64,
    ) -> Result<u64, ZeroVolatilityError> {
        if !atr.is_finite() || atr <= 0.0 {
            return Err(ZeroVolatilityError);
        }

        let mut risk_fraction = self.allocation.base_risk_fraction;
        if self.allocation.adaptive_risk {
            risk_fraction *= confidence / 100.0;
        }

        let risk_per_share = atr * self.allocation.atr_multiplier;
        let shares = (account_balance * risk_fraction / risk_per_share).floor();

        debug!(
            account_balance,
            atr, confidence, risk_fraction, shares, "position sized"
        );

        // f64::max treats NaN as absent, so a junk balance lands on the floor.
        Ok(shares.max(1.0) as u64)
    }

    /// Trailing stop anchored `TRAILING_ATR_FACTOR` ATRs above the entry,
    /// ratcheting up to the current price once price moves beyond it.
    /// Non-decreasing in `current_price` by construction.
    pub fn trailing_stop(&self, current_price: f64, entry_price: f64, atr: f64) -> f64 {
        (entry_price + atr * TRAILING_ATR_FACTOR).max(current_price)
    }

    /// Risk fraction to use given the session's volatility reading
    /// (ATR as a percent of price).  Quiet sessions keep the base fraction;
    /// loud ones get half.
    pub fn risk_on_high_volatility(&self, market_volatility: f64) -> f64 {
        if market_volatility > HIGH_VOLATILITY_THRESHOLD {
            self.allocation.base_risk_fraction * HIGH_VOLATILITY_HAIRCUT
        } else {
            self.allocation.base_risk_fraction
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn model(base_risk_fraction: f64, atr_multiplier: f64, adaptive_risk: bool) -> RiskModel {
        RiskModel::new(RiskAllocation {
            base_risk_fraction,
            atr_multiplier,
            adaptive_risk,
        })
    }

    #[test]
    fn stop_loss_sits_two_atr_below_price() {
        let m = model(0.02, 2.0, true);
        assert!((m.stop_loss(1.5, 100.0) - 97.0).abs() < 1e-9);
    }

    #[test]
    fn stop_loss_never_goes_negative() {
        let m = model(0.02, 2.0, true);
        assert_eq!(m.stop_loss(60.0, 100.0), 0.0);
        assert_eq!(m.stop_loss(1.0, 0.5), 0.0);
    }

    #[test]
    fn position_size_matches_hand_calculation() {
        // 10_000 * (0.02 * 80/100) / (1.5 * 2.0) = 160 / 3 = 53.33 -> 53
        let m = model(0.02, 2.0, true);
        assert_eq!(m.position_size(10_000.0, 1.5, 80.0).unwrap(), 53);
    }

    #[test]
    fn position_size_without_adaptive_risk_ignores_confidence() {
        let m = model(0.02, 2.0, false);
        let low = m.position_size(10_000.0, 1.5, 10.0).unwrap();
        let high = m.position_size(10_000.0, 1.5, 95.0).unwrap();
        assert_eq!(low, high);
        // 10_000 * 0.02 / 3.0 = 66.66 -> 66
        assert_eq!(low, 66);
    }

    #[test]
    fn position_size_scales_with_confidence_when_adaptive() {
        let m = model(0.02, 2.0, true);
        let low = m.position_size(10_000.0, 1.5, 40.0).unwrap();
        let high = m.position_size(10_000.0, 1.5, 80.0).unwrap();
        assert!(high > low);
    }

    #[test]
    fn position_size_floors_at_one_share() {
        let m = model(0.02, 2.0, true);
        // Tiny balance: raw size is far below 1.
        assert_eq!(m.position_size(10.0, 5.0, 50.0).unwrap(), 1);
    }

    #[test]
    fn position_size_rejects_zero_atr() {
        let m = model(0.02, 2.0, true);
        assert_eq!(
            m.position_size(10_000.0, 0.0, 80.0),
            Err(ZeroVolatilityError)
        );
    }

    #[test]
    fn position_size_rejects_junk_atr() {
        let m = model(0.02, 2.0, true);
        assert!(m.position_size(10_000.0, -1.0, 80.0).is_err());
        assert!(m.position_size(10_000.0, f64::NAN, 80.0).is_err());
        assert!(m.position_size(10_000.0, f64::INFINITY, 80.0).is_err());
    }

    #[test]
    fn trailing_stop_holds_anchor_until_price_passes_it() {
        let m = model(0.02, 2.0, true);
        // Anchor = 100 + 1.5 * 2.0 = 103.
        assert!((m.trailing_stop(101.0, 100.0, 2.0) - 103.0).abs() < 1e-9);
        assert!((m.trailing_stop(103.0, 100.0, 2.0) - 103.0).abs() < 1e-9);
        assert!((m.trailing_stop(107.5, 100.0, 2.0) - 107.5).abs() < 1e-9);
    }

    #[test]
    fn trailing_stop_is_non_decreasing_in_price() {
        let m = model(0.02, 2.0, true);
        let mut prev = f64::MIN;
        for i in 0..200 {
            let price = 90.0 + i as f64 * 0.25;
            let stop = m.trailing_stop(price, 100.0, 2.0);
            assert!(stop >= prev, "stop regressed at price {price}");
            prev = stop;
        }
    }

    #[test]
    fn high_volatility_halves_the_risk_fraction() {
        let m = model(0.02, 2.0, true);
        assert!((m.risk_on_high_volatility(3.5) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn calm_volatility_keeps_the_base_fraction() {
        let m = model(0.02, 2.0, true);
        assert!((m.risk_on_high_volatility(1.0) - 0.02).abs() < 1e-12);
        // The threshold itself is not "above".
        assert!((m.risk_on_high_volatility(3.0) - 0.02).abs() < 1e-12);
    }
}
