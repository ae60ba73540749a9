// =============================================================================
// Volatility Indicator — Wilder's Average True Range
// =============================================================================
//
// The risk model prices stops and position sizes in ATR units, so this is
// the one indicator the engine carries.  True range folds overnight gaps
// into the bar-to-bar move:
//
//   TR  = max(high - low, |high - prev_close|, |low - prev_close|)
//   ATR = mean of the first `period` TRs, then Wilder-smoothed:
//         ATR' = (ATR * (period - 1) + TR) / period
// =============================================================================

use crate::types::Candle;

/// True range of `bar` against the previous bar's close.
fn true_range(prev_close: f64, bar: &Candle) -> f64 {
    let range = bar.high - bar.low;
    let up_gap = (bar.high - prev_close).abs();
    let down_gap = (bar.low - prev_close).abs();
    range.max(up_gap).max(down_gap)
}

/// Latest ATR over `candles` (oldest bar first) with Wilder smoothing.
///
/// Needs `period + 1` bars; the extra one supplies the previous close for
/// the first true range.  Returns `None` for a zero period, a short slice,
/// or junk prices anywhere in the window.  `f64::max` ignores NaN operands,
/// so prices are validated up front rather than after the fold.
pub fn calculate_atr(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }
    if candles
        .iter()
        .any(|c| !(c.high.is_finite() && c.low.is_finite() && c.close.is_finite()))
    {
        return None;
    }

    let trs: Vec<f64> = candles
        .windows(2)
        .map(|pair| true_range(pair[0].close, &pair[1]))
        .collect();

    let period_f = period as f64;
    let seed = trs[..period].iter().sum::<f64>() / period_f;
    let atr = trs[period..]
        .iter()
        .fold(seed, |atr, &tr| (atr * (period_f - 1.0) + tr) / period_f);

    // Finite inputs can still overflow to infinity on absurd price spans.
    atr.is_finite().then_some(atr)
}

/// ATR as a percentage of the latest close, comparable across price scales.
/// This is the `market_volatility` input to the risk model's haircut.
pub fn calculate_atr_pct(candles: &[Candle], period: usize) -> Option<f64> {
    let atr = calculate_atr(candles, period)?;
    let last_close = candles.last()?.close;
    if last_close == 0.0 {
        return None;
    }
    Some(atr / last_close * 100.0)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn bar(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp: 0,
            open,
            high,
            low,
            close,
            volume: 1_000_000.0,
        }
    }

    #[test]
    fn zero_period_yields_nothing() {
        let bars = vec![bar(100.0, 105.0, 95.0, 102.0); 20];
        assert!(calculate_atr(&bars, 0).is_none());
    }

    #[test]
    fn short_history_yields_nothing() {
        // period 14 needs 15 bars.
        let bars = vec![bar(100.0, 105.0, 95.0, 102.0); 14];
        assert!(calculate_atr(&bars, 14).is_none());
    }

    #[test]
    fn seed_is_the_mean_true_range() {
        // True ranges work out to 4, 5, 6 with no smoothing bars left over.
        let bars = vec![
            bar(100.0, 102.0, 98.0, 100.0),
            bar(100.0, 103.0, 99.0, 102.0),
            bar(102.0, 106.0, 101.0, 105.0),
            bar(105.0, 108.0, 102.0, 107.0),
        ];
        let atr = calculate_atr(&bars, 3).unwrap();
        assert!((atr - 5.0).abs() < 1e-9);
    }

    #[test]
    fn wilder_smoothing_blends_in_later_bars() {
        // Seed is 5.0 over the first three true ranges, the extra bar adds
        // a TR of 6, so the smoothed value is (5.0 * 2 + 6) / 3.
        let bars = vec![
            bar(100.0, 102.0, 98.0, 100.0),
            bar(100.0, 103.0, 99.0, 102.0),
            bar(102.0, 106.0, 101.0, 105.0),
            bar(105.0, 108.0, 102.0, 107.0),
            bar(107.0, 110.0, 104.0, 109.0),
        ];
        let atr = calculate_atr(&bars, 3).unwrap();
        assert!((atr - 16.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn overnight_gap_widens_the_true_range() {
        // Second bar gaps up: |115 - 95| = 20 dwarfs its 7-point intraday
        // range, and the seed mean carries it: (20 + 4 + 4) / 3.
        let bars = vec![
            bar(100.0, 105.0, 95.0, 95.0),
            bar(110.0, 115.0, 108.0, 112.0),
            bar(112.0, 114.0, 110.0, 113.0),
            bar(113.0, 115.0, 111.0, 114.0),
        ];
        let atr = calculate_atr(&bars, 3).unwrap();
        assert!((atr - 28.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn flat_tape_reports_its_constant_range() {
        // Every bar spans 10 points and closes mid-range, so TR never moves
        // and smoothing cannot drift off it.
        let bars = vec![bar(200.0, 205.0, 195.0, 200.0); 9];
        let atr = calculate_atr(&bars, 4).unwrap();
        assert!((atr - 10.0).abs() < 1e-9);
    }

    #[test]
    fn nan_price_anywhere_in_the_window_yields_nothing() {
        let mut bars = vec![bar(100.0, 105.0, 95.0, 100.0); 6];
        bars[2].low = f64::NAN;
        assert!(calculate_atr(&bars, 4).is_none());
    }

    #[test]
    fn atr_pct_is_atr_over_the_last_close() {
        // ATR 10 on a 200 close reads as 5 percent.
        let bars = vec![bar(200.0, 205.0, 195.0, 200.0); 9];
        let pct = calculate_atr_pct(&bars, 4).unwrap();
        assert!((pct - 5.0).abs() < 1e-9);
    }

    #[test]
    fn atr_pct_refuses_a_zero_close() {
        let mut bars = vec![bar(200.0, 205.0, 195.0, 200.0); 9];
        bars[8].close = 0.0;
        assert!(calculate_atr_pct(&bars, 4).is_none());
    }
}
