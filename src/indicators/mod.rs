// =============================================================================
// Indicators Module
// =============================================================================
//
// Pure volatility math over candle slices.  Everything here returns
// `Option<f64>`: a caller that cannot produce enough clean history gets
// `None`, never a guessed number.

pub mod atr;
