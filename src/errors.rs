// =============================================================================
// Error taxonomy for the Meridian signal engine
// =============================================================================
//
// Three families, three lifetimes:
//   FetchError          — per-slot acquisition failure, never fatal to a cycle
//   ConfigError         — construction-time validation failure, always fatal
//   ZeroVolatilityError — value-level sizing refusal, caller skips the symbol
// =============================================================================

use thiserror::Error;

/// Failure of a single quote, candle, or news acquisition.
///
/// A `FetchError` is always scoped to one slot of a batch: the surrounding
/// cycle keeps its remaining results and the next cycle re-fetches everything
/// anyway, so nothing here is retried in place.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level failure: connect error, timeout, or a non-2xx status.
    #[error("transient upstream failure: {0}")]
    Transient(String),

    /// The upstream answered but the payload was unusable: missing fields,
    /// unparseable numbers, or a shape we do not recognise.
    #[error("malformed upstream payload: {0}")]
    Data(String),

    /// The batch was cancelled before this slot was dispatched.
    #[error("batch cancelled before dispatch")]
    Cancelled,
}

impl FetchError {
    /// True when waiting for the next cycle could plausibly succeed without
    /// any change on our side.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Short tag for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transient(_) => "transient",
            Self::Data(_) => "data",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        // Body-decode failures mean the upstream answered with junk; anything
        // else (connect, timeout, status) is weather.
        if e.is_decode() {
            Self::Data(e.to_string())
        } else {
            Self::Transient(e.to_string())
        }
    }
}

/// Invalid engine configuration.
///
/// Raised while wiring the engine together in `main`. The process refuses to
/// start rather than run with a budget or threshold it cannot honour.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A component asked for a rate budget no source defines.
    #[error("unknown data source '{0}' (no rate budget configured)")]
    UnknownSource(String),

    /// requests_per_minute of zero would make the admission interval infinite.
    // The raw identifier keeps thiserror from treating this field as the
    // error's source(); it holds a data-source name, not an error cause.
    #[error("rate budget for '{source}' must be positive")]
    NonPositiveRate { r#source: String },

    /// A numeric field fell outside its documented range.
    #[error("{field} must be within {min}..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    /// A required list or string field was empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// An ATR of zero (or junk) makes the risk-per-share denominator
/// meaningless. The caller skips sizing for that symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("ATR is zero or invalid; refusing to size the position")]
pub struct ZeroVolatilityError;
