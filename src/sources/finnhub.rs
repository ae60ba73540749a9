// =============================================================================
// Finnhub REST client — real-time quotes and historical candles
// =============================================================================
//
// SECURITY: the API token travels in the query string, so request URLs are
// never logged. Structured log fields carry the symbol and counts only.
//
// Upstream quirks handled here so callers never see them:
//   * Unknown symbols come back as HTTP 200 with an all-zero quote.
//   * /stock/candle reports its own status in the payload ("ok" / "no_data")
//     and delivers bars as parallel arrays keyed t/o/h/l/c/v.
// =============================================================================

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::errors::FetchError;
use crate::sources::QuoteSource;
use crate::types::{Candle, Quote};

/// Quote and candle provider backed by the Finnhub REST API.
#[derive(Clone)]
pub struct FinnhubQuotes {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl FinnhubQuotes {
    /// Key under which this source's rate budget is configured.
    pub const NAME: &'static str = "finnhub";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://finnhub.io/api/v1".to_string(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("failed to build reqwest client for FinnhubQuotes"),
        }
    }

    /// Create a client that re-uses an existing HTTP client.
    pub fn with_client(api_key: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://finnhub.io/api/v1".to_string(),
            client,
        }
    }
}

#[async_trait]
impl QuoteSource for FinnhubQuotes {
    fn name(&self) -> &str {
        Self::NAME
    }

    /// GET /quote — latest price snapshot for one symbol.
    #[instrument(skip(self), name = "finnhub::get_quote")]
    async fn get_quote(&self, symbol: &str) -> Result<Quote, FetchError> {
        let url = format!(
            "{}/quote?symbol={}&token={}",
            self.base_url, symbol, self.api_key
        );

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Transient(format!(
                "finnhub GET /quote for {symbol} returned {status}"
            )));
        }

        let body: Value = resp.json().await?;
        let quote = parse_quote(symbol, &body)?;

        debug!(
            symbol,
            current = quote.current_price,
            high = quote.high_price,
            low = quote.low_price,
            "quote fetched"
        );
        Ok(quote)
    }

    /// GET /stock/candle — OHLCV bars for one symbol, oldest first.
    #[instrument(skip(self), name = "finnhub::get_candles")]
    async fn get_candles(
        &self,
        symbol: &str,
        resolution: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<Candle>, FetchError> {
        let url = format!(
            "{}/stock/candle?symbol={}&resolution={}&from={}&to={}&token={}",
            self.base_url, symbol, resolution, from, to, self.api_key
        );

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Transient(format!(
                "finnhub GET /stock/candle for {symbol} returned {status}"
            )));
        }

        let body: Value = resp.json().await?;
        let candles = parse_candles(symbol, &body)?;

        debug!(symbol, resolution, count = candles.len(), "candles fetched");
        Ok(candles)
    }
}

impl std::fmt::Debug for FinnhubQuotes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinnhubQuotes")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Payload parsing
// -----------------------------------------------------------------------------

/// Parse a /quote payload: c = current, h = session high, l = session low,
/// pc = previous close (optional).
fn parse_quote(symbol: &str, body: &Value) -> Result<Quote, FetchError> {
    let current_price = require_f64(body, "c")?;
    let high_price = require_f64(body, "h")?;
    let low_price = require_f64(body, "l")?;

    // Finnhub answers unknown symbols with HTTP 200 and an all-zero quote.
    if current_price == 0.0 {
        return Err(FetchError::Data(format!(
            "finnhub returned a zero quote for {symbol} (unknown symbol?)"
        )));
    }

    let previous_close = body["pc"].as_f64().filter(|v| *v > 0.0);

    Ok(Quote {
        symbol: symbol.to_string(),
        current_price,
        high_price,
        low_price,
        previous_close,
    })
}

/// Parse a /stock/candle payload into bars, preserving upstream order.
fn parse_candles(symbol: &str, body: &Value) -> Result<Vec<Candle>, FetchError> {
    match body["s"].as_str() {
        Some("ok") => {}
        Some("no_data") => return Ok(Vec::new()),
        Some(other) => {
            return Err(FetchError::Data(format!(
                "finnhub candle status '{other}' for {symbol}"
            )))
        }
        None => {
            return Err(FetchError::Data(format!(
                "finnhub candle response for {symbol} is missing its status field"
            )))
        }
    }

    let timestamps = i64_series(body, "t")?;
    let opens = f64_series(body, "o")?;
    let highs = f64_series(body, "h")?;
    let lows = f64_series(body, "l")?;
    let closes = f64_series(body, "c")?;
    let volumes = f64_series(body, "v")?;

    let n = timestamps.len();
    if [&opens, &highs, &lows, &closes, &volumes]
        .iter()
        .any(|s| s.len() != n)
    {
        return Err(FetchError::Data(format!(
            "finnhub candle series for {symbol} have mismatched lengths"
        )));
    }

    let mut candles = Vec::with_capacity(n);
    for i in 0..n {
        candles.push(Candle {
            timestamp: timestamps[i],
            open: opens[i],
            high: highs[i],
            low: lows[i],
            close: closes[i],
            volume: volumes[i],
        });
    }
    Ok(candles)
}

fn require_f64(body: &Value, key: &'static str) -> Result<f64, FetchError> {
    body[key]
        .as_f64()
        .ok_or_else(|| FetchError::Data(format!("quote response is missing '{key}'")))
}

fn f64_series(body: &Value, key: &'static str) -> Result<Vec<f64>, FetchError> {
    let arr = body[key].as_array().ok_or_else(|| {
        FetchError::Data(format!("candle response is missing the '{key}' series"))
    })?;
    arr.iter()
        .map(|v| {
            v.as_f64().ok_or_else(|| {
                FetchError::Data(format!("candle series '{key}' holds a non-numeric value"))
            })
        })
        .collect()
}

fn i64_series(body: &Value, key: &'static str) -> Result<Vec<i64>, FetchError> {
    let arr = body[key].as_array().ok_or_else(|| {
        FetchError::Data(format!("candle response is missing the '{key}' series"))
    })?;
    arr.iter()
        .map(|v| {
            v.as_i64().ok_or_else(|| {
                FetchError::Data(format!("candle series '{key}' holds a non-integer value"))
            })
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quote_payload_parses_all_fields() {
        let body = json!({"c": 261.74, "h": 263.31, "l": 260.68, "o": 261.07, "pc": 259.45});
        let q = parse_quote("AAPL", &body).unwrap();
        assert_eq!(q.symbol, "AAPL");
        assert_eq!(q.current_price, 261.74);
        assert_eq!(q.high_price, 263.31);
        assert_eq!(q.low_price, 260.68);
        assert_eq!(q.previous_close, Some(259.45));
    }

    #[test]
    fn zero_quote_is_a_data_error() {
        let body = json!({"c": 0.0, "h": 0.0, "l": 0.0, "pc": 0.0});
        let err = parse_quote("NOSUCH", &body).unwrap_err();
        assert!(matches!(err, FetchError::Data(_)));
        assert!(err.to_string().contains("NOSUCH"));
    }

    #[test]
    fn missing_quote_field_is_a_data_error() {
        let body = json!({"c": 100.0, "l": 95.0});
        let err = parse_quote("AAPL", &body).unwrap_err();
        assert!(matches!(err, FetchError::Data(_)));
        assert!(err.to_string().contains("'h'"));
    }

    #[test]
    fn zero_previous_close_maps_to_none() {
        let body = json!({"c": 100.0, "h": 101.0, "l": 99.0, "pc": 0.0});
        let q = parse_quote("AAPL", &body).unwrap();
        assert!(q.previous_close.is_none());
    }

    #[test]
    fn candle_payload_parses_in_upstream_order() {
        let body = json!({
            "s": "ok",
            "t": [1_700_000_000i64, 1_700_086_400i64],
            "o": [100.0, 102.0],
            "h": [103.0, 104.0],
            "l": [99.0, 101.0],
            "c": [102.0, 103.5],
            "v": [1_000_000.0, 1_200_000.0],
        });
        let candles = parse_candles("AAPL", &body).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].timestamp, 1_700_000_000);
        assert_eq!(candles[0].close, 102.0);
        assert_eq!(candles[1].high, 104.0);
        assert_eq!(candles[1].volume, 1_200_000.0);
    }

    #[test]
    fn candle_no_data_is_an_empty_vec() {
        let body = json!({"s": "no_data"});
        assert!(parse_candles("AAPL", &body).unwrap().is_empty());
    }

    #[test]
    fn candle_error_status_is_a_data_error() {
        let body = json!({"s": "error"});
        assert!(matches!(
            parse_candles("AAPL", &body),
            Err(FetchError::Data(_))
        ));
    }

    #[test]
    fn candle_series_length_mismatch_is_a_data_error() {
        let body = json!({
            "s": "ok",
            "t": [1_700_000_000i64, 1_700_086_400i64],
            "o": [100.0],
            "h": [103.0, 104.0],
            "l": [99.0, 101.0],
            "c": [102.0, 103.5],
            "v": [1_000_000.0, 1_200_000.0],
        });
        let err = parse_candles("AAPL", &body).unwrap_err();
        assert!(matches!(err, FetchError::Data(_)));
        assert!(err.to_string().contains("mismatched"));
    }
}
