// =============================================================================
// Upstream data sources — collaborator traits and concrete clients
// =============================================================================
//
// The engine core only ever sees these two traits.  HTTP transport,
// credentials, payload shapes, and upstream quirks stay inside the concrete
// clients; a failed call surfaces as a `FetchError` and nothing else.
// =============================================================================

pub mod alpha_vantage;
pub mod finnhub;

pub use alpha_vantage::AlphaVantageNews;
pub use finnhub::FinnhubQuotes;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::FetchError;
use crate::types::{Candle, NewsItem, Quote};

/// Real-time quote provider.
///
/// `name` is the key under which the source's rate budget is configured;
/// components resolve their admission gate with it at construction time.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn name(&self) -> &str;

    /// Latest quote for one symbol, parsed and validated.
    async fn get_quote(&self, symbol: &str) -> Result<Quote, FetchError>;

    /// Historical OHLCV bars for one symbol, oldest first.
    ///
    /// `resolution` uses the upstream's notation ("D" for daily);
    /// `from`/`to` are unix-second bounds, inclusive.
    async fn get_candles(
        &self,
        symbol: &str,
        resolution: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<Candle>, FetchError>;
}

/// Batched news provider.
#[async_trait]
pub trait NewsSource: Send + Sync {
    fn name(&self) -> &str;

    /// News items for each requested symbol.  Symbols without coverage are
    /// simply absent from the map; that is data, not an error.
    async fn get_news(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, Vec<NewsItem>>, FetchError>;
}
