// =============================================================================
// Alpha Vantage news client — batched NEWS_SENTIMENT feed
// =============================================================================
//
// SECURITY: the API key travels in the query string, so request URLs are
// never logged.
//
// One request covers every symbol in the cycle: NEWS_SENTIMENT accepts a
// comma-joined `tickers` list and tags each feed entry with the tickers it
// mentions. Throttle responses arrive as HTTP 200 with a "Note" or
// "Information" body instead of a feed, and are surfaced as transient.
// =============================================================================

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::errors::FetchError;
use crate::sources::NewsSource;
use crate::types::NewsItem;

/// Timestamp layout of the feed's `time_published` field.
const TIME_PUBLISHED_FORMAT: &str = "%Y%m%dT%H%M%S";

/// News provider backed by the Alpha Vantage NEWS_SENTIMENT endpoint.
#[derive(Clone)]
pub struct AlphaVantageNews {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl AlphaVantageNews {
    /// Key under which this source's rate budget is configured.
    pub const NAME: &'static str = "alpha_vantage";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://www.alphavantage.co".to_string(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("failed to build reqwest client for AlphaVantageNews"),
        }
    }

    /// Create a client that re-uses an existing HTTP client.
    pub fn with_client(api_key: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://www.alphavantage.co".to_string(),
            client,
        }
    }
}

#[async_trait]
impl NewsSource for AlphaVantageNews {
    fn name(&self) -> &str {
        Self::NAME
    }

    /// GET /query?function=NEWS_SENTIMENT — one batched call for all symbols.
    #[instrument(skip(self, symbols), fields(requested = symbols.len()), name = "alpha_vantage::get_news")]
    async fn get_news(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, Vec<NewsItem>>, FetchError> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        let url = format!(
            "{}/query?function=NEWS_SENTIMENT&tickers={}&apikey={}",
            self.base_url,
            symbols.join(","),
            self.api_key
        );

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Transient(format!(
                "alpha vantage NEWS_SENTIMENT returned {status}"
            )));
        }

        let body: Value = resp.json().await?;
        let by_symbol = parse_feed(symbols, &body)?;

        debug!(
            covered = by_symbol.len(),
            items = by_symbol.values().map(Vec::len).sum::<usize>(),
            "news feed fetched"
        );
        Ok(by_symbol)
    }
}

impl std::fmt::Debug for AlphaVantageNews {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlphaVantageNews")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Payload parsing
// -----------------------------------------------------------------------------

/// Fan a NEWS_SENTIMENT payload out into per-symbol item lists.
///
/// Feed entries tagged with several requested tickers are attributed to each
/// of them. Entries missing a title or carrying an unparseable timestamp are
/// skipped; unrequested tickers are ignored.
fn parse_feed(
    symbols: &[String],
    body: &Value,
) -> Result<HashMap<String, Vec<NewsItem>>, FetchError> {
    let feed = match body["feed"].as_array() {
        Some(feed) => feed,
        None => {
            // Throttling and plan limits come back as 200 with an explanatory
            // note instead of a feed.
            if body.get("Note").is_some() || body.get("Information").is_some() {
                return Err(FetchError::Transient(
                    "alpha vantage throttled the NEWS_SENTIMENT request".to_string(),
                ));
            }
            if let Some(msg) = body["Error Message"].as_str() {
                return Err(FetchError::Data(format!("alpha vantage error: {msg}")));
            }
            return Err(FetchError::Data(
                "NEWS_SENTIMENT response is missing its 'feed' array".to_string(),
            ));
        }
    };

    let requested: HashSet<&str> = symbols.iter().map(String::as_str).collect();
    let mut by_symbol: HashMap<String, Vec<NewsItem>> = HashMap::new();

    for entry in feed {
        let headline = match entry["title"].as_str() {
            Some(t) => t,
            None => {
                warn!("skipping feed entry without a title");
                continue;
            }
        };

        let published_at = match entry["time_published"]
            .as_str()
            .and_then(|raw| NaiveDateTime::parse_from_str(raw, TIME_PUBLISHED_FORMAT).ok())
        {
            Some(naive) => naive.and_utc(),
            None => {
                warn!(headline, "skipping feed entry with an unusable timestamp");
                continue;
            }
        };

        let source = entry["source"].as_str().unwrap_or("Unknown");

        let tickers = entry["ticker_sentiment"].as_array();
        for tagged in tickers.into_iter().flatten() {
            let Some(ticker) = tagged["ticker"].as_str() else {
                continue;
            };
            if !requested.contains(ticker) {
                continue;
            }
            by_symbol
                .entry(ticker.to_string())
                .or_default()
                .push(NewsItem {
                    headline: headline.to_string(),
                    source: source.to_string(),
                    published_at,
                    symbol: ticker.to_string(),
                });
        }
    }

    Ok(by_symbol)
}
