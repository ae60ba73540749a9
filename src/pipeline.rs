// =============================================================================
// Trade Pipeline — one cycle: quotes -> news -> influence -> signals
// =============================================================================
//
// The orchestrator owns one pass over the symbol universe.  Quotes arrive
// through the chunked scheduler, the whole universe's news arrives in a
// single admission-gated batch call, then each symbol is scored and run
// through the signal engine independently, in input order.
//
// Failure policy: a failed quote slot skips that symbol, a failed news batch
// degrades to an empty map (zero influence can never clear a positive
// sentiment threshold), and neither ever aborts the cycle.  Cycles share no
// state with each other; the stats block is observational only.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::errors::FetchError;
use crate::rate_limit::AdmissionGate;
use crate::scheduler::FetchScheduler;
use crate::sentiment::InfluenceScorer;
use crate::signal_engine::SignalEngine;
use crate::sources::NewsSource;
use crate::types::{CycleStats, NewsItem, TradeSignal};

pub struct TradePipeline {
    scheduler: FetchScheduler,
    news: Arc<dyn NewsSource>,
    news_gate: Arc<AdmissionGate>,
    scorer: InfluenceScorer,
    engine: SignalEngine,
    stats: RwLock<CycleStats>,
}

impl TradePipeline {
    pub fn new(
        scheduler: FetchScheduler,
        news: Arc<dyn NewsSource>,
        news_gate: Arc<AdmissionGate>,
        scorer: InfluenceScorer,
        engine: SignalEngine,
    ) -> Self {
        Self {
            scheduler,
            news,
            news_gate,
            scorer,
            engine,
            stats: RwLock::new(CycleStats::default()),
        }
    }

    /// Run one full cycle over `symbols`.
    ///
    /// Returns the emitted signals in input-symbol order; a symbol with no
    /// entry simply produced no trade this cycle.
    pub async fn run_cycle(&self, symbols: &[String]) -> Vec<TradeSignal> {
        let started = std::time::Instant::now();

        let quotes = self.scheduler.fetch_batch(symbols).await;

        let news_map = match self.fetch_news(symbols).await {
            Ok(map) => map,
            Err(e) => {
                warn!(
                    source = self.news.name(),
                    kind = e.kind(),
                    error = %e,
                    "news batch failed, scoring this cycle with an empty map"
                );
                HashMap::new()
            }
        };

        let now = Utc::now();
        let mut signals = Vec::new();
        let mut quotes_ok = 0usize;
        let mut quotes_failed = 0usize;

        for (symbol, slot) in symbols.iter().zip(&quotes) {
            let quote = match slot {
                Ok(q) => {
                    quotes_ok += 1;
                    q
                }
                Err(e) => {
                    quotes_failed += 1;
                    warn!(symbol = %symbol, kind = e.kind(), error = %e, "quote unavailable, skipping symbol");
                    continue;
                }
            };

            let items = news_map
                .get(symbol)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let influence = self.scorer.score(symbol, items, now);

            if let Some(signal) = self.engine.generate(quote, influence) {
                signals.push(signal);
            }
        }

        let stats = {
            let mut guard = self.stats.write();
            guard.sequence += 1;
            guard.quotes_ok = quotes_ok;
            guard.quotes_failed = quotes_failed;
            guard.news_symbols = news_map.len();
            guard.signals_emitted = signals.len();
            guard.duration_ms = started.elapsed().as_millis() as u64;
            guard.clone()
        };

        info!(
            sequence = stats.sequence,
            quotes_ok = stats.quotes_ok,
            quotes_failed = stats.quotes_failed,
            news_symbols = stats.news_symbols,
            signals = stats.signals_emitted,
            duration_ms = stats.duration_ms,
            "cycle complete"
        );

        signals
    }

    /// Snapshot of the last completed cycle's counters.
    pub fn stats(&self) -> CycleStats {
        self.stats.read().clone()
    }

    async fn fetch_news(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, Vec<NewsItem>>, FetchError> {
        self.news_gate.acquire().await;
        self.news.get_news(symbols).await
    }
}

impl std::fmt::Debug for TradePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradePipeline")
            .field("scheduler", &self.scheduler)
            .field("news", &self.news.name())
            .finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::rate_limit::RateLimiter;
    use crate::sentiment::LexiconClassifier;
    use crate::sources::QuoteSource;
    use crate::types::{Candle, Quote};
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;

    /// Quote source with a fixed book; symbols in `failing` error out.
    struct BookSource {
        failing: Vec<String>,
    }

    #[async_trait]
    impl QuoteSource for BookSource {
        fn name(&self) -> &str {
            "finnhub"
        }

        async fn get_quote(&self, symbol: &str) -> Result<Quote, FetchError> {
            if self.failing.iter().any(|f| f == symbol) {
                return Err(FetchError::Transient(format!("{symbol} unreachable")));
            }
            // Close enough to the session high to pass the breakout check.
            Ok(Quote {
                symbol: symbol.to_string(),
                current_price: 100.0,
                high_price: 102.0,
                low_price: 95.0,
                previous_close: Some(99.0),
            })
        }

        async fn get_candles(
            &self,
            _symbol: &str,
            _resolution: &str,
            _from: i64,
            _to: i64,
        ) -> Result<Vec<Candle>, FetchError> {
            Ok(vec![])
        }
    }

    /// News source that serves a canned map, or fails every call.
    struct CannedNews {
        map: HashMap<String, Vec<NewsItem>>,
        fail: bool,
    }

    #[async_trait]
    impl NewsSource for CannedNews {
        fn name(&self) -> &str {
            "alpha_vantage"
        }

        async fn get_news(
            &self,
            _symbols: &[String],
        ) -> Result<HashMap<String, Vec<NewsItem>>, FetchError> {
            if self.fail {
                return Err(FetchError::Transient("news upstream down".to_string()));
            }
            Ok(self.map.clone())
        }
    }

    /// Fresh, credible, positive item that scores 80 with the lexicon:
    /// strength 1.0 x recency 1.0 x credibility 1.0 x impact 0.8.
    fn strong_item(symbol: &str) -> NewsItem {
        NewsItem {
            headline: "Record earnings beat expectations as profit surges".to_string(),
            source: "Reuters".to_string(),
            published_at: Utc::now() - ChronoDuration::hours(1),
            symbol: symbol.to_string(),
        }
    }

    fn pipeline(failing: &[&str], news: CannedNews) -> TradePipeline {
        let config = EngineConfig::default();
        let limiter = RateLimiter::new(&config.rate_budgets).unwrap();

        let source = Arc::new(BookSource {
            failing: failing.iter().map(|s| s.to_string()).collect(),
        });
        let scheduler = FetchScheduler::new(
            source,
            limiter.gate("finnhub").unwrap(),
            config.chunk_size,
        );

        TradePipeline::new(
            scheduler,
            Arc::new(news),
            limiter.gate("alpha_vantage").unwrap(),
            InfluenceScorer::new(Arc::new(LexiconClassifier::default()), &config),
            SignalEngine::new(&config),
        )
    }

    fn universe(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn signals_come_back_in_input_symbol_order() {
        let mut map = HashMap::new();
        map.insert("AAPL".to_string(), vec![strong_item("AAPL")]);
        map.insert("GOOGL".to_string(), vec![strong_item("GOOGL")]);

        let p = pipeline(&[], CannedNews { map, fail: false });
        let signals = p
            .run_cycle(&universe(&["AAPL", "MSFT", "GOOGL"]))
            .await;

        // MSFT has no news: influence 0 cannot clear the threshold.
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].symbol, "AAPL");
        assert_eq!(signals[1].symbol, "GOOGL");
    }

    #[tokio::test(start_paused = true)]
    async fn news_batch_failure_degrades_to_a_quiet_cycle() {
        let p = pipeline(
            &[],
            CannedNews {
                map: HashMap::new(),
                fail: true,
            },
        );
        let signals = p.run_cycle(&universe(&["AAPL", "MSFT"])).await;

        assert!(signals.is_empty());
        let stats = p.stats();
        assert_eq!(stats.quotes_ok, 2);
        assert_eq!(stats.signals_emitted, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_quote_slot_skips_only_that_symbol() {
        let mut map = HashMap::new();
        map.insert("AAPL".to_string(), vec![strong_item("AAPL")]);
        map.insert("MSFT".to_string(), vec![strong_item("MSFT")]);

        let p = pipeline(&["AAPL"], CannedNews { map, fail: false });
        let signals = p.run_cycle(&universe(&["AAPL", "MSFT"])).await;

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].symbol, "MSFT");

        let stats = p.stats();
        assert_eq!(stats.quotes_ok, 1);
        assert_eq!(stats.quotes_failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stats_track_the_latest_cycle_and_sequence() {
        let p = pipeline(
            &[],
            CannedNews {
                map: HashMap::new(),
                fail: false,
            },
        );

        p.run_cycle(&universe(&["AAPL"])).await;
        p.run_cycle(&universe(&["AAPL", "MSFT"])).await;

        let stats = p.stats();
        assert_eq!(stats.sequence, 2);
        assert_eq!(stats.quotes_ok, 2);
        assert_eq!(stats.news_symbols, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_universe_is_a_no_op_cycle() {
        let p = pipeline(
            &[],
            CannedNews {
                map: HashMap::new(),
                fail: false,
            },
        );
        let signals = p.run_cycle(&[]).await;
        assert!(signals.is_empty());
        assert_eq!(p.stats().sequence, 1);
    }
}
