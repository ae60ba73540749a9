// =============================================================================
// Fetch Scheduler — Chunked, rate-gated quote acquisition with slot isolation
// =============================================================================
//
// A scheduler is bound to one quote source and that source's admission gate
// when it is built.  `fetch_batch` walks the symbol list in fixed-size
// chunks; within a chunk every request runs concurrently, each one
// individually admitted by the gate, so in-flight concurrency is bounded by
// the chunk size while pacing stays the gate's business.
//
// The output always has exactly one slot per input symbol, in input order.
// A slot fails alone: one symbol's timeout or junk payload never disturbs
// its siblings.  The scheduler never retries; the next cycle re-fetches
// everything anyway.
//
// Cancellation is checked between chunks.  Slots whose chunk was never
// dispatched come back as `FetchError::Cancelled`, keeping the one-slot-
// per-symbol shape even for an aborted batch.
// =============================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::errors::FetchError;
use crate::rate_limit::AdmissionGate;
use crate::sources::QuoteSource;
use crate::types::Quote;

pub struct FetchScheduler {
    source: Arc<dyn QuoteSource>,
    gate: Arc<AdmissionGate>,
    chunk_size: usize,
    cancel: Arc<AtomicBool>,
}

impl FetchScheduler {
    /// Bind a scheduler to a source and its admission gate.
    ///
    /// The gate comes out of `RateLimiter::gate(source.name())`, so an
    /// unknown source name has already failed before a scheduler can exist.
    pub fn new(source: Arc<dyn QuoteSource>, gate: Arc<AdmissionGate>, chunk_size: usize) -> Self {
        Self {
            source,
            gate,
            // chunks() panics on zero.
            chunk_size: chunk_size.max(1),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag shared with whoever may need to abort a batch mid-flight.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Fetch a quote for every symbol.
    ///
    /// Returns one result per input symbol, order preserved, length always
    /// equal to the input length.
    pub async fn fetch_batch(&self, symbols: &[String]) -> Vec<Result<Quote, FetchError>> {
        let mut results: Vec<Result<Quote, FetchError>> = Vec::with_capacity(symbols.len());

        for chunk in symbols.chunks(self.chunk_size) {
            if self.cancel.load(Ordering::SeqCst) {
                let remaining = symbols.len() - results.len();
                warn!(
                    source = self.source.name(),
                    remaining, "batch cancelled, marking undispatched slots"
                );
                results.extend((0..remaining).map(|_| Err(FetchError::Cancelled)));
                break;
            }

            debug!(
                source = self.source.name(),
                chunk_len = chunk.len(),
                done = results.len(),
                "dispatching chunk"
            );

            let fetches = chunk.iter().map(|symbol| self.fetch_one(symbol));
            results.extend(join_all(fetches).await);
        }

        results
    }

    async fn fetch_one(&self, symbol: &str) -> Result<Quote, FetchError> {
        self.gate.acquire().await;
        self.source.get_quote(symbol).await
    }
}

impl std::fmt::Debug for FetchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchScheduler")
            .field("source", &self.source.name())
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}
