// =============================================================================
// Influence Scorer — Fuses news sentiment into a bounded 0-100 score
// =============================================================================
//
// Per symbol and cycle, each usable news item is scored as
//
//   strength * recency * credibility * impact * 100
//
// and the per-item scores are averaged.  Strength comes from the sentiment
// classifier; recency decays linearly to zero over the configured window;
// credibility is binary (known publisher or not); impact is higher for
// earnings coverage.
//
// Items are dropped before scoring in exactly two cases: an empty headline
// (nothing to classify) and a high-risk term match (litigation and
// regulatory landmines disqualify a headline outright).  Everything else
// counts toward the mean, including items old enough to score zero; a wave
// of stale news dilutes, it does not excite.
//
// The scorer holds no mutable state.  Given the same items, clock, and
// classifier it always produces the same score.
// =============================================================================

pub mod classifier;

pub use classifier::{LexiconClassifier, SentimentClassifier};

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::types::NewsItem;

pub struct InfluenceScorer {
    classifier: Arc<dyn SentimentClassifier>,
    decay_window_days: i64,
    /// Lower-cased at construction; matched against lower-cased headlines.
    high_risk_terms: Vec<String>,
    credible_sources: HashSet<String>,
}

impl InfluenceScorer {
    pub fn new(classifier: Arc<dyn SentimentClassifier>, config: &EngineConfig) -> Self {
        Self {
            classifier,
            decay_window_days: config.decay_window_days,
            high_risk_terms: config
                .high_risk_terms
                .iter()
                .map(|t| t.to_lowercase())
                .collect(),
            credible_sources: config.credible_sources.iter().cloned().collect(),
        }
    }

    /// Trade influence of `items` on `symbol` at time `now`, in [0, 100].
    ///
    /// No news means no influence: an empty or fully-filtered set scores 0.
    pub fn score(&self, symbol: &str, items: &[NewsItem], now: DateTime<Utc>) -> f64 {
        let mut item_scores: Vec<f64> = Vec::with_capacity(items.len());

        for item in items {
            if item.headline.trim().is_empty() {
                debug!(symbol, source = %item.source, "skipping news item with empty headline");
                continue;
            }

            let lowered = item.headline.to_lowercase();
            if let Some(term) = self
                .high_risk_terms
                .iter()
                .find(|term| lowered.contains(term.as_str()))
            {
                warn!(
                    symbol,
                    term = %term,
                    headline = %item.headline,
                    "filtered high-risk news"
                );
                continue;
            }

            let strength = self.classifier.classify(&item.headline);

            let age_days = (now - item.published_at).num_days();
            // Future-dated items clamp to full weight; the 0-100 bound must
            // hold for any input timestamps.
            let recency =
                (1.0 - age_days as f64 / self.decay_window_days as f64).clamp(0.0, 1.0);

            let credibility = if self.credible_sources.contains(&item.source) {
                1.0
            } else {
                0.5
            };

            let impact = if lowered.contains("earnings") { 0.8 } else { 0.5 };

            item_scores.push(strength * recency * credibility * impact * 100.0);
        }

        if item_scores.is_empty() {
            return 0.0;
        }

        let mean = item_scores.iter().sum::<f64>() / item_scores.len() as f64;
        (mean * 100.0).round() / 100.0
    }
}

impl std::fmt::Debug for InfluenceScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluenceScorer")
            .field("decay_window_days", &self.decay_window_days)
            .field("high_risk_terms", &self.high_risk_terms.len())
            .field("credible_sources", &self.credible_sources.len())
            .finish()
    }
}
