// =============================================================================
// Sentiment Classifier — Binary headline polarity from a financial lexicon
// =============================================================================
//
// The scorer needs one number per headline: how positive the text reads,
// in [0, 1].  The default implementation counts hits against two fixed
// financial word lists and returns positive / (positive + negative), with
// 0.5 for text that touches neither list.
//
// The trait is the seam for swapping in an external model service; nothing
// upstream of it knows or cares how the number was produced.
// =============================================================================

use std::collections::HashSet;

/// Binary sentiment over a piece of text.  Implementations must be
/// stateless across calls; the scorer treats them as pure.
pub trait SentimentClassifier: Send + Sync {
    /// Positivity of `text` in [0, 1]; 0.5 means neutral or unknown.
    fn classify(&self, text: &str) -> f64;
}

/// Deterministic lexicon-based classifier used as the default.
pub struct LexiconClassifier {
    positive_words: HashSet<&'static str>,
    negative_words: HashSet<&'static str>,
}

impl LexiconClassifier {
    pub fn new() -> Self {
        Self {
            positive_words: Self::build_positive_lexicon(),
            negative_words: Self::build_negative_lexicon(),
        }
    }

    /// Count lexicon hits over the tokenized text.  Tokens are lowercased
    /// and stripped of surrounding punctuation so "Profits," still matches.
    fn count_hits(&self, text: &str, lexicon: &HashSet<&'static str>) -> usize {
        text.split_whitespace()
            .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|token| !token.is_empty())
            .filter(|token| lexicon.contains(token.to_lowercase().as_str()))
            .count()
    }

    /// Build positive word lexicon
    fn build_positive_lexicon() -> HashSet<&'static str> {
        [
            // Growth and performance
            "growth", "growing", "grew", "surge", "surges", "surged", "rally",
            "rallies", "rallied", "gain", "gains", "gained", "rise", "rises",
            "rose", "jump", "jumps", "jumped", "soar", "soars", "soared",
            "climb", "climbs", "climbed", "record", "beat", "beats",
            "exceeded", "surpassed", "outperformed", "strong", "stronger",
            "robust", "solid",
            // Financial positives
            "profit", "profits", "profitable", "upgrade", "upgraded",
            "upside", "raise", "raised", "boost", "boosts", "boosted",
            "dividend", "buyback", "expansion", "expands", "breakthrough",
            // Outlook
            "optimistic", "bullish", "positive", "momentum", "opportunity",
            "success", "successful", "wins", "won", "approval", "approved",
        ]
        .into_iter()
        .collect()
    }

    /// Build negative word lexicon
    fn build_negative_lexicon() -> HashSet<&'static str> {
        [
            // Decline indicators
            "decline", "declines", "declined", "drop", "drops", "dropped",
            "fall", "falls", "fell", "plunge", "plunges", "plunged", "slump",
            "slumps", "slumped", "tumble", "tumbles", "tumbled", "sink",
            "sinks", "sank", "slide", "slides", "slid", "crash", "crashes",
            "crashed", "weak", "weaker", "weakness",
            // Financial negatives
            "loss", "losses", "miss", "missed", "misses", "shortfall",
            "downgrade", "downgraded", "downside", "cut", "cuts", "layoff",
            "layoffs", "bankruptcy", "default", "recall", "recalls", "probe",
            "fine", "fined", "penalty", "warning", "warns", "warned",
            // Outlook
            "pessimistic", "bearish", "negative", "concern", "concerns",
            "fear", "fears", "risk", "risks", "uncertainty", "slowdown",
            "recession", "disappointing", "disappointed", "struggles",
            "struggling",
        ]
        .into_iter()
        .collect()
    }
}

impl SentimentClassifier for LexiconClassifier {
    fn classify(&self, text: &str) -> f64 {
        let positive = self.count_hits(text, &self.positive_words);
        let negative = self.count_hits(text, &self.negative_words);

        if positive + negative == 0 {
            return 0.5;
        }
        positive as f64 / (positive + negative) as f64
    }
}

impl Default for LexiconClassifier {
    fn default() -> Self {
        Self::new()
    }
}
