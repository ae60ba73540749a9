// =============================================================================
// Rate Limiter — Per-source admission gates with uniform request spacing
// =============================================================================
//
// Every upstream source gets its own admission gate sized from its
// requests-per-minute budget:
//
//   min_interval = 60s / requests_per_minute
//
// A gate admits callers one at a time, never closer together than
// min_interval, in strict arrival order.  There is no burst credit: a gate
// that sat idle for an hour still spaces the next two callers a full
// interval apart.  Gates are independent, so two sources never delay each
// other.
//
// `acquire` only ever delays.  All failure modes (unknown source, zero
// budget) are construction-time configuration errors.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::errors::ConfigError;

/// Receipt for one admitted request.
///
/// Pacing is enforced at admission; dropping a permit releases nothing.
#[derive(Debug, Clone, Copy)]
pub struct Permit {
    /// When the gate let this request through.
    pub admitted_at: Instant,
}

/// Serialization point for one upstream source.
///
/// The mutex is held across the pacing sleep.  That is the point: the next
/// caller cannot even inspect the gate until the current one has been
/// admitted, which combined with the mutex's fair queueing gives strict
/// FIFO admission.
pub struct AdmissionGate {
    source: String,
    min_interval: Duration,
    last_admitted: Mutex<Option<Instant>>,
}

impl AdmissionGate {
    fn new(source: String, requests_per_minute: u32) -> Self {
        Self {
            source,
            min_interval: Duration::from_secs(60) / requests_per_minute,
            last_admitted: Mutex::new(None),
        }
    }

    /// Wait until issuing another request would not exceed the source's
    /// budget, then record the admission.  Never errors, only delays.
    pub async fn acquire(&self) -> Permit {
        let mut last = self.last_admitted.lock().await;

        if let Some(prev) = *last {
            tokio::time::sleep_until(prev + self.min_interval).await;
        }

        let now = Instant::now();
        let waited = last
            .map(|prev| now.saturating_duration_since(prev))
            .unwrap_or_default();
        *last = Some(now);

        debug!(
            source = %self.source,
            waited_ms = waited.as_millis() as u64,
            "request admitted"
        );

        Permit { admitted_at: now }
    }

    /// Spacing this gate enforces between consecutive admissions.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl std::fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionGate")
            .field("source", &self.source)
            .field("min_interval", &self.min_interval)
            .finish()
    }
}

/// Owns one admission gate per configured source.
///
/// Budgets are validated here, once, so that every later `gate` lookup can
/// hand out a ready-to-use gate and `acquire` itself stays infallible.
#[derive(Debug)]
pub struct RateLimiter {
    gates: HashMap<String, Arc<AdmissionGate>>,
}

impl RateLimiter {
    /// Build gates from per-source requests-per-minute budgets.
    pub fn new(budgets: &HashMap<String, u32>) -> Result<Self, ConfigError> {
        let mut gates = HashMap::with_capacity(budgets.len());

        for (source, &rpm) in budgets {
            if rpm == 0 {
                return Err(ConfigError::NonPositiveRate {
                    source: source.clone(),
                });
            }
            gates.insert(
                source.clone(),
                Arc::new(AdmissionGate::new(source.clone(), rpm)),
            );
        }

        Ok(Self { gates })
    }

    /// Resolve the gate for `source`.
    ///
    /// Callers do this once while wiring themselves up, so a typo'd source
    /// name dies at startup instead of in the middle of a cycle.
    pub fn gate(&self, source: &str) -> Result<Arc<AdmissionGate>, ConfigError> {
        self.gates
            .get(source)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownSource(source.to_string()))
    }
}
