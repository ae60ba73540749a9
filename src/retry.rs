// =============================================================================
// Retry helper — bounded attempts with doubling backoff
// =============================================================================
//
// Used by delivery-side glue (alert sends) only.  Fetch paths never retry:
// a failed slot is surfaced as-is and the next cycle re-fetches everything.
// =============================================================================

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tracing::warn;

/// Run `op` up to `attempts` times, sleeping between failures.
///
/// The delay starts at `initial_delay` and doubles after every failed
/// attempt.  The final error carries `op_name` and the attempt count.
pub async fn retry_with_backoff<T, F, Fut>(
    op_name: &str,
    attempts: u32,
    initial_delay: Duration,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = attempts.max(1);
    let mut delay = initial_delay;
    let mut attempt = 1u32;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                warn!(
                    op = op_name,
                    attempt,
                    attempts,
                    backoff_ms = delay.as_millis() as u64,
                    error = %e,
                    "attempt failed, backing off"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(e) => {
                return Err(e.context(format!("{op_name} failed after {attempts} attempts")))
            }
        }
    }
}
