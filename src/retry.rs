//! Exponential backoff for connection establishment.
//!
//! Used when opening the WebDriver session and when pinging MongoDB at
//! startup. Both services are commonly launched next to this binary and may
//! need a few seconds before they accept connections.
//!
//! # Backoff Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), 30s) + random_jitter(0..250ms)
//! ```

use rand::{Rng, rng};
use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, warn};

const MAX_DELAY: Duration = Duration::from_secs(30);

/// Run `op` until it succeeds or `max_retries` retries have failed.
///
/// # Arguments
///
/// * `what` - Operation name used in log events
/// * `max_retries` - Retries after the first attempt
/// * `base_delay` - Delay before the first retry (doubles each retry)
///
/// # Returns
///
/// The first successful result, or the last error once retries are exhausted.
pub async fn with_backoff<T, E, F, Fut>(
    what: &str,
    max_retries: usize,
    base_delay: Duration,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let total_t0 = Instant::now();
    let mut attempt = 0usize;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;
                let total_dt = total_t0.elapsed();

                if attempt > max_retries {
                    error!(
                        what,
                        attempt,
                        max = max_retries,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        error = %e,
                        "exhausted retries"
                    );
                    return Err(e);
                }

                let delay = backoff_delay(base_delay, attempt);
                warn!(
                    what,
                    attempt,
                    max = max_retries,
                    ?delay,
                    error = %e,
                    "attempt failed; backing off"
                );
                sleep(delay).await;
            }
        }
    }
}

fn backoff_delay(base_delay: Duration, attempt: usize) -> Duration {
    let shift = (attempt.saturating_sub(1)).min(16) as u32;
    let delay = base_delay.saturating_mul(1 << shift).min(MAX_DELAY);
    let jitter_ms: u64 = rng().random_range(0..=250);
    delay + Duration::from_millis(jitter_ms)
}
