//! Timeout-based polling

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Result type for polling check functions.
///
/// - `Ok(Some(value))` - Condition met, return the value
/// - `Ok(None)` - Condition not met yet, keep polling
/// - `Err(e)` - Fatal error, stop polling immediately
pub type PollResult<T, E> = std::result::Result<Option<T>, E>;

/// Why polling stopped without a value
#[derive(Debug, PartialEq, Eq)]
pub enum PollError<E> {
    /// The deadline passed; carries the time spent polling
    Timeout(Duration),
    /// The check function reported a fatal error
    Failed(E),
}

/// Polls `check_fn` every `interval` until it yields a value, fails, or the
/// timeout passes.
///
/// A `timeout` of `None` or zero waits forever. The check always runs at
/// least once. A sleep never runs past the deadline, so the last check
/// lands on it even when `interval` is longer than the time left.
pub async fn wait_with_timeout<T, E, F, Fut>(
    timeout: Option<Duration>,
    interval: Duration,
    description: &str,
    mut check_fn: F,
) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PollResult<T, E>>,
{
    let deadline = timeout.filter(|t| !t.is_zero());
    let start = Instant::now();

    loop {
        match check_fn().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(e) => return Err(PollError::Failed(e)),
        }

        let nap = match deadline {
            Some(limit) => {
                let elapsed = start.elapsed();
                if elapsed >= limit {
                    return Err(PollError::Timeout(elapsed));
                }
                interval.min(limit - elapsed)
            }
            None => interval,
        };

        debug!("Waiting for {}...", description);
        tokio::time::sleep(nap).await;
    }
}
