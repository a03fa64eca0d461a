//! Fixed-delay retry for output retrieval

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::errors::LauncherError;

/// Retry settings
#[derive(Debug, Clone)]
pub struct RetryOptions {
    /// Delay between attempts
    pub interval: Duration,

    /// Attempts before giving up with a timeout
    pub max_attempts: u32,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_attempts: 30,
        }
    }
}

/// Invoke `action` until it succeeds, fails permanently, or runs out of attempts
///
/// Transient failures (see [`LauncherError::is_transient`]) wait `interval`
/// through `sleep_fn` before the next attempt. `on_attempt` is told the
/// number of each attempt before it runs. The wait races `cancel`; once
/// it reads `true` the loop stops with [`LauncherError::Cancelled`].
pub async fn retry_until_ready<T, A, AF, S, SF, O>(
    options: &RetryOptions,
    mut action: A,
    sleep_fn: S,
    mut on_attempt: O,
    cancel: &mut watch::Receiver<bool>,
) -> Result<T, LauncherError>
where
    A: FnMut() -> AF,
    AF: Future<Output = Result<T, LauncherError>>,
    S: Fn(Duration) -> SF,
    SF: Future<Output = ()>,
    O: FnMut(u32),
{
    let max_attempts = options.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if *cancel.borrow() {
            return Err(cancelled());
        }

        attempt += 1;
        on_attempt(attempt);

        let result = tokio::select! {
            result = action() => result,
            _ = wait_cancelled(cancel) => return Err(cancelled()),
        };

        match result {
            Ok(value) => {
                debug!("Outputs ready after {} attempt(s)", attempt);
                return Ok(value);
            }
            Err(e) if e.is_transient() => {
                if attempt >= max_attempts {
                    warn!("Giving up after {} attempts: {}", attempt, e);
                    return Err(LauncherError::Timeout(format!(
                        "outputs not available after {attempt} attempts (last error: {e})"
                    )));
                }
                debug!(
                    "Attempt {} not ready ({}), retrying in {:?}",
                    attempt, e, options.interval
                );
            }
            Err(e) => return Err(e),
        }

        tokio::select! {
            _ = sleep_fn(options.interval) => {}
            _ = wait_cancelled(cancel) => return Err(cancelled()),
        }
    }
}

/// Resolve once the cancel flag turns `true`
///
/// A dropped sender means nobody can cancel any more, so this never resolves.
pub async fn wait_cancelled(cancel: &mut watch::Receiver<bool>) {
    let closed = cancel.wait_for(|cancelled| *cancelled).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

fn cancelled() -> LauncherError {
    LauncherError::Cancelled("output retrieval stopped".to_string())
}
