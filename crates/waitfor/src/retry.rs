//! Fixed-interval retry loop.
//!
//! [`Retry::run`] calls an operation until it succeeds, reports a fatal
//! error, or the cancellation token fires. The operation classifies its own
//! failures through [`Attempt`]; the loop never inspects error values.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// A failed attempt and whether it is worth retrying
#[derive(Debug)]
pub enum Attempt<E> {
    Retry(E),
    Fatal(E),
}

/// Why a retry loop stopped without success
#[derive(Debug, Error)]
pub enum RetryError<E: fmt::Debug + fmt::Display> {
    #[error("{0}")]
    Fatal(E),

    #[error("{}", cancelled_message(.last))]
    Cancelled { last: Option<E> },
}

fn cancelled_message<E: fmt::Display>(last: &Option<E>) -> String {
    match last {
        Some(err) => format!("cancelled after error: {err}"),
        None => "cancelled before first attempt".to_string(),
    }
}

/// Retry policy bound to a cancellation token
#[derive(Debug, Clone)]
pub struct Retry {
    interval: Duration,
    cancel: CancellationToken,
}

impl Retry {
    pub fn new(interval: Duration, cancel: CancellationToken) -> Self {
        Self { interval, cancel }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `operation` until success, a fatal error or cancellation.
    ///
    /// The first attempt starts immediately. Between attempts the loop sleeps
    /// for the interval, waking early if the token is cancelled.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, RetryError<E>>
    where
        E: fmt::Debug + fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Attempt<E>>>,
    {
        let mut last = None;

        loop {
            if self.cancel.is_cancelled() {
                return Err(RetryError::Cancelled { last });
            }

            match operation().await {
                Ok(value) => return Ok(value),
                Err(Attempt::Fatal(err)) => return Err(RetryError::Fatal(err)),
                Err(Attempt::Retry(err)) => last = Some(err),
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(RetryError::Cancelled { last }),
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
