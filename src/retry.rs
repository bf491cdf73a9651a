//! Uniform retry and error-classification wrapper for remote calls.
//!
//! Every call against the photo library goes through [`RetryPolicy::execute`]:
//! transient failures are retried after a fixed delay, a vanished item comes
//! back as [`Lookup::Missing`], and anything else surfaces as a [`FatalError`].

use std::future::Future;
use std::num::NonZeroU32;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::RetryOptions;
use crate::error::{ErrorClass, FatalError, RemoteError};

/// Result of a remote lookup that completed without a fatal error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    /// The remote reported the item as not found.
    Missing,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Lookup::Missing)
    }
}

/// Performs the wait between retry attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy<S = TokioSleeper> {
    delay: Duration,
    max_attempts: Option<NonZeroU32>,
    sleeper: S,
}

impl RetryPolicy<TokioSleeper> {
    /// Unbounded policy waiting `delay` between attempts.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
            sleeper: TokioSleeper,
        }
    }

    pub fn from_options(options: &RetryOptions) -> Self {
        Self::new(options.delay).with_max_attempts(options.max_attempts)
    }
}

impl<S: Sleeper> RetryPolicy<S> {
    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> RetryPolicy<T> {
        RetryPolicy {
            delay: self.delay,
            max_attempts: self.max_attempts,
            sleeper,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<NonZeroU32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Run `op` until it succeeds, reports not-found, or fails fatally.
    ///
    /// `call` names the operation in logs and in the returned error.
    pub async fn execute<T, F, Fut>(&self, call: &str, mut op: F) -> Result<Lookup<T>, FatalError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            let err = match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(call, attempt, "remote call recovered");
                    }
                    return Ok(Lookup::Found(value));
                }
                Err(err) => err,
            };

            match err.classify() {
                ErrorClass::NotFound => {
                    warn!(
                        call,
                        "remote item not found; was it deleted? it should disappear after the next refresh"
                    );
                    return Ok(Lookup::Missing);
                }
                ErrorClass::Fatal => {
                    return Err(FatalError::Remote {
                        call: call.to_string(),
                        source: err,
                    });
                }
                ErrorClass::Transient => {
                    if let Some(max) = self.max_attempts {
                        if attempt >= max.get() {
                            return Err(FatalError::RetriesExhausted {
                                call: call.to_string(),
                                attempts: attempt,
                                source: err,
                            });
                        }
                    }
                    warn!(
                        call,
                        attempt,
                        delay = %humantime::format_duration(self.delay),
                        error = %err,
                        "remote service unavailable; retrying"
                    );
                    self.sleeper.sleep(self.delay).await;
                }
            }
        }
    }
}
