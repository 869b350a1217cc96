use std::time::Duration;

use crate::config::IngestionSettings;

/// Fixed-delay retry policy. The delay between attempts is constant; there
/// is no jitter and no growth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (at least 1).
    pub max_attempts: u32,
    /// Wait between a failed attempt and the next one.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_settings(settings: &IngestionSettings) -> Self {
        Self::new(settings.max_attempts, settings.backoff())
    }
}

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Terminal outcome of a retry sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryFailure<E> {
    /// The error must not be retried (e.g. the upstream asked us to back off).
    Fatal { attempt: u32, error: E },
    /// Every allowed attempt failed with a retryable error.
    Exhausted { attempts: u32, last: E },
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision<E> {
    Retry { next_attempt: u32, delay: Duration },
    GiveUp(RetryFailure<E>),
}

/// Attempt counter driven by attempt outcomes.
///
/// `Attempting(n)` moves to `Attempting(n + 1)` after a retryable failure
/// while `n < max_attempts`; a non-retryable failure or the last allowed
/// attempt ends the sequence. Success is handled by the caller, which simply
/// stops consulting the state.
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    attempt: u32,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, attempt: 1 }
    }

    /// The attempt currently in flight, starting at 1.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn on_failure<E: Retryable>(&mut self, error: E) -> RetryDecision<E> {
        if !error.is_retryable() {
            return RetryDecision::GiveUp(RetryFailure::Fatal {
                attempt: self.attempt,
                error,
            });
        }

        if self.attempt >= self.policy.max_attempts {
            return RetryDecision::GiveUp(RetryFailure::Exhausted {
                attempts: self.attempt,
                last: error,
            });
        }

        self.attempt += 1;
        RetryDecision::Retry {
            next_attempt: self.attempt,
            delay: self.policy.backoff,
        }
    }
}
