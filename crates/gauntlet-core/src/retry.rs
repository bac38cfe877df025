//! Deadline-driven retry for polling steps
//!
//! A polling step re-evaluates a predicate at fixed intervals until it is
//! satisfied or a deadline passes. The predicate stays pure: it looks at one
//! attempt's outcome and reports [`Tick::Satisfied`] or [`Tick::Pending`];
//! the [`Poller`] owns the clock and turns each tick into one of three
//! states: satisfied, pending (sleep and try again) or timed out.
//!
//! A policy with a zero timeout still performs exactly one attempt: the
//! deadline is checked only after the predicate has seen a result.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::error::{GauntletError, Result};

/// Outcome of evaluating one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick<T> {
    /// The condition holds; polling stops with this value.
    Satisfied(T),
    /// Not yet; the reason is kept so a timeout can surface the last one.
    Pending(String),
}

/// How long to keep trying and how long to wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        // A zero interval would spin; one second is the finest step grammar
        // the phrase "checking each N seconds" can express anyway.
        let interval = interval.max(Duration::from_secs(1));
        Self { timeout, interval }
    }

    pub fn from_secs(timeout: u64, interval: u64) -> Self {
        Self::new(Duration::from_secs(timeout), Duration::from_secs(interval))
    }
}

/// What the poller decided after seeing one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus<T> {
    Satisfied(T),
    Pending(String),
    TimedOut(String),
}

/// Attempts made and wall-clock time spent until success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryReport {
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Tracks attempts against a [`RetryPolicy`]'s deadline.
#[derive(Debug)]
pub struct Poller {
    policy: RetryPolicy,
    started: Instant,
    attempts: u32,
}

impl Poller {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            started: Instant::now(),
            attempts: 0,
        }
    }

    /// Records the start of an attempt and returns its ordinal (1-based).
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Classifies a tick against the deadline. A pending tick past the
    /// deadline becomes a timeout carrying the pending reason.
    pub fn status<T>(&self, tick: Tick<T>) -> PollStatus<T> {
        match tick {
            Tick::Satisfied(value) => PollStatus::Satisfied(value),
            Tick::Pending(reason) => {
                if self.started.elapsed() >= self.policy.timeout {
                    PollStatus::TimedOut(reason)
                } else {
                    PollStatus::Pending(reason)
                }
            }
        }
    }

    /// Sleeps until the next attempt is due.
    pub async fn wait(&self) {
        debug!(
            "condition pending after {} attempt(s), retrying in {:?}",
            self.attempts, self.policy.interval
        );
        tokio::time::sleep(self.policy.interval).await;
    }

    pub fn report(&self) -> RetryReport {
        RetryReport {
            attempts: self.attempts,
            elapsed: self.started.elapsed(),
        }
    }

    /// The timeout error for a poll that ran out of time, carrying the last
    /// pending reason so the final failure reads like the assertion that
    /// kept failing.
    pub fn timed_out(&self, last_failure: String) -> GauntletError {
        GauntletError::PollTimeout {
            attempts: self.attempts,
            elapsed_secs: self.started.elapsed().as_secs(),
            last_failure,
        }
    }
}

/// Drives a poller over an already-collected sequence of ticks, used where
/// the attempt itself produces no borrow entanglement (tests, simple
/// predicates). Network polling loops drive the [`Poller`] directly.
pub async fn run_ticks<T, I>(policy: RetryPolicy, ticks: I) -> Result<(T, RetryReport)>
where
    I: IntoIterator<Item = Tick<T>>,
{
    let mut poller = Poller::new(policy);
    let mut iter = ticks.into_iter();
    loop {
        poller.begin_attempt();
        let tick = iter
            .next()
            .unwrap_or_else(|| Tick::Pending("no further ticks".to_string()));
        match poller.status(tick) {
            PollStatus::Satisfied(value) => return Ok((value, poller.report())),
            PollStatus::TimedOut(last) => return Err(poller.timed_out(last)),
            PollStatus::Pending(_) => poller.wait().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(reason: &str) -> Tick<&'static str> {
        Tick::Pending(reason.to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn zero_timeout_attempts_exactly_once() {
        let ticks = vec![pending("still PENDING"), Tick::Satisfied("too late")];
        let err = run_ticks(RetryPolicy::from_secs(0, 2), ticks)
            .await
            .unwrap_err();

        match err {
            GauntletError::PollTimeout {
                attempts,
                last_failure,
                ..
            } => {
                assert_eq!(attempts, 1);
                assert_eq!(last_failure, "still PENDING");
            }
            other => panic!("expected PollTimeout, got {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn zero_timeout_still_accepts_an_immediate_success() {
        let (value, report) = run_ticks(RetryPolicy::from_secs(0, 2), vec![Tick::Satisfied("ok")])
            .await
            .unwrap();
        assert_eq!(value, "ok");
        assert_eq!(report.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn satisfied_tick_reports_attempts_and_elapsed() {
        let ticks = vec![
            pending("PENDING"),
            pending("PENDING"),
            pending("PENDING"),
            Tick::Satisfied("READY"),
        ];
        let (value, report) = run_ticks(RetryPolicy::from_secs(10, 2), ticks)
            .await
            .unwrap();

        assert_eq!(value, "READY");
        assert_eq!(report.attempts, 4);
        // Three sleeps of two seconds under a paused clock.
        assert_eq!(report.elapsed.as_secs(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_surfaces_the_last_pending_reason() {
        let ticks = vec![pending("attempt one"), pending("attempt two"), pending("attempt three")];
        let err = run_ticks::<&str, _>(RetryPolicy::from_secs(3, 2), ticks)
            .await
            .unwrap_err();

        match err {
            GauntletError::PollTimeout {
                attempts,
                last_failure,
                ..
            } => {
                // Attempts at t=0 and t=2 are before the deadline; the tick
                // at t=4 is past it.
                assert_eq!(attempts, 3);
                assert_eq!(last_failure, "attempt three");
            }
            other => panic!("expected PollTimeout, got {other}"),
        }
    }

    #[test]
    fn zero_interval_is_clamped() {
        let policy = RetryPolicy::from_secs(10, 0);
        assert_eq!(policy.interval, Duration::from_secs(1));
    }
}
