//! Poll an endpoint until its body matches
//!
//! Re-issues the same request at a fixed interval until the body contains a
//! pattern (or stops containing a literal), bounded by a timeout. Mismatches
//! before the deadline are expected and retried silently; only the final one
//! surfaces, wrapped in the timeout error. Success reports how many attempts
//! and how much wall-clock time the condition took.

use regex::Regex;
use tracing::info;

use gauntlet_core::retry::{PollStatus, Poller, RetryPolicy, RetryReport, Tick};
use gauntlet_core::Result;

use crate::client::{HttpVerb, RestClient};

/// What the response body must (or must no longer) look like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyExpectation {
    /// Body contains the pattern, interpreted as a regex where it parses as
    /// one and as a literal otherwise.
    Contains(String),
    /// Body does not contain the literal.
    NotContains(String),
}

/// Pattern containment: regex match when the pattern compiles, literal
/// containment otherwise.
pub fn matches_or_contains(pattern: &str, text: &str) -> bool {
    match Regex::new(pattern) {
        Ok(regex) => regex.is_match(text),
        Err(_) => text.contains(pattern),
    }
}

impl BodyExpectation {
    fn check(&self, body: &str) -> Tick<()> {
        match self {
            BodyExpectation::Contains(pattern) => {
                if matches_or_contains(pattern, body) {
                    Tick::Satisfied(())
                } else {
                    Tick::Pending(format!("response body does not yet contain '{pattern}'"))
                }
            }
            BodyExpectation::NotContains(literal) => {
                if body.contains(literal.as_str()) {
                    Tick::Pending(format!("response body still contains '{literal}'"))
                } else {
                    Tick::Satisfied(())
                }
            }
        }
    }
}

/// Re-issues `verb endpoint` under `policy` until `expectation` holds.
/// Transport failures are not retried; they fail the step immediately, the
/// way any other step's request failure would.
pub async fn poll(
    client: &mut RestClient,
    verb: HttpVerb,
    endpoint: &str,
    expectation: &BodyExpectation,
    policy: RetryPolicy,
) -> Result<RetryReport> {
    let mut poller = Poller::new(policy);
    loop {
        let attempt = poller.begin_attempt();
        let response = client.send(verb, endpoint).await?;
        let tick = expectation.check(&response.body);

        match poller.status(tick) {
            PollStatus::Satisfied(()) => {
                let report = poller.report();
                info!(
                    "condition met after {} attempt(s) over {}s",
                    report.attempts,
                    report.elapsed.as_secs()
                );
                return Ok(report);
            }
            PollStatus::TimedOut(last_failure) => return Err(poller.timed_out(last_failure)),
            PollStatus::Pending(_) => {
                info!("condition not met on attempt {attempt}, retrying");
                poller.wait().await;
            }
        }
    }
}
