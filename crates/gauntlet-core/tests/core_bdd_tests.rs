//! BDD Tests for the Gauntlet scenario context and retry policy

use cucumber::{given, then, when, World};
use gauntlet_core::retry::{run_ticks, RetryPolicy, RetryReport, Tick};
use gauntlet_core::{GauntletError, ScenarioContext};

#[derive(Debug, World)]
#[world(init = Self::new)]
struct CoreWorld {
    ctx: ScenarioContext,
    policy: Option<RetryPolicy>,
    report: Option<RetryReport>,
    last_error: Option<GauntletError>,
}

impl CoreWorld {
    fn new() -> Self {
        Self {
            ctx: ScenarioContext::new(),
            policy: None,
            report: None,
            last_error: None,
        }
    }
}

#[given("a fresh scenario context")]
async fn given_fresh_context(world: &mut CoreWorld) {
    world.ctx = ScenarioContext::new();
}

#[when(expr = "I save {string} in environment variable {string}")]
async fn when_save_variable(world: &mut CoreWorld, value: String, name: String) {
    world.ctx.vars.set(name, value);
}

#[then(expr = "the variable {string} must equal {string}")]
async fn then_variable_equals(world: &mut CoreWorld, name: String, expected: String) {
    let actual = world
        .ctx
        .vars
        .get(&name)
        .unwrap_or_else(|| panic!("variable '{name}' was never saved"));
    assert_eq!(actual, expected);
}

#[then(expr = "interpolating {string} must produce {string}")]
async fn then_interpolation_produces(world: &mut CoreWorld, template: String, expected: String) {
    assert_eq!(world.ctx.vars.interpolate(&template), expected);
}

#[given(expr = "a retry policy of {int} seconds timeout checking each {int} seconds")]
async fn given_retry_policy(world: &mut CoreWorld, timeout: u64, interval: u64) {
    world.policy = Some(RetryPolicy::from_secs(timeout, interval));
}

#[when("I poll a condition that never holds")]
async fn when_poll_never_holds(world: &mut CoreWorld) {
    let policy = world.policy.expect("no retry policy configured");
    let ticks = std::iter::repeat_with(|| Tick::<()>::Pending("condition not met".to_string()))
        .take(32);
    match run_ticks(policy, ticks).await {
        Ok(_) => panic!("a condition that never holds must not satisfy the poll"),
        Err(err) => world.last_error = Some(err),
    }
}

#[when(expr = "I poll a condition that holds on attempt {int}")]
async fn when_poll_holds_on_attempt(world: &mut CoreWorld, attempt: u32) {
    let policy = world.policy.expect("no retry policy configured");
    let ticks = (1..=attempt).map(|n| {
        if n == attempt {
            Tick::Satisfied(())
        } else {
            Tick::Pending(format!("attempt {n} still pending"))
        }
    });
    let (_, report) = run_ticks(policy, ticks)
        .await
        .expect("poll should have succeeded");
    world.report = Some(report);
}

#[then(expr = "the poll must time out after {int} attempt(s)")]
async fn then_poll_times_out(world: &mut CoreWorld, expected_attempts: u32) {
    match world.last_error.as_ref().expect("no poll failure recorded") {
        GauntletError::PollTimeout { attempts, .. } => assert_eq!(*attempts, expected_attempts),
        other => panic!("expected a poll timeout, got {other}"),
    }
}

#[then(expr = "the poll must succeed after {int} attempt(s)")]
async fn then_poll_succeeds(world: &mut CoreWorld, expected_attempts: u32) {
    let report = world.report.as_ref().expect("no poll report recorded");
    assert_eq!(report.attempts, expected_attempts);
}

#[tokio::main]
async fn main() {
    CoreWorld::run("tests/features").await;
}
