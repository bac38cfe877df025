//! BDD Tests for the Gauntlet REST client

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use cucumber::{given, then, when, World};
use serde_json::json;

use gauntlet_core::retry::RetryPolicy;
use gauntlet_core::VariableStore;
use gauntlet_rest::{assertions, extract, poll, BodyExpectation, HttpVerb, RestClient};

#[derive(Clone, Default)]
struct MockState {
    status_calls: Arc<AtomicUsize>,
}

async fn user() -> Json<serde_json::Value> {
    Json(json!({"name": "alice", "roles": ["admin", "qa"]}))
}

async fn status(State(state): State<MockState>) -> String {
    let call = state.status_calls.fetch_add(1, Ordering::SeqCst);
    if call < 2 {
        "PENDING".to_string()
    } else {
        "READY".to_string()
    }
}

#[derive(Debug, World)]
#[world(init = Self::new)]
struct RestWorld {
    client: Option<RestClient>,
    vars: VariableStore,
    mock_addr: Option<SocketAddr>,
}

impl RestWorld {
    fn new() -> Self {
        Self {
            client: None,
            vars: VariableStore::new(),
            mock_addr: None,
        }
    }

    fn client(&mut self) -> &mut RestClient {
        self.client.as_mut().expect("no REST client configured")
    }
}

#[given("a mock API is running")]
async fn given_mock_api(world: &mut RestWorld) {
    let app = Router::new()
        .route("/users/{id}", get(user))
        .route("/status", get(status))
        .with_state(MockState::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock listener");
    world.mock_addr = Some(listener.local_addr().expect("mock local addr"));
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve mock");
    });
}

#[given("I send requests to the mock API")]
async fn given_requests_to_mock(world: &mut RestWorld) {
    let addr = world.mock_addr.expect("no mock API running");
    let mut client = RestClient::new().expect("client");
    client
        .configure_base(false, Some("127.0.0.1"), Some(addr.port()))
        .expect("base uri");
    world.client = Some(client);
}

#[when(expr = "I send a {string} request to {string}")]
async fn when_send_request(world: &mut RestWorld, verb: String, endpoint: String) {
    let verb: HttpVerb = verb.parse().expect("verb");
    world
        .client()
        .send(verb, &endpoint)
        .await
        .expect("request should be dispatched");
}

#[when(
    expr = "in less than {int} seconds, checking each {int} seconds, I send a {string} request to {string} so that the response contains {string}"
)]
async fn when_poll_until_contains(
    world: &mut RestWorld,
    timeout: u64,
    wait: u64,
    verb: String,
    endpoint: String,
    pattern: String,
) {
    let verb: HttpVerb = verb.parse().expect("verb");
    let policy = RetryPolicy::from_secs(timeout, wait);
    let report = poll(
        world.client(),
        verb,
        &endpoint,
        &BodyExpectation::Contains(pattern),
        policy,
    )
    .await
    .expect("polling should succeed within the timeout");
    world.vars.set("POLL_ATTEMPTS", report.attempts.to_string());
}

#[then(expr = "the service response status must be {int}")]
async fn then_status(world: &mut RestWorld, expected: u16) {
    let response = world.client().last_response().expect("no response");
    assertions::assert_status(response, expected).expect("status assertion");
}

#[then(expr = "the service response must contain the text {string}")]
async fn then_body_contains(world: &mut RestWorld, fragment: String) {
    let response = world.client().last_response().expect("no response");
    assertions::assert_body_contains(response, &fragment).expect("body assertion");
}

#[given(expr = "I save element {string} in environment variable {string}")]
async fn given_save_element(world: &mut RestWorld, element: String, name: String) {
    let query = extract::parse_query(&element);
    let response_body = world
        .client()
        .last_response()
        .expect("no response")
        .body
        .clone();
    let source = query.inline_source.as_deref().unwrap_or(&response_body);
    let value =
        extract::extract_non_empty(source, &query.expression, None).expect("extraction");
    world.vars.set(name, value);
}

#[then(expr = "the variable {string} must equal {string}")]
async fn then_variable_equals(world: &mut RestWorld, name: String, expected: String) {
    assert_eq!(world.vars.get(&name), Some(expected.as_str()));
}

#[then(expr = "the poll must have taken {int} attempts")]
async fn then_poll_attempts(world: &mut RestWorld, expected: u32) {
    assert_eq!(
        world.vars.get("POLL_ATTEMPTS"),
        Some(expected.to_string().as_str())
    );
}

#[tokio::main]
async fn main() {
    RestWorld::run("tests/features").await;
}
