//! REST step definitions
//!
//! The Gherkin phrases for REST scenarios, mapped onto `gauntlet-rest`.
//! Wherever a phrase takes free text — endpoints, header values, expected
//! values, file paths — `${NAME}` references resolve against the scenario's
//! variable store first, so values saved by earlier steps flow into later
//! ones.

use cucumber::gherkin::Step;
use cucumber::{given, then, when};

use gauntlet_core::retry::RetryPolicy;
use gauntlet_rest::{
    assertions, extract, payload, polling, BaseUri, BodyFormat, Condition, HttpVerb,
};

use crate::world::GauntletWorld;

fn parse_verb(raw: &str) -> HttpVerb {
    raw.parse().unwrap_or_else(|err| panic!("{err}"))
}

fn two_column_rows(step: &Step) -> Vec<(String, String)> {
    let table = step.table.as_ref().expect("this step requires a data table");
    table
        .rows
        .iter()
        .map(|row| {
            (
                row.first().cloned().unwrap_or_default(),
                row.get(1).cloned().unwrap_or_default(),
            )
        })
        .collect()
}

fn three_column_rows(step: &Step) -> Vec<(String, String, String)> {
    let table = step.table.as_ref().expect("this step requires a data table");
    table
        .rows
        .iter()
        .map(|row| {
            (
                row.first().cloned().unwrap_or_default(),
                row.get(1).cloned().unwrap_or_default(),
                row.get(2).cloned().unwrap_or_default(),
            )
        })
        .collect()
}

fn setup_base(world: &mut GauntletWorld, secured: bool, authority: &str) {
    let authority = world.ctx.vars.interpolate(authority);
    let (host, port) = BaseUri::parse_authority(&authority).unwrap_or_else(|err| panic!("{err}"));
    world
        .rest()
        .configure_base(secured, Some(&host), port)
        .unwrap_or_else(|err| panic!("{err}"));
}

#[given(expr = "I send requests to {string}")]
pub async fn setup_app(world: &mut GauntletWorld, authority: String) {
    setup_base(world, false, &authority);
}

#[given(expr = "I securely send requests to {string}")]
pub async fn setup_app_secured(world: &mut GauntletWorld, authority: String) {
    setup_base(world, true, &authority);
}

/// Legacy phrasing: port 443 implies https, anything else plain http.
#[given(expr = "My app is running in {string}")]
pub async fn setup_running_app(world: &mut GauntletWorld, authority: String) {
    let interpolated = world.ctx.vars.interpolate(&authority);
    let (_, port) = BaseUri::parse_authority(&interpolated).unwrap_or_else(|err| panic!("{err}"));
    setup_base(world, port == Some(443), &authority);
}

async fn dispatch(world: &mut GauntletWorld, verb: &str, endpoint: &str) {
    let verb = parse_verb(verb);
    let endpoint = world.ctx.vars.interpolate(endpoint);
    world
        .rest()
        .send(verb, &endpoint)
        .await
        .unwrap_or_else(|err| panic!("{err}"));
}

#[when(expr = "I send a {string} request to {string}")]
pub async fn send_request(world: &mut GauntletWorld, verb: String, endpoint: String) {
    dispatch(world, &verb, &endpoint).await;
}

fn apply_login_info(world: &mut GauntletWorld, login_info: &str) {
    let (user, password) = login_info
        .split_once(':')
        .unwrap_or_else(|| panic!("credentials must be 'user:password', got '{login_info}'"));
    world.rest().set_basic_auth(user, password);
}

#[when(expr = "I send a {string} request to {string} with user and password {string}")]
pub async fn send_request_with_auth(
    world: &mut GauntletWorld,
    verb: String,
    endpoint: String,
    login_info: String,
) {
    apply_login_info(world, &login_info);
    dispatch(world, &verb, &endpoint).await;
}

async fn load_body(world: &mut GauntletWorld, base_data: &str, format: &str) -> String {
    let path = world.ctx.vars.interpolate(base_data);
    let format: BodyFormat = format.parse().unwrap_or_else(|err| panic!("{err}"));
    payload::load(&path, format)
        .await
        .unwrap_or_else(|err| panic!("{err}"))
}

#[when(expr = "I send a {string} request to {string} based on {string} as {string}")]
pub async fn send_request_with_body(
    world: &mut GauntletWorld,
    verb: String,
    endpoint: String,
    base_data: String,
    format: String,
) {
    let body = load_body(world, &base_data, &format).await;
    world.rest().set_body(body);
    dispatch(world, &verb, &endpoint).await;
}

#[when(
    expr = "I send a {string} request to {string} with user and password {string} based on {string} as {string}"
)]
pub async fn send_request_with_auth_and_body(
    world: &mut GauntletWorld,
    verb: String,
    endpoint: String,
    login_info: String,
    base_data: String,
    format: String,
) {
    apply_login_info(world, &login_info);
    let body = load_body(world, &base_data, &format).await;
    world.rest().set_body(body);
    dispatch(world, &verb, &endpoint).await;
}

#[when(expr = "I send a {string} request to {string} based on {string} as {string} with:")]
pub async fn send_request_with_modified_body(
    world: &mut GauntletWorld,
    verb: String,
    endpoint: String,
    base_data: String,
    format: String,
    step: &Step,
) {
    let body = load_body(world, &base_data, &format).await;
    let mut document: serde_json::Value =
        serde_json::from_str(&body).unwrap_or_else(|err| panic!("body is not JSON: {err}"));

    let rows: Vec<(String, String, String)> = three_column_rows(step)
        .into_iter()
        .map(|(path, operation, value)| (path, operation, world.ctx.vars.interpolate(&value)))
        .collect();
    payload::apply_all(&mut document, &rows).unwrap_or_else(|err| panic!("{err}"));

    world.rest().set_body(document.to_string());
    dispatch(world, &verb, &endpoint).await;
}

#[then(expr = "the service response status must be {int}")]
pub async fn assert_status(world: &mut GauntletWorld, status: u16) {
    assertions::assert_status(world.response(), status).unwrap_or_else(|err| panic!("{err}"));
}

#[then(expr = "the service response status must be {int} and its response length must be {int}")]
pub async fn assert_status_and_length(world: &mut GauntletWorld, status: u16, length: usize) {
    let response = world.response();
    assertions::assert_status(response, status).unwrap_or_else(|err| panic!("{err}"));
    assertions::assert_body_length(response, length).unwrap_or_else(|err| panic!("{err}"));
}

#[then(
    expr = "the service response status must be {int} and its response must contain the text {string}"
)]
pub async fn assert_status_and_text(world: &mut GauntletWorld, status: u16, text: String) {
    let expected = world.ctx.vars.interpolate(&text);
    let response = world.response();
    assertions::assert_status(response, status).unwrap_or_else(|err| panic!("{err}"));
    assertions::assert_body_contains(response, &expected).unwrap_or_else(|err| panic!("{err}"));
}

#[then(
    expr = "the service response status must be {int} and its response matches the schema in {string}"
)]
pub async fn assert_status_and_schema(world: &mut GauntletWorld, status: u16, schema_path: String) {
    let path = world.ctx.vars.interpolate(&schema_path);
    let schema = payload::load(&path, BodyFormat::Json)
        .await
        .unwrap_or_else(|err| panic!("{err}"));
    let response = world.response();
    assertions::assert_status(response, status).unwrap_or_else(|err| panic!("{err}"));
    assertions::assert_matches_schema(response, &schema).unwrap_or_else(|err| panic!("{err}"));
}

#[then(expr = "the service response must contain the text {string}")]
pub async fn assert_response_text(world: &mut GauntletWorld, text: String) {
    let expected = world.ctx.vars.interpolate(&text);
    assertions::assert_body_contains(world.response(), &expected)
        .unwrap_or_else(|err| panic!("{err}"));
}

fn save_element_value(world: &mut GauntletWorld, element: &str, position: Option<usize>, name: &str) {
    let query = extract::parse_query(element);
    let value = match &query.inline_source {
        Some(source) => extract::extract_non_empty(source, &query.expression, position),
        None => {
            let body = world.response().body.clone();
            extract::extract_non_empty(&body, &query.expression, position)
        }
    }
    .unwrap_or_else(|err| panic!("{err}"));
    world.ctx.vars.set(name, value);
}

#[given(expr = "I save element {string} in environment variable {string}")]
pub async fn save_element(world: &mut GauntletWorld, element: String, name: String) {
    save_element_value(world, &element, None, &name);
}

#[given(expr = "I save element in position {int} in {string} in environment variable {string}")]
pub async fn save_element_in_position(
    world: &mut GauntletWorld,
    position: usize,
    element: String,
    name: String,
) {
    save_element_value(world, &element, Some(position), &name);
}

#[given(expr = "I set headers:")]
pub async fn set_headers(world: &mut GauntletWorld, step: &Step) {
    for (name, value) in two_column_rows(step) {
        let value = world.ctx.vars.interpolate(&value);
        world.rest().set_header(name, value);
    }
}

#[given(expr = "I set cookies:")]
pub async fn set_cookies(world: &mut GauntletWorld, step: &Step) {
    for (name, value) in two_column_rows(step) {
        let value = world.ctx.vars.interpolate(&value);
        world.rest().set_cookie(name, value);
    }
}

#[then(expr = "I clear headers from previous request")]
pub async fn clear_headers(world: &mut GauntletWorld) {
    world.rest().clear_headers();
}

#[then(expr = "I clear cookies from previous request")]
pub async fn clear_cookies(world: &mut GauntletWorld) {
    world.rest().clear_cookies();
}

async fn poll_endpoint(
    world: &mut GauntletWorld,
    timeout: u64,
    wait: u64,
    verb: &str,
    endpoint: &str,
    expectation: polling::BodyExpectation,
) {
    let verb = parse_verb(verb);
    let endpoint = world.ctx.vars.interpolate(endpoint);
    let policy = RetryPolicy::from_secs(timeout, wait);
    let report = polling::poll(world.rest(), verb, &endpoint, &expectation, policy)
        .await
        .unwrap_or_else(|err| panic!("{err}"));
    world.last_poll = Some(report);
}

#[when(
    expr = "in less than {int} seconds, checking each {int} seconds, I send a {string} request to {string} so that the response contains {string}"
)]
pub async fn poll_until_contains(
    world: &mut GauntletWorld,
    timeout: u64,
    wait: u64,
    verb: String,
    endpoint: String,
    value: String,
) {
    let pattern = world.ctx.vars.interpolate(&value);
    poll_endpoint(
        world,
        timeout,
        wait,
        &verb,
        &endpoint,
        polling::BodyExpectation::Contains(pattern),
    )
    .await;
}

#[when(
    expr = "in less than {int} seconds, checking each {int} seconds, I send a {string} request to {string} so that the response does not contain {string}"
)]
pub async fn poll_until_not_contains(
    world: &mut GauntletWorld,
    timeout: u64,
    wait: u64,
    verb: String,
    endpoint: String,
    value: String,
) {
    let literal = world.ctx.vars.interpolate(&value);
    poll_endpoint(
        world,
        timeout,
        wait,
        &verb,
        &endpoint,
        polling::BodyExpectation::NotContains(literal),
    )
    .await;
}

fn interpolated_case_rows(world: &GauntletWorld, step: &Step) -> Vec<(String, String, String)> {
    three_column_rows(step)
        .into_iter()
        .map(|(name, condition, expected)| {
            (name, condition, world.ctx.vars.interpolate(&expected))
        })
        .collect()
}

#[then(expr = "the service response headers match the following cases:")]
pub async fn check_response_headers(world: &mut GauntletWorld, step: &Step) {
    let rows = interpolated_case_rows(world, step);
    assertions::check_header_cases(world.response(), &rows).unwrap_or_else(|err| panic!("{err}"));
}

#[then(expr = "the service response cookies match the following cases:")]
pub async fn check_response_cookies(world: &mut GauntletWorld, step: &Step) {
    let rows = interpolated_case_rows(world, step);
    assertions::check_cookie_cases(world.response(), &rows).unwrap_or_else(|err| panic!("{err}"));
}

#[then(expr = "I save the response header {string} in environment variable {string}")]
pub async fn save_response_header(world: &mut GauntletWorld, header: String, name: String) {
    let value = world
        .response()
        .header(&header)
        .unwrap_or_else(|| panic!("the header '{header}' is not present in the response"))
        .to_string();
    world.ctx.vars.set(name, value);
}

#[then(expr = "I save the response cookie {string} in environment variable {string}")]
pub async fn save_response_cookie(world: &mut GauntletWorld, cookie: String, name: String) {
    let value = world
        .response()
        .cookie(&cookie)
        .unwrap_or_else(|| panic!("the cookie '{cookie}' is not present in the response"))
        .to_string();
    world.ctx.vars.set(name, value);
}

/// Evaluates JSONPath cases against JSON saved in a variable.
#[then(expr = "{string} matches the following cases:")]
pub async fn variable_matches_cases(world: &mut GauntletWorld, name: String, step: &Step) {
    let saved = world
        .ctx
        .vars
        .get(&name)
        .unwrap_or_else(|| panic!("variable '{name}' was never saved"))
        .to_string();

    for (expression, condition, expected) in interpolated_case_rows(world, step) {
        let condition: Condition = condition.parse().unwrap_or_else(|err| panic!("{err}"));
        let actual = extract::json_path_value(&saved, &expression, None).ok();
        gauntlet_rest::conditions::evaluate(
            &format!("'{name}' at '{expression}'"),
            actual.as_deref(),
            condition,
            &expected,
        )
        .unwrap_or_else(|err| panic!("{err}"));
    }
}
