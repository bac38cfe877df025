//! SOAP step definitions
//!
//! Connect to a WSDL once, execute operations with optional placeholder
//! substitution, and assert on the response XML — fault or not, the response
//! is data and these steps decide what passes.

use std::collections::BTreeMap;

use cucumber::gherkin::Step;
use cucumber::{given, then, when};

use gauntlet_rest::{conditions, Condition};
use gauntlet_soap::{read_element, SoapClient};

use crate::world::GauntletWorld;

#[given(expr = "I connect to the webservice whose WSDL is {string}")]
pub async fn connect_to_webservice(world: &mut GauntletWorld, address: String) {
    let address = world.ctx.vars.interpolate(&address);
    let client = world.soap.client.get_or_insert_with(SoapClient::new);
    let wsdl = client
        .load_wsdl(&address)
        .await
        .unwrap_or_else(|err| panic!("{err}"));
    world.soap.wsdl = Some(wsdl);
}

async fn execute_operation(
    world: &mut GauntletWorld,
    operation: &str,
    request_path: &str,
    variables: BTreeMap<String, String>,
) {
    let path = world.ctx.vars.interpolate(request_path);
    let request = tokio::fs::read_to_string(&path)
        .await
        .unwrap_or_else(|err| panic!("cannot read request template '{path}': {err}"));

    let (client, wsdl) = world.soap_connection();
    let response = client
        .invoke_with_params(wsdl, operation, &request, &variables)
        .await
        .unwrap_or_else(|err| panic!("{err}"));
    world.soap.last_response = Some(response);
}

#[when(expr = "I execute the {string} operation with the request in {string}")]
pub async fn execute_without_params(world: &mut GauntletWorld, operation: String, path: String) {
    execute_operation(world, &operation, &path, BTreeMap::new()).await;
}

#[when(expr = "I execute the {string} operation with the request in {string} replacing:")]
pub async fn execute_with_params(
    world: &mut GauntletWorld,
    operation: String,
    path: String,
    step: &Step,
) {
    let mut variables = BTreeMap::new();
    if let Some(table) = step.table.as_ref() {
        for row in &table.rows {
            let name = row.first().cloned().unwrap_or_default();
            let value = row.get(1).cloned().unwrap_or_default();
            variables.insert(name, world.ctx.vars.interpolate(&value));
        }
    }
    execute_operation(world, &operation, &path, variables).await;
}

#[then(expr = "the webservice response must contain {string}")]
pub async fn assert_soap_response_contains(world: &mut GauntletWorld, text: String) {
    let expected = world.ctx.vars.interpolate(&text);
    let response = world.soap_response();
    assert!(
        response.contains(&expected),
        "text '{expected}' was not found in the webservice response: {response}"
    );
}

#[then(expr = "the webservice response matches the following cases:")]
pub async fn check_soap_response_cases(world: &mut GauntletWorld, step: &Step) {
    let table = step.table.as_ref().expect("this step requires a data table");
    let response = world.soap_response().to_string();

    for row in &table.rows {
        let element = row.first().cloned().unwrap_or_default();
        let condition: Condition = row
            .get(1)
            .cloned()
            .unwrap_or_default()
            .parse()
            .unwrap_or_else(|err| panic!("{err}"));
        let expected = world
            .ctx
            .vars
            .interpolate(&row.get(2).cloned().unwrap_or_default());

        let actual = read_element(&response, &element).unwrap_or_else(|err| panic!("{err}"));
        conditions::evaluate(
            &format!("element '{element}'"),
            actual.as_deref(),
            condition,
            &expected,
        )
        .unwrap_or_else(|err| panic!("{err}"));
    }
}

#[given(
    expr = "I save the value of {string} from the webservice response in environment variable {string}"
)]
pub async fn save_soap_element(world: &mut GauntletWorld, element: String, name: String) {
    let response = world.soap_response();
    let value = read_element(response, &element)
        .unwrap_or_else(|err| panic!("{err}"))
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| panic!("element '{element}' is empty or missing in the response"));
    world.ctx.vars.set(name, value);
}
