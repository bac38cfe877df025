//! Response assertions
//!
//! Status, body length, body text and JSON-schema checks over the last
//! response, plus the table-driven header and cookie checks. Every failure
//! names the mismatched field with its expected and actual values.

use serde_json::Value;

use gauntlet_core::{GauntletError, Result};

use crate::client::RestResponse;
use crate::conditions::{self, Condition};

pub fn assert_status(response: &RestResponse, expected: u16) -> Result<()> {
    if response.status == expected {
        return Ok(());
    }
    Err(GauntletError::AssertionFailed {
        subject: "response status".to_string(),
        condition: "equal".to_string(),
        expected: expected.to_string(),
        actual: format!("'{}'", response.status),
    })
}

pub fn assert_body_length(response: &RestResponse, expected: usize) -> Result<()> {
    let actual = response.body.len();
    if actual == expected {
        return Ok(());
    }
    Err(GauntletError::AssertionFailed {
        subject: "response length".to_string(),
        condition: "equal".to_string(),
        expected: expected.to_string(),
        actual: format!("'{actual}'"),
    })
}

pub fn assert_body_contains(response: &RestResponse, fragment: &str) -> Result<()> {
    if response.body.contains(fragment) {
        return Ok(());
    }
    Err(GauntletError::AssertionFailed {
        subject: "response body".to_string(),
        condition: "contains".to_string(),
        expected: fragment.to_string(),
        actual: format!("'{}'", response.body),
    })
}

/// Validates the response body against a JSON schema. Schema compilation
/// errors are reported as such; instance violations are collected into one
/// failure message.
pub fn assert_matches_schema(response: &RestResponse, schema_json: &str) -> Result<()> {
    let schema: Value = serde_json::from_str(schema_json)?;
    let instance: Value = serde_json::from_str(&response.body)?;

    let validator =
        jsonschema::validator_for(&schema).map_err(|err| GauntletError::InvalidSchema {
            reason: err.to_string(),
        })?;

    let violations: Vec<String> = validator
        .iter_errors(&instance)
        .map(|err| err.to_string())
        .collect();
    if violations.is_empty() {
        return Ok(());
    }
    Err(GauntletError::SchemaMismatch {
        violations: violations.join("; "),
    })
}

/// Checks each `(name, condition, expected)` row against a response header.
pub fn check_header_cases(
    response: &RestResponse,
    rows: &[(String, String, String)],
) -> Result<()> {
    for (name, condition, expected) in rows {
        let condition: Condition = condition.parse()?;
        conditions::evaluate(
            &format!("header '{name}'"),
            response.header(name),
            condition,
            expected,
        )?;
    }
    Ok(())
}

/// Checks each `(name, condition, expected)` row against a response cookie.
pub fn check_cookie_cases(
    response: &RestResponse,
    rows: &[(String, String, String)],
) -> Result<()> {
    for (name, condition, expected) in rows {
        let condition: Condition = condition.parse()?;
        conditions::evaluate(
            &format!("cookie '{name}'"),
            response.cookie(name),
            condition,
            expected,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn response(status: u16, body: &str) -> RestResponse {
        RestResponse {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            cookies: BTreeMap::from([("session".to_string(), "abc".to_string())]),
            body: body.to_string(),
            elapsed: Duration::from_millis(5),
            received_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn status_mismatch_names_both_codes() {
        let err = assert_status(&response(404, ""), 200).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("200"));
        assert!(message.contains("404"));
    }

    #[test]
    fn body_length_and_text() {
        let resp = response(200, "hello");
        assert!(assert_body_length(&resp, 5).is_ok());
        assert!(assert_body_length(&resp, 6).is_err());
        assert!(assert_body_contains(&resp, "ell").is_ok());
        assert!(assert_body_contains(&resp, "bye").is_err());
    }

    #[test]
    fn schema_validation_collects_violations() {
        let schema = r#"{
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "required": ["name"]
        }"#;

        assert!(assert_matches_schema(&response(200, r#"{"name": "alice"}"#), schema).is_ok());

        let err = assert_matches_schema(&response(200, r#"{"name": 7}"#), schema).unwrap_err();
        assert!(matches!(err, GauntletError::SchemaMismatch { .. }));

        let bad_schema = r#"{"type": "not-a-type"}"#;
        assert!(matches!(
            assert_matches_schema(&response(200, "{}"), bad_schema),
            Err(GauntletError::InvalidSchema { .. })
        ));
    }

    #[test]
    fn header_cases_match_case_insensitively() {
        let resp = response(200, "");
        let rows = vec![
            (
                "Content-Type".to_string(),
                "equal".to_string(),
                "application/json".to_string(),
            ),
            ("X-Missing".to_string(), "does not exist".to_string(), String::new()),
        ];
        assert!(check_header_cases(&resp, &rows).is_ok());

        let failing = vec![(
            "Content-Type".to_string(),
            "contains".to_string(),
            "xml".to_string(),
        )];
        assert!(check_header_cases(&resp, &failing).is_err());
    }

    #[test]
    fn cookie_cases_check_the_cookie_jar() {
        let resp = response(200, "");
        let rows = vec![("session".to_string(), "exists".to_string(), String::new())];
        assert!(check_cookie_cases(&resp, &rows).is_ok());

        let failing = vec![("missing".to_string(), "exists".to_string(), String::new())];
        assert!(check_cookie_cases(&resp, &failing).is_err());
    }
}
