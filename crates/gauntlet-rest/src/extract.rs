//! JSONPath extraction for save steps
//!
//! A save step names a JSONPath expression, normally evaluated over the last
//! response body. The expression may instead carry its own document inline:
//! `<json>.$<path>` applies `$<path>` to the JSON that precedes it, which is
//! how a step re-queries a value saved by an earlier step.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use serde_json_path::JsonPath;

use gauntlet_core::{GauntletError, Result};

/// Splits `["a","b","c"].$[0]` into the inline document and the expression.
static INLINE_SOURCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^((.*)(\.)+)(\$.*)$").expect("inline source pattern"));

/// A parsed save-step expression: the JSONPath itself and, when the step
/// carried one, the inline document it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathQuery {
    pub inline_source: Option<String>,
    pub expression: String,
}

/// Parses a step's element text. Without an inline document the expression
/// is returned unchanged and the caller supplies the response body.
pub fn parse_query(element: &str) -> PathQuery {
    match INLINE_SOURCE.captures(element) {
        Some(captures) => PathQuery {
            inline_source: Some(captures[2].to_string()),
            expression: captures[4].to_string(),
        },
        None => PathQuery {
            inline_source: None,
            expression: element.to_string(),
        },
    }
}

/// Renders an extracted value the way a feature file expects to compare it:
/// strings bare, everything else as compact JSON.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Evaluates a JSONPath expression over a JSON document, optionally picking
/// one match by position. No match is a path-not-found error.
pub fn json_path_value(json: &str, expression: &str, position: Option<usize>) -> Result<String> {
    let document: Value = serde_json::from_str(json)?;
    let path = JsonPath::parse(expression).map_err(|err| GauntletError::InvalidExpression {
        expression: expression.to_string(),
        reason: err.to_string(),
    })?;
    let matches = path.query(&document).all();

    match position {
        Some(index) => matches
            .get(index)
            .map(|value| value_to_string(value))
            .ok_or_else(|| GauntletError::PathNotFound {
                path: format!("{expression} in position {index}"),
            }),
        None => match matches.as_slice() {
            [] => Err(GauntletError::PathNotFound {
                path: expression.to_string(),
            }),
            [single] => Ok(value_to_string(single)),
            many => Ok(Value::Array(many.iter().map(|v| (*v).clone()).collect()).to_string()),
        },
    }
}

/// Extraction for save steps: empty results fail the step so a scenario
/// never silently saves an empty variable.
pub fn extract_non_empty(json: &str, expression: &str, position: Option<usize>) -> Result<String> {
    let value = json_path_value(json, expression, position)?;
    if value.is_empty() {
        return Err(GauntletError::EmptyExtraction {
            expression: expression.to_string(),
        });
    }
    Ok(value)
}
