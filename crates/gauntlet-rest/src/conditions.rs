//! Table-driven response conditions
//!
//! Header, cookie and JSONPath checks share one operator vocabulary:
//!
//! ```text
//! | Content-Type | equal | application/json |
//! ```
//!
//! `length` counts characters of the value; `size` counts elements of a JSON
//! array value. Existence operators ignore the expected cell.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use gauntlet_core::{GauntletError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Equal,
    NotEqual,
    Exists,
    DoesNotExist,
    Contains,
    DoesNotContain,
    Length,
    Size,
}

impl FromStr for Condition {
    type Err = GauntletError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "equal" => Ok(Condition::Equal),
            "not equal" => Ok(Condition::NotEqual),
            "exists" => Ok(Condition::Exists),
            // Both spellings appear in feature files in the wild.
            "does not exist" | "does not exists" => Ok(Condition::DoesNotExist),
            "contains" => Ok(Condition::Contains),
            "does not contain" => Ok(Condition::DoesNotContain),
            "length" => Ok(Condition::Length),
            "size" => Ok(Condition::Size),
            _ => Err(GauntletError::UnsupportedCondition {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Condition::Equal => "equal",
            Condition::NotEqual => "not equal",
            Condition::Exists => "exists",
            Condition::DoesNotExist => "does not exist",
            Condition::Contains => "contains",
            Condition::DoesNotContain => "does not contain",
            Condition::Length => "length",
            Condition::Size => "size",
        };
        f.write_str(text)
    }
}

/// Checks one table row. `subject` names the checked field in the failure
/// message, e.g. `header 'Content-Type'`; `actual` is `None` when the field
/// is absent from the response.
pub fn evaluate(
    subject: &str,
    actual: Option<&str>,
    condition: Condition,
    expected: &str,
) -> Result<()> {
    let ok = match condition {
        Condition::Equal => actual == Some(expected),
        Condition::NotEqual => actual.is_some_and(|value| value != expected),
        Condition::Exists => actual.is_some(),
        Condition::DoesNotExist => actual.is_none(),
        Condition::Contains => actual.is_some_and(|value| value.contains(expected)),
        Condition::DoesNotContain => actual.is_some_and(|value| !value.contains(expected)),
        Condition::Length => match expected.trim().parse::<usize>() {
            Ok(expected_len) => actual.is_some_and(|value| value.chars().count() == expected_len),
            Err(_) => {
                return Err(failure(subject, condition, expected, Some("a numeric length")))
            }
        },
        Condition::Size => match expected.trim().parse::<usize>() {
            Ok(expected_size) => actual.is_some_and(|value| {
                serde_json::from_str::<Value>(value)
                    .ok()
                    .and_then(|parsed| parsed.as_array().map(Vec::len))
                    == Some(expected_size)
            }),
            Err(_) => return Err(failure(subject, condition, expected, Some("a numeric size"))),
        },
    };

    if ok {
        Ok(())
    } else {
        Err(failure(subject, condition, expected, actual))
    }
}

fn failure(
    subject: &str,
    condition: Condition,
    expected: &str,
    actual: Option<&str>,
) -> GauntletError {
    GauntletError::AssertionFailed {
        subject: subject.to_string(),
        condition: condition.to_string(),
        expected: expected.to_string(),
        actual: actual
            .map(|value| format!("'{value}'"))
            .unwrap_or_else(|| "no value".to_string()),
    }
}
