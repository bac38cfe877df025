//! Request-body sourcing and structured modifications
//!
//! A request body can be loaded from a data file, either as validated JSON or
//! as a raw string, and reshaped with a table of modifications before it is
//! sent. Each modification names a dotted key path, an operation and, for ADD
//! and UPDATE, the new value:
//!
//! ```text
//! | key2.key3 | UPDATE | "new value3" |
//! ```
//!
//! ADD creates missing intermediate objects; UPDATE and DELETE require the
//! path to exist and fail with a path-not-found error otherwise.

use std::str::FromStr;

use serde_json::{Map, Value};
use tracing::debug;

use gauntlet_core::{GauntletError, Result};

/// How a data file's content is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Json,
    Text,
}

impl FromStr for BodyFormat {
    type Err = GauntletError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(BodyFormat::Json),
            "string" => Ok(BodyFormat::Text),
            _ => Err(GauntletError::UnsupportedBodyFormat {
                name: s.to_string(),
            }),
        }
    }
}

/// Reads a body from a data file. JSON content is validated on load so a
/// malformed fixture fails the sourcing step, not the assertion three steps
/// later.
pub async fn load(path: &str, format: BodyFormat) -> Result<String> {
    debug!("loading request body from {}", path);
    let raw = tokio::fs::read_to_string(path).await?;
    match format {
        BodyFormat::Text => Ok(raw),
        BodyFormat::Json => {
            let value: Value = serde_json::from_str(&raw)?;
            Ok(value.to_string())
        }
    }
}

/// Operation applied at a dotted key path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modification {
    Add,
    Update,
    Delete,
}

impl FromStr for Modification {
    type Err = GauntletError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "ADD" => Ok(Modification::Add),
            "UPDATE" => Ok(Modification::Update),
            "DELETE" => Ok(Modification::Delete),
            _ => Err(GauntletError::UnsupportedModification {
                name: s.to_string(),
            }),
        }
    }
}

/// Table cells parse as JSON where they can, so `5`, `true` and `{"a": 1}`
/// keep their types; anything else is a plain string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Applies one modification to `root` at `path`.
pub fn apply(
    root: &mut Value,
    path: &str,
    modification: Modification,
    value: Option<&Value>,
) -> Result<()> {
    let segments: Vec<&str> = path.split('.').collect();
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| GauntletError::PathNotFound {
            path: path.to_string(),
        })?;

    match modification {
        Modification::Add => {
            let parent = descend(root, parents, true, path)?;
            let map = as_object(parent, path)?;
            map.insert(
                (*last).to_string(),
                value.cloned().unwrap_or(Value::Null),
            );
        }
        Modification::Update => {
            let parent = descend(root, parents, false, path)?;
            let map = as_object(parent, path)?;
            let slot = map
                .get_mut(*last)
                .ok_or_else(|| GauntletError::PathNotFound {
                    path: path.to_string(),
                })?;
            *slot = value.cloned().unwrap_or(Value::Null);
        }
        Modification::Delete => {
            let parent = descend(root, parents, false, path)?;
            let map = as_object(parent, path)?;
            map.remove(*last)
                .ok_or_else(|| GauntletError::PathNotFound {
                    path: path.to_string(),
                })?;
        }
    }
    Ok(())
}

/// Applies a whole modifications table, each row `(path, operation, value)`.
pub fn apply_all(root: &mut Value, rows: &[(String, String, String)]) -> Result<()> {
    for (path, operation, raw_value) in rows {
        let modification: Modification = operation.parse()?;
        let value = match modification {
            Modification::Delete => None,
            _ => Some(parse_value(raw_value)),
        };
        apply(root, path, modification, value.as_ref())?;
    }
    Ok(())
}

fn descend<'a>(
    root: &'a mut Value,
    segments: &[&str],
    create: bool,
    full_path: &str,
) -> Result<&'a mut Value> {
    let mut current = root;
    for segment in segments {
        let map = as_object(current, full_path)?;
        current = if create {
            map.entry((*segment).to_string())
                .or_insert_with(|| Value::Object(Map::new()))
        } else {
            map.get_mut(*segment)
                .ok_or_else(|| GauntletError::PathNotFound {
                    path: full_path.to_string(),
                })?
        };
    }
    Ok(current)
}

fn as_object<'a>(value: &'a mut Value, path: &str) -> Result<&'a mut Map<String, Value>> {
    value
        .as_object_mut()
        .ok_or_else(|| GauntletError::PathNotFound {
            path: path.to_string(),
        })
}
