//! Add/remove/set reconciliation for many-to-many fields.
//!
//! # Design
//! The backend's update call always overwrites a list field. To add to or
//! remove from a relationship the client fetches the current value first,
//! applies the requested change locally and sends the whole list back.
//! Membership is plain JSON equality, so identifiers must already be
//! normalized on both sides.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::{ApiError, Result};

/// How a requested list is merged with a field's current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum M2MMode {
    Add,
    Remove,
    Set,
}

impl FromStr for M2MMode {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add" => Ok(M2MMode::Add),
            "remove" => Ok(M2MMode::Remove),
            "set" => Ok(M2MMode::Set),
            other => Err(ApiError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for M2MMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            M2MMode::Add => "add",
            M2MMode::Remove => "remove",
            M2MMode::Set => "set",
        };
        f.write_str(name)
    }
}

/// Field name to mode name, as supplied by the caller.
pub type M2MModes = BTreeMap<String, String>;

/// Reconcile one field.
///
/// Returns `Ok(None)` when nothing was requested for the field (absent,
/// `null` or an empty list).
pub fn reconcile(field: &str, initial: &Value, requested: Option<&Value>, mode: M2MMode) -> Result<Option<Vec<Value>>> {
    let Value::Array(current) = initial else {
        return Err(ApiError::NotM2MField(field.to_string()));
    };
    let requested = match requested {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) if items.is_empty() => return Ok(None),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(ApiError::InvalidValue(format!("data for {field} must be an array")));
        }
    };

    let mut result = current.clone();
    match mode {
        M2MMode::Add => {
            for value in requested {
                if !result.contains(value) {
                    result.push(value.clone());
                }
            }
        }
        M2MMode::Remove => {
            for value in requested {
                if let Some(index) = result.iter().position(|v| v == value) {
                    result.remove(index);
                }
            }
        }
        M2MMode::Set => result = requested.clone(),
    }
    Ok(Some(result))
}

/// Build the outgoing update payload for a record under m2m modes.
///
/// `initial` is the record as fetched from the server, restricted to the
/// governed fields. Fields named in `modes` but absent from `initial` are
/// skipped. Reconciled values replace whatever `data` held for the field; a
/// governed field with nothing requested (absent, `null` or empty) is left
/// out of the payload so the server keeps its current list.
pub fn merge_m2m(initial: &Map<String, Value>, data: &Map<String, Value>, modes: &M2MModes) -> Result<Map<String, Value>> {
    let mut merged = data.clone();
    for (field, mode) in modes {
        let Some(current) = initial.get(field) else {
            tracing::debug!(%field, "m2m field missing from fetched record, skipping");
            continue;
        };
        if !current.is_array() {
            return Err(ApiError::NotM2MField(field.clone()));
        }
        let mode: M2MMode = mode.parse()?;
        match reconcile(field, current, data.get(field), mode)? {
            Some(value) => {
                tracing::debug!(%field, %mode, count = value.len(), "reconciled m2m field");
                merged.insert(field.clone(), Value::Array(value));
            }
            None => {
                merged.remove(field);
            }
        }
    }
    Ok(merged)
}
