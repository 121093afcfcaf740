//! Collapses entity references in write payloads into bare identifiers.
//!
//! An entity reference is any JSON object carrying an `id` member, usually a
//! record previously returned by the API. The backend only understands the
//! identifier, so references are replaced before every create and update.

use serde_json::{Map, Value};

use crate::error::{ApiError, Result};

/// Identifier carried by an entity reference.
///
/// Missing, `null`, `false`, `0` and empty-string identifiers are treated as
/// absent.
pub fn entity_id(entity: &Map<String, Value>) -> Option<&Value> {
    match entity.get("id")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        id => Some(id),
    }
}

pub(crate) fn require_id<'a>(entity: &'a Map<String, Value>, context: &str) -> Result<&'a Value> {
    entity_id(entity).ok_or_else(|| ApiError::InvalidValue(format!("{context}: entity reference needs an id")))
}

/// Replace every entity reference in `data` by its identifier.
///
/// Array values are rebuilt from their entity references and integers. Any
/// other element (strings, floats, nested arrays) is dropped with a warning.
pub fn normalize_payload(data: &mut Map<String, Value>) -> Result<()> {
    for (key, value) in data.iter_mut() {
        match value {
            Value::Object(entity) => {
                let id = require_id(entity, key)?.clone();
                *value = id;
            }
            Value::Array(items) => {
                let mut ids = Vec::with_capacity(items.len());
                for item in items.iter() {
                    match item {
                        Value::Object(entity) => ids.push(require_id(entity, key)?.clone()),
                        Value::Number(n) if n.is_i64() || n.is_u64() => ids.push(item.clone()),
                        other => {
                            tracing::warn!(field = %key, element = %other, "dropping non-identifier element from list field");
                        }
                    }
                }
                *items = ids;
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("payload must be an object"),
        }
    }

    #[test]
    fn single_reference_becomes_id() {
        let mut data = payload(json!({"name": "sh010", "sequence": {"id": 4, "name": "sq01"}}));
        normalize_payload(&mut data).unwrap();
        assert_eq!(Value::Object(data), json!({"name": "sh010", "sequence": 4}));
    }

    #[test]
    fn list_keeps_ids_and_integers() {
        let mut data = payload(json!({"assets": [{"id": 1}, 2, {"id": 3, "name": "tree"}]}));
        normalize_payload(&mut data).unwrap();
        assert_eq!(data["assets"], json!([1, 2, 3]));
    }

    #[test]
    fn list_drops_other_scalars() {
        let mut data = payload(json!({"tags": ["hero", 7, 1.5, null, {"id": 9}]}));
        normalize_payload(&mut data).unwrap();
        assert_eq!(data["tags"], json!([7, 9]));
    }

    #[test]
    fn scalars_are_untouched() {
        let mut data = payload(json!({"name": "Str", "frame_in": 1001, "active": true, "notes": null}));
        let before = data.clone();
        normalize_payload(&mut data).unwrap();
        assert_eq!(data, before);
    }

    #[test]
    fn reference_without_id_fails() {
        let mut data = payload(json!({"project": {"name": "no id"}}));
        let err = normalize_payload(&mut data).unwrap_err();
        assert!(matches!(err, ApiError::InvalidValue(ref msg) if msg.starts_with("project")));
    }

    #[test]
    fn list_reference_without_id_fails() {
        let mut data = payload(json!({"assets": [1, {"id": null}]}));
        assert!(matches!(normalize_payload(&mut data), Err(ApiError::InvalidValue(_))));
    }

    #[test]
    fn falsy_ids_are_absent() {
        for id in [json!(null), json!(0), json!(""), json!(false)] {
            let entity = payload(json!({"id": id.clone()}));
            assert!(entity_id(&entity).is_none(), "{id}");
        }
        let entity = payload(json!({"id": "a1"}));
        assert_eq!(entity_id(&entity), Some(&json!("a1")));
    }
}
