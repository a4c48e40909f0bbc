//! Parameter extraction from the request's `data` object.

use bson::Document;
use serde_json::{Map, Value};

use crate::record::document_from_json;
use crate::{Error, Result};

/// The request's `data` as an object. A missing `data` is the empty object.
pub fn params(data: &Value) -> Result<&Map<String, Value>> {
    static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();

    match data {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(EMPTY.get_or_init(Map::new)),
        _ => Err(Error::invalid_parameter("data", "expected an object")),
    }
}

/// A present, non-null parameter.
pub fn required<'a>(params: &'a Map<String, Value>, name: &str) -> Result<&'a Value> {
    match params.get(name) {
        None | Some(Value::Null) => Err(Error::MissingParameter(name.to_string())),
        Some(value) => Ok(value),
    }
}

pub fn string<'a>(params: &'a Map<String, Value>, name: &str) -> Result<&'a str> {
    required(params, name)?
        .as_str()
        .ok_or_else(|| Error::invalid_parameter(name, "expected a string"))
}

/// Like [`required`], but an empty object, array or string also counts as
/// missing.
pub fn non_empty<'a>(params: &'a Map<String, Value>, name: &str) -> Result<&'a Value> {
    let value = required(params, name)?;
    let empty = match value {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    };
    if empty {
        return Err(Error::MissingParameter(name.to_string()));
    }
    Ok(value)
}

/// An optional object parameter as a document; missing means empty.
pub fn document(params: &Map<String, Value>, name: &str) -> Result<Document> {
    document_from_json(name, params.get(name).unwrap_or(&Value::Null))
}

/// An optional non-negative integer, given as a number or numeric string.
/// Missing or `null` is 0.
pub fn unsigned(params: &Map<String, Value>, name: &str) -> Result<u64> {
    let invalid = || Error::invalid_parameter(name, "must be a non-negative integer");

    match params.get(name) {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n.as_u64().ok_or_else(invalid),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(0),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn params_accepts_object_or_nothing() {
        assert!(params(&Value::Null).unwrap().is_empty());
        assert_eq!(params(&json!({"a": 1})).unwrap().len(), 1);
        assert!(params(&json!("text")).is_err());
        assert!(params(&json!([1])).is_err());
    }

    #[test]
    fn required_and_string() {
        let p = map(json!({"key": "k", "n": 1, "nothing": null}));

        assert_eq!(string(&p, "key").unwrap(), "k");
        assert_eq!(
            string(&p, "n"),
            Err(Error::invalid_parameter("n", "expected a string"))
        );
        assert_eq!(
            required(&p, "nothing"),
            Err(Error::MissingParameter("nothing".into()))
        );
        assert_eq!(
            string(&p, "absent"),
            Err(Error::MissingParameter("absent".into()))
        );
    }

    #[test]
    fn non_empty_rejects_empty_containers() {
        let p = map(json!({"a": {}, "b": [], "c": "", "d": {"x": 1}, "e": 0}));

        assert!(non_empty(&p, "a").is_err());
        assert!(non_empty(&p, "b").is_err());
        assert!(non_empty(&p, "c").is_err());
        assert!(non_empty(&p, "d").is_ok());
        assert!(non_empty(&p, "e").is_ok());
    }

    #[test]
    fn documents() {
        let p = map(json!({"filter": {"name": "a"}, "bad": 3}));

        assert_eq!(document(&p, "filter").unwrap(), doc! { "name": "a" });
        assert_eq!(document(&p, "missing").unwrap(), Document::new());
        assert!(document(&p, "bad").is_err());
    }

    #[test]
    fn unsigned_values() {
        let p = map(json!({"a": 5, "b": "10", "c": null, "d": -1, "e": "x", "f": true, "g": ""}));

        assert_eq!(unsigned(&p, "a").unwrap(), 5);
        assert_eq!(unsigned(&p, "b").unwrap(), 10);
        assert_eq!(unsigned(&p, "c").unwrap(), 0);
        assert_eq!(unsigned(&p, "missing").unwrap(), 0);
        assert_eq!(unsigned(&p, "g").unwrap(), 0);
        assert!(unsigned(&p, "d").is_err());
        assert!(unsigned(&p, "e").is_err());
        assert!(unsigned(&p, "f").is_err());
    }
}
