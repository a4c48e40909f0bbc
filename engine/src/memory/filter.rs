//! Query filter evaluation over BSON documents.
//!
//! Supports the subset of the MongoDB query language the in-memory store
//! needs: implicit equality, `$eq $ne $gt $gte $lt $lte $in $nin $exists`
//! and the logical `$and $or $nor`. Field names may be dotted paths.

use std::cmp::Ordering;

use bson::{Bson, Document};

use crate::{Error, Result};

/// Whether `doc` satisfies `filter`. The empty filter matches everything.
pub fn matches(doc: &Document, filter: &Document) -> Result<bool> {
    for (key, condition) in filter {
        let satisfied = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in clauses(key, condition)? {
                    if !matches(doc, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => any_clause(doc, key, condition)?,
            "$nor" => !any_clause(doc, key, condition)?,
            op if op.starts_with('$') => {
                return Err(Error::InvalidDocument(format!(
                    "unknown top-level operator: {op}"
                )))
            }
            path => matches_field(lookup(doc, path), condition)?,
        };

        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

fn any_clause(doc: &Document, key: &str, condition: &Bson) -> Result<bool> {
    for clause in clauses(key, condition)? {
        if matches(doc, clause)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn clauses<'a>(key: &str, condition: &'a Bson) -> Result<Vec<&'a Document>> {
    let Bson::Array(items) = condition else {
        return Err(Error::InvalidDocument(format!("{key} expects an array")));
    };
    if items.is_empty() {
        return Err(Error::InvalidDocument(format!(
            "{key} expects a non-empty array"
        )));
    }
    items
        .iter()
        .map(|item| match item {
            Bson::Document(d) => Ok(d),
            _ => Err(Error::InvalidDocument(format!(
                "{key} entries must be documents"
            ))),
        })
        .collect()
}

/// Resolve a dotted path inside a document. Numeric segments index arrays.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            Bson::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn is_operator_document(condition: &Bson) -> Option<&Document> {
    match condition {
        Bson::Document(d) if d.keys().next().is_some_and(|k| k.starts_with('$')) => Some(d),
        _ => None,
    }
}

fn matches_field(value: Option<&Bson>, condition: &Bson) -> Result<bool> {
    let Some(operators) = is_operator_document(condition) else {
        return Ok(equals(value, condition));
    };

    for (op, operand) in operators {
        let satisfied = match op.as_str() {
            "$eq" => equals(value, operand),
            "$ne" => !equals(value, operand),
            "$gt" => compares(value, operand, |o| o == Ordering::Greater),
            "$gte" => compares(value, operand, |o| o != Ordering::Less),
            "$lt" => compares(value, operand, |o| o == Ordering::Less),
            "$lte" => compares(value, operand, |o| o != Ordering::Greater),
            "$in" => in_list(value, op, operand)?,
            "$nin" => !in_list(value, op, operand)?,
            "$exists" => value.is_some() == truthy(operand),
            other => {
                return Err(Error::InvalidDocument(format!(
                    "unsupported query operator: {other}"
                )))
            }
        };

        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Field equality: a missing field equals `null`, an array field equals any
/// of its elements as well as the whole array.
fn equals(value: Option<&Bson>, target: &Bson) -> bool {
    match value {
        None => matches!(target, Bson::Null),
        Some(Bson::Array(items)) if !matches!(target, Bson::Array(_)) => {
            items.iter().any(|item| values_equal(item, target))
        }
        Some(v) => values_equal(v, target),
    }
}

fn compares(value: Option<&Bson>, target: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    match value {
        None => false,
        Some(Bson::Array(items)) => items
            .iter()
            .any(|item| compare(item, target).is_some_and(&accept)),
        Some(v) => compare(v, target).is_some_and(accept),
    }
}

fn in_list(value: Option<&Bson>, op: &str, operand: &Bson) -> Result<bool> {
    let Bson::Array(candidates) = operand else {
        return Err(Error::InvalidDocument(format!("{op} expects an array")));
    };
    Ok(candidates.iter().any(|candidate| equals(value, candidate)))
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Null | Bson::Undefined => false,
        other => as_f64(other).map_or(true, |n| n != 0.0),
    }
}

pub(crate) fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

/// Equality that treats all numeric types as one.
pub fn values_equal(a: &Bson, b: &Bson) -> bool {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Ordering between comparable values of the same kind.
pub fn compare(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => {
            Some(x.timestamp_millis().cmp(&y.timestamp_millis()))
        }
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.bytes().cmp(&y.bytes())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn user() -> Document {
        doc! {
            "name": "Alice",
            "age": 30,
            "score": 7.5,
            "tags": ["admin", "staff"],
            "address": { "city": "Lisbon", "zip": "1000" },
        }
    }

    fn check(filter: Document) -> bool {
        matches(&user(), &filter).unwrap()
    }

    #[test]
    fn empty_filter_matches() {
        assert!(check(doc! {}));
    }

    #[test]
    fn implicit_equality() {
        assert!(check(doc! { "name": "Alice" }));
        assert!(!check(doc! { "name": "Bob" }));
        assert!(check(doc! { "name": "Alice", "age": 30 }));
        assert!(!check(doc! { "name": "Alice", "age": 31 }));
    }

    #[test]
    fn numeric_types_compare_across_widths() {
        assert!(check(doc! { "age": 30_i64 }));
        assert!(check(doc! { "age": 30.0 }));
        assert!(check(doc! { "score": { "$gt": 7 } }));
    }

    #[test]
    fn missing_field_equals_null() {
        assert!(check(doc! { "nickname": Bson::Null }));
        assert!(!check(doc! { "name": Bson::Null }));
    }

    #[test]
    fn dotted_paths() {
        assert!(check(doc! { "address.city": "Lisbon" }));
        assert!(!check(doc! { "address.city": "Porto" }));
        assert!(check(doc! { "tags.1": "staff" }));
        assert!(!check(doc! { "name.first": "Alice" }));
    }

    #[test]
    fn array_fields_match_elements() {
        assert!(check(doc! { "tags": "admin" }));
        assert!(check(doc! { "tags": ["admin", "staff"] }));
        assert!(!check(doc! { "tags": ["staff", "admin"] }));
        assert!(check(doc! { "tags": { "$in": ["guest", "staff"] } }));
    }

    #[test]
    fn comparison_operators() {
        assert!(check(doc! { "age": { "$gt": 18, "$lt": 65 } }));
        assert!(check(doc! { "age": { "$gte": 30, "$lte": 30 } }));
        assert!(!check(doc! { "age": { "$gt": 30 } }));
        assert!(check(doc! { "name": { "$gt": "Aaron" } }));
        // Mismatched kinds never compare.
        assert!(!check(doc! { "name": { "$gt": 1 } }));
        assert!(!check(doc! { "missing": { "$lt": 1 } }));
    }

    #[test]
    fn membership_and_existence() {
        assert!(check(doc! { "name": { "$in": ["Bob", "Alice"] } }));
        assert!(check(doc! { "name": { "$nin": ["Bob"] } }));
        assert!(check(doc! { "name": { "$ne": "Bob" } }));
        assert!(check(doc! { "age": { "$exists": true } }));
        assert!(check(doc! { "nickname": { "$exists": false } }));
        assert!(!check(doc! { "nickname": { "$exists": 1 } }));
    }

    #[test]
    fn logical_operators() {
        assert!(check(doc! { "$or": [{ "name": "Bob" }, { "age": 30 }] }));
        assert!(!check(doc! { "$and": [{ "name": "Alice" }, { "age": 31 }] }));
        assert!(check(doc! { "$nor": [{ "name": "Bob" }, { "age": 31 }] }));
    }

    #[test]
    fn rejects_unknown_operators() {
        assert!(matches(&user(), &doc! { "$where": "true" }).is_err());
        assert!(matches(&user(), &doc! { "age": { "$regex": "3" } }).is_err());
        assert!(matches(&user(), &doc! { "$or": [] }).is_err());
        assert!(matches(&user(), &doc! { "name": { "$in": "Alice" } }).is_err());
    }
}
