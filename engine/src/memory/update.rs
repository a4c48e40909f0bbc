//! Update-operator application for the in-memory store.
//!
//! Understands `$set`, `$unset` and `$inc` with dotted paths. A document
//! without operators is rejected, matching the behaviour of `update_one` /
//! `update_many` in MongoDB.

use bson::{Bson, Document};

use super::filter::as_f64;
use crate::record::ID_FIELD;
use crate::{Error, Result};

/// Apply `update` to `doc` in place. Returns whether anything changed.
pub fn apply(doc: &mut Document, update: &Document) -> Result<bool> {
    let mut changed = false;

    for (op, fields) in update {
        if !op.starts_with('$') {
            return Err(Error::InvalidDocument(
                "update document must contain only operators".to_string(),
            ));
        }
        let Bson::Document(fields) = fields else {
            return Err(Error::InvalidDocument(format!(
                "{op} expects a document of fields"
            )));
        };

        for (path, value) in fields {
            changed |= match op.as_str() {
                "$set" => set(doc, path, value.clone())?,
                "$unset" => unset(doc, path)?,
                "$inc" => increment(doc, path, value)?,
                other => {
                    return Err(Error::InvalidDocument(format!(
                        "unsupported update operator: {other}"
                    )))
                }
            };
        }
    }

    Ok(changed)
}

/// Seed for an upsert: the equality conditions of `filter`.
pub fn seed_from_filter(filter: &Document) -> Result<Document> {
    let mut seed = Document::new();

    for (key, condition) in filter {
        if key.starts_with('$') {
            continue;
        }
        let value = match condition {
            Bson::Document(ops) if ops.keys().next().is_some_and(|k| k.starts_with('$')) => {
                match ops.get("$eq") {
                    Some(v) => v.clone(),
                    None => continue,
                }
            }
            other => other.clone(),
        };
        set(&mut seed, key, value)?;
    }

    Ok(seed)
}

fn set(doc: &mut Document, path: &str, value: Bson) -> Result<bool> {
    guard_id(doc, path, &value)?;

    let (parent, field) = parent_or_create(doc, path)?;
    if parent.get(field) == Some(&value) {
        return Ok(false);
    }
    parent.insert(field, value);
    Ok(true)
}

fn unset(doc: &mut Document, path: &str) -> Result<bool> {
    if path == ID_FIELD {
        return Err(Error::InvalidDocument(
            "the _id field cannot be removed".to_string(),
        ));
    }
    match existing_parent(doc, path)? {
        Some((parent, field)) => Ok(parent.remove(field).is_some()),
        None => Ok(false),
    }
}

fn increment(doc: &mut Document, path: &str, by: &Bson) -> Result<bool> {
    if as_f64(by).is_none() {
        return Err(Error::InvalidDocument(format!(
            "cannot increment '{path}' by a non-numeric value"
        )));
    }

    let (parent, field) = parent_or_create(doc, path)?;
    let next = match parent.get(field) {
        None => by.clone(),
        Some(current) => add(current, by).ok_or_else(|| {
            Error::InvalidDocument(format!("cannot increment non-numeric field '{path}'"))
        })?,
    };

    if parent.get(field) == Some(&next) {
        return Ok(false);
    }
    parent.insert(field, next);
    Ok(true)
}

fn add(a: &Bson, b: &Bson) -> Option<Bson> {
    match (a, b) {
        (Bson::Int32(x), Bson::Int32(y)) => Some(
            x.checked_add(*y)
                .map(Bson::Int32)
                .unwrap_or_else(|| Bson::Int64(i64::from(*x) + i64::from(*y))),
        ),
        (Bson::Double(_), _) | (_, Bson::Double(_)) => Some(Bson::Double(as_f64(a)? + as_f64(b)?)),
        _ => {
            let x = integer(a)?;
            let y = integer(b)?;
            x.checked_add(y).map(Bson::Int64)
        }
    }
}

fn integer(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(n) => Some(i64::from(*n)),
        Bson::Int64(n) => Some(*n),
        _ => None,
    }
}

fn guard_id(doc: &Document, path: &str, value: &Bson) -> Result<()> {
    if path == ID_FIELD || path.starts_with("_id.") {
        match doc.get(ID_FIELD) {
            Some(existing) if path == ID_FIELD && existing == value => {}
            None if path == ID_FIELD => {}
            _ => {
                return Err(Error::InvalidDocument(
                    "performing an update on the path '_id' would modify the immutable field '_id'"
                        .to_string(),
                ))
            }
        }
    }
    Ok(())
}

fn split_path(path: &str) -> Result<(Vec<&str>, &str)> {
    let mut segments: Vec<&str> = path.split('.').collect();
    let field = segments.pop().unwrap_or(path);
    if field.is_empty() || segments.iter().any(|s| s.is_empty()) {
        return Err(Error::InvalidDocument(format!("invalid field path '{path}'")));
    }
    Ok((segments, field))
}

fn not_a_document(segment: &str, path: &str) -> Error {
    Error::InvalidDocument(format!(
        "cannot traverse non-document field '{segment}' in '{path}'"
    ))
}

/// Walk to the document holding the last segment of `path`, inserting
/// missing intermediate documents.
fn parent_or_create<'a, 'p>(
    doc: &'a mut Document,
    path: &'p str,
) -> Result<(&'a mut Document, &'p str)> {
    let (segments, field) = split_path(path)?;

    let mut current = doc;
    for segment in segments {
        if !current.contains_key(segment) {
            current.insert(segment, Document::new());
        }
        current = match current.get_mut(segment) {
            Some(Bson::Document(inner)) => inner,
            _ => return Err(not_a_document(segment, path)),
        };
    }
    Ok((current, field))
}

/// Like [`parent_or_create`], but a missing intermediate yields `None`.
fn existing_parent<'a, 'p>(
    doc: &'a mut Document,
    path: &'p str,
) -> Result<Option<(&'a mut Document, &'p str)>> {
    let (segments, field) = split_path(path)?;

    let mut current = doc;
    for segment in segments {
        current = match current.get_mut(segment) {
            Some(Bson::Document(inner)) => inner,
            None => return Ok(None),
            Some(_) => return Err(not_a_document(segment, path)),
        };
    }
    Ok(Some((current, field)))
}
