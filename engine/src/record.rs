//! Record and identifier types.
//!
//! Records are schema-less BSON documents. Every record carries an `_id`
//! assigned by the store; the store's native handle (an ObjectId) is turned
//! into its canonical string form before it leaves a [`Model`](crate::Model).

use std::fmt;
use std::str::FromStr;

use bson::{oid::ObjectId, Bson, Document};
use serde::{Serialize, Serializer};

use crate::{Error, Result};

/// A schema-less record.
pub type Record = Document;

/// Name of the identifier field every record carries.
pub const ID_FIELD: &str = "_id";

/// Opaque record identifier as handed out by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordId(Bson);

impl RecordId {
    /// Wrap a raw identifier value returned by the store.
    pub fn new(value: impl Into<Bson>) -> Self {
        Self(value.into())
    }

    /// Parse the canonical string form of an ObjectId.
    pub fn parse(s: &str) -> Result<Self> {
        ObjectId::parse_str(s)
            .map(|oid| Self(Bson::ObjectId(oid)))
            .map_err(|_| Error::MalformedId(s.to_string()))
    }

    /// The raw identifier value.
    pub fn as_bson(&self) -> &Bson {
        &self.0
    }

    /// Consume into the raw identifier value.
    pub fn into_bson(self) -> Bson {
        self.0
    }

    /// Filter selecting exactly the record with this identifier.
    pub fn filter(&self) -> Document {
        let mut filter = Document::new();
        filter.insert(ID_FIELD, self.0.clone());
        filter
    }
}

impl From<ObjectId> for RecordId {
    fn from(oid: ObjectId) -> Self {
        Self(Bson::ObjectId(oid))
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&canonical_id(&self.0))
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Canonical string form of an identifier value.
pub fn canonical_id(value: &Bson) -> String {
    match value {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Replace the record's `_id` with its canonical string form.
pub fn normalize_id(mut record: Record) -> Record {
    if let Some(id) = record.get(ID_FIELD) {
        let canonical = canonical_id(id);
        record.insert(ID_FIELD, canonical);
    }
    record
}

/// Render a record as relaxed extended JSON.
pub fn to_json(record: Record) -> serde_json::Value {
    Bson::Document(record).into_relaxed_extjson()
}

/// Convert an arbitrary JSON value into BSON.
pub fn from_json(value: &serde_json::Value) -> Result<Bson> {
    Ok(bson::to_bson(value)?)
}

/// Convert a JSON object into a document. `null` becomes the empty document.
pub fn document_from_json(name: &str, value: &serde_json::Value) -> Result<Document> {
    match value {
        serde_json::Value::Null => Ok(Document::new()),
        serde_json::Value::Object(_) => Ok(bson::to_document(value)?),
        _ => Err(Error::invalid_parameter(name, "expected an object")),
    }
}
