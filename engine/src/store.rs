//! The document store seam.
//!
//! [`DocumentStore`] is the set of primitives a backing document database has
//! to provide. Every method is a single blocking request against one named
//! collection; there is no batching, locking or retrying at this level.

use bson::{Bson, Document};
use serde::Serialize;

use crate::record::RecordId;
use crate::Result;

/// Outcome of an update request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    /// Records matched by the filter
    pub matched: u64,
    /// Records actually changed
    pub modified: u64,
    /// Identifier of the record created by an upsert
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upserted_id: Option<RecordId>,
}

/// Primitive operations of a document database.
///
/// Implementations must be shareable across threads; connection-level
/// thread safety is the implementation's concern.
pub trait DocumentStore: Send + Sync {
    /// Names of all collections in the database.
    fn collection_names(&self) -> Result<Vec<String>>;

    /// Number of records matching `filter`.
    fn count(&self, collection: &str, filter: Document) -> Result<u64>;

    /// Distinct values of `field` among records matching `filter`.
    fn distinct(&self, collection: &str, field: &str, filter: Document) -> Result<Vec<Bson>>;

    /// First record matching `filter` in natural order.
    fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>>;

    /// Records matching `filter` in natural order. `skip` is applied before
    /// `limit`; a `limit` of 0 means no limit.
    fn find(
        &self,
        collection: &str,
        filter: Document,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Document>>;

    /// Insert one record, returning its identifier.
    fn insert_one(&self, collection: &str, record: Document) -> Result<Bson>;

    /// Insert records in order, returning their identifiers in the same order.
    fn insert_many(&self, collection: &str, records: Vec<Document>) -> Result<Vec<Bson>>;

    /// Apply `update` to the first record matching `filter`, inserting a new
    /// record when nothing matches and `upsert` is set.
    fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome>;

    /// Apply `update` to every record matching `filter`.
    fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateOutcome>;

    /// Delete the first record matching `filter`.
    fn delete_one(&self, collection: &str, filter: Document) -> Result<u64>;

    /// Delete every record matching `filter`.
    fn delete_many(&self, collection: &str, filter: Document) -> Result<u64>;
}
