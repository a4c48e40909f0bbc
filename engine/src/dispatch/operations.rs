//! The operations reachable through the dispatcher.

use bson::{Bson, Document};
use serde_json::{json, Value};

use super::envelope::{Reply, Status};
use super::shape;
use super::Services;
use crate::cache::ConnectionCheck;
use crate::encode;
use crate::record::{document_from_json, from_json, to_json, ID_FIELD};
use crate::{Error, Result};

pub fn mongo_connection_check(services: &Services) -> Result<Reply> {
    let check = services.db.check_connection();
    let status = if check.status {
        Status::Success
    } else {
        Status::Error
    };
    Ok(Reply::new(status, check.collections).with_message(check.message))
}

pub fn mongo_insert(services: &Services, collection: &str, data: &Value) -> Result<Reply> {
    let payload = from_json(data)?;
    let ids = services
        .db
        .model(collection)
        .insert(payload)?
        .ok_or_else(|| {
            Error::invalid_parameter("data", "expected a document or an array of documents")
        })?;

    let data = match ids.as_slice() {
        [id] if !data.is_array() => Value::from(id.to_string()),
        _ => ids.iter().map(|id| Value::from(id.to_string())).collect(),
    };
    Ok(Reply::success(data).with_collection(collection))
}

pub fn mongo_get(services: &Services, collection: &str, data: &Value) -> Result<Reply> {
    let filter = document_from_json("data", data)?;
    let records = services.db.model(collection).find_all(filter, 0, 0)?;
    Ok(Reply::success(records_to_json(records)).with_collection(collection))
}

/// Every record of the collection. `data` may carry `skip` and `limit`.
pub fn mongo_get_all(services: &Services, collection: &str, data: &Value) -> Result<Reply> {
    let paging = shape::params(data)?;
    let skip = shape::unsigned(paging, "skip")?;
    let limit = shape::unsigned(paging, "limit")?;

    let records = services
        .db
        .model(collection)
        .find_all(Document::new(), skip, limit)?;
    Ok(Reply::success(records_to_json(records)).with_collection(collection))
}

pub fn mongo_delete(services: &Services, collection: &str, data: &Value) -> Result<Reply> {
    let filter = document_from_json("data", data)?;
    let deleted = services.db.model(collection).delete(filter)?;
    Ok(Reply::success(deleted).with_collection(collection))
}

/// Update matching records; a filter holding a string `_id` targets that
/// record alone.
pub fn mongo_update(
    services: &Services,
    collection: &str,
    filter: Document,
    update: Document,
) -> Result<Reply> {
    let model = services.db.model(collection);
    let modified = match filter.get(ID_FIELD) {
        Some(Bson::String(id)) => model.update_by_id(id, update)?,
        _ => model.update(filter, update, true)?,
    };
    Ok(Reply::success(modified).with_collection(collection))
}

pub fn mongo_upsert(
    services: &Services,
    collection: &str,
    filter: Document,
    update: Document,
) -> Result<Reply> {
    let outcome = services.db.model(collection).upsert(filter, update)?;
    let data = serde_json::to_value(outcome).map_err(|e| Error::Serialization(e.to_string()))?;
    Ok(Reply::success(data).with_collection(collection))
}

/// Never fails: a missing cache is reported like an unreachable one.
pub fn cache_connection_check(services: &Services) -> Result<Reply> {
    let check = match services.cache() {
        Ok(cache) => cache.check_connection(),
        Err(e) => ConnectionCheck::failed(e.to_string()),
    };
    let status = if check.status {
        Status::Success
    } else {
        Status::Error
    };
    Ok(Reply::new(status, Value::Null).with_message(check.message))
}

pub fn cache_store(services: &Services, key: &str, value: &Value, expire: u64) -> Result<Reply> {
    services.cache()?.set(key, value, Some(expire))?;
    Ok(Reply::executed(true).with_key(key))
}

pub fn cache_get(services: &Services, key: &str) -> Result<Reply> {
    let value: Option<Value> = services.cache()?.get(key)?;
    Ok(Reply::executed(value.unwrap_or(Value::Null)).with_key(key))
}

pub fn cache_delete(services: &Services, key: &str) -> Result<Reply> {
    let deleted = services.cache()?.delete(key)?;
    Ok(Reply::executed(deleted).with_key(key))
}

pub fn cache_get_all_keys(services: &Services) -> Result<Reply> {
    let keys = services.cache()?.keys("*")?;
    Ok(Reply::executed(keys))
}

pub fn cache_get_all(services: &Services) -> Result<Reply> {
    let entries = services.cache()?.get_all()?;
    Ok(Reply::success(Value::Object(entries.into_iter().collect())))
}

pub fn cache_flush(services: &Services) -> Result<Reply> {
    services.cache()?.flushdb()?;
    Ok(Reply::success(Value::Null).with_message("Cache flushed"))
}

pub fn data_encode(_: &Services, cdc: &str, secret: &str, key: &str) -> Result<Reply> {
    let tangled = encode::tangle(cdc, secret, key);
    Ok(Reply::success(json!({ "tangled": tangled })))
}

fn records_to_json(records: Vec<Document>) -> Value {
    records.into_iter().map(to_json).collect()
}
