//! Request and response envelopes of the dispatch endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound `{method, data?}` body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Request {
    pub method: String,
    #[serde(default)]
    pub data: Value,
}

impl Request {
    pub fn new(method: impl Into<String>, data: Value) -> Self {
        Self {
            method: method.into(),
            data,
        }
    }
}

/// Outcome tag carried by every successful dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    /// A store or cache operation completed and returned its result.
    Success,
    /// A cache command was sent; `data` carries the server's answer.
    Executed,
    /// A connectivity probe ran and reported a failure.
    Error,
}

/// `{status, collection?, key?, message?, data}` response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Value,
}

impl Reply {
    pub fn new(status: Status, data: impl Into<Value>) -> Self {
        Self {
            status,
            collection: None,
            key: None,
            message: None,
            data: data.into(),
        }
    }

    pub fn success(data: impl Into<Value>) -> Self {
        Self::new(Status::Success, data)
    }

    pub fn executed(data: impl Into<Value>) -> Self {
        Self::new(Status::Executed, data)
    }

    pub fn with_collection(mut self, collection: &str) -> Self {
        self.collection = Some(collection.to_string());
        self
    }

    pub fn with_key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
