//! Error types for the docbridge engine.

use thiserror::Error;

/// All possible errors from the docbridge engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Backend errors
    #[error("store error: {0}")]
    Store(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("cache is not configured")]
    CacheUnavailable,

    // Data errors
    #[error("malformed identifier: {0}")]
    MalformedId(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    // Dispatch errors
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    #[error("missing parameter: {0}")]
    MissingParameter(String),

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },
}

impl Error {
    /// Shorthand for [`Error::InvalidParameter`].
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl From<bson::ser::Error> for Error {
    fn from(e: bson::ser::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::UnknownMethod("not_a_real_method".into());
        assert_eq!(err.to_string(), "unknown method: not_a_real_method");

        let err = Error::MissingParameter("collection".into());
        assert_eq!(err.to_string(), "missing parameter: collection");

        let err = Error::invalid_parameter("expire", "must be a non-negative integer");
        assert_eq!(
            err.to_string(),
            "invalid parameter 'expire': must be a non-negative integer"
        );

        assert_eq!(
            Error::CacheUnavailable.to_string(),
            "cache is not configured"
        );
    }
}
