//! Error types and result types for record operations.
//!
//! Every fallible operation in this crate returns [`RecordResult<T>`]. Request errors are
//! raised before any backend call, backend errors carry the operation and collection that
//! produced them.

use std::fmt;

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// The record operation that was being attempted when a backend failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Merge,
    Delete,
    Retrieve,
    Count,
    CreateCollection,
    DropCollection,
    ListCollections,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Create => "create records",
            Operation::Update => "update records",
            Operation::Merge => "merge records",
            Operation::Delete => "delete records",
            Operation::Retrieve => "retrieve records",
            Operation::Count => "count records",
            Operation::CreateCollection => "create collection",
            Operation::DropCollection => "drop collection",
            Operation::ListCollections => "list collections",
        })
    }
}

/// Represents all possible errors raised by the record layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    /// Malformed or missing request input, detected before any backend call.
    #[error("Bad request: {0}")]
    Request(String),
    /// A single-record lookup matched nothing.
    #[error("Record with id '{id}' was not found in collection {collection}")]
    NotFound { id: String, collection: String },
    /// A store failure, wrapped with the attempted operation and collection.
    #[error("Failed to {operation} in '{collection}': {message}")]
    Backend {
        operation: Operation,
        collection: String,
        message: String,
    },
    /// A raw failure raised inside a backend implementation.
    #[error("Store error: {0}")]
    Store(String),
    /// Conversion error between BSON and JSON representations.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during backend initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
}

impl RecordError {
    pub fn request(message: impl Into<String>) -> Self {
        RecordError::Request(message.into())
    }

    pub fn not_found(id: impl fmt::Display, collection: &str) -> Self {
        RecordError::NotFound {
            id: id.to_string(),
            collection: collection.to_string(),
        }
    }

    /// Attaches the attempted operation and collection to a raw store failure.
    ///
    /// Errors that already carry their own context are returned unchanged.
    pub fn during(self, operation: Operation, collection: &str) -> Self {
        match self {
            RecordError::Store(message) => RecordError::Backend {
                operation,
                collection: collection.to_string(),
                message,
            },
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RecordError::NotFound { .. })
    }
}

/// A specialized `Result` type for record operations.
pub type RecordResult<T> = Result<T, RecordError>;

impl From<BsonError> for RecordError {
    fn from(err: BsonError) -> Self {
        RecordError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for RecordError {
    fn from(err: SerdeJsonError) -> Self {
        RecordError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_gain_context() {
        let err = RecordError::Store("duplicate key".into()).during(Operation::Create, "users");

        assert_eq!(
            err,
            RecordError::Backend {
                operation: Operation::Create,
                collection: "users".into(),
                message: "duplicate key".into(),
            }
        );
        assert_eq!(err.to_string(), "Failed to create records in 'users': duplicate key");
    }

    #[test]
    fn request_errors_keep_identity() {
        let err = RecordError::request("empty").during(Operation::Update, "users");
        assert_eq!(err, RecordError::Request("empty".into()));
    }
}
