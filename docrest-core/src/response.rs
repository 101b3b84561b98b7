//! Result shapes returned to callers.
//!
//! Multi-record operations return one [`Outcome`] per input record, in input order.
//! Retrieval by filter returns a [`RecordList`] with optional count metadata.

use bson::Document;
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};
use thiserror::Error;

use crate::error::{RecordError, RecordResult};

/// Why a single record in a batch produced no result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OutcomeError {
    #[error(transparent)]
    Failed(#[from] RecordError),
    /// An earlier record failed and the batch stopped writing.
    #[error("Not attempted after an earlier failure in the batch")]
    NotAttempted,
}

/// The result for one record of a batch operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Record(Document),
    Error(OutcomeError),
}

impl Outcome {
    pub fn failed(err: RecordError) -> Self {
        Outcome::Error(OutcomeError::Failed(err))
    }

    pub fn is_record(&self) -> bool {
        matches!(self, Outcome::Record(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_))
    }

    pub fn record(&self) -> Option<&Document> {
        match self {
            Outcome::Record(record) => Some(record),
            Outcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&OutcomeError> {
        match self {
            Outcome::Record(_) => None,
            Outcome::Error(err) => Some(err),
        }
    }

    pub fn into_result(self) -> Result<Document, OutcomeError> {
        match self {
            Outcome::Record(record) => Ok(record),
            Outcome::Error(err) => Err(err),
        }
    }
}

impl From<RecordResult<Document>> for Outcome {
    fn from(result: RecordResult<Document>) -> Self {
        match result {
            Ok(record) => Outcome::Record(record),
            Err(err) => Outcome::failed(err),
        }
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Outcome::Record(record) => record.serialize(serializer),
            Outcome::Error(err) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", &err.to_string())?;
                map.end()
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListMeta {
    /// Total matches, ignoring offset and limit.
    pub count: u64,
}

/// Records matched by a filter.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct RecordList {
    #[serde(rename = "record")]
    pub records: Vec<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ListMeta>,
}

impl RecordList {
    pub fn new(records: Vec<Document>) -> Self {
        Self {
            records,
            meta: None,
        }
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.meta = Some(ListMeta { count });
        self
    }

    pub fn count(&self) -> Option<u64> {
        self.meta.map(|meta| meta.count)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
