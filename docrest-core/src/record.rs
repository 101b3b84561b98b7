//! Normalization of multi-record request payloads.
//!
//! A payload may be a single mapping, a sequence of mappings, or a mapping keyed by the
//! consecutive indexes `"0".."n"`. All three become a [`RecordSet`].

use bson::{Bson, Document, ser::serialize_to_bson};
use serde_json::Value;

use crate::error::{RecordError, RecordResult};

/// One or more records taken from a request payload, in request order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordSet {
    records: Vec<Document>,
}

impl RecordSet {
    pub fn new(records: Vec<Document>) -> Self {
        Self { records }
    }

    /// Normalizes an arbitrary BSON payload.
    pub fn from_bson(value: Bson) -> RecordResult<Self> {
        match value {
            Bson::Document(document) => Ok(Self::from(document)),
            Bson::Array(values) => values
                .into_iter()
                .enumerate()
                .map(|(index, value)| match value {
                    Bson::Document(document) => Ok(document),
                    other => Err(RecordError::request(format!(
                        "record {index} is not a mapping of fields: {other}"
                    ))),
                })
                .collect::<RecordResult<Vec<_>>>()
                .map(Self::new),
            Bson::Null => Ok(Self::default()),
            other => Err(RecordError::request(format!(
                "expected a record or a list of records, got {other}"
            ))),
        }
    }

    /// Normalizes a JSON payload.
    pub fn from_json(value: Value) -> RecordResult<Self> {
        let value = serialize_to_bson(&value)?;
        Self::from_bson(value)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Document] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Document> {
        self.records
    }

    /// Rejects an empty payload or any empty record.
    pub fn validate(&self) -> RecordResult<()> {
        if self.records.is_empty() {
            return Err(RecordError::request("There are no record sets in the request."));
        }
        if let Some(index) = self.records.iter().position(Document::is_empty) {
            return Err(RecordError::request(format!(
                "record {index} has no fields"
            )));
        }
        Ok(())
    }
}

impl From<Document> for RecordSet {
    fn from(document: Document) -> Self {
        match indexed_records(&document) {
            Some(records) => Self::new(records),
            None => Self::new(vec![document]),
        }
    }
}

impl From<Vec<Document>> for RecordSet {
    fn from(records: Vec<Document>) -> Self {
        Self::new(records)
    }
}

impl<const N: usize> From<[Document; N]> for RecordSet {
    fn from(records: [Document; N]) -> Self {
        Self::new(records.into())
    }
}

impl IntoIterator for RecordSet {
    type Item = Document;
    type IntoIter = std::vec::IntoIter<Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

fn indexed_records(document: &Document) -> Option<Vec<Document>> {
    if document.is_empty() {
        return None;
    }

    document
        .iter()
        .enumerate()
        .map(|(index, (key, value))| match value {
            Bson::Document(record) if *key == index.to_string() => Some(record.clone()),
            _ => None,
        })
        .collect()
}
