//! Per-operation options.
//!
//! Options arrive as loosely-typed request extras. Each operation accepts only the keys it
//! understands; anything else is rejected as a bad request.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    error::{RecordError, RecordResult},
    sort::SortSpec,
};

/// Options for retrieving records by filter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrieveOptions {
    /// Maximum number of records to return.
    pub limit: Option<u64>,
    /// Number of matching records to skip.
    pub offset: Option<u64>,
    #[serde(alias = "order")]
    pub sort: Option<SortSpec>,
    /// Report the total number of matches, ignoring offset and limit.
    pub include_count: bool,
}

impl RetrieveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(value: Value) -> RecordResult<Self> {
        from_json(value)
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_sort(mut self, sort: impl Into<SortSpec>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn with_count(mut self) -> Self {
        self.include_count = true;
        self
    }
}

/// Options for batch record creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreateOptions {
    /// Stop writing at the first failed record. Records already written are kept.
    pub rollback: bool,
}

impl CreateOptions {
    pub fn from_json(value: Value) -> RecordResult<Self> {
        from_json(value)
    }

    pub fn with_rollback(mut self) -> Self {
        self.rollback = true;
        self
    }
}

fn from_json<T: DeserializeOwned + Default>(value: Value) -> RecordResult<T> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value).map_err(|err| RecordError::request(err.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::sort::{SortDirection, SortKey};

    #[test]
    fn retrieve_options_from_json() {
        let options = RetrieveOptions::from_json(json!({
            "limit": 10,
            "offset": 20,
            "order": "age desc",
            "include_count": true,
        }))
        .unwrap();

        assert_eq!(options.limit, Some(10));
        assert_eq!(options.offset, Some(20));
        assert!(options.include_count);
        assert_eq!(
            options.sort.unwrap().keys(),
            &[SortKey {
                field: "age".into(),
                direction: SortDirection::Desc,
            }]
        );
    }

    #[test]
    fn unknown_keys_are_bad_requests() {
        let err = RetrieveOptions::from_json(json!({ "limt": 1 })).unwrap_err();
        assert!(matches!(err, RecordError::Request(_)));

        let err = CreateOptions::from_json(json!({ "limit": 1 })).unwrap_err();
        assert!(matches!(err, RecordError::Request(_)));
    }

    #[test]
    fn null_and_empty_are_defaults() {
        assert_eq!(RetrieveOptions::from_json(Value::Null).unwrap(), RetrieveOptions::default());
        assert_eq!(CreateOptions::from_json(json!({})).unwrap(), CreateOptions::default());
        assert!(CreateOptions::from_json(json!({ "rollback": true })).unwrap().rollback);
    }
}
