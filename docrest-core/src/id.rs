//! Identifier normalization between external and backend-native forms.
//!
//! Callers address records with strings or numbers. The store keys them by [`ObjectId`]
//! when the value looks like one, and by the supplied value otherwise. These helpers
//! convert single ids, id lists and ids embedded in records in both directions.

use std::fmt;

use bson::{Bson, Document, oid::ObjectId};

use crate::literal::{self, Literal};

/// Field name accepted in place of the configured identifier field.
pub const ID_ALIAS: &str = "id";

/// A record identifier tagged with its representation.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordId {
    Native(ObjectId),
    /// A value kept exactly as supplied.
    External(Bson),
}

impl RecordId {
    /// The value used to address the record in the store.
    pub fn to_bson(&self) -> Bson {
        match self {
            RecordId::Native(oid) => Bson::ObjectId(*oid),
            RecordId::External(value) => value.clone(),
        }
    }

    /// The value reported back to callers.
    pub fn to_external(&self) -> Bson {
        match self {
            RecordId::Native(oid) => Bson::String(oid.to_hex()),
            RecordId::External(value) => value.clone(),
        }
    }

    /// The numeric reading of a string id, when it has one.
    ///
    /// Ids stored as numbers can still be addressed with their decimal text.
    pub fn numeric_alternative(&self) -> Option<RecordId> {
        let RecordId::External(Bson::String(text)) = self else {
            return None;
        };
        if !literal::is_numeric(text) {
            return None;
        }
        match literal::infer(text) {
            number @ (Literal::Int(_) | Literal::Float(_)) => {
                Some(RecordId::External(number.into()))
            }
            _ => None,
        }
    }
}

impl From<RecordId> for Bson {
    fn from(id: RecordId) -> Self {
        match id {
            RecordId::Native(oid) => Bson::ObjectId(oid),
            RecordId::External(value) => value,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Native(oid) => write!(f, "{}", oid.to_hex()),
            RecordId::External(Bson::String(text)) => f.write_str(text),
            RecordId::External(value) => write!(f, "{value}"),
        }
    }
}

/// A list of ids, either as a delimited string or as explicit values.
#[derive(Debug, Clone, PartialEq)]
pub enum IdList {
    /// Comma-separated text. Elements are type-inferred.
    Delimited(String),
    /// Values taken as supplied.
    Values(Vec<Bson>),
}

impl IdList {
    pub fn is_empty(&self) -> bool {
        to_native_ids(self.clone()).is_empty()
    }
}

impl From<&str> for IdList {
    fn from(value: &str) -> Self {
        IdList::Delimited(value.to_string())
    }
}

impl From<String> for IdList {
    fn from(value: String) -> Self {
        IdList::Delimited(value)
    }
}

impl From<Vec<Bson>> for IdList {
    fn from(value: Vec<Bson>) -> Self {
        IdList::Values(value)
    }
}

impl From<Vec<String>> for IdList {
    fn from(value: Vec<String>) -> Self {
        IdList::Values(value.into_iter().map(Bson::String).collect())
    }
}

impl From<Vec<&str>> for IdList {
    fn from(value: Vec<&str>) -> Self {
        IdList::Values(value.into_iter().map(Bson::from).collect())
    }
}

impl From<Vec<ObjectId>> for IdList {
    fn from(value: Vec<ObjectId>) -> Self {
        IdList::Values(value.into_iter().map(Bson::ObjectId).collect())
    }
}

impl From<Vec<RecordId>> for IdList {
    fn from(value: Vec<RecordId>) -> Self {
        IdList::Values(value.into_iter().map(Bson::from).collect())
    }
}

impl From<RecordId> for IdList {
    fn from(value: RecordId) -> Self {
        IdList::Values(vec![value.into()])
    }
}

impl From<Bson> for IdList {
    fn from(value: Bson) -> Self {
        match value {
            Bson::String(text) => IdList::Delimited(text),
            Bson::Array(values) => IdList::Values(values),
            other => IdList::Values(vec![other]),
        }
    }
}

/// Normalizes a single id.
///
/// A 24-character hex string becomes a native id. With `infer_unquoted`, other strings are
/// typed by [`literal::infer`], so `"42"` addresses the integer `42`.
pub fn to_native_id(value: &Bson, infer_unquoted: bool) -> RecordId {
    match value {
        Bson::ObjectId(oid) => RecordId::Native(*oid),
        Bson::String(text) => {
            if text.len() == 24 {
                if let Ok(oid) = ObjectId::parse_str(text) {
                    return RecordId::Native(oid);
                }
            }
            if infer_unquoted {
                RecordId::External(literal::infer(text).into())
            } else {
                RecordId::External(value.clone())
            }
        }
        other => RecordId::External(other.clone()),
    }
}

/// Normalizes a list of ids, dropping empty elements of delimited input.
pub fn to_native_ids(ids: impl Into<IdList>) -> Vec<RecordId> {
    match ids.into() {
        IdList::Delimited(text) => text
            .trim_matches(|ch: char| ch == ',' || ch.is_whitespace())
            .split(',')
            .map(str::trim)
            .filter(|element| !element.is_empty())
            .map(|element| to_native_id(&Bson::String(element.to_string()), true))
            .collect(),
        IdList::Values(values) => values
            .iter()
            .map(|value| to_native_id(value, false))
            .collect(),
    }
}

/// Reads the id of a record, falling back to the `id` alias.
pub fn record_id(record: &Document, id_field: &str) -> Option<RecordId> {
    record
        .get(id_field)
        .or_else(|| record.get(ID_ALIAS))
        .map(|value| to_native_id(value, false))
}

/// Rewrites the id of a record into its native form.
///
/// When the id was supplied under the alias, it moves to `id_field`.
pub fn to_native_record(mut record: Document, id_field: &str) -> Document {
    let value = match record.get(id_field) {
        Some(value) => value.clone(),
        None => match record.remove(ID_ALIAS) {
            Some(value) => value,
            None => return record,
        },
    };

    record.insert(id_field, to_native_id(&value, false));
    record
}

/// Converts a native id back to the form callers see.
pub fn to_external_id(value: &Bson) -> Bson {
    match value {
        Bson::ObjectId(oid) => Bson::String(oid.to_hex()),
        other => other.clone(),
    }
}

/// Rewrites the id of a record into its external form, in place.
pub fn to_external_record(mut record: Document, id_field: &str) -> Document {
    let key = if record.contains_key(id_field) {
        id_field
    } else if record.contains_key(ID_ALIAS) {
        ID_ALIAS
    } else {
        return record;
    };

    if let Some(value) = record.get_mut(key) {
        *value = to_external_id(value);
    }
    record
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    const HEX: &str = "507f1f77bcf86cd799439011";

    #[test]
    fn object_id_strings_become_native() {
        let oid = ObjectId::parse_str(HEX).unwrap();
        assert_eq!(to_native_id(&Bson::from(HEX), false), RecordId::Native(oid));
        assert_eq!(to_native_id(&Bson::ObjectId(oid), false), RecordId::Native(oid));
    }

    #[test]
    fn twenty_four_non_hex_characters_stay_external() {
        let value = Bson::from("zzzzzzzzzzzzzzzzzzzzzzzz");
        assert_eq!(to_native_id(&value, false), RecordId::External(value.clone()));
    }

    #[test]
    fn inference_only_when_requested() {
        assert_eq!(to_native_id(&Bson::from("42"), false), RecordId::External("42".into()));
        assert_eq!(
            to_native_id(&Bson::from("42"), true),
            RecordId::External(Bson::Int32(42))
        );
        assert_eq!(
            to_native_id(&Bson::Int64(7), true),
            RecordId::External(Bson::Int64(7))
        );
    }

    #[test]
    fn round_trip_for_non_native_ids() {
        for value in [Bson::from("abc"), Bson::from("42"), Bson::Int32(5), Bson::from("")] {
            assert_eq!(to_native_id(&value, false).to_external(), value);
        }
        assert_eq!(to_native_id(&Bson::from(HEX), false).to_external(), Bson::from(HEX));
    }

    #[test]
    fn delimited_lists_trim_and_infer() {
        let ids = to_native_ids(" ,a, 42 ,,b, ");
        assert_eq!(
            ids,
            vec![
                RecordId::External("a".into()),
                RecordId::External(Bson::Int32(42)),
                RecordId::External("b".into()),
            ]
        );
        assert!(to_native_ids(" , ").is_empty());
    }

    #[test]
    fn explicit_lists_are_not_inferred() {
        let ids = to_native_ids(vec!["42", HEX]);
        assert_eq!(ids[0], RecordId::External("42".into()));
        assert!(matches!(ids[1], RecordId::Native(_)));
    }

    #[test]
    fn alias_moves_to_id_field() {
        let record = to_native_record(doc! { "id": HEX, "name": "a" }, "_id");
        assert!(!record.contains_key("id"));
        assert!(matches!(record.get("_id"), Some(Bson::ObjectId(_))));

        let record = to_native_record(doc! { "_id": "x", "id": "y" }, "_id");
        assert_eq!(record.get_str("_id").unwrap(), "x");
        assert_eq!(record.get_str("id").unwrap(), "y");

        let record = to_native_record(doc! { "name": "a" }, "_id");
        assert_eq!(record, doc! { "name": "a" });
    }

    #[test]
    fn external_records_use_hex_strings() {
        let oid = ObjectId::parse_str(HEX).unwrap();
        let record = to_external_record(doc! { "_id": oid, "n": 1 }, "_id");
        assert_eq!(record, doc! { "_id": HEX, "n": 1 });
    }

    #[test]
    fn numeric_alternative_for_decimal_text() {
        assert_eq!(
            RecordId::External("12".into()).numeric_alternative(),
            Some(RecordId::External(Bson::Int32(12)))
        );
        assert_eq!(RecordId::External("ab".into()).numeric_alternative(), None);
        assert_eq!(RecordId::External(Bson::Int32(1)).numeric_alternative(), None);
    }
}
