//! Predicate evaluation for in-memory record filtering.
//!
//! This module walks [`Predicate`] trees against BSON documents with MongoDB-like matching
//! rules: array fields match when any element matches, and negative operators (`ne`, `nin`)
//! match records that lack the field.

use std::{cmp::Ordering, collections::HashMap};

use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};
use regex::Regex;

use docrest_core::{
    error::{RecordError, RecordResult},
    predicate::{CompareOp, PatternKind, Predicate, PredicateVisitor},
    sort::{SortDirection, SortSpec},
};

/// Comparable representation of BSON values.
///
/// Integers compare exactly with each other. A float on either side switches the comparison
/// to f64, so `Int32(1)`, `Int64(1)` and `Double(1.0)` still compare equal.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    DateTime(DateTime),
    ObjectId(ObjectId),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Int(i64::from(*value)),
            Bson::Int64(value) => Comparable::Int(*value),
            Bson::Double(value) => Comparable::Float(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            _ => Comparable::Null,
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Int(a), Comparable::Int(b)) => a == b,
            (Comparable::Int(a), Comparable::Float(b)) | (Comparable::Float(b), Comparable::Int(a)) => {
                *a as f64 == *b
            }
            (Comparable::Float(a), Comparable::Float(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Int(b)) => Some(a.cmp(b)),
            (Comparable::Int(a), Comparable::Float(b)) => (*a as f64).partial_cmp(b),
            (Comparable::Float(a), Comparable::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Comparable::Float(a), Comparable::Float(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl Comparable<'_> {
    /// Cross-type rank used when sorting values of different types.
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Int(_) | Comparable::Float(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::ObjectId(_) => 5,
            Comparable::Bool(_) => 6,
            Comparable::DateTime(_) => 7,
        }
    }

    /// Total order for sorting: by type rank first, then by value.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.partial_cmp(other).unwrap_or(Ordering::Equal))
    }
}

/// Resolves a dotted field path inside a document.
pub(crate) fn lookup<'d>(document: &'d Document, path: &str) -> Option<&'d Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Bson::Document(nested) => nested.get(segment)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Evaluates predicates against documents, caching compiled patterns across documents.
#[derive(Debug, Default)]
pub(crate) struct DocumentEvaluator<'a> {
    document: Option<&'a Document>,
    patterns: HashMap<String, Regex>,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matches(&mut self, document: &'a Document, predicate: &Predicate) -> RecordResult<bool> {
        self.document = Some(document);
        self.visit(predicate)
    }

    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Document>,
        predicate: &Predicate,
    ) -> RecordResult<Vec<&'a Document>> {
        let mut evaluator = DocumentEvaluator::new();
        let mut matched = Vec::new();

        for document in documents {
            if evaluator.matches(document, predicate)? {
                matched.push(document);
            }
        }

        Ok(matched)
    }

    fn field(&self, field: &str) -> Option<&'a Bson> {
        self.document.and_then(|document| lookup(document, field))
    }

    fn pattern(&mut self, regex: &str) -> RecordResult<&Regex> {
        if !self.patterns.contains_key(regex) {
            let compiled = Regex::new(regex)
                .map_err(|err| RecordError::request(format!("invalid pattern '{regex}': {err}")))?;
            self.patterns.insert(regex.to_string(), compiled);
        }

        self.patterns
            .get(regex)
            .ok_or_else(|| RecordError::Store(format!("pattern '{regex}' was not cached")))
    }
}

/// Scalar candidates of a field: the value itself, plus its elements when it is an array.
fn candidates(value: &Bson) -> Vec<Comparable<'_>> {
    let mut values = vec![Comparable::from(value)];
    if let Bson::Array(items) = value {
        values.extend(items.iter().map(Comparable::from));
    }
    values
}

fn equals(field_value: Option<&Bson>, value: &Bson) -> bool {
    let expected = Comparable::from(value);
    match field_value {
        Some(field_value) => candidates(field_value).iter().any(|item| *item == expected),
        None => expected == Comparable::Null,
    }
}

fn listed(value: &Bson) -> Vec<&Bson> {
    match value {
        Bson::Array(values) => values.iter().collect(),
        other => vec![other],
    }
}

impl PredicateVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = RecordError;

    fn visit_match_all(&mut self) -> Result<Self::Output, Self::Error> {
        Ok(true)
    }

    fn visit_and(&mut self, children: &[Predicate]) -> Result<Self::Output, Self::Error> {
        for child in children {
            if !self.visit(child)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, children: &[Predicate]) -> Result<Self::Output, Self::Error> {
        for child in children {
            if self.visit(child)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_nor(&mut self, children: &[Predicate]) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_or(children)?)
    }

    fn visit_not(&mut self, child: &Predicate) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit(child)?)
    }

    fn visit_compare(
        &mut self,
        field: &str,
        op: CompareOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        let field_value = self.field(field);

        Ok(match op {
            CompareOp::Eq => equals(field_value, value),
            CompareOp::Ne => !equals(field_value, value),
            CompareOp::In => listed(value).into_iter().any(|item| equals(field_value, item)),
            CompareOp::Nin => !listed(value).into_iter().any(|item| equals(field_value, item)),
            CompareOp::All => {
                let wanted = listed(value);
                !wanted.is_empty() && wanted.into_iter().all(|item| equals(field_value, item))
            }
            CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte => {
                let Some(field_value) = field_value else {
                    return Ok(false);
                };
                let expected = Comparable::from(value);
                candidates(field_value).iter().any(|item| {
                    match item.partial_cmp(&expected) {
                        Some(ordering) => match op {
                            CompareOp::Gt => ordering == Ordering::Greater,
                            CompareOp::Gte => ordering != Ordering::Less,
                            CompareOp::Lt => ordering == Ordering::Less,
                            _ => ordering != Ordering::Greater,
                        },
                        None => false,
                    }
                })
            }
        })
    }

    fn visit_pattern(
        &mut self,
        field: &str,
        _kind: PatternKind,
        regex: &str,
    ) -> Result<Self::Output, Self::Error> {
        let Some(field_value) = self.field(field) else {
            return Ok(false);
        };
        let pattern = self.pattern(regex)?;

        Ok(candidates(field_value).iter().any(|item| match item {
            Comparable::String(text) => pattern.is_match(text),
            _ => false,
        }))
    }
}

/// Orders documents by a multi-key sort specification. Missing fields sort as null.
pub(crate) fn compare_documents(left: &Document, right: &Document, sort: &SortSpec) -> Ordering {
    for key in sort.keys() {
        let a = lookup(left, &key.field).map(Comparable::from).unwrap_or(Comparable::Null);
        let b = lookup(right, &key.field).map(Comparable::from).unwrap_or(Comparable::Null);

        let ordering = match key.direction {
            SortDirection::Asc => a.sort_cmp(&b),
            SortDirection::Desc => b.sort_cmp(&a),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use docrest_core::filter::compile;

    use super::*;

    fn check(document: &Document, filter: &str) -> bool {
        DocumentEvaluator::new()
            .matches(document, &compile(filter))
            .unwrap()
    }

    #[test]
    fn numeric_types_compare_across_widths() {
        let document = doc! { "age": 21_i64, "score": 3.5 };
        assert!(check(&document, "age = 21"));
        assert!(check(&document, "age >= 21"));
        assert!(!check(&document, "age > 21"));
        assert!(check(&document, "score lt 4"));
    }

    #[test]
    fn large_integers_compare_exactly() {
        let document = doc! { "id": 9_007_199_254_740_993_i64 };
        assert!(check(&document, "id = 9007199254740993"));
        assert!(!check(&document, "id = 9007199254740992"));
        assert!(check(&document, "id > 9007199254740992"));
        assert!(check(&document, "id in (1, 9007199254740993)"));
    }

    #[test]
    fn negative_operators_match_missing_fields() {
        let document = doc! { "name": "a" };
        assert!(check(&document, "age != 3"));
        assert!(check(&document, "age nin (1, 2)"));
        assert!(!check(&document, "age < 3"));
    }

    #[test]
    fn arrays_match_any_element() {
        let document = doc! { "tags": ["red", "blue"] };
        assert!(check(&document, "tags = red"));
        assert!(check(&document, "tags in (green, blue)"));
        assert!(check(&document, "tags all (red, blue)"));
        assert!(!check(&document, "tags all (red, green)"));
    }

    #[test]
    fn patterns_and_logic() {
        let document = doc! { "name": "Joe", "age": 30 };
        assert!(check(&document, "name like 'Jo%'"));
        assert!(check(&document, "name like '%oe'"));
        assert!(!check(&document, "name like '%x%'"));
        assert!(check(&document, "not age < 18 and name like o"));
        assert!(check(&document, "age < 18 nor name = Ann"));
    }

    #[test]
    fn dotted_paths() {
        let document = doc! { "address": { "city": "Oslo" } };
        assert!(check(&document, "address.city = Oslo"));
    }

    #[test]
    fn opaque_segments_are_rejected() {
        let err = DocumentEvaluator::new()
            .matches(&doc! {}, &Predicate::Opaque("junk".into()))
            .unwrap_err();
        assert!(matches!(err, RecordError::Request(_)));
    }

    #[test]
    fn multi_key_sort() {
        let mut documents = vec![
            doc! { "a": 1, "b": "x" },
            doc! { "a": 2, "b": "y" },
            doc! { "a": 1, "b": "z" },
        ];
        let sort = SortSpec::parse("a desc, b");
        documents.sort_by(|left, right| compare_documents(left, right, &sort));
        assert_eq!(documents[0], doc! { "a": 2, "b": "y" });
        assert_eq!(documents[1], doc! { "a": 1, "b": "x" });
    }
}
