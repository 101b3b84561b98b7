//! Translation from docrest predicate trees to MongoDB query syntax.

use bson::{Bson, Document, doc};

use docrest_core::{
    error::RecordError,
    predicate::{CompareOp, PatternKind, Predicate, PredicateVisitor},
    projection::Projection,
    sort::{SortDirection, SortSpec},
};

/// Translates predicate trees into MongoDB query documents.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    fn visit_all(&mut self, children: &[Predicate]) -> Result<Vec<Document>, RecordError> {
        children
            .iter()
            .map(|child| self.visit(child))
            .collect()
    }
}

impl PredicateVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = RecordError;

    fn visit_match_all(&mut self) -> Result<Self::Output, Self::Error> {
        Ok(doc! {})
    }

    fn visit_and(&mut self, children: &[Predicate]) -> Result<Self::Output, Self::Error> {
        Ok(doc! { "$and": self.visit_all(children)? })
    }

    fn visit_or(&mut self, children: &[Predicate]) -> Result<Self::Output, Self::Error> {
        Ok(doc! { "$or": self.visit_all(children)? })
    }

    fn visit_nor(&mut self, children: &[Predicate]) -> Result<Self::Output, Self::Error> {
        Ok(doc! { "$nor": self.visit_all(children)? })
    }

    // `$not` only applies to operator expressions, so arbitrary subtrees go through `$nor`.
    fn visit_not(&mut self, child: &Predicate) -> Result<Self::Output, Self::Error> {
        Ok(doc! { "$nor": [self.visit(child)?] })
    }

    fn visit_compare(
        &mut self,
        field: &str,
        op: CompareOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        let operator = match op {
            CompareOp::Eq => "$eq",
            CompareOp::Ne => "$ne",
            CompareOp::Gt => "$gt",
            CompareOp::Gte => "$gte",
            CompareOp::Lt => "$lt",
            CompareOp::Lte => "$lte",
            CompareOp::In => "$in",
            CompareOp::Nin => "$nin",
            CompareOp::All => "$all",
        };

        let value = match (op.takes_list(), value) {
            (true, Bson::Array(_)) | (false, _) => value.clone(),
            (true, single) => Bson::Array(vec![single.clone()]),
        };

        Ok(doc! { field: { operator: value } })
    }

    fn visit_pattern(
        &mut self,
        field: &str,
        _kind: PatternKind,
        regex: &str,
    ) -> Result<Self::Output, Self::Error> {
        Ok(doc! { field: { "$regex": regex } })
    }
}

/// MongoDB projection document, or `None` for every field.
pub(crate) fn projection_document(projection: &Projection) -> Option<Document> {
    projection
        .fields()
        .map(|fields| fields.iter().map(|field| (field.clone(), Bson::Int32(1))).collect())
}

/// MongoDB sort document, or `None` when unsorted.
pub(crate) fn sort_document(sort: &SortSpec) -> Option<Document> {
    if sort.is_empty() {
        return None;
    }

    Some(
        sort.keys()
            .iter()
            .map(|key| {
                let direction = match key.direction {
                    SortDirection::Asc => 1,
                    SortDirection::Desc => -1,
                };
                (key.field.clone(), Bson::Int32(direction))
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use docrest_core::filter::compile;

    use super::*;

    fn translate(filter: &str) -> Document {
        MongoQueryTranslator.visit(&compile(filter)).unwrap()
    }

    #[test]
    fn comparisons() {
        assert_eq!(translate("age >= 21"), doc! { "age": { "$gte": 21 } });
        assert_eq!(translate("name = 'John'"), doc! { "name": { "$eq": "John" } });
        assert_eq!(translate("tag in (a, b)"), doc! { "tag": { "$in": ["a", "b"] } });
    }

    #[test]
    fn logic() {
        assert_eq!(
            translate("a = 1 or b = 2 and c = 3"),
            doc! {
                "$or": [
                    { "a": { "$eq": 1 } },
                    { "$and": [{ "b": { "$eq": 2 } }, { "c": { "$eq": 3 } }] },
                ]
            }
        );
        assert_eq!(
            translate("not a = 1"),
            doc! { "$nor": [{ "a": { "$eq": 1 } }] }
        );
        assert_eq!(translate(""), doc! {});
    }

    #[test]
    fn patterns() {
        assert_eq!(translate("name like 'Jo%'"), doc! { "name": { "$regex": "^Jo" } });
    }

    #[test]
    fn opaque_segments_are_rejected() {
        let err = MongoQueryTranslator
            .visit(&Predicate::Opaque("junk".into()))
            .unwrap_err();
        assert!(matches!(err, RecordError::Request(_)));
    }

    #[test]
    fn projection_and_sort_documents() {
        assert_eq!(projection_document(&Projection::All), None);
        assert_eq!(
            projection_document(&Projection::new("name", "_id")),
            Some(doc! { "_id": 1, "name": 1 })
        );
        assert_eq!(
            sort_document(&SortSpec::parse("age desc, name")),
            Some(doc! { "age": -1, "name": 1 })
        );
        assert_eq!(sort_document(&SortSpec::new()), None);
    }
}
