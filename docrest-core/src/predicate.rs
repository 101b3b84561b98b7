//! Backend-neutral predicate trees.
//!
//! A [`Predicate`] is produced by the filter compiler (or built by hand) and consumed by
//! one backend collection per call. Backends walk it with a [`PredicateVisitor`], the same
//! way the memory evaluator and the MongoDB translator do.
//!
//! # Example
//!
//! ```ignore
//! use docrest::predicate::{CompareOp, Predicate};
//!
//! let adults = Predicate::compare("age", CompareOp::Gte, 21)
//!     .and(Predicate::compare("status", CompareOp::Eq, "active"));
//! ```

use bson::Bson;

use crate::error::RecordError;

/// Comparison and membership operators for predicate leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Field value is one of the listed values.
    In,
    /// Field value is none of the listed values.
    Nin,
    /// Array field contains every listed value.
    All,
}

impl CompareOp {
    /// Membership operators always carry a sequence value.
    pub fn takes_list(self) -> bool {
        matches!(self, CompareOp::In | CompareOp::Nin | CompareOp::All)
    }
}

/// Wildcard placement of a `like` pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// `%text%`
    Contains,
    /// `text%`
    Prefix,
    /// `%text`
    Suffix,
    /// `text` with no wildcard, matched anywhere in the value.
    Substring,
}

/// A filter condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// The empty filter; matches every record.
    MatchAll,
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Nor(Vec<Predicate>),
    Not(Box<Predicate>),
    Compare {
        field: String,
        op: CompareOp,
        value: Bson,
    },
    /// Regular-expression match on a string field.
    Pattern {
        field: String,
        kind: PatternKind,
        regex: String,
    },
    /// A filter segment with no recognizable operator, kept verbatim.
    Opaque(String),
}

impl Predicate {
    pub fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<Bson>) -> Self {
        let value = value.into();
        let value = if op.takes_list() && !matches!(value, Bson::Array(_)) {
            Bson::Array(vec![value])
        } else {
            value
        };

        Predicate::Compare {
            field: field.into(),
            op,
            value,
        }
    }

    /// Membership of `field` in `values`, used for id-list addressing.
    pub fn one_of(field: impl Into<String>, values: impl IntoIterator<Item = Bson>) -> Self {
        Predicate::Compare {
            field: field.into(),
            op: CompareOp::In,
            value: Bson::Array(values.into_iter().collect()),
        }
    }

    /// Combines this predicate with another using logical AND.
    ///
    /// If this predicate is already an AND, the other one is appended to it.
    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::And(mut list) => {
                list.push(other);
                Predicate::And(list)
            }
            _ => Predicate::And(vec![self, other]),
        }
    }

    /// Combines this predicate with another using logical OR.
    pub fn or(self, other: Predicate) -> Self {
        match self {
            Predicate::Or(mut list) => {
                list.push(other);
                Predicate::Or(list)
            }
            _ => Predicate::Or(vec![self, other]),
        }
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, Predicate::MatchAll)
    }

    /// Returns the first opaque segment anywhere in the tree.
    pub fn find_opaque(&self) -> Option<&str> {
        match self {
            Predicate::Opaque(text) => Some(text),
            Predicate::And(children) | Predicate::Or(children) | Predicate::Nor(children) => {
                children.iter().find_map(Predicate::find_opaque)
            }
            Predicate::Not(child) => child.find_opaque(),
            _ => None,
        }
    }
}

/// Walks a [`Predicate`] tree, producing one output per node.
pub trait PredicateVisitor {
    type Output;
    type Error: From<RecordError> + Into<RecordError>;

    fn visit_match_all(&mut self) -> Result<Self::Output, Self::Error>;
    fn visit_and(&mut self, children: &[Predicate]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, children: &[Predicate]) -> Result<Self::Output, Self::Error>;
    fn visit_nor(&mut self, children: &[Predicate]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, child: &Predicate) -> Result<Self::Output, Self::Error>;
    fn visit_compare(
        &mut self,
        field: &str,
        op: CompareOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_pattern(
        &mut self,
        field: &str,
        kind: PatternKind,
        regex: &str,
    ) -> Result<Self::Output, Self::Error>;

    /// Opaque segments have no portable meaning; backends refuse them by default.
    fn visit_opaque(&mut self, text: &str) -> Result<Self::Output, Self::Error> {
        Err(RecordError::request(format!("unrecognized filter expression '{text}'")).into())
    }

    fn visit(&mut self, predicate: &Predicate) -> Result<Self::Output, Self::Error> {
        match predicate {
            Predicate::MatchAll => self.visit_match_all(),
            Predicate::And(children) => self.visit_and(children),
            Predicate::Or(children) => self.visit_or(children),
            Predicate::Nor(children) => self.visit_nor(children),
            Predicate::Not(child) => self.visit_not(child),
            Predicate::Compare { field, op, value } => self.visit_compare(field, *op, value),
            Predicate::Pattern { field, kind, regex } => self.visit_pattern(field, *kind, regex),
            Predicate::Opaque(text) => self.visit_opaque(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_values_are_wrapped_in_arrays() {
        let predicate = Predicate::compare("tag", CompareOp::In, "red");
        assert_eq!(
            predicate,
            Predicate::Compare {
                field: "tag".into(),
                op: CompareOp::In,
                value: Bson::Array(vec![Bson::String("red".into())]),
            }
        );
    }

    #[test]
    fn chained_and_stays_flat() {
        let predicate = Predicate::compare("a", CompareOp::Eq, 1)
            .and(Predicate::compare("b", CompareOp::Eq, 2))
            .and(Predicate::compare("c", CompareOp::Eq, 3));

        match predicate {
            Predicate::And(children) => assert_eq!(children.len(), 3),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn finds_nested_opaque_segments() {
        let predicate = Predicate::compare("a", CompareOp::Eq, 1)
            .or(Predicate::Opaque("garbage".into()).negate());
        assert_eq!(predicate.find_opaque(), Some("garbage"));
        assert_eq!(Predicate::MatchAll.find_opaque(), None);
    }
}
