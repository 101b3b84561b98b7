//! Compiles filter strings into [`Predicate`] trees.
//!
//! The grammar, lowest precedence first:
//!
//! ```text
//! filter     := or_expr
//! or_expr    := nor_expr ( OR nor_expr )*
//! nor_expr   := and_expr ( NOR and_expr )*
//! and_expr   := unary ( AND unary )*
//! unary      := NOT unary | comparison
//! comparison := field OP value
//! ```
//!
//! `OR`/`AND` may be written as words (any case) or as `||`/`&&`. Comparison operators are
//! `= != > >= < <=` and the words `eq ne gt gte lt lte in nin all like`.
//!
//! # Example
//!
//! ```ignore
//! use docrest::filter::compile;
//!
//! let predicate = compile("age >= 21 and name like 'Jo%'");
//! ```

use bson::Bson;

use crate::{
    lexer::{Comparison, Logical, Token, TokenKind, tokenize},
    literal,
    predicate::{PatternKind, Predicate},
};

/// Input accepted by [`compile`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FilterSource {
    Text(String),
    Tree(Predicate),
    #[default]
    Empty,
}

impl From<&str> for FilterSource {
    fn from(value: &str) -> Self {
        FilterSource::Text(value.to_string())
    }
}

impl From<String> for FilterSource {
    fn from(value: String) -> Self {
        FilterSource::Text(value)
    }
}

impl From<&String> for FilterSource {
    fn from(value: &String) -> Self {
        FilterSource::Text(value.clone())
    }
}

impl From<Predicate> for FilterSource {
    fn from(value: Predicate) -> Self {
        FilterSource::Tree(value)
    }
}

impl<T: Into<FilterSource>> From<Option<T>> for FilterSource {
    fn from(value: Option<T>) -> Self {
        value.map_or(FilterSource::Empty, Into::into)
    }
}

/// Compiles a filter into a predicate tree.
///
/// Prebuilt trees are returned unchanged. Empty input matches every record. Segments
/// without a comparison operator become [`Predicate::Opaque`].
pub fn compile(source: impl Into<FilterSource>) -> Predicate {
    match source.into() {
        FilterSource::Tree(predicate) => predicate,
        FilterSource::Empty => Predicate::MatchAll,
        FilterSource::Text(text) if text.trim().is_empty() => Predicate::MatchAll,
        FilterSource::Text(text) => {
            let tokens = tokenize(&text);
            Parser {
                source: &text,
                tokens: &tokens,
                pos: 0,
            }
            .parse_or()
        }
    }
}

struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl Parser<'_> {
    fn parse_or(&mut self) -> Predicate {
        let operands = self.chain(Logical::Or, Self::parse_nor);
        collapse(operands, Predicate::Or)
    }

    fn parse_nor(&mut self) -> Predicate {
        let operands = self.chain(Logical::Nor, Self::parse_and);
        collapse(operands, Predicate::Nor)
    }

    fn parse_and(&mut self) -> Predicate {
        let operands = self.chain(Logical::And, Self::parse_unary);
        collapse(operands, Predicate::And)
    }

    fn chain(&mut self, op: Logical, operand: fn(&mut Self) -> Predicate) -> Vec<Predicate> {
        let mut operands = vec![operand(self)];
        while self.peek() == Some(TokenKind::Logical(op)) {
            self.pos += 1;
            operands.push(operand(self));
        }
        operands
    }

    fn parse_unary(&mut self) -> Predicate {
        if self.peek() == Some(TokenKind::Not) {
            self.pos += 1;
            return self.parse_unary().negate();
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Predicate {
        let start = self.pos;
        while let Some(kind) = self.peek() {
            if matches!(kind, TokenKind::Logical(_)) {
                break;
            }
            self.pos += 1;
        }
        let segment = &self.tokens[start..self.pos];

        let Some(first) = segment.first() else {
            return Predicate::Opaque(String::new());
        };
        let Some(last) = segment.last() else {
            return Predicate::Opaque(String::new());
        };
        let text_start = first.span.start;
        let text_end = last.span.end;

        let operator = segment.iter().find_map(|token| match token.kind {
            TokenKind::Comparison(comparison) => Some((comparison, token)),
            _ => None,
        });

        let Some((comparison, token)) = operator else {
            return Predicate::Opaque(self.source[text_start..text_end].trim().to_string());
        };

        let field = self.source[text_start..token.span.start].trim();
        let value = self.source[token.span.end..text_end].trim();

        leaf(field, comparison, value)
    }

    fn peek(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|token| token.kind)
    }
}

fn collapse(mut operands: Vec<Predicate>, combine: fn(Vec<Predicate>) -> Predicate) -> Predicate {
    if operands.len() == 1 {
        operands.remove(0)
    } else {
        combine(operands)
    }
}

fn leaf(field: &str, comparison: Comparison, value: &str) -> Predicate {
    match comparison {
        Comparison::Like => like(field, value),
        Comparison::Op(op) if op.takes_list() => Predicate::Compare {
            field: field.to_string(),
            op,
            value: Bson::Array(list_values(value)),
        },
        Comparison::Op(op) => Predicate::Compare {
            field: field.to_string(),
            op,
            value: literal::infer(value).into(),
        },
    }
}

fn like(field: &str, value: &str) -> Predicate {
    let text = literal::infer(value).to_string();

    let (leading, rest) = match text.strip_prefix('%') {
        Some(rest) => (true, rest),
        None => (false, text.as_str()),
    };
    let (trailing, inner) = match rest.strip_suffix('%') {
        Some(inner) => (true, inner),
        None => (false, rest),
    };
    let escaped = regex::escape(inner);

    let (kind, regex) = match (leading, trailing) {
        (true, true) => (PatternKind::Contains, escaped),
        (false, true) => (PatternKind::Prefix, format!("^{escaped}")),
        (true, false) => (PatternKind::Suffix, format!("{escaped}$")),
        (false, false) => (PatternKind::Substring, escaped),
    };

    Predicate::Pattern {
        field: field.to_string(),
        kind,
        regex,
    }
}

fn list_values(value: &str) -> Vec<Bson> {
    let inner = value
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .or_else(|| {
            value
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
        })
        .unwrap_or(value);

    split_outside_quotes(inner, ',')
        .into_iter()
        .map(str::trim)
        .filter(|element| !element.is_empty())
        .map(|element| Bson::from(literal::infer(element)))
        .collect()
}

fn split_outside_quotes(text: &str, delimiter: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (index, ch) in text.char_indices() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => {}
            None if (ch == '\'' || ch == '"')
                && text[start..index].trim().is_empty()
                && text[index + ch.len_utf8()..].contains(ch) =>
            {
                quote = Some(ch)
            }
            None if ch == delimiter => {
                parts.push(&text[start..index]);
                start = index + ch.len_utf8();
            }
            None => {}
        }
    }
    parts.push(&text[start..]);

    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::CompareOp;

    fn compare(field: &str, op: CompareOp, value: impl Into<Bson>) -> Predicate {
        Predicate::compare(field, op, value)
    }

    #[test]
    fn prebuilt_trees_pass_through() {
        let tree = compare("a", CompareOp::Eq, 1).or(Predicate::Opaque("x".into()));
        assert_eq!(compile(tree.clone()), tree);
    }

    #[test]
    fn empty_input_matches_all() {
        assert_eq!(compile(""), Predicate::MatchAll);
        assert_eq!(compile("   "), Predicate::MatchAll);
        assert_eq!(compile(None::<&str>), Predicate::MatchAll);
    }

    #[test]
    fn integers_are_typed() {
        assert_eq!(compile("age >= 21"), compare("age", CompareOp::Gte, Bson::Int32(21)));
        assert_eq!(compile("age>=21"), compare("age", CompareOp::Gte, Bson::Int32(21)));
    }

    #[test]
    fn quoted_values_stay_strings() {
        assert_eq!(compile("name = 'John'"), compare("name", CompareOp::Eq, "John"));
        assert_eq!(compile("code = \"42\""), compare("code", CompareOp::Eq, "42"));
    }

    #[test]
    fn word_operators() {
        assert_eq!(compile("age gt 3.5"), compare("age", CompareOp::Gt, 3.5));
        assert_eq!(compile("active NE true"), compare("active", CompareOp::Ne, true));
        assert_eq!(compile("age lte 10"), compare("age", CompareOp::Lte, Bson::Int32(10)));
    }

    #[test]
    fn or_of_two_comparisons() {
        assert_eq!(
            compile("a = 1 or b = 2"),
            Predicate::Or(vec![compile("a = 1"), compile("b = 2")])
        );
        assert_eq!(compile("a = 1 || b = 2"), compile("a = 1 or b = 2"));
    }

    #[test]
    fn and_chains_are_flat() {
        assert_eq!(
            compile("a = 1 and b = 2 and c = 3"),
            Predicate::And(vec![compile("a = 1"), compile("b = 2"), compile("c = 3")])
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        assert_eq!(
            compile("a = 1 or b = 2 and c = 3"),
            Predicate::Or(vec![
                compile("a = 1"),
                Predicate::And(vec![compile("b = 2"), compile("c = 3")]),
            ])
        );
    }

    #[test]
    fn nor_sits_between_or_and_and() {
        assert_eq!(
            compile("a = 1 nor b = 2 and c = 3 or d = 4"),
            Predicate::Or(vec![
                Predicate::Nor(vec![
                    compile("a = 1"),
                    Predicate::And(vec![compile("b = 2"), compile("c = 3")]),
                ]),
                compile("d = 4"),
            ])
        );
    }

    #[test]
    fn not_applies_to_the_next_comparison() {
        assert_eq!(
            compile("not a = 1 and b = 2"),
            Predicate::And(vec![compile("a = 1").negate(), compile("b = 2")])
        );
        assert_eq!(compile("not not a = 1"), compile("a = 1").negate().negate());
    }

    #[test]
    fn membership_lists() {
        assert_eq!(
            compile("tag in (red, 'blue', 3)"),
            Predicate::Compare {
                field: "tag".into(),
                op: CompareOp::In,
                value: Bson::Array(vec!["red".into(), "blue".into(), Bson::Int32(3)]),
            }
        );
        assert_eq!(
            compile("tag nin [a,b]"),
            Predicate::Compare {
                field: "tag".into(),
                op: CompareOp::Nin,
                value: Bson::Array(vec!["a".into(), "b".into()]),
            }
        );
        assert_eq!(
            compile("tags all red"),
            Predicate::Compare {
                field: "tags".into(),
                op: CompareOp::All,
                value: Bson::Array(vec!["red".into()]),
            }
        );
    }

    #[test]
    fn apostrophes_inside_words_are_literal() {
        assert_eq!(
            compile("name = O'Brien and age > 3"),
            Predicate::And(vec![
                compare("name", CompareOp::Eq, "O'Brien"),
                compare("age", CompareOp::Gt, Bson::Int32(3)),
            ])
        );
        assert_eq!(
            compile("name = 'open or age > 3"),
            Predicate::Or(vec![
                compare("name", CompareOp::Eq, "'open"),
                compare("age", CompareOp::Gt, Bson::Int32(3)),
            ])
        );
        assert_eq!(
            compile("name in (O'Brien, 'Doe, J')"),
            Predicate::Compare {
                field: "name".into(),
                op: CompareOp::In,
                value: Bson::Array(vec!["O'Brien".into(), "Doe, J".into()]),
            }
        );
    }

    #[test]
    fn commas_inside_quotes_do_not_split() {
        assert_eq!(
            compile("name in ('Doe, John', x)"),
            Predicate::Compare {
                field: "name".into(),
                op: CompareOp::In,
                value: Bson::Array(vec!["Doe, John".into(), "x".into()]),
            }
        );
    }

    #[test]
    fn like_patterns() {
        let pattern = |kind, regex: &str| Predicate::Pattern {
            field: "name".into(),
            kind,
            regex: regex.into(),
        };

        assert_eq!(compile("name like '%oe%'"), pattern(PatternKind::Contains, "oe"));
        assert_eq!(compile("name like 'Jo%'"), pattern(PatternKind::Prefix, "^Jo"));
        assert_eq!(compile("name like '%oe'"), pattern(PatternKind::Suffix, "oe$"));
        assert_eq!(compile("name like oe"), pattern(PatternKind::Substring, "oe"));
        assert_eq!(compile("name like 'a.b%'"), pattern(PatternKind::Prefix, "^a\\.b"));
    }

    #[test]
    fn operators_inside_quotes_are_values() {
        assert_eq!(
            compile("note = 'a and b'"),
            compare("note", CompareOp::Eq, "a and b")
        );
    }

    #[test]
    fn segments_without_operator_are_opaque() {
        assert_eq!(compile("just some text"), Predicate::Opaque("just some text".into()));
        assert_eq!(
            compile("a = 1 and loose"),
            Predicate::And(vec![compile("a = 1"), Predicate::Opaque("loose".into())])
        );
    }

    #[test]
    fn first_operator_splits_the_segment() {
        assert_eq!(compile("expr = a>b"), compare("expr", CompareOp::Eq, "a>b"));
    }
}
