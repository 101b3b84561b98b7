//! Literal type inference for filter values and unquoted identifiers.

use std::fmt;

use bson::Bson;

/// A typed scalar inferred from a token string.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(value) => write!(f, "{value}"),
            Literal::Float(value) => write!(f, "{value}"),
            Literal::Bool(value) => write!(f, "{value}"),
            Literal::String(value) => f.write_str(value),
        }
    }
}

impl From<Literal> for Bson {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Int(value) => match i32::try_from(value) {
                Ok(small) => Bson::Int32(small),
                Err(_) => Bson::Int64(value),
            },
            Literal::Float(value) => Bson::Double(value),
            Literal::Bool(value) => Bson::Boolean(value),
            Literal::String(value) => Bson::String(value),
        }
    }
}

/// Converts a token into a typed scalar.
///
/// Quoted tokens are returned verbatim without their quotes. Numeric tokens become integers
/// when they round-trip exactly through integer parsing, floats otherwise. `true`/`false`
/// (any case) become booleans. Everything else stays a string.
pub fn infer(token: &str) -> Literal {
    if let Some(inner) = unquote(token) {
        return Literal::String(inner.to_string());
    }

    if is_numeric(token) {
        if let Ok(value) = token.parse::<i64>() {
            if value.to_string() == token {
                return Literal::Int(value);
            }
        }
        if let Ok(value) = token.parse::<f64>() {
            return Literal::Float(value);
        }
    }

    if token.eq_ignore_ascii_case("true") {
        return Literal::Bool(true);
    }
    if token.eq_ignore_ascii_case("false") {
        return Literal::Bool(false);
    }

    Literal::String(token.to_string())
}

/// Returns the inner text of a token wrapped in matching single or double quotes.
pub fn unquote(token: &str) -> Option<&str> {
    let bytes = token.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if (first == b'\'' || first == b'"') && bytes[bytes.len() - 1] == first {
            return Some(&token[1..token.len() - 1]);
        }
    }
    None
}

/// Decimal number syntax: optional sign, digits with an optional fraction, optional exponent.
pub fn is_numeric(token: &str) -> bool {
    let bytes = token.as_bytes();
    let mut pos = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        pos += 1;
    }

    let mut digits = 0;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
        digits += 1;
    }
    if pos < bytes.len() && bytes[pos] == b'.' {
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return false;
    }

    if pos < bytes.len() && matches!(bytes[pos], b'e' | b'E') {
        pos += 1;
        if matches!(bytes.get(pos), Some(b'+' | b'-')) {
            pos += 1;
        }
        let start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos == start {
            return false;
        }
    }

    pos == bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_tokens_stay_strings() {
        assert_eq!(infer("'John'"), Literal::String("John".into()));
        assert_eq!(infer("\"42\""), Literal::String("42".into()));
        assert_eq!(infer("'true'"), Literal::String("true".into()));
        assert_eq!(infer("''"), Literal::String(String::new()));
    }

    #[test]
    fn mismatched_quotes_are_not_stripped() {
        assert_eq!(infer("'abc\""), Literal::String("'abc\"".into()));
        assert_eq!(infer("'"), Literal::String("'".into()));
    }

    #[test]
    fn integers_round_trip() {
        assert_eq!(infer("21"), Literal::Int(21));
        assert_eq!(infer("-7"), Literal::Int(-7));
        assert_eq!(infer("9007199254740993"), Literal::Int(9007199254740993));
    }

    #[test]
    fn non_canonical_numbers_become_floats() {
        assert_eq!(infer("3.5"), Literal::Float(3.5));
        assert_eq!(infer("007"), Literal::Float(7.0));
        assert_eq!(infer("+5"), Literal::Float(5.0));
        assert_eq!(infer("1e3"), Literal::Float(1000.0));
    }

    #[test]
    fn booleans_ignore_case() {
        assert_eq!(infer("TRUE"), Literal::Bool(true));
        assert_eq!(infer("False"), Literal::Bool(false));
    }

    #[test]
    fn everything_else_is_a_string() {
        assert_eq!(infer("active"), Literal::String("active".into()));
        assert_eq!(infer("inf"), Literal::String("inf".into()));
        assert_eq!(infer("NaN"), Literal::String("NaN".into()));
        assert_eq!(infer("1e"), Literal::String("1e".into()));
        assert_eq!(infer("."), Literal::String(".".into()));
    }

    #[test]
    fn small_integers_convert_to_int32() {
        assert_eq!(Bson::from(Literal::Int(21)), Bson::Int32(21));
        assert_eq!(Bson::from(Literal::Int(1 << 40)), Bson::Int64(1 << 40));
    }
}
