//! Tokenizer for the filter expression language.
//!
//! Tokens keep the byte span they were read from so the parser can hand the original
//! source text of field names and values to the literal inferencer untouched.

use std::ops::Range;

use crate::predicate::CompareOp;

/// Logical combinators, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logical {
    Or,
    Nor,
    And,
}

/// Comparison operators as written in a filter, before tree construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Op(CompareOp),
    Like,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Logical(Logical),
    Not,
    Comparison(Comparison),
    /// A quoted run, quotes included in the span.
    Quoted,
    Word,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

const SYMBOLS: [(&str, TokenKind); 8] = [
    ("||", TokenKind::Logical(Logical::Or)),
    ("&&", TokenKind::Logical(Logical::And)),
    ("!=", TokenKind::Comparison(Comparison::Op(CompareOp::Ne))),
    (">=", TokenKind::Comparison(Comparison::Op(CompareOp::Gte))),
    ("<=", TokenKind::Comparison(Comparison::Op(CompareOp::Lte))),
    ("=", TokenKind::Comparison(Comparison::Op(CompareOp::Eq))),
    (">", TokenKind::Comparison(Comparison::Op(CompareOp::Gt))),
    ("<", TokenKind::Comparison(Comparison::Op(CompareOp::Lt))),
];

/// Splits a filter string into tokens.
pub fn tokenize(source: &str) -> Vec<Token> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let byte = bytes[pos];

        if byte.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        // Quotes open a run only at a token boundary and only when closed later on.
        // Anything else is a literal character of the surrounding word.
        if byte == b'\'' || byte == b'"' {
            if let Some(offset) = source[pos + 1..].find(byte as char) {
                let end = pos + 1 + offset + 1;
                tokens.push(Token {
                    kind: TokenKind::Quoted,
                    span: pos..end,
                });
                pos = end;
                continue;
            }
        }

        if let Some((symbol, kind)) = SYMBOLS
            .iter()
            .find(|(symbol, _)| source[pos..].starts_with(symbol))
        {
            tokens.push(Token {
                kind: *kind,
                span: pos..pos + symbol.len(),
            });
            pos += symbol.len();
            continue;
        }

        let start = pos;
        while pos < bytes.len() && !ends_word(source, pos) {
            pos += source[pos..].chars().next().map_or(1, char::len_utf8);
        }
        tokens.push(Token {
            kind: classify(&source[start..pos]),
            span: start..pos,
        });
    }

    tokens
}

fn ends_word(source: &str, pos: usize) -> bool {
    let byte = source.as_bytes()[pos];
    byte.is_ascii_whitespace()
        || SYMBOLS
            .iter()
            .any(|(symbol, _)| source[pos..].starts_with(symbol))
}

fn classify(word: &str) -> TokenKind {
    match word.to_ascii_lowercase().as_str() {
        "or" => TokenKind::Logical(Logical::Or),
        "nor" => TokenKind::Logical(Logical::Nor),
        "and" => TokenKind::Logical(Logical::And),
        "not" => TokenKind::Not,
        "eq" => TokenKind::Comparison(Comparison::Op(CompareOp::Eq)),
        "ne" => TokenKind::Comparison(Comparison::Op(CompareOp::Ne)),
        "gte" => TokenKind::Comparison(Comparison::Op(CompareOp::Gte)),
        "lte" => TokenKind::Comparison(Comparison::Op(CompareOp::Lte)),
        "gt" => TokenKind::Comparison(Comparison::Op(CompareOp::Gt)),
        "lt" => TokenKind::Comparison(Comparison::Op(CompareOp::Lt)),
        "in" => TokenKind::Comparison(Comparison::Op(CompareOp::In)),
        "nin" => TokenKind::Comparison(Comparison::Op(CompareOp::Nin)),
        "all" => TokenKind::Comparison(Comparison::Op(CompareOp::All)),
        "like" => TokenKind::Comparison(Comparison::Like),
        _ => TokenKind::Word,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|token| token.kind).collect()
    }

    #[test]
    fn two_character_operators_are_single_tokens() {
        assert_eq!(
            kinds("age>=21"),
            vec![
                TokenKind::Word,
                TokenKind::Comparison(Comparison::Op(CompareOp::Gte)),
                TokenKind::Word,
            ]
        );
        assert_eq!(
            kinds("a != b"),
            vec![
                TokenKind::Word,
                TokenKind::Comparison(Comparison::Op(CompareOp::Ne)),
                TokenKind::Word,
            ]
        );
    }

    #[test]
    fn keywords_ignore_case() {
        assert_eq!(
            kinds("NOT a GTE 1 And b LIKE x"),
            vec![
                TokenKind::Not,
                TokenKind::Word,
                TokenKind::Comparison(Comparison::Op(CompareOp::Gte)),
                TokenKind::Word,
                TokenKind::Logical(Logical::And),
                TokenKind::Word,
                TokenKind::Comparison(Comparison::Like),
                TokenKind::Word,
            ]
        );
    }

    #[test]
    fn quoted_runs_hide_keywords_and_operators() {
        let source = "name = 'a and b >= c'";
        let tokens = tokenize(source);
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[2].kind, TokenKind::Quoted);
        assert_eq!(&source[tokens[2].span.clone()], "'a and b >= c'");
    }

    #[test]
    fn unterminated_quote_is_a_literal_character() {
        let source = "name = 'open and a = 1";
        let tokens = tokenize(source);
        assert_eq!(tokens[2].kind, TokenKind::Word);
        assert_eq!(&source[tokens[2].span.clone()], "'open");
        assert_eq!(tokens[3].kind, TokenKind::Logical(Logical::And));
    }

    #[test]
    fn quotes_inside_words_do_not_open_runs() {
        let source = "name = O'Brien and x = 'y'";
        let tokens = tokenize(source);
        assert_eq!(&source[tokens[2].span.clone()], "O'Brien");
        assert_eq!(tokens[3].kind, TokenKind::Logical(Logical::And));
        assert_eq!(tokens[6].kind, TokenKind::Quoted);
    }

    #[test]
    fn symbolic_logical_operators() {
        assert_eq!(
            kinds("a=1||b=2&&c=3"),
            vec![
                TokenKind::Word,
                TokenKind::Comparison(Comparison::Op(CompareOp::Eq)),
                TokenKind::Word,
                TokenKind::Logical(Logical::Or),
                TokenKind::Word,
                TokenKind::Comparison(Comparison::Op(CompareOp::Eq)),
                TokenKind::Word,
                TokenKind::Logical(Logical::And),
                TokenKind::Word,
                TokenKind::Comparison(Comparison::Op(CompareOp::Eq)),
                TokenKind::Word,
            ]
        );
    }

    #[test]
    fn keywords_inside_words_are_not_split() {
        assert_eq!(kinds("brand = android"), vec![
            TokenKind::Word,
            TokenKind::Comparison(Comparison::Op(CompareOp::Eq)),
            TokenKind::Word,
        ]);
    }
}
