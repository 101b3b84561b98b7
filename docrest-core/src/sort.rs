//! Sort specifications.
//!
//! The textual form is a comma-separated list of `field [direction]` entries, where the
//! direction is `asc`, `desc`, `dsc`, `1` or `-1` in any case. Entries without a direction
//! sort ascending. Earlier entries take precedence.

use serde::{Deserialize, Serialize};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    #[default]
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl SortDirection {
    fn parse(token: &str) -> Self {
        let token = token.to_ascii_lowercase();
        match token.as_str() {
            "desc" | "dsc" | "-1" => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// An ordered list of sort keys.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SortSpec {
    keys: Vec<SortKey>,
}

impl SortSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Self {
        let keys = text
            .split(',')
            .filter_map(|entry| {
                let mut parts = entry.split_whitespace();
                let field = parts.next()?;
                let direction = parts.next().map_or(SortDirection::Asc, SortDirection::parse);
                Some(SortKey {
                    field: field.to_string(),
                    direction,
                })
            })
            .collect();

        Self { keys }
    }

    /// Appends a key; earlier keys take precedence.
    pub fn then(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.keys.push(SortKey {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl From<&str> for SortSpec {
    fn from(value: &str) -> Self {
        SortSpec::parse(value)
    }
}

impl From<String> for SortSpec {
    fn from(value: String) -> Self {
        SortSpec::parse(&value)
    }
}

impl<F: Into<String>> From<Vec<(F, SortDirection)>> for SortSpec {
    fn from(value: Vec<(F, SortDirection)>) -> Self {
        value
            .into_iter()
            .fold(SortSpec::new(), |spec, (field, direction)| spec.then(field, direction))
    }
}

impl From<SortSpec> for String {
    fn from(spec: SortSpec) -> Self {
        spec.keys
            .iter()
            .map(|key| match key.direction {
                SortDirection::Asc => format!("{} asc", key.field),
                SortDirection::Desc => format!("{} desc", key.field),
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(field: &str, direction: SortDirection) -> SortKey {
        SortKey {
            field: field.into(),
            direction,
        }
    }

    #[test]
    fn parses_directions() {
        let spec = SortSpec::parse("age DESC, name, created -1, score 1, rank dsc, x asc");
        assert_eq!(
            spec.keys(),
            &[
                key("age", SortDirection::Desc),
                key("name", SortDirection::Asc),
                key("created", SortDirection::Desc),
                key("score", SortDirection::Asc),
                key("rank", SortDirection::Desc),
                key("x", SortDirection::Asc),
            ]
        );
    }

    #[test]
    fn skips_empty_entries() {
        assert_eq!(SortSpec::parse(" , ,age desc,").keys(), &[key("age", SortDirection::Desc)]);
        assert!(SortSpec::parse("").is_empty());
    }

    #[test]
    fn explicit_pairs() {
        let spec = SortSpec::from(vec![("a", SortDirection::Desc), ("b", SortDirection::Asc)]);
        assert_eq!(
            spec.keys(),
            &[key("a", SortDirection::Desc), key("b", SortDirection::Asc)]
        );
    }

    #[test]
    fn deserializes_from_text() {
        let spec: SortSpec = serde_json::from_str("\"age desc\"").unwrap();
        assert_eq!(spec.keys(), &[key("age", SortDirection::Desc)]);
    }
}
