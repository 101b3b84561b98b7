//! Field projection for returned records.
//!
//! A projection is built from a comma-delimited field list or an explicit list of names.
//! `*` or an empty list selects every field. Any explicit list also selects the identifier
//! field.

use bson::{Bson, Document};

/// Raw field selection as received from a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldList {
    Delimited(String),
    Names(Vec<String>),
}

impl Default for FieldList {
    fn default() -> Self {
        FieldList::Delimited(String::new())
    }
}

impl From<&str> for FieldList {
    fn from(value: &str) -> Self {
        FieldList::Delimited(value.to_string())
    }
}

impl From<String> for FieldList {
    fn from(value: String) -> Self {
        FieldList::Delimited(value)
    }
}

impl From<Vec<String>> for FieldList {
    fn from(value: Vec<String>) -> Self {
        FieldList::Names(value)
    }
}

impl From<Vec<&str>> for FieldList {
    fn from(value: Vec<&str>) -> Self {
        FieldList::Names(value.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for FieldList {
    fn from(value: [&str; N]) -> Self {
        FieldList::Names(value.into_iter().map(str::to_string).collect())
    }
}

impl<T: Into<FieldList>> From<Option<T>> for FieldList {
    fn from(value: Option<T>) -> Self {
        value.map_or_else(FieldList::default, Into::into)
    }
}

/// The set of fields included in a returned record.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Projection {
    #[default]
    All,
    /// Selected field paths, identifier first. Dotted paths select nested fields.
    Fields(Vec<String>),
}

impl Projection {
    pub fn new(fields: impl Into<FieldList>, id_field: &str) -> Self {
        let names: Vec<String> = match fields.into() {
            FieldList::Delimited(text) => text
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
            FieldList::Names(names) => names
                .into_iter()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
        };

        if names.is_empty() || names.iter().any(|name| name == "*") {
            return Projection::All;
        }

        let mut selected = vec![id_field.to_string()];
        for name in names {
            if !selected.contains(&name) {
                selected.push(name);
            }
        }
        Projection::Fields(selected)
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Projection::All)
    }

    /// True when nothing but the identifier is selected.
    pub fn is_id_only(&self, id_field: &str) -> bool {
        match self {
            Projection::All => false,
            Projection::Fields(fields) => fields.iter().all(|field| field == id_field),
        }
    }

    /// Selected paths, or `None` for every field.
    pub fn fields(&self) -> Option<&[String]> {
        match self {
            Projection::All => None,
            Projection::Fields(fields) => Some(fields),
        }
    }

    /// Keeps only the selected fields of a record, preserving its field order.
    pub fn apply(&self, record: Document) -> Document {
        match self {
            Projection::All => record,
            Projection::Fields(fields) => {
                let paths: Vec<Vec<&str>> =
                    fields.iter().map(|field| field.split('.').collect()).collect();
                select(record, &paths)
            }
        }
    }
}

fn select(record: Document, paths: &[Vec<&str>]) -> Document {
    let mut projected = Document::new();

    for (key, value) in record {
        let matching: Vec<&[&str]> = paths
            .iter()
            .filter(|path| path.first() == Some(&key.as_str()))
            .map(|path| &path[1..])
            .collect();

        if matching.is_empty() {
            continue;
        }
        if matching.iter().any(|rest| rest.is_empty()) {
            projected.insert(key, value);
            continue;
        }
        if let Bson::Document(nested) = value {
            let rest: Vec<Vec<&str>> = matching.into_iter().map(<[&str]>::to_vec).collect();
            let nested = select(nested, &rest);
            if !nested.is_empty() {
                projected.insert(key, nested);
            }
        }
    }

    projected
}
