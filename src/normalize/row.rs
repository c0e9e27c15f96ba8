use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One cell of a source row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawValue {
    Text(String),
    /// Exact number, as produced by spreadsheet readers.
    Number(Decimal),
    Empty,
}

impl RawValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) => false,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s.trim()),
            Self::Number(d) => write!(f, "{}", d.normalize()),
            Self::Empty => Ok(()),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        if s.trim().is_empty() {
            Self::Empty
        } else {
            Self::Text(s.to_string())
        }
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        if s.trim().is_empty() {
            Self::Empty
        } else {
            Self::Text(s)
        }
    }
}

impl From<Decimal> for RawValue {
    fn from(d: Decimal) -> Self {
        Self::Number(d)
    }
}

/// One ingested record: column name to raw value.
///
/// Column names are trimmed and lowercased on insertion, so lookups are
/// insensitive to the source's header casing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceRow {
    index: usize,
    cells: BTreeMap<String, RawValue>,
}

impl SourceRow {
    /// Empty row at a 0-based position in the source.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            cells: BTreeMap::new(),
        }
    }

    /// Row from `(column, value)` pairs.
    pub fn from_pairs<K, V>(index: usize, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<RawValue>,
    {
        let mut row = Self::new(index);
        for (k, v) in pairs {
            row.insert(k, v);
        }
        row
    }

    pub fn with(mut self, column: impl AsRef<str>, value: impl Into<RawValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl AsRef<str>, value: impl Into<RawValue>) {
        self.cells
            .insert(normalize_column(column.as_ref()), value.into());
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Cell of a column; `None` when the column is absent.
    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.cells.get(&normalize_column(column))
    }

    /// True when every cell is empty (trailing spreadsheet rows).
    pub fn is_blank(&self) -> bool {
        self.cells.values().all(RawValue::is_empty)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }
}

pub(crate) fn normalize_column(name: &str) -> String {
    name.trim().to_lowercase()
}
