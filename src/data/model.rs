use std::collections::{BTreeSet, HashSet};
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

use super::temporal::DateParser;
use crate::error::{EngineError, EngineResult};

/// Tokens read as a missing value when no other list is configured.
/// Mirrors the usual dataframe defaults for CSV input.
pub const DEFAULT_MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#NA", "N/A", "NA", "n/a", "NULL", "null", "NaN", "nan", "-NaN", "-nan", "None",
    "<NA>",
];

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
/// Using `BTreeMap` / `BTreeSet` downstream so `Value` must be `Ord`.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Infer a value from a raw text cell.
    ///
    /// Missing tokens become [`Value::Null`], then integer, float and boolean
    /// parses are tried in that order. Anything else stays trimmed text,
    /// dates included: whether a text column is temporal is decided by
    /// classification, not at load time.
    pub fn parse_cell<S: AsRef<str>>(raw: &str, missing_tokens: &[S]) -> Value {
        let trimmed = raw.trim();
        if trimmed.is_empty() || missing_tokens.iter().any(|t| t.as_ref().trim() == trimmed) {
            return Value::Null;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return Value::Float(f);
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Value::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Value::Bool(false);
        }
        Value::Text(trimmed.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to interpret the value as an `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    fn discriminant(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Integer(_) => 2,
            Value::Float(_) => 3,
            Value::Text(_) => 4,
            Value::DateTime(_) => 5,
        }
    }
}

// -- Manual Eq/Ord so Value can go in a BTreeSet; equality follows `cmp` --

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        let da = self.discriminant();
        let db = other.discriminant();
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (DateTime(a), DateTime(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.discriminant().hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::DateTime(d) => d.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::DateTime(d) => {
                if d.time() == chrono::NaiveTime::MIN {
                    write!(f, "{}", d.date())
                } else {
                    write!(f, "{d}")
                }
            }
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Text(_) | Value::DateTime(_) => serializer.collect_str(self),
        }
    }
}

// ---------------------------------------------------------------------------
// Column – a named, positionally aligned sequence of values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    values: Vec<Value>,
}

impl Column {
    /// Build a column. A mix of integers and floats (nulls aside) is
    /// promoted to floats so the column keeps a single numeric type.
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        let mixed_numeric = values.iter().any(|v| matches!(v, Value::Float(_)))
            && values.iter().all(|v| v.is_null() || v.is_numeric());
        let values = if mixed_numeric {
            values
                .into_iter()
                .map(|v| match v {
                    Value::Integer(i) => Value::Float(i as f64),
                    other => other,
                })
                .collect()
        } else {
            values
        };
        Column {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values that are not [`Value::Null`].
    pub fn non_missing(&self) -> impl Iterator<Item = &Value> {
        self.values.iter().filter(|v| !v.is_null())
    }

    /// Sorted set of distinct values, `Null` included when present.
    pub fn unique_values(&self) -> BTreeSet<Value> {
        self.values.iter().cloned().collect()
    }

    /// Number of distinct non-missing values.
    pub fn distinct_count(&self) -> usize {
        self.non_missing().collect::<HashSet<_>>().len()
    }

    /// Interpret a user-typed label as a value of this column, using the
    /// missing tokens the column was loaded with. `"5"` matches a float
    /// column holding `5.0` and `"2024-01-05"` a column of native dates.
    pub fn value_for_label<M: AsRef<str>>(
        &self,
        label: &str,
        missing_tokens: &[M],
        parser: &DateParser,
    ) -> Value {
        let parsed = Value::parse_cell(label, missing_tokens);
        if parsed.is_null() {
            return parsed;
        }
        if self.values.iter().any(|v| matches!(v, Value::DateTime(_))) {
            if let Some(dt) = parser.parse_str(label) {
                return Value::DateTime(dt);
            }
        }
        let float_column = self.values.iter().any(|v| matches!(v, Value::Float(_)));
        match parsed {
            Value::Integer(i) if float_column => Value::Float(i as f64),
            other => other,
        }
    }

    fn take(&self, indices: &[usize]) -> Column {
        Column {
            name: self.name.clone(),
            values: indices.iter().map(|&i| self.values[i].clone()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Table – ordered columns sharing one row count
// ---------------------------------------------------------------------------

/// An immutable in-memory table.
///
/// Invariants checked on construction: column names are unique and every
/// column has the same number of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> EngineResult<Self> {
        {
            let mut seen = HashSet::new();
            for col in &columns {
                if !seen.insert(col.name()) {
                    return Err(EngineError::DuplicateColumn {
                        column: col.name().to_string(),
                    });
                }
            }
        }
        let row_count = columns.first().map(Column::len).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.len() != row_count) {
            return Err(EngineError::RaggedColumns {
                column: bad.name().to_string(),
                expected: row_count,
                found: bad.len(),
            });
        }
        Ok(Table { columns, row_count })
    }

    /// A table with no columns and no rows.
    pub fn empty() -> Self {
        Table {
            columns: Vec::new(),
            row_count: 0,
        }
    }

    /// Build a table from row-major values.
    pub fn from_rows<H: AsRef<str>>(headers: &[H], rows: Vec<Vec<Value>>) -> EngineResult<Self> {
        let mut buffers: Vec<Vec<Value>> = headers
            .iter()
            .map(|_| Vec::with_capacity(rows.len()))
            .collect();
        for (row_no, row) in rows.into_iter().enumerate() {
            if row.len() != headers.len() {
                return Err(EngineError::RaggedRow {
                    row: row_no,
                    expected: headers.len(),
                    found: row.len(),
                });
            }
            for (buf, value) in buffers.iter_mut().zip(row) {
                buf.push(value);
            }
        }
        let columns = headers
            .iter()
            .zip(buffers)
            .map(|(h, values)| Column::new(h.as_ref(), values))
            .collect();
        Table::new(columns)
    }

    /// Build a table from raw text cells, inferring each value with
    /// [`Value::parse_cell`].
    pub fn from_text_rows<H, R, C, M>(
        headers: &[H],
        rows: &[R],
        missing_tokens: &[M],
    ) -> EngineResult<Self>
    where
        H: AsRef<str>,
        R: AsRef<[C]>,
        C: AsRef<str>,
        M: AsRef<str>,
    {
        let parsed = rows
            .iter()
            .map(|row| {
                row.as_ref()
                    .iter()
                    .map(|cell| Value::parse_cell(cell.as_ref(), missing_tokens))
                    .collect()
            })
            .collect();
        Table::from_rows(headers, parsed)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Like [`Table::column`] but a missing column is an error.
    pub fn require_column(&self, name: &str) -> EngineResult<&Column> {
        self.column(name)
            .ok_or_else(|| EngineError::invalid_column(name))
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Values of one row, in column order.
    pub fn row(&self, index: usize) -> Option<Vec<&Value>> {
        if index >= self.row_count {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values[index]).collect())
    }

    /// New table with the given rows, in the given order.
    /// Indices must be in range.
    pub(crate) fn take_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
            row_count: indices.len(),
        }
    }
}
