use log::debug;
use serde::Serialize;

use super::model::{Column, Table, Value};
use super::temporal::DateParser;

/// Verdict for a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Temporal,
}

impl ColumnKind {
    pub fn label(self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Temporal => "temporal",
        }
    }
}

/// Partition of a table's column names. Each list keeps table order and
/// every column lands in exactly one list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnClassification {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
    pub temporal: Vec<String>,
}

impl ColumnClassification {
    pub fn kind_of(&self, column: &str) -> Option<ColumnKind> {
        let has = |names: &[String]| names.iter().any(|n| n == column);
        if has(&self.numeric) {
            Some(ColumnKind::Numeric)
        } else if has(&self.categorical) {
            Some(ColumnKind::Categorical)
        } else if has(&self.temporal) {
            Some(ColumnKind::Temporal)
        } else {
            None
        }
    }

    pub fn is_numeric(&self, column: &str) -> bool {
        self.kind_of(column) == Some(ColumnKind::Numeric)
    }

    pub fn is_categorical(&self, column: &str) -> bool {
        self.kind_of(column) == Some(ColumnKind::Categorical)
    }

    pub fn is_temporal(&self, column: &str) -> bool {
        self.kind_of(column) == Some(ColumnKind::Temporal)
    }

    pub fn len(&self) -> usize {
        self.numeric.len() + self.categorical.len() + self.temporal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, name: &str, kind: ColumnKind) {
        let bucket = match kind {
            ColumnKind::Numeric => &mut self.numeric,
            ColumnKind::Categorical => &mut self.categorical,
            ColumnKind::Temporal => &mut self.temporal,
        };
        bucket.push(name.to_string());
    }
}

/// Classify one column.
///
/// * numeric     – every non-missing value is an integer or float
/// * temporal    – every non-missing value is a date or parses as one
/// * categorical – anything else, including columns with no values at all
pub fn classify_column_with(column: &Column, parser: &DateParser) -> ColumnKind {
    if column.non_missing().next().is_none() {
        return ColumnKind::Categorical;
    }
    if column.non_missing().all(Value::is_numeric) {
        return ColumnKind::Numeric;
    }
    if column
        .non_missing()
        .all(|v| parser.parse_value(v).is_some())
    {
        return ColumnKind::Temporal;
    }
    ColumnKind::Categorical
}

/// [`classify_column_with`] using the default date formats.
pub fn classify_column(column: &Column) -> ColumnKind {
    classify_column_with(column, &DateParser::default())
}

pub fn classify_columns_with(table: &Table, parser: &DateParser) -> ColumnClassification {
    let mut out = ColumnClassification::default();
    for column in table.columns() {
        let kind = classify_column_with(column, parser);
        debug!("column '{}' classified as {}", column.name(), kind.label());
        out.push(column.name(), kind);
    }
    out
}

/// Partition every column of `table` into numeric, categorical and
/// temporal names.
pub fn classify_columns(table: &Table) -> ColumnClassification {
    classify_columns_with(table, &DateParser::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::DEFAULT_MISSING_TOKENS;

    fn col(name: &str, cells: &[&str]) -> Column {
        Column::new(
            name,
            cells
                .iter()
                .map(|c| Value::parse_cell(c, DEFAULT_MISSING_TOKENS))
                .collect(),
        )
    }

    #[test]
    fn numbers_with_gaps_are_numeric() {
        assert_eq!(classify_column(&col("v", &["1", "", "2.5"])), ColumnKind::Numeric);
    }

    #[test]
    fn dates_are_temporal() {
        assert_eq!(
            classify_column(&col("d", &["2024-01-01", "NA", "2024-02-05"])),
            ColumnKind::Temporal
        );
    }

    #[test]
    fn one_bad_date_makes_the_column_categorical() {
        assert_eq!(
            classify_column(&col("d", &["2024-01-01", "soon"])),
            ColumnKind::Categorical
        );
    }

    #[test]
    fn numbers_mixed_with_text_are_categorical() {
        assert_eq!(classify_column(&col("v", &["1", "two"])), ColumnKind::Categorical);
    }

    #[test]
    fn booleans_and_empty_columns_are_categorical() {
        assert_eq!(classify_column(&col("b", &["true", "false"])), ColumnKind::Categorical);
        assert_eq!(classify_column(&col("e", &["", "NA"])), ColumnKind::Categorical);
        assert_eq!(classify_column(&col("z", &[])), ColumnKind::Categorical);
    }

    #[test]
    fn zero_column_table_yields_empty_partition() {
        let c = classify_columns(&Table::empty());
        assert!(c.is_empty());
    }

    #[test]
    fn custom_parser_changes_the_verdict() {
        let column = col("d", &["15/01/2024", "20/01/2024"]);
        assert_eq!(classify_column(&column), ColumnKind::Categorical);
        let parser = DateParser::with_formats(&["%d/%m/%Y"]);
        assert_eq!(classify_column_with(&column, &parser), ColumnKind::Temporal);
    }

    #[test]
    fn kind_lookup() {
        let table = Table::new(vec![
            col("n", &["1"]),
            col("c", &["x"]),
            col("t", &["2024-01-01"]),
        ])
        .unwrap();
        let c = classify_columns(&table);
        assert!(c.is_numeric("n"));
        assert!(c.is_categorical("c"));
        assert!(c.is_temporal("t"));
        assert_eq!(c.kind_of("missing"), None);
        assert_eq!(c.len(), 3);
    }
}
