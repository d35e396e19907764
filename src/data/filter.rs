use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use super::model::{Table, Value};
use super::temporal::DateParser;
use crate::error::EngineResult;

// ---------------------------------------------------------------------------
// Filter predicate: which values are permitted per column
// ---------------------------------------------------------------------------

/// One column constraint: a row survives when its value in `column` is
/// one of `allowed`. An empty `allowed` set matches nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    pub column: String,
    pub allowed: BTreeSet<Value>,
}

impl FilterSpec {
    pub fn new(column: impl Into<String>, allowed: impl IntoIterator<Item = Value>) -> Self {
        FilterSpec {
            column: column.into(),
            allowed: allowed.into_iter().collect(),
        }
    }

    /// A spec from user-typed labels, each read the way the column's own
    /// cells were read: same missing tokens, same date formats.
    pub fn from_labels<S, M>(
        table: &Table,
        column: &str,
        labels: &[S],
        missing_tokens: &[M],
        parser: &DateParser,
    ) -> EngineResult<Self>
    where
        S: AsRef<str>,
        M: AsRef<str>,
    {
        let col = table.require_column(column)?;
        Ok(FilterSpec {
            column: column.to_string(),
            allowed: labels
                .iter()
                .map(|l| col.value_for_label(l.as_ref(), missing_tokens, parser))
                .collect(),
        })
    }
}

/// Per-column selection state kept by a host: column_name → selected values.
pub type FilterState = BTreeMap<String, BTreeSet<Value>>;

/// Initialise a [`FilterState`] with all values selected (i.e., show everything).
pub fn init_filter_state(table: &Table) -> FilterState {
    table
        .columns()
        .iter()
        .map(|col| (col.name().to_string(), col.unique_values()))
        .collect()
}

/// Return indices of rows that pass every spec, in table order.
///
/// A row passes a spec when its value for that column is in the permitted
/// set; a missing cell passes only if `Value::Null` is permitted. Every
/// spec column is checked up front, so an unknown column fails before any
/// row is examined.
pub fn filtered_indices(table: &Table, specs: &[FilterSpec]) -> EngineResult<Vec<usize>> {
    let resolved = specs
        .iter()
        .map(|spec| {
            table
                .require_column(&spec.column)
                .map(|col| (col, &spec.allowed))
        })
        .collect::<EngineResult<Vec<_>>>()?;

    if resolved.iter().any(|(_, allowed)| allowed.is_empty()) {
        // Nothing selected for some column → hide everything
        return Ok(Vec::new());
    }

    Ok((0..table.row_count())
        .filter(|&row| {
            resolved
                .iter()
                .all(|(col, allowed)| allowed.contains(&col.values()[row]))
        })
        .collect())
}

/// Keep the rows that pass every spec. Column order and relative row
/// order are preserved.
pub fn apply_filter(table: &Table, specs: &[FilterSpec]) -> EngineResult<Table> {
    let indices = filtered_indices(table, specs)?;
    debug!(
        "filter over {} column(s) kept {} of {} rows",
        specs.len(),
        indices.len(),
        table.row_count()
    );
    Ok(table.take_rows(&indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{load_csv_reader, LoadOptions};
    use crate::data::model::{Column, DEFAULT_MISSING_TOKENS};
    use crate::error::EngineError;

    fn tasks() -> Table {
        Table::from_text_rows(
            &["Name", "Assignee", "Hours"],
            &[
                ["A", "Bob", "3"],
                ["B", "Carol", "5"],
                ["C", "Bob", ""],
                ["D", "", "8"],
            ],
            DEFAULT_MISSING_TOKENS,
        )
        .unwrap()
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn keeps_matching_rows_in_order() {
        let t = tasks();
        let out = apply_filter(&t, &[FilterSpec::new("Assignee", [text("Bob")])]).unwrap();
        assert_eq!(out.row_count(), 2);
        assert_eq!(out.column("Name").unwrap().values(), &[text("A"), text("C")]);
        assert_eq!(out.column_names(), t.column_names());
    }

    #[test]
    fn specs_combine_with_and() {
        let t = tasks();
        let specs = [
            FilterSpec::new("Assignee", [text("Bob")]),
            FilterSpec::new("Hours", [Value::Integer(3), Value::Integer(5)]),
        ];
        assert_eq!(filtered_indices(&t, &specs).unwrap(), vec![0]);
    }

    #[test]
    fn empty_selection_hides_everything() {
        let t = tasks();
        let out = apply_filter(&t, &[FilterSpec::new("Assignee", Vec::<Value>::new())]).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.column_count(), 3);
    }

    #[test]
    fn missing_cells_need_null_selected() {
        let t = tasks();
        let spec = FilterSpec::new("Hours", [Value::Null]);
        assert_eq!(filtered_indices(&t, &[spec]).unwrap(), vec![2]);
    }

    #[test]
    fn unknown_column_is_an_error() {
        let t = tasks();
        let err = apply_filter(&t, &[FilterSpec::new("Owner", [text("Bob")])]).unwrap_err();
        assert_eq!(err, EngineError::InvalidColumn { column: "Owner".into() });
    }

    #[test]
    fn unknown_column_is_reported_even_after_an_empty_selection() {
        let t = tasks();
        let specs = [
            FilterSpec::new("Assignee", Vec::<Value>::new()),
            FilterSpec::new("Owner", [text("Bob")]),
        ];
        assert!(apply_filter(&t, &specs).is_err());
    }

    #[test]
    fn no_specs_keeps_everything() {
        let t = tasks();
        assert_eq!(apply_filter(&t, &[]).unwrap(), t);
    }

    #[test]
    fn init_state_selects_every_value() {
        let t = tasks();
        let state = init_filter_state(&t);
        assert_eq!(state.len(), 3);
        assert!(state["Assignee"].contains(&Value::Null));
        assert_eq!(state["Assignee"].len(), 3);
    }

    #[test]
    fn labels_follow_the_column_type() {
        let t = tasks();
        let parser = DateParser::default();
        let spec = FilterSpec::from_labels(&t, "Hours", &["5"], DEFAULT_MISSING_TOKENS, &parser)
            .unwrap();
        assert_eq!(filtered_indices(&t, &[spec]).unwrap(), vec![1]);
        assert!(
            FilterSpec::from_labels(&t, "Nope", &["5"], DEFAULT_MISSING_TOKENS, &parser).is_err()
        );
    }

    #[test]
    fn date_labels_select_native_date_cells() {
        let day = |d| {
            chrono::NaiveDate::from_ymd_opt(2024, 1, d)
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map_or(Value::Null, Value::DateTime)
        };
        let t = Table::new(vec![Column::new("Start Date", vec![day(5), day(6)])]).unwrap();
        let spec = FilterSpec::from_labels(
            &t,
            "Start Date",
            &["2024-01-05"],
            DEFAULT_MISSING_TOKENS,
            &DateParser::default(),
        )
        .unwrap();
        assert_eq!(filtered_indices(&t, &[spec]).unwrap(), vec![0]);
    }

    #[test]
    fn labels_respect_configured_missing_tokens() {
        let options = LoadOptions {
            missing_tokens: vec!["?".to_string()],
            delimiter: None,
        };
        let t = load_csv_reader("Status\nNA\nok\n?\n".as_bytes(), &options).unwrap();
        let parser = DateParser::default();

        let tokens = options.missing_tokens.as_slice();
        let na = FilterSpec::from_labels(&t, "Status", &["NA"], tokens, &parser).unwrap();
        assert_eq!(filtered_indices(&t, &[na]).unwrap(), vec![0]);

        let missing = FilterSpec::from_labels(&t, "Status", &["?"], tokens, &parser).unwrap();
        assert_eq!(filtered_indices(&t, &[missing]).unwrap(), vec![2]);
    }
}
