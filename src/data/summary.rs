use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::classify::{classify_columns_with, ColumnClassification, ColumnKind};
use super::model::{Column, Table, Value};
use super::temporal::DateParser;
use crate::error::EngineResult;

// ---------------------------------------------------------------------------
// Summary record
// ---------------------------------------------------------------------------
//
// Statistics that cannot be computed are `None` rather than an error: an
// empty column has no mean, a single value has no sample deviation.

/// describe()-style statistics for a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    /// Non-missing values.
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (N - 1 divisor); `None` below two values.
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q25: Option<f64>,
    #[serde(rename = "50%")]
    pub q50: Option<f64>,
    #[serde(rename = "75%")]
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalSummary {
    pub count: usize,
    pub distinct: usize,
    /// Most frequent value; ties go to the one seen first.
    pub top: Option<Value>,
    pub freq: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemporalSummary {
    pub count: usize,
    pub distinct: usize,
    pub first: Option<NaiveDateTime>,
    pub last: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ColumnStats {
    Numeric(NumericSummary),
    Categorical(CategoricalSummary),
    Temporal(TemporalSummary),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    #[serde(flatten)]
    pub stats: ColumnStats,
}

/// Statistics over a (possibly filtered) table. Columns keep table order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRecord {
    pub row_count: usize,
    pub columns: Vec<ColumnSummary>,
}

impl SummaryRecord {
    pub fn get(&self, column: &str) -> Option<&ColumnStats> {
        self.columns
            .iter()
            .find(|c| c.column == column)
            .map(|c| &c.stats)
    }

    pub fn numeric(&self, column: &str) -> Option<&NumericSummary> {
        match self.get(column) {
            Some(ColumnStats::Numeric(n)) => Some(n),
            _ => None,
        }
    }

    /// Numeric columns only, in table order.
    pub fn numeric_columns(&self) -> impl Iterator<Item = (&str, &NumericSummary)> {
        self.columns.iter().filter_map(|c| match &c.stats {
            ColumnStats::Numeric(n) => Some((c.column.as_str(), n)),
            _ => None,
        })
    }

    /// Distinct non-missing values of a categorical or temporal column.
    pub fn distinct_count(&self, column: &str) -> Option<usize> {
        match self.get(column)? {
            ColumnStats::Categorical(c) => Some(c.distinct),
            ColumnStats::Temporal(t) => Some(t.distinct),
            ColumnStats::Numeric(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Summarise `table`.
///
/// With `columns == None` every numeric column is included. Otherwise only
/// the named columns are, each summarised according to its classification;
/// naming a column that does not exist is an `InvalidColumn` error.
pub fn compute_summary(table: &Table, columns: Option<&[&str]>) -> EngineResult<SummaryRecord> {
    compute_summary_with(table, columns, &DateParser::default())
}

pub fn compute_summary_with(
    table: &Table,
    columns: Option<&[&str]>,
    parser: &DateParser,
) -> EngineResult<SummaryRecord> {
    let classification = classify_columns_with(table, parser);
    summarize_classified(table, columns, &classification, parser)
}

/// Like [`compute_summary_with`] but with a classification made earlier,
/// e.g. on the unfiltered table, so a column keeps its kind even when the
/// filter leaves no rows to inspect.
pub fn summarize_classified(
    table: &Table,
    columns: Option<&[&str]>,
    classification: &ColumnClassification,
    parser: &DateParser,
) -> EngineResult<SummaryRecord> {
    let selected: Vec<&Column> = match columns {
        None => table
            .columns()
            .iter()
            .filter(|c| classification.is_numeric(c.name()))
            .collect(),
        Some(names) => names
            .iter()
            .map(|name| table.require_column(name))
            .collect::<EngineResult<_>>()?,
    };

    let columns = selected
        .into_iter()
        .map(|col| {
            let stats = match classification.kind_of(col.name()) {
                Some(ColumnKind::Numeric) => ColumnStats::Numeric(numeric_summary(col)),
                Some(ColumnKind::Temporal) => ColumnStats::Temporal(temporal_summary(col, parser)),
                _ => ColumnStats::Categorical(categorical_summary(col)),
            };
            ColumnSummary {
                column: col.name().to_string(),
                stats,
            }
        })
        .collect();

    Ok(SummaryRecord {
        row_count: table.row_count(),
        columns,
    })
}

/// Numeric statistics over the non-missing values of `column`. NaN cells
/// count as missing.
pub fn numeric_summary(column: &Column) -> NumericSummary {
    let mut values: Vec<f64> = column
        .values()
        .iter()
        .filter_map(Value::as_f64)
        .filter(|v| !v.is_nan())
        .collect();
    values.sort_by(f64::total_cmp);

    let count = values.len();
    if count == 0 {
        return NumericSummary {
            count,
            mean: None,
            std: None,
            min: None,
            q25: None,
            q50: None,
            q75: None,
            max: None,
        };
    }

    // Welford: a constant column keeps an exact mean and zero deviation.
    let mut mean = 0.0;
    let mut m2 = 0.0;
    for (i, &x) in values.iter().enumerate() {
        let delta = x - mean;
        mean += delta / (i + 1) as f64;
        m2 += delta * (x - mean);
    }
    let std = (count >= 2).then(|| (m2 / (count - 1) as f64).sqrt());

    NumericSummary {
        count,
        mean: Some(mean),
        std,
        min: values.first().copied(),
        q25: percentile(&values, 0.25),
        q50: percentile(&values, 0.50),
        q75: percentile(&values, 0.75),
        max: values.last().copied(),
    }
}

/// Linear interpolation between order statistics at `p * (n - 1)`.
/// `sorted` must be ascending.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let idx = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    if lo == hi {
        Some(sorted[lo])
    } else {
        let frac = idx - lo as f64;
        Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
    }
}

fn categorical_summary(column: &Column) -> CategoricalSummary {
    // value -> (occurrences, first row seen)
    let mut counts: HashMap<&Value, (usize, usize)> = HashMap::new();
    for (row, value) in column.values().iter().enumerate() {
        if value.is_null() {
            continue;
        }
        counts.entry(value).or_insert((0, row)).0 += 1;
    }
    let top = counts
        .iter()
        .max_by(|(_, (ca, ra)), (_, (cb, rb))| ca.cmp(cb).then(rb.cmp(ra)))
        .map(|(v, (c, _))| ((*v).clone(), *c));

    CategoricalSummary {
        count: column.non_missing().count(),
        distinct: counts.len(),
        freq: top.as_ref().map(|(_, c)| *c).unwrap_or(0),
        top: top.map(|(v, _)| v),
    }
}

fn temporal_summary(column: &Column, parser: &DateParser) -> TemporalSummary {
    let parsed: Vec<NaiveDateTime> = column
        .non_missing()
        .filter_map(|v| parser.parse_value(v))
        .collect();
    let mut distinct = parsed.clone();
    distinct.sort();
    distinct.dedup();
    TemporalSummary {
        count: parsed.len(),
        distinct: distinct.len(),
        first: distinct.first().copied(),
        last: distinct.last().copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::DEFAULT_MISSING_TOKENS;
    use crate::error::EngineError;

    fn table(headers: &[&str], rows: &[Vec<&str>]) -> Table {
        Table::from_text_rows(headers, rows, DEFAULT_MISSING_TOKENS).unwrap()
    }

    fn close(a: Option<f64>, b: f64) -> bool {
        a.map(|a| (a - b).abs() < 1e-9).unwrap_or(false)
    }

    #[test]
    fn describe_matches_known_values() {
        let t = table(&["v"], &[vec!["1"], vec!["2"], vec!["3"], vec!["4"]]);
        let s = compute_summary(&t, None).unwrap();
        let v = s.numeric("v").unwrap();
        assert_eq!(v.count, 4);
        assert!(close(v.mean, 2.5));
        assert!(close(v.std, 1.2909944487358056));
        assert!(close(v.min, 1.0));
        assert!(close(v.q25, 1.75));
        assert!(close(v.q50, 2.5));
        assert!(close(v.q75, 3.25));
        assert!(close(v.max, 4.0));
    }

    #[test]
    fn missing_values_are_not_counted() {
        let t = table(&["v"], &[vec!["10"], vec![""], vec!["NA"]]);
        let v = numeric_summary(t.column("v").unwrap());
        assert_eq!(v.count, 1);
        assert!(close(v.mean, 10.0));
        assert_eq!(v.std, None);
        assert!(close(v.q75, 10.0));
    }

    #[test]
    fn constant_column_has_zero_deviation() {
        let t = table(&["v"], &[vec!["0.1"], vec!["0.1"], vec!["0.1"]]);
        let v = numeric_summary(t.column("v").unwrap());
        assert_eq!(v.mean, Some(0.1));
        assert_eq!(v.std, Some(0.0));
        assert_eq!(v.min, v.max);
    }

    #[test]
    fn empty_table_is_fails_soft() {
        let t = table(&["X", "Y"], &[]);
        let s = compute_summary(&t, None).unwrap();
        assert_eq!(s.row_count, 0);
        assert!(s.columns.is_empty());

        let empty = numeric_summary(&Column::new("v", Vec::new()));
        assert_eq!(empty.count, 0);
        assert_eq!(empty.mean, None);
        assert_eq!(empty.q50, None);
    }

    #[test]
    fn requested_categorical_columns_report_distinct_counts() {
        let t = table(
            &["Assignee", "Hours"],
            &[vec!["Bob", "1"], vec!["Carol", "2"], vec!["Bob", "3"], vec!["", "4"]],
        );
        let s = compute_summary(&t, Some(&["Assignee", "Hours"][..])).unwrap();
        assert_eq!(s.distinct_count("Assignee"), Some(2));
        match s.get("Assignee") {
            Some(ColumnStats::Categorical(c)) => {
                assert_eq!(c.count, 3);
                assert_eq!(c.top, Some(Value::Text("Bob".into())));
                assert_eq!(c.freq, 2);
            }
            other => panic!("unexpected stats {other:?}"),
        }
        assert_eq!(s.numeric("Hours").unwrap().count, 4);
        assert_eq!(s.columns[0].column, "Assignee");
    }

    #[test]
    fn requested_temporal_columns_report_range() {
        let t = table(&["Due"], &[vec!["2024-02-05"], vec!["2024-01-10"], vec!["2024-01-10"]]);
        let s = compute_summary(&t, Some(&["Due"][..])).unwrap();
        match s.get("Due") {
            Some(ColumnStats::Temporal(ts)) => {
                assert_eq!(ts.count, 3);
                assert_eq!(ts.distinct, 2);
                assert_eq!(ts.first.unwrap().to_string(), "2024-01-10 00:00:00");
                assert_eq!(ts.last.unwrap().to_string(), "2024-02-05 00:00:00");
            }
            other => panic!("unexpected stats {other:?}"),
        }
    }

    #[test]
    fn unknown_requested_column_is_an_error() {
        let t = table(&["v"], &[vec!["1"]]);
        assert_eq!(
            compute_summary(&t, Some(&["w"][..])).unwrap_err(),
            EngineError::InvalidColumn { column: "w".into() }
        );
    }

    #[test]
    fn percentile_edges() {
        assert_eq!(percentile(&[], 0.5), None);
        assert_eq!(percentile(&[7.0], 0.25), Some(7.0));
        assert_eq!(percentile(&[1.0, 3.0], 0.5), Some(2.0));
    }

    #[test]
    fn serializes_like_describe() {
        let t = table(&["v"], &[vec!["1"]]);
        let s = compute_summary(&t, None).unwrap();
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["row_count"], 1);
        assert_eq!(json["columns"][0]["kind"], "numeric");
        assert_eq!(json["columns"][0]["50%"], 1.0);
        assert!(json["columns"][0]["std"].is_null());
    }
}
