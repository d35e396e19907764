//! Text and JSON renderings of tables and summaries for headless hosts.

use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use serde::Serialize;

use crate::chart::ChartSpec;
use crate::data::classify::ColumnClassification;
use crate::data::model::{Table, Value};
use crate::data::summary::{ColumnStats, NumericSummary, SummaryRecord};
use crate::data::windows::TimeWindows;

const NUMERIC_STATS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];
const OTHER_STATS: [&str; 6] = ["count", "unique", "top", "freq", "first", "last"];

// ---------------------------------------------------------------------------
// Arrow conversions
// ---------------------------------------------------------------------------

/// First `limit` rows of `table` as a batch of display strings. Missing
/// cells stay null. `None` when the table has no columns.
pub fn table_to_batch(table: &Table, limit: usize) -> Result<Option<RecordBatch>> {
    if table.column_count() == 0 {
        return Ok(None);
    }
    let rows = table.row_count().min(limit);
    let fields: Vec<Field> = table
        .columns()
        .iter()
        .map(|c| Field::new(c.name(), DataType::Utf8, true))
        .collect();
    let arrays: Vec<ArrayRef> = table
        .columns()
        .iter()
        .map(|c| {
            let cells: Vec<Option<String>> = c.values()[..rows]
                .iter()
                .map(|v| (!v.is_null()).then(|| v.to_string()))
                .collect();
            Arc::new(StringArray::from(cells)) as ArrayRef
        })
        .collect();
    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
        .context("building preview batch")?;
    Ok(Some(batch))
}

fn numeric_stat(s: &NumericSummary, stat: &str) -> Option<f64> {
    match stat {
        "count" => Some(s.count as f64),
        "mean" => s.mean,
        "std" => s.std,
        "min" => s.min,
        "25%" => s.q25,
        "50%" => s.q50,
        "75%" => s.q75,
        "max" => s.max,
        _ => None,
    }
}

fn other_stat(stats: &ColumnStats, stat: &str) -> Option<String> {
    match (stats, stat) {
        (ColumnStats::Categorical(c), "count") => Some(c.count.to_string()),
        (ColumnStats::Categorical(c), "unique") => Some(c.distinct.to_string()),
        (ColumnStats::Categorical(c), "top") => c.top.as_ref().map(Value::to_string),
        (ColumnStats::Categorical(c), "freq") => Some(c.freq.to_string()),
        (ColumnStats::Temporal(t), "count") => Some(t.count.to_string()),
        (ColumnStats::Temporal(t), "unique") => Some(t.distinct.to_string()),
        (ColumnStats::Temporal(t), "first") => t.first.map(|d| d.to_string()),
        (ColumnStats::Temporal(t), "last") => t.last.map(|d| d.to_string()),
        _ => None,
    }
}

/// describe()-style grid: one row per statistic, one Float64 column per
/// numeric column. `None` when the summary has no numeric columns.
pub fn summary_to_batch(summary: &SummaryRecord) -> Result<Option<RecordBatch>> {
    let numeric: Vec<(&str, &NumericSummary)> = summary.numeric_columns().collect();
    if numeric.is_empty() {
        return Ok(None);
    }
    let mut fields = vec![Field::new("", DataType::Utf8, false)];
    let mut arrays: Vec<ArrayRef> = vec![Arc::new(StringArray::from(NUMERIC_STATS.to_vec()))];
    for (name, stats) in numeric {
        fields.push(Field::new(name, DataType::Float64, true));
        let values: Vec<Option<f64>> = NUMERIC_STATS
            .iter()
            .map(|stat| numeric_stat(stats, stat))
            .collect();
        arrays.push(Arc::new(Float64Array::from(values)));
    }
    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
        .context("building summary batch")?;
    Ok(Some(batch))
}

/// Grid for categorical and temporal columns: count, unique, top, freq,
/// first, last. `None` when there are no such columns.
pub fn other_summary_to_batch(summary: &SummaryRecord) -> Result<Option<RecordBatch>> {
    let others: Vec<_> = summary
        .columns
        .iter()
        .filter(|c| !matches!(c.stats, ColumnStats::Numeric(_)))
        .collect();
    if others.is_empty() {
        return Ok(None);
    }
    let mut fields = vec![Field::new("", DataType::Utf8, false)];
    let mut arrays: Vec<ArrayRef> = vec![Arc::new(StringArray::from(OTHER_STATS.to_vec()))];
    for col in others {
        fields.push(Field::new(col.column.as_str(), DataType::Utf8, true));
        let values: Vec<Option<String>> = OTHER_STATS
            .iter()
            .map(|stat| other_stat(&col.stats, stat))
            .collect();
        arrays.push(Arc::new(StringArray::from(values)));
    }
    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
        .context("building summary batch")?;
    Ok(Some(batch))
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

fn pretty(batch: &RecordBatch) -> Result<String> {
    Ok(pretty_format_batches(std::slice::from_ref(batch))
        .context("formatting table")?
        .to_string())
}

/// Preview grid of the first `limit` rows plus a row count footer.
pub fn render_table(table: &Table, limit: usize) -> Result<String> {
    let Some(batch) = table_to_batch(table, limit)? else {
        return Ok("(no columns)".to_string());
    };
    let mut out = pretty(&batch)?;
    if table.row_count() > limit {
        out.push_str(&format!("\n... {} more row(s)", table.row_count() - limit));
    }
    out.push_str(&format!(
        "\n[{} rows x {} columns]",
        table.row_count(),
        table.column_count()
    ));
    Ok(out)
}

pub fn render_summary(summary: &SummaryRecord) -> Result<String> {
    let mut parts = vec![format!("rows: {}", summary.row_count)];
    if let Some(batch) = summary_to_batch(summary)? {
        parts.push(pretty(&batch)?);
    }
    if let Some(batch) = other_summary_to_batch(summary)? {
        parts.push(pretty(&batch)?);
    }
    if summary.columns.is_empty() {
        parts.push("(no numeric columns)".to_string());
    }
    Ok(parts.join("\n"))
}

// ---------------------------------------------------------------------------
// JSON report
// ---------------------------------------------------------------------------

/// Table preview in split orientation: column names plus row-major values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub total_rows: usize,
}

impl TablePreview {
    pub fn new(table: &Table, limit: usize) -> Self {
        let rows = (0..table.row_count().min(limit))
            .filter_map(|i| table.row(i))
            .map(|row| row.into_iter().cloned().collect())
            .collect();
        TablePreview {
            columns: table.column_names().iter().map(|n| n.to_string()).collect(),
            rows,
            total_rows: table.row_count(),
        }
    }
}

/// Everything the dashboard shows for one upload, in one serialisable bundle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub source: String,
    pub raw: TablePreview,
    pub classification: ColumnClassification,
    pub charts: Vec<ChartSpec>,
    pub filtered: TablePreview,
    pub summary: SummaryRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub windows: Option<TimeWindows>,
}
