use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    ArrowPrimitiveType, DataType, Date32Type, Date64Type, Float16Type, Float32Type, Float64Type,
    Int16Type, Int32Type, Int64Type, Int8Type, TimeUnit, TimestampMicrosecondType, TimestampMillisecondType,
    TimestampNanosecondType, TimestampSecondType, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use log::{info, warn};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::model::{Column, Table, Value, DEFAULT_MISSING_TOKENS};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// How text sources are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Cells read as missing values.
    pub missing_tokens: Vec<String>,
    /// Field delimiter; `None` picks `,` or, for `.tsv`, tab.
    pub delimiter: Option<char>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            missing_tokens: DEFAULT_MISSING_TOKENS.iter().map(|t| t.to_string()).collect(),
            delimiter: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` – header row, then one record per line
/// * `.tsv`          – same, tab separated
/// * `.json`         – `[{ "col": value, ... }, ...]`
/// * `.parquet`      – any flat schema
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" | "txt" => load_csv(path, options, b','),
        "tsv" => load_csv(path, options, b'\t'),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    info!(
        "loaded {} rows x {} columns from {}",
        table.row_count(),
        table.column_count(),
        path.display()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path, options: &LoadOptions, default_delimiter: u8) -> Result<Table> {
    let file = File::open(path).context("opening CSV")?;
    read_delimited(file, options, default_delimiter)
}

/// Read CSV from any reader, e.g. bytes uploaded by a host.
/// The first record is the header.
pub fn load_csv_reader<R: Read>(reader: R, options: &LoadOptions) -> Result<Table> {
    read_delimited(reader, options, b',')
}

fn read_delimited<R: Read>(reader: R, options: &LoadOptions, default_delimiter: u8) -> Result<Table> {
    let delimiter = match options.delimiter {
        Some(c) if c.is_ascii() => c as u8,
        Some(c) => bail!("delimiter '{c}' is not a single-byte character"),
        None => default_delimiter,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(
            record
                .iter()
                .map(|cell| Value::parse_cell(cell, &options.missing_tokens))
                .collect(),
        );
    }

    Table::from_rows(&headers, rows).context("building table from CSV")
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Name": "A", "Start Date": "2024-01-01", "Hours": 3.5 },
///   ...
/// ]
/// ```
///
/// Columns are the union of all keys in sorted order; a key absent from a
/// record reads as null.
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json_records(&text)
}

pub fn parse_json_records(text: &str) -> Result<Table> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut objects = Vec::with_capacity(records.len());
    let mut names: BTreeSet<&str> = BTreeSet::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        names.extend(obj.keys().map(String::as_str));
        objects.push(obj);
    }

    let columns = names
        .into_iter()
        .map(|name| {
            let values = objects
                .iter()
                .map(|obj| obj.get(name).map(json_to_value).unwrap_or(Value::Null))
                .collect();
            Column::new(name, values)
        })
        .collect();

    Ok(Table::new(columns)?)
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with a flat schema.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Date and timestamp columns become
/// native date values; types without a direct mapping are formatted as text.
fn load_parquet(path: &Path) -> Result<Table> {
    let file = File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;

    let names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut buffers: Vec<Vec<Value>> = names.iter().map(|_| Vec::new()).collect();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for (col_idx, buffer) in buffers.iter_mut().enumerate() {
            let array = batch.column(col_idx);
            let name = &names[col_idx];
            append_arrow_values(array, buffer)
                .with_context(|| format!("reading parquet column '{name}'"))?;
        }
    }

    let columns = names
        .into_iter()
        .zip(buffers)
        .map(|(name, values)| Column::new(name, values))
        .collect();
    Ok(Table::new(columns)?)
}

// -- Arrow helpers --

/// Append every row of an Arrow array to `out` as [`Value`]s.
fn append_arrow_values(array: &ArrayRef, out: &mut Vec<Value>) -> Result<()> {
    macro_rules! push_primitive {
        ($ty:ty, $conv:expr) => {{
            let arr = array.as_primitive::<$ty>();
            for row in 0..arr.len() {
                out.push(if arr.is_null(row) {
                    Value::Null
                } else {
                    $conv(arr.value(row))
                });
            }
        }};
    }
    macro_rules! push_temporal {
        ($ty:ty) => {{
            let arr = array.as_primitive::<$ty>();
            for row in 0..arr.len() {
                out.push(if arr.is_null(row) {
                    Value::Null
                } else {
                    arr.value_as_datetime(row)
                        .map(Value::DateTime)
                        .unwrap_or(Value::Null)
                });
            }
        }};
    }

    match array.data_type() {
        DataType::Utf8 => {
            let arr = array.as_string::<i32>();
            out.extend(arr.iter().map(|v| v.map_or(Value::Null, |s| Value::Text(s.to_string()))));
        }
        DataType::LargeUtf8 => {
            let arr = array.as_string::<i64>();
            out.extend(arr.iter().map(|v| v.map_or(Value::Null, |s| Value::Text(s.to_string()))));
        }
        DataType::Boolean => {
            let arr = array.as_boolean();
            out.extend(arr.iter().map(|v| v.map_or(Value::Null, Value::Bool)));
        }
        DataType::Int8 => push_primitive!(Int8Type, |v: i8| Value::Integer(v as i64)),
        DataType::Int16 => push_primitive!(Int16Type, |v: i16| Value::Integer(v as i64)),
        DataType::Int32 => push_primitive!(Int32Type, |v: i32| Value::Integer(v as i64)),
        DataType::Int64 => push_primitive!(Int64Type, Value::Integer),
        DataType::UInt8 => push_primitive!(UInt8Type, |v: u8| Value::Integer(v as i64)),
        DataType::UInt16 => push_primitive!(UInt16Type, |v: u16| Value::Integer(v as i64)),
        DataType::UInt32 => push_primitive!(UInt32Type, |v: u32| Value::Integer(v as i64)),
        DataType::UInt64 => push_primitive!(UInt64Type, |v: u64| match i64::try_from(v) {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::Float(v as f64),
        }),
        DataType::Float16 => {
            push_primitive!(Float16Type, |v: <Float16Type as ArrowPrimitiveType>::Native| {
                Value::Float(v.to_f64())
            })
        }
        DataType::Float32 => push_primitive!(Float32Type, |v: f32| Value::Float(v as f64)),
        DataType::Float64 => push_primitive!(Float64Type, Value::Float),
        DataType::Date32 => push_temporal!(Date32Type),
        DataType::Date64 => push_temporal!(Date64Type),
        DataType::Timestamp(TimeUnit::Second, _) => push_temporal!(TimestampSecondType),
        DataType::Timestamp(TimeUnit::Millisecond, _) => push_temporal!(TimestampMillisecondType),
        DataType::Timestamp(TimeUnit::Microsecond, _) => push_temporal!(TimestampMicrosecondType),
        DataType::Timestamp(TimeUnit::Nanosecond, _) => push_temporal!(TimestampNanosecondType),
        other => {
            warn!("column type {other:?} has no direct mapping, reading it as text");
            let formatter = ArrayFormatter::try_new(array.as_ref(), &FormatOptions::default())
                .context("formatting arrow column")?;
            for row in 0..array.len() {
                out.push(if array.is_null(row) {
                    Value::Null
                } else {
                    Value::Text(formatter.value(row).to_string())
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_reader_infers_cells() {
        let data = "Name,Hours,Start Date\nA,3,2024-01-01\nB,,2024-02-01\n";
        let table = load_csv_reader(data.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(table.column_names(), vec!["Name", "Hours", "Start Date"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.column("Hours").unwrap().values(),
            &[Value::Integer(3), Value::Null]
        );
    }

    #[test]
    fn csv_header_only_gives_empty_columns() {
        let table = load_csv_reader("X,Y\n".as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(table.column_names(), vec!["X", "Y"]);
        assert!(table.is_empty());
    }

    #[test]
    fn ragged_csv_is_an_error() {
        let data = "a,b\n1,2\n3\n";
        assert!(load_csv_reader(data.as_bytes(), &LoadOptions::default()).is_err());
    }

    #[test]
    fn custom_delimiter_and_missing_tokens() {
        let options = LoadOptions {
            missing_tokens: vec!["?".into()],
            delimiter: Some(';'),
        };
        let table = load_csv_reader("a;b\n?;NA\n".as_bytes(), &options).unwrap();
        assert_eq!(table.column("a").unwrap().values(), &[Value::Null]);
        assert_eq!(table.column("b").unwrap().values(), &[Value::Text("NA".into())]);
    }

    #[test]
    fn json_records_fill_missing_keys() {
        let table = parse_json_records(r#"[{"b": 1, "a": "x"}, {"a": "y", "c": 2.5}]"#).unwrap();
        assert_eq!(table.column_names(), vec!["a", "b", "c"]);
        assert_eq!(
            table.column("b").unwrap().values(),
            &[Value::Integer(1), Value::Null]
        );
        assert_eq!(
            table.column("c").unwrap().values(),
            &[Value::Null, Value::Float(2.5)]
        );
    }

    #[test]
    fn json_must_be_an_array_of_objects() {
        assert!(parse_json_records(r#"{"a": 1}"#).is_err());
        assert!(parse_json_records(r#"[1, 2]"#).is_err());
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_file(Path::new("data.xlsx"), &LoadOptions::default()).unwrap_err();
        assert!(err.to_string().contains("Unsupported file extension"));
    }
}
