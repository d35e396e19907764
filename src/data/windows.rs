//! Named date windows relative to a reference day.
//!
//! Every window is a half-open range of calendar days `[start, end)`.
//! A positive size looks ahead from `now`, a negative one looks back, and
//! the extra [`ALL_WINDOW_LABEL`] window covers every date observed in the
//! table. Arithmetic is exact calendar days (`chrono::Days`), never
//! approximate months.

use chrono::{Days, NaiveDate};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::model::Table;
use super::temporal::DateParser;
use crate::error::{EngineError, EngineResult};

/// Label of the window spanning all observed dates.
pub const ALL_WINDOW_LABEL: &str = "All";

/// A named offset in days from the reference day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub label: String,
    pub days: i64,
}

impl WindowSize {
    pub fn new(label: impl Into<String>, days: i64) -> Self {
        WindowSize {
            label: label.into(),
            days,
        }
    }
}

/// `[start, end)` in calendar days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeWindow {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day < self.end
    }

    /// Whether the inclusive span `[first, last]` shares a day with the window.
    pub fn overlaps(&self, first: NaiveDate, last: NaiveDate) -> bool {
        let (first, last) = if first <= last { (first, last) } else { (last, first) };
        first < self.end && last >= self.start
    }

    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// Derived windows in a stable order: "All" (when dates were observed)
/// followed by the requested sizes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TimeWindows {
    windows: Vec<TimeWindow>,
}

impl TimeWindows {
    pub fn get(&self, label: &str) -> Option<&TimeWindow> {
        self.windows.iter().find(|w| w.label == label)
    }

    pub fn all(&self) -> Option<&TimeWindow> {
        self.get(ALL_WINDOW_LABEL)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.windows.iter().map(|w| w.label.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeWindow> {
        self.windows.iter()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// `day` moved by `days` calendar days in either direction.
pub fn shift_days(day: NaiveDate, days: i64) -> EngineResult<NaiveDate> {
    let shifted = if days >= 0 {
        day.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        day.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.ok_or(EngineError::DateOutOfRange { date: day, days })
}

/// Earliest parseable day in `start_column` and latest in `end_column`.
/// `None` when either column has no parseable dates.
pub fn observed_span(
    table: &Table,
    start_column: &str,
    end_column: &str,
    parser: &DateParser,
) -> EngineResult<Option<(NaiveDate, NaiveDate)>> {
    let start = table.require_column(start_column)?;
    let end = table.require_column(end_column)?;
    let min_start = start.values().iter().filter_map(|v| parser.parse_date(v)).min();
    let max_end = end.values().iter().filter_map(|v| parser.parse_date(v)).max();
    Ok(min_start.zip(max_end))
}

/// Build the named windows around `now` plus an "All" window over the
/// table's observed dates.
///
/// `end_column` defaults to `start_column`. The "All" window runs from
/// the earliest start day up to and including the latest end day, so its
/// exclusive end is the day after. If no dates parse it is left out.
pub fn derive_time_windows(
    table: &Table,
    start_column: &str,
    end_column: Option<&str>,
    now: NaiveDate,
    sizes: &[WindowSize],
) -> EngineResult<TimeWindows> {
    derive_time_windows_with(table, start_column, end_column, now, sizes, &DateParser::default())
}

pub fn derive_time_windows_with(
    table: &Table,
    start_column: &str,
    end_column: Option<&str>,
    now: NaiveDate,
    sizes: &[WindowSize],
    parser: &DateParser,
) -> EngineResult<TimeWindows> {
    let end_column = end_column.unwrap_or(start_column);
    let mut windows = Vec::with_capacity(sizes.len() + 1);

    match observed_span(table, start_column, end_column, parser)? {
        Some((first, last)) => {
            let end = shift_days(last, 1)?;
            windows.push(TimeWindow {
                label: ALL_WINDOW_LABEL.to_string(),
                start: first.min(end),
                end,
            });
        }
        None => warn!(
            "no parseable dates in '{start_column}'/'{end_column}', omitting the {ALL_WINDOW_LABEL} window"
        ),
    }

    for size in sizes {
        let other = shift_days(now, size.days)?;
        let (start, end) = if size.days >= 0 { (now, other) } else { (other, now) };
        windows.push(TimeWindow {
            label: size.label.clone(),
            start,
            end,
        });
    }

    debug!("derived {} time window(s) around {now}", windows.len());
    Ok(TimeWindows { windows })
}

/// Keep the rows whose dates fall in `window`.
///
/// With an end column a row is kept when its inclusive span
/// `[start, end]` overlaps the window; without one, when its start day is
/// inside it. Rows whose start does not parse are dropped; an unparseable
/// end falls back to the start day.
pub fn apply_window(
    table: &Table,
    start_column: &str,
    end_column: Option<&str>,
    window: &TimeWindow,
) -> EngineResult<Table> {
    apply_window_with(table, start_column, end_column, window, &DateParser::default())
}

pub fn apply_window_with(
    table: &Table,
    start_column: &str,
    end_column: Option<&str>,
    window: &TimeWindow,
    parser: &DateParser,
) -> EngineResult<Table> {
    let start = table.require_column(start_column)?;
    let end = end_column.map(|c| table.require_column(c)).transpose()?;

    let indices: Vec<usize> = (0..table.row_count())
        .filter(|&row| {
            let Some(first) = parser.parse_date(&start.values()[row]) else {
                return false;
            };
            match end {
                Some(end) => {
                    let last = parser.parse_date(&end.values()[row]).unwrap_or(first);
                    window.overlaps(first, last)
                }
                None => window.contains(first),
            }
        })
        .collect();

    debug!(
        "window '{}' kept {} of {} rows",
        window.label,
        indices.len(),
        table.row_count()
    );
    Ok(table.take_rows(&indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Value, DEFAULT_MISSING_TOKENS};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tasks() -> Table {
        Table::from_text_rows(
            &["Name", "Start Date", "Due Date"],
            &[
                ["A", "2024-01-01", "2024-01-10"],
                ["B", "2024-02-01", "2024-02-05"],
                ["C", "2024-01-16", "2024-01-20"],
                ["D", "someday", "2024-03-01"],
            ],
            DEFAULT_MISSING_TOKENS,
        )
        .unwrap()
    }

    #[test]
    fn week_window_starts_at_now() {
        let w = derive_time_windows(
            &tasks(),
            "Start Date",
            Some("Due Date"),
            ymd(2024, 1, 15),
            &[WindowSize::new("week", 7)],
        )
        .unwrap();
        let week = w.get("week").unwrap();
        assert_eq!(week.start, ymd(2024, 1, 15));
        assert_eq!(week.end, ymd(2024, 1, 22));
        assert_eq!(week.len_days(), 7);
        assert!(week.contains(ymd(2024, 1, 21)));
        assert!(!week.contains(ymd(2024, 1, 22)));
    }

    #[test]
    fn month_is_exact_days_across_leap_february() {
        let w = derive_time_windows(
            &tasks(),
            "Start Date",
            None,
            ymd(2024, 2, 15),
            &[WindowSize::new("month", 30)],
        )
        .unwrap();
        assert_eq!(w.get("month").unwrap().end, ymd(2024, 3, 16));
    }

    #[test]
    fn negative_sizes_look_back() {
        let w = derive_time_windows(
            &tasks(),
            "Start Date",
            None,
            ymd(2024, 1, 15),
            &[WindowSize::new("last week", -7)],
        )
        .unwrap();
        let last = w.get("last week").unwrap();
        assert_eq!((last.start, last.end), (ymd(2024, 1, 8), ymd(2024, 1, 15)));
    }

    #[test]
    fn all_window_spans_observed_dates() {
        let w = derive_time_windows(
            &tasks(),
            "Start Date",
            Some("Due Date"),
            ymd(2024, 1, 15),
            &[WindowSize::new("week", 7)],
        )
        .unwrap();
        assert_eq!(w.labels(), vec!["All", "week"]);
        let all = w.all().unwrap();
        assert_eq!(all.start, ymd(2024, 1, 1));
        assert_eq!(all.end, ymd(2024, 3, 2));
        assert!(all.contains(ymd(2024, 3, 1)));
    }

    #[test]
    fn all_window_is_omitted_without_dates() {
        let t = Table::from_text_rows(&["d"], &[["soon"]], DEFAULT_MISSING_TOKENS).unwrap();
        let w = derive_time_windows(&t, "d", None, ymd(2024, 1, 15), &[]).unwrap();
        assert!(w.is_empty());
    }

    #[test]
    fn unknown_columns_are_errors() {
        let t = tasks();
        let now = ymd(2024, 1, 15);
        assert!(derive_time_windows(&t, "Begin", None, now, &[]).is_err());
        assert!(derive_time_windows(&t, "Start Date", Some("End"), now, &[]).is_err());
    }

    #[test]
    fn overflow_is_reported() {
        let err = shift_days(NaiveDate::MAX, 1).unwrap_err();
        assert!(matches!(err, EngineError::DateOutOfRange { days: 1, .. }));
    }

    #[test]
    fn window_filter_keeps_overlapping_tasks() {
        let t = tasks();
        let week = TimeWindow {
            label: "week".into(),
            start: ymd(2024, 1, 15),
            end: ymd(2024, 1, 22),
        };
        let out = apply_window(&t, "Start Date", Some("Due Date"), &week).unwrap();
        assert_eq!(out.column("Name").unwrap().values(), &[Value::Text("C".into())]);

        let early = TimeWindow {
            label: "early".into(),
            start: ymd(2024, 1, 5),
            end: ymd(2024, 1, 6),
        };
        let spans = apply_window(&t, "Start Date", Some("Due Date"), &early).unwrap();
        assert_eq!(spans.row_count(), 1);
        let starts = apply_window(&t, "Start Date", None, &early).unwrap();
        assert!(starts.is_empty());
    }
}
