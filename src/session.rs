use std::collections::BTreeSet;

use chrono::NaiveDate;
use log::debug;

use crate::chart::{plan_charts, AxisSelection, ChartSpec};
use crate::data::classify::{classify_columns_with, ColumnClassification};
use crate::data::filter::{apply_filter, init_filter_state, FilterSpec, FilterState};
use crate::data::model::{Table, Value, DEFAULT_MISSING_TOKENS};
use crate::data::summary::{summarize_classified, SummaryRecord};
use crate::data::temporal::DateParser;
use crate::data::windows::{
    apply_window_with, derive_time_windows_with, TimeWindow, TimeWindows, WindowSize,
};
use crate::error::EngineResult;

// ---------------------------------------------------------------------------
// Dashboard session
// ---------------------------------------------------------------------------

/// Host-side state for one uploaded table, independent of rendering.
///
/// The engine functions stay pure: every edit to the selections rebuilds
/// the filter specs from scratch and recomputes `visible` from `table`.
#[derive(Debug, Clone)]
pub struct DashboardSession {
    /// The table as loaded.
    table: Table,

    classification: ColumnClassification,

    parser: DateParser,

    /// Tokens the table was loaded with; filter labels are read with them.
    missing_tokens: Vec<String>,

    /// Per-column filter selections.
    filters: FilterState,

    /// Rows passing the current filters (cached).
    visible: Table,

    /// Chart axes; `None` until chosen or when no numeric column exists.
    selection: Option<AxisSelection>,

    /// Date window applied after the value filters.
    window: Option<ActiveWindow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveWindow {
    start_column: String,
    end_column: Option<String>,
    window: TimeWindow,
}

impl DashboardSession {
    pub fn new(table: Table) -> Self {
        Self::with_parser(table, DateParser::default())
    }

    /// Ingest a newly loaded table, select every value of every column and
    /// pick default axes.
    pub fn with_parser(table: Table, parser: DateParser) -> Self {
        let classification = classify_columns_with(&table, &parser);
        let filters = init_filter_state(&table);
        let selection = AxisSelection::suggest(&table, &classification);
        DashboardSession {
            visible: table.clone(),
            table,
            classification,
            parser,
            missing_tokens: DEFAULT_MISSING_TOKENS.iter().map(|t| t.to_string()).collect(),
            filters,
            selection,
            window: None,
        }
    }

    /// Missing tokens used when the table was loaded, if not the defaults.
    pub fn with_missing_tokens(mut self, tokens: Vec<String>) -> Self {
        self.missing_tokens = tokens;
        self
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn visible(&self) -> &Table {
        &self.visible
    }

    pub fn classification(&self) -> &ColumnClassification {
        &self.classification
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn selection(&self) -> Option<&AxisSelection> {
        self.selection.as_ref()
    }

    /// Filter options for a column: every distinct value in the full table.
    pub fn unique_values(&self, column: &str) -> EngineResult<BTreeSet<Value>> {
        Ok(self.table.require_column(column)?.unique_values())
    }

    /// Specs for the columns that actually constrain rows. A column with
    /// every value selected cannot exclude anything and is skipped.
    pub fn active_specs(&self) -> Vec<FilterSpec> {
        self.filters
            .iter()
            .filter(|(col, selected)| {
                self.table
                    .column(col)
                    .map(|c| c.unique_values() != **selected)
                    .unwrap_or(true)
            })
            .map(|(col, selected)| FilterSpec::new(col.clone(), selected.iter().cloned()))
            .collect()
    }

    /// Recompute `visible` after a filter or window change.
    pub fn refilter(&mut self) -> EngineResult<()> {
        let specs = self.active_specs();
        let filtered = apply_filter(&self.table, &specs)?;
        self.visible = match &self.window {
            Some(active) => apply_window_with(
                &filtered,
                &active.start_column,
                active.end_column.as_deref(),
                &active.window,
                &self.parser,
            )?,
            None => filtered,
        };
        debug!(
            "{} active filter(s), {} of {} rows visible",
            specs.len(),
            self.visible.row_count(),
            self.table.row_count()
        );
        Ok(())
    }

    /// Replace a column's selection.
    pub fn set_filter_values(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = Value>,
    ) -> EngineResult<()> {
        self.table.require_column(column)?;
        self.filters
            .insert(column.to_string(), values.into_iter().collect());
        self.refilter()
    }

    /// Replace a column's selection with user-typed labels, read the way
    /// the column's cells were read. No labels selects nothing.
    pub fn set_filter_labels<S: AsRef<str>>(
        &mut self,
        column: &str,
        labels: &[S],
    ) -> EngineResult<()> {
        let tokens = self.missing_tokens.as_slice();
        let spec = FilterSpec::from_labels(&self.table, column, labels, tokens, &self.parser)?;
        self.set_filter_values(column, spec.allowed)
    }

    /// Toggle a single value in a column's filter.
    pub fn toggle_filter_value(&mut self, column: &str, value: &Value) -> EngineResult<()> {
        self.table.require_column(column)?;
        let selected = self.filters.entry(column.to_string()).or_default();
        if !selected.remove(value) {
            selected.insert(value.clone());
        }
        self.refilter()
    }

    /// Select all values in a column.
    pub fn select_all(&mut self, column: &str) -> EngineResult<()> {
        let all = self.unique_values(column)?;
        self.filters.insert(column.to_string(), all);
        self.refilter()
    }

    /// Deselect all values in a column. Hides every row.
    pub fn select_none(&mut self, column: &str) -> EngineResult<()> {
        self.table.require_column(column)?;
        self.filters.insert(column.to_string(), BTreeSet::new());
        self.refilter()
    }

    /// Named windows around `now` plus "All", over the full table.
    pub fn time_windows(
        &self,
        start_column: &str,
        end_column: Option<&str>,
        now: NaiveDate,
        sizes: &[WindowSize],
    ) -> EngineResult<TimeWindows> {
        derive_time_windows_with(&self.table, start_column, end_column, now, sizes, &self.parser)
    }

    /// Only show rows whose dates fall in `window`.
    pub fn set_window(
        &mut self,
        start_column: &str,
        end_column: Option<&str>,
        window: TimeWindow,
    ) -> EngineResult<()> {
        self.table.require_column(start_column)?;
        if let Some(end) = end_column {
            self.table.require_column(end)?;
        }
        self.window = Some(ActiveWindow {
            start_column: start_column.to_string(),
            end_column: end_column.map(str::to_string),
            window,
        });
        self.refilter()
    }

    pub fn clear_window(&mut self) -> EngineResult<()> {
        self.window = None;
        self.refilter()
    }

    pub fn window(&self) -> Option<&TimeWindow> {
        self.window.as_ref().map(|a| &a.window)
    }

    /// Choose chart axes; rejected selections leave the old one in place.
    pub fn set_selection(&mut self, selection: AxisSelection) -> EngineResult<()> {
        selection.validate(&self.table, &self.classification)?;
        self.selection = Some(selection);
        Ok(())
    }

    /// Chart plan for the current selection; empty when no axes are set.
    pub fn charts(&self) -> EngineResult<Vec<ChartSpec>> {
        match &self.selection {
            Some(sel) => plan_charts(&self.table, &self.classification, sel),
            None => Ok(Vec::new()),
        }
    }

    /// Summary of the visible rows. Columns keep the kind they had in the
    /// full table.
    pub fn summary(&self) -> EngineResult<SummaryRecord> {
        summarize_classified(&self.visible, None, &self.classification, &self.parser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::DEFAULT_MISSING_TOKENS;

    fn session() -> DashboardSession {
        let t = Table::from_text_rows(
            &["Name", "Assignee", "Hours"],
            &[["A", "Bob", "3"], ["B", "Carol", "5"], ["C", "Bob", "7"]],
            DEFAULT_MISSING_TOKENS,
        )
        .unwrap();
        DashboardSession::new(t)
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn starts_with_everything_visible() {
        let s = session();
        assert_eq!(s.visible().row_count(), 3);
        assert!(s.active_specs().is_empty());
        assert_eq!(s.selection(), Some(&AxisSelection::new("Name", "Hours")));
    }

    #[test]
    fn toggling_a_value_hides_its_rows() {
        let mut s = session();
        s.toggle_filter_value("Assignee", &text("Bob")).unwrap();
        assert_eq!(s.visible().row_count(), 1);
        assert_eq!(s.active_specs().len(), 1);
        s.toggle_filter_value("Assignee", &text("Bob")).unwrap();
        assert_eq!(s.visible().row_count(), 3);
    }

    #[test]
    fn select_none_then_all() {
        let mut s = session();
        s.select_none("Name").unwrap();
        assert!(s.visible().is_empty());
        s.select_all("Name").unwrap();
        assert_eq!(s.visible().row_count(), 3);
    }

    #[test]
    fn summary_follows_the_filter() {
        let mut s = session();
        s.set_filter_values("Assignee", [text("Bob")]).unwrap();
        let summary = s.summary().unwrap();
        assert_eq!(summary.row_count, 2);
        assert_eq!(summary.numeric("Hours").unwrap().mean, Some(5.0));
    }

    #[test]
    fn summary_keeps_numeric_columns_when_nothing_is_visible() {
        let mut s = session();
        s.select_none("Assignee").unwrap();
        let summary = s.summary().unwrap();
        assert_eq!(summary.row_count, 0);
        let hours = summary.numeric("Hours").unwrap();
        assert_eq!(hours.count, 0);
        assert_eq!(hours.mean, None);
    }

    #[test]
    fn unknown_columns_are_rejected() {
        let mut s = session();
        assert!(s.select_none("Owner").is_err());
        assert!(s.unique_values("Owner").is_err());
        assert!(s.set_selection(AxisSelection::new("Name", "Assignee")).is_err());
        assert_eq!(s.selection(), Some(&AxisSelection::new("Name", "Hours")));
    }

    #[test]
    fn window_narrows_the_filtered_rows() {
        let t = Table::from_text_rows(
            &["Name", "Start Date", "Due Date", "Assignee"],
            &[
                ["A", "2024-01-01", "2024-01-10", "Bob"],
                ["B", "2024-01-16", "2024-01-18", "Carol"],
                ["C", "2024-01-17", "2024-01-30", "Bob"],
            ],
            DEFAULT_MISSING_TOKENS,
        )
        .unwrap();
        let mut s = DashboardSession::new(t);
        let now = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let windows = s
            .time_windows("Start Date", Some("Due Date"), now, &[WindowSize::new("week", 7)])
            .unwrap();
        let week = windows.get("week").unwrap().clone();
        s.set_window("Start Date", Some("Due Date"), week).unwrap();
        assert_eq!(s.visible().row_count(), 2);
        s.set_filter_values("Assignee", [text("Bob")]).unwrap();
        assert_eq!(s.visible().row_count(), 1);
        s.clear_window().unwrap();
        assert_eq!(s.visible().row_count(), 2);
        assert!(s.window().is_none());
    }

    #[test]
    fn labels_are_read_like_the_loaded_cells() {
        let t = Table::from_text_rows(
            &["Status", "Hours"],
            &[["NA", "1.5"], ["ok", "5"], ["?", "2"]],
            &["?"],
        )
        .unwrap();
        let mut s = DashboardSession::new(t).with_missing_tokens(vec!["?".to_string()]);
        s.set_filter_labels("Status", &["NA"]).unwrap();
        assert_eq!(s.visible().row_count(), 1);
        s.set_filter_labels("Status", &["NA", "ok"]).unwrap();
        s.set_filter_labels("Hours", &["5"]).unwrap();
        assert_eq!(s.visible().row_count(), 1);
        s.set_filter_labels::<&str>("Status", &[]).unwrap();
        assert!(s.visible().is_empty());
    }

    #[test]
    fn charts_follow_the_selection() {
        let mut s = session();
        s.set_selection(AxisSelection::new("Name", "Hours").with_color("Assignee"))
            .unwrap();
        assert_eq!(s.charts().unwrap().len(), 2);
    }
}
