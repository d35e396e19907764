use serde::Serialize;

use crate::data::classify::{ColumnClassification, ColumnKind};
use crate::data::model::Table;
use crate::error::{EngineError, EngineResult};

// ---------------------------------------------------------------------------
// Chart plans
// ---------------------------------------------------------------------------
//
// A plan says which charts a table supports and which columns go on which
// channel. Drawing them is the charting engine's job.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Scatter,
    Bar,
    Line,
    Timeline,
}

impl ChartKind {
    fn title_prefix(self) -> &'static str {
        match self {
            ChartKind::Scatter => "Scatter Plot",
            ChartKind::Bar => "Bar Chart",
            ChartKind::Line => "Line Chart",
            ChartKind::Timeline => "Timeline",
        }
    }
}

/// Column choices for the x axis, y axis and optional colour grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AxisSelection {
    pub x: String,
    pub y: String,
    pub color: Option<String>,
}

impl AxisSelection {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        AxisSelection {
            x: x.into(),
            y: y.into(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Default picks: first column on x, first numeric column on y, no
    /// colour. `None` when the table has no numeric column.
    pub fn suggest(table: &Table, classification: &ColumnClassification) -> Option<Self> {
        let x = table.column_names().first()?.to_string();
        let y = classification.numeric.first()?.clone();
        Some(AxisSelection::new(x, y))
    }

    /// Check every named column exists and fits its channel.
    pub fn validate(&self, table: &Table, classification: &ColumnClassification) -> EngineResult<()> {
        table.require_column(&self.x)?;
        require_kind(table, classification, &self.y, "y axis", ColumnKind::Numeric)?;
        if let Some(color) = &self.color {
            require_kind(table, classification, color, "color", ColumnKind::Categorical)?;
        }
        Ok(())
    }
}

/// Everything a charting engine needs to draw one chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub x: String,
    pub y: String,
    pub color: Option<String>,
    pub title: String,
}

impl ChartSpec {
    fn new(kind: ChartKind, x: &str, y: &str, color: Option<&str>) -> Self {
        ChartSpec {
            kind,
            x: x.to_string(),
            y: y.to_string(),
            color: color.map(str::to_string),
            title: format!("{}: {x} vs {y}", kind.title_prefix()),
        }
    }
}

fn require_kind(
    table: &Table,
    classification: &ColumnClassification,
    column: &str,
    role: &'static str,
    expected: ColumnKind,
) -> EngineResult<()> {
    table.require_column(column)?;
    if classification.kind_of(column) == Some(expected) {
        Ok(())
    } else {
        Err(EngineError::IncompatibleAxis {
            column: column.to_string(),
            role,
            expected: expected.label(),
        })
    }
}

/// Charts for a selection: always a scatter, a bar chart when x is
/// categorical and a line chart when x is numeric.
pub fn plan_charts(
    table: &Table,
    classification: &ColumnClassification,
    selection: &AxisSelection,
) -> EngineResult<Vec<ChartSpec>> {
    selection.validate(table, classification)?;
    let color = selection.color.as_deref();
    let (x, y) = (selection.x.as_str(), selection.y.as_str());

    let mut charts = vec![ChartSpec::new(ChartKind::Scatter, x, y, color)];
    match classification.kind_of(x) {
        Some(ColumnKind::Categorical) => charts.push(ChartSpec::new(ChartKind::Bar, x, y, color)),
        Some(ColumnKind::Numeric) => charts.push(ChartSpec::new(ChartKind::Line, x, y, color)),
        _ => {}
    }
    Ok(charts)
}

/// Gantt-style plan: one bar per `task` running from `start` to `end`.
/// The x channel holds the start column and the y channel the end column.
pub fn plan_timeline(
    table: &Table,
    classification: &ColumnClassification,
    task: &str,
    start: &str,
    end: &str,
    color: Option<&str>,
) -> EngineResult<ChartSpec> {
    table.require_column(task)?;
    require_kind(table, classification, start, "timeline start", ColumnKind::Temporal)?;
    require_kind(table, classification, end, "timeline end", ColumnKind::Temporal)?;
    if let Some(color) = color {
        require_kind(table, classification, color, "color", ColumnKind::Categorical)?;
    }
    Ok(ChartSpec {
        kind: ChartKind::Timeline,
        x: start.to_string(),
        y: end.to_string(),
        color: color.map(str::to_string),
        title: format!("Timeline: {task} from {start} to {end}"),
    })
}
