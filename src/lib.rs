//! Engine behind a small CSV dashboard: load a table, sort its columns
//! into numeric / categorical / temporal, narrow it down with per-column
//! value filters and date windows, and describe what is left.
//!
//! Rendering is left to the host. [`session::DashboardSession`] holds the
//! interactive state a UI would keep, [`chart`] says which charts fit a
//! selection and [`report`] turns results into text grids or JSON.

pub mod chart;
pub mod config;
pub mod data;
pub mod error;
pub mod report;
pub mod session;

pub use chart::{plan_charts, plan_timeline, AxisSelection, ChartKind, ChartSpec};
pub use config::DashboardConfig;
pub use data::loader::{load_csv_reader, load_file, LoadOptions};
pub use data::{
    apply_filter, apply_window, classify_columns, compute_summary, derive_time_windows, Column,
    ColumnClassification, ColumnKind, FilterSpec, SummaryRecord, Table, TimeWindow, TimeWindows,
    Value, WindowSize,
};
pub use error::{EngineError, EngineResult};
pub use session::DashboardSession;
