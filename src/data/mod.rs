//! Data layer: core types, loading, classification, filtering, statistics.
//!
//! Architecture:
//! ```text
//!  .csv / .tsv / .json / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → Table
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  Table    │  named columns of Values, one row count
//!   └──────────┘
//!        │
//!        ├──▶ classify  numeric / categorical / temporal names
//!        ├──▶ filter    permitted-value predicates → filtered Table
//!        ├──▶ summary   describe()-style statistics
//!        └──▶ windows   named date ranges around a reference day
//! ```
//!
//! Everything past the loader is a pure function over an immutable table.

pub mod classify;
pub mod filter;
pub mod loader;
pub mod model;
pub mod summary;
pub mod temporal;
pub mod windows;

pub use classify::{classify_column, classify_columns, ColumnClassification, ColumnKind};
pub use filter::{apply_filter, filtered_indices, init_filter_state, FilterSpec, FilterState};
pub use model::{Column, Table, Value};
pub use summary::{compute_summary, ColumnStats, SummaryRecord};
pub use temporal::DateParser;
pub use windows::{apply_window, derive_time_windows, TimeWindow, TimeWindows, WindowSize};
