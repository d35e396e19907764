use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use log::{debug, info};

use rusty_dashboard::chart::{plan_timeline, AxisSelection, ChartSpec};
use rusty_dashboard::config::DashboardConfig;
use rusty_dashboard::data::loader::load_file;
use rusty_dashboard::data::windows::TimeWindows;
use rusty_dashboard::report::{render_summary, render_table, DashboardReport, TablePreview};
use rusty_dashboard::session::DashboardSession;

/// Load a table and print what the dashboard would show for it.
#[derive(Parser, Debug)]
#[command(name = "rusty-dashboard", version, about)]
struct Cli {
    /// Data file (.csv, .tsv, .txt, .json or .parquet)
    file: PathBuf,

    /// Column for the x axis (default: first column)
    #[arg(long)]
    x: Option<String>,

    /// Numeric column for the y axis (default: first numeric column)
    #[arg(long)]
    y: Option<String>,

    /// Categorical column used to group colours
    #[arg(long)]
    color: Option<String>,

    /// Keep rows whose COLUMN holds one of the listed values. Repeatable;
    /// `COLUMN=` keeps nothing.
    #[arg(long = "filter", value_name = "COLUMN=V1,V2")]
    filters: Vec<String>,

    /// Date column the time windows are computed from
    #[arg(long)]
    window_column: Option<String>,

    /// Optional end-date column; rows overlapping a window are kept
    #[arg(long, requires = "window_column")]
    window_end_column: Option<String>,

    /// Reference day for the windows (default: today)
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_day)]
    now: Option<NaiveDate>,

    /// Only show rows in this window (e.g. "All", "week")
    #[arg(long, requires = "window_column")]
    window: Option<String>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rows shown in table previews (overrides the config)
    #[arg(long)]
    rows: Option<usize>,

    /// Print one JSON report instead of text sections
    #[arg(long)]
    json: bool,
}

fn parse_day(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

/// `COLUMN=v1,v2` → (column, labels). An empty right-hand side selects nothing.
fn parse_filter(arg: &str) -> Result<(&str, Vec<&str>)> {
    let Some((column, values)) = arg.split_once('=') else {
        bail!("filter '{arg}' is not of the form COLUMN=V1,V2");
    };
    let labels = if values.is_empty() {
        Vec::new()
    } else {
        values.split(',').map(str::trim).collect()
    };
    Ok((column.trim(), labels))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => DashboardConfig::from_path(path)?,
        None => DashboardConfig::default(),
    };
    let preview_rows = cli.rows.unwrap_or(config.preview_rows);

    let table = load_file(&cli.file, &config.load)?;
    let mut session = DashboardSession::with_parser(table, config.date_parser())
        .with_missing_tokens(config.load.missing_tokens.clone());

    apply_selection(&mut session, &cli)?;

    for arg in &cli.filters {
        let (column, labels) = parse_filter(arg)?;
        session
            .set_filter_labels(column, labels.as_slice())
            .with_context(|| format!("applying filter '{arg}'"))?;
    }

    let windows = match &cli.window_column {
        Some(start) => {
            let now = cli.now.unwrap_or_else(|| Local::now().date_naive());
            let end = cli.window_end_column.as_deref();
            let windows = session.time_windows(start, end, now, &config.windows)?;
            if let Some(label) = &cli.window {
                let Some(window) = windows.get(label) else {
                    bail!(
                        "unknown window '{label}', expected one of: {}",
                        windows.labels().join(", ")
                    );
                };
                session.set_window(start, end, window.clone())?;
            }
            Some(windows)
        }
        None => None,
    };

    let mut charts = session.charts()?;
    if let (Some(start), Some(end)) = (&cli.window_column, &cli.window_end_column) {
        let classification = session.classification();
        if classification.is_temporal(start) && classification.is_temporal(end) {
            if let Some(task) = session.table().column_names().first() {
                let color = session.selection().and_then(|s| s.color.as_deref());
                charts.push(plan_timeline(
                    session.table(),
                    classification,
                    task,
                    start,
                    end,
                    color,
                )?);
            }
        } else {
            debug!("'{start}'/'{end}' are not both temporal, no timeline");
        }
    }

    let summary = session.summary()?;
    info!(
        "{} of {} rows after filtering",
        session.visible().row_count(),
        session.table().row_count()
    );

    if cli.json {
        let report = DashboardReport {
            source: cli.file.display().to_string(),
            raw: TablePreview::new(session.table(), preview_rows),
            classification: session.classification().clone(),
            charts,
            filtered: TablePreview::new(session.visible(), preview_rows),
            summary,
            windows,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    section("Raw Data");
    println!("{}", render_table(session.table(), preview_rows)?);

    section("Columns");
    let classification = session.classification();
    println!("numeric:     {}", join_or_none(&classification.numeric));
    println!("categorical: {}", join_or_none(&classification.categorical));
    println!("temporal:    {}", join_or_none(&classification.temporal));

    section("Charts");
    print_charts(&charts);

    if let Some(windows) = &windows {
        section("Time Windows");
        print_windows(windows, session.window().map(|w| w.label.as_str()));
    }

    section("Filtered Data");
    println!("{}", render_table(session.visible(), preview_rows)?);

    section("Summary Statistics");
    println!("{}", render_summary(&summary)?);

    Ok(())
}

/// Apply `--x/--y/--color` on top of the suggested axes.
fn apply_selection(session: &mut DashboardSession, cli: &Cli) -> Result<()> {
    if cli.x.is_none() && cli.y.is_none() && cli.color.is_none() {
        return Ok(());
    }
    let suggested = session.selection().cloned();
    let x = match (&cli.x, &suggested) {
        (Some(x), _) => x.clone(),
        (None, Some(s)) => s.x.clone(),
        (None, None) => bail!("no default x axis, pass --x"),
    };
    let y = match (&cli.y, &suggested) {
        (Some(y), _) => y.clone(),
        (None, Some(s)) => s.y.clone(),
        (None, None) => bail!("no numeric column for the y axis, pass --y"),
    };
    let mut selection = AxisSelection::new(x, y);
    if let Some(color) = &cli.color {
        selection = selection.with_color(color.clone());
    }
    session
        .set_selection(selection)
        .context("invalid axis selection")?;
    Ok(())
}

fn section(title: &str) {
    println!("\n== {title} ==");
}

fn join_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}

fn print_charts(charts: &[ChartSpec]) {
    if charts.is_empty() {
        println!("(no numeric column to plot)");
    }
    for chart in charts {
        match &chart.color {
            Some(color) => println!("- {} (color: {color})", chart.title),
            None => println!("- {}", chart.title),
        }
    }
}

fn print_windows(windows: &TimeWindows, active: Option<&str>) {
    if windows.is_empty() {
        println!("(none)");
    }
    for w in windows.iter() {
        let marker = if Some(w.label.as_str()) == active { "*" } else { " " };
        println!(
            "{marker} {:<8} {} .. {} ({} days)",
            w.label,
            w.start,
            w.end,
            w.len_days()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_arguments_split_on_equals_and_commas() {
        assert_eq!(parse_filter("Assignee=Bob, Carol").unwrap(), ("Assignee", vec!["Bob", "Carol"]));
        assert_eq!(parse_filter("Assignee=").unwrap(), ("Assignee", vec![]));
        assert!(parse_filter("Assignee").is_err());
    }

    #[test]
    fn cli_parses_window_options() {
        let cli = Cli::try_parse_from([
            "rusty-dashboard",
            "tasks.csv",
            "--window-column",
            "Start Date",
            "--now",
            "2024-01-15",
            "--window",
            "week",
            "--filter",
            "Assignee=Bob",
        ])
        .unwrap();
        assert_eq!(cli.now, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(cli.filters, vec!["Assignee=Bob"]);
        assert!(Cli::try_parse_from(["rusty-dashboard", "t.csv", "--window", "week"]).is_err());
        assert!(Cli::try_parse_from(["rusty-dashboard", "t.csv", "--now", "15/01/2024"]).is_err());
    }
}
