use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::loader::LoadOptions;
use crate::data::temporal::{DateParser, DEFAULT_DATE_FORMATS};
use crate::data::windows::WindowSize;

// ---------------------------------------------------------------------------
// Dashboard configuration
// ---------------------------------------------------------------------------

/// Settings a host can override from a JSON file. Every field has a
/// default, so `{}` is a valid configuration.
///
/// ```json
/// {
///   "load": { "missing_tokens": ["", "NA"], "delimiter": ";" },
///   "date_formats": ["%d/%m/%Y"],
///   "windows": [{ "label": "fortnight", "days": 14 }],
///   "preview_rows": 20
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub load: LoadOptions,
    /// chrono format strings, tried in order before RFC 3339.
    pub date_formats: Vec<String>,
    /// Named windows offered next to "All".
    pub windows: Vec<WindowSize>,
    /// Rows shown in table previews.
    pub preview_rows: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            load: LoadOptions::default(),
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
            windows: vec![WindowSize::new("week", 7), WindowSize::new("month", 30)],
            preview_rows: 10,
        }
    }
}

impl DashboardConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn date_parser(&self) -> DateParser {
        DateParser::with_formats(&self.date_formats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_all_defaults() {
        assert_eq!(DashboardConfig::from_json("{}").unwrap(), DashboardConfig::default());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let cfg = DashboardConfig::from_json(
            r#"{ "windows": [{ "label": "fortnight", "days": 14 }], "load": { "delimiter": ";" } }"#,
        )
        .unwrap();
        assert_eq!(cfg.windows, vec![WindowSize::new("fortnight", 14)]);
        assert_eq!(cfg.load.delimiter, Some(';'));
        assert!(cfg.load.missing_tokens.iter().any(|t| t == "NA"));
        assert_eq!(cfg.preview_rows, 10);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(DashboardConfig::from_json("{ windows: 3 }").is_err());
    }
}
