use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use super::model::Value;

/// Formats tried, in order, before falling back to RFC 3339.
/// Slash dates are read month first.
pub const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%b %d, %Y",
];

/// Best-effort date/time parser used by classification and date windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParser {
    formats: Vec<String>,
}

impl Default for DateParser {
    fn default() -> Self {
        DateParser::with_formats(DEFAULT_DATE_FORMATS)
    }
}

impl DateParser {
    pub fn with_formats<S: AsRef<str>>(formats: &[S]) -> Self {
        DateParser {
            formats: formats.iter().map(|f| f.as_ref().to_string()).collect(),
        }
    }

    pub fn formats(&self) -> &[String] {
        &self.formats
    }

    /// Parse one text cell. Date-only inputs land on midnight.
    pub fn parse_str(&self, raw: &str) -> Option<NaiveDateTime> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        for fmt in &self.formats {
            if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
                return Some(dt);
            }
            if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
                return Some(d.and_time(NaiveTime::MIN));
            }
        }
        DateTime::parse_from_rfc3339(trimmed)
            .ok()
            .map(|dt| dt.naive_utc())
    }

    /// Read a cell as a timestamp: native date values pass through, text
    /// is parsed, everything else is `None`.
    pub fn parse_value(&self, value: &Value) -> Option<NaiveDateTime> {
        match value {
            Value::DateTime(dt) => Some(*dt),
            Value::Text(s) => self.parse_str(s),
            _ => None,
        }
    }

    pub fn parse_date(&self, value: &Value) -> Option<NaiveDate> {
        self.parse_value(value).map(|dt| dt.date())
    }
}
