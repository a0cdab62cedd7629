//! Timestamp rendering for string-encoded timestamp columns

use crate::error::{ImportError, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Offset, Utc};

pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f %z";
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// strftime pattern plus the offset timestamps are shown in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampFormatter {
    format: String,
    offset: FixedOffset,
}

impl TimestampFormatter {
    /// Validate `format` and `timezone` up front so formatting itself cannot fail
    pub fn new(format: &str, timezone: &str) -> Result<Self> {
        if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            return Err(ImportError::config(format!(
                "Invalid timestamp format '{}'",
                format
            )));
        }

        Ok(Self {
            format: format.to_string(),
            offset: parse_timezone(timezone)?,
        })
    }

    pub fn format(&self, ts: &DateTime<Utc>) -> String {
        ts.with_timezone(&self.offset).format(&self.format).to_string()
    }
}

impl Default for TimestampFormatter {
    fn default() -> Self {
        Self {
            format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            offset: Utc.fix(),
        }
    }
}

/// Accepts `UTC`, `GMT`, `Z` or a fixed offset such as `+09:00`
pub fn parse_timezone(timezone: &str) -> Result<FixedOffset> {
    let trimmed = timezone.trim();
    match trimmed.to_ascii_uppercase().as_str() {
        "UTC" | "GMT" | "Z" => return Ok(Utc.fix()),
        _ => {},
    }

    trimmed
        .parse::<FixedOffset>()
        .map_err(|_| ImportError::config(format!("Unsupported timezone '{}'", timezone)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.timestamp_opt(1_442_595_600, 0).unwrap()
    }

    #[test]
    fn test_default_format() {
        let formatter = TimestampFormatter::default();
        assert_eq!(formatter.format(&ts()), "2015-09-18 17:00:00.000 +0000");
    }

    #[test]
    fn test_fixed_offset() {
        let formatter = TimestampFormatter::new("%Y-%m-%dT%H:%M:%S%:z", "+09:00").unwrap();
        assert_eq!(formatter.format(&ts()), "2015-09-19T02:00:00+09:00");
    }

    #[test]
    fn test_invalid_settings_are_config_errors() {
        assert!(matches!(
            TimestampFormatter::new("%Y-%Q", "UTC"),
            Err(ImportError::Config(_))
        ));
        assert!(matches!(
            TimestampFormatter::new(DEFAULT_TIMESTAMP_FORMAT, "Mars/Olympus"),
            Err(ImportError::Config(_))
        ));
    }

    #[test]
    fn test_timezone_names() {
        assert_eq!(parse_timezone("utc").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_timezone("-05:30").unwrap().local_minus_utc(), -(5 * 3600 + 1800));
    }
}
