//! Timestamp reconciliation
//!
//! Day-ahead price exports disagree on how they encode time: some split the
//! calendar date and the delivery hour into two columns, some put
//! `"2022/01/05 13:00 - 14:00"` in the first column, some carry a plain
//! `timestamp` column. The reconciler tries each known layout in a fixed
//! priority order and the first one that applies decides how every row is read.
//!
//! When a row describes an interval, the canonical timestamp is the start of
//! that interval.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use super::error::{DataError, DataResult};
use super::table::RawTable;

static TIME_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{1,2}:\d{2}").expect("valid time-of-day pattern"));
static DATE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}[/\-]\d{2}[/\-]\d{2}").expect("valid date pattern"));
static RANGE_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*-\s*").expect("valid range separator pattern"));

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%d.%m.%Y", "%m/%d/%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Which timestamp encoding a table was recognised as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampLayout {
    /// `date` column plus an `hour` column holding a time or an interval
    DateAndHour,
    /// First column holds date and time (or time range) in one string
    CombinedFirstColumn,
    /// Dedicated `timestamp` column
    TimestampColumn,
}

impl std::fmt::Display for TimestampLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DateAndHour => write!(f, "date+hour"),
            Self::CombinedFirstColumn => write!(f, "combined first column"),
            Self::TimestampColumn => write!(f, "timestamp column"),
        }
    }
}

/// Result of reconciling a table: one (possibly missing) timestamp per row.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub layout: TimestampLayout,
    pub timestamps: Vec<Option<NaiveDateTime>>,
    /// Columns that encoded time and are no longer candidate measurements
    pub consumed: Vec<String>,
}

/// One way of reading timestamps out of a table.
pub trait LayoutStrategy: Send + Sync {
    fn layout(&self) -> TimestampLayout;

    /// Whether this layout can interpret the table at all.
    fn applies(&self, table: &RawTable) -> bool;

    /// Columns that carry time for this layout.
    fn consumed_columns(&self, table: &RawTable) -> Vec<String>;

    /// Resolve one timestamp per row. `None` marks a row whose time could not
    /// be recovered but which the layout does not treat as fatal.
    fn resolve(&self, table: &RawTable) -> DataResult<Vec<Option<NaiveDateTime>>>;
}

/// `date` + `hour` columns. The hour may be `"14:00"`, `"14:00 - 15:00"` or `"14:00-15:00"`.
pub struct DateAndHourColumns;

impl LayoutStrategy for DateAndHourColumns {
    fn layout(&self) -> TimestampLayout {
        TimestampLayout::DateAndHour
    }

    fn applies(&self, table: &RawTable) -> bool {
        table.has_column("date") && table.has_column("hour")
    }

    fn consumed_columns(&self, _table: &RawTable) -> Vec<String> {
        vec!["date".to_string(), "hour".to_string()]
    }

    fn resolve(&self, table: &RawTable) -> DataResult<Vec<Option<NaiveDateTime>>> {
        let (Some(date_idx), Some(hour_idx)) = (table.column_index("date"), table.column_index("hour"))
        else {
            return Err(DataError::schema("missing 'date' or 'hour' column", table.headers()));
        };

        table
            .column(date_idx)
            .zip(table.column(hour_idx))
            .enumerate()
            .map(|(i, (date, hour))| {
                let Some(start) = extract_start_time(hour) else {
                    debug!(row = i + 1, hour, "no time-of-day token in hour field");
                    return Ok(None);
                };
                combine(date.trim(), start).map(Some).ok_or_else(|| {
                    DataError::parse(i + 1, &format!("{} {}", date.trim(), hour), "unrecognised date")
                })
            })
            .collect()
    }
}

/// First column holding both a date and a time, e.g. `"2022/01/05 13:00 - 14:00"`.
///
/// Rows without a date token fall back to the comma-separated shape
/// `"<date>, <start - end>"` before failing the load.
pub struct CombinedFirstColumn;

impl LayoutStrategy for CombinedFirstColumn {
    fn layout(&self) -> TimestampLayout {
        TimestampLayout::CombinedFirstColumn
    }

    fn applies(&self, table: &RawTable) -> bool {
        if table.headers().is_empty() {
            return false;
        }
        table
            .column(0)
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(|sample| DATE_TOKEN.is_match(sample) && TIME_TOKEN.is_match(sample))
            .unwrap_or(false)
    }

    fn consumed_columns(&self, table: &RawTable) -> Vec<String> {
        table.headers().iter().take(1).cloned().collect()
    }

    fn resolve(&self, table: &RawTable) -> DataResult<Vec<Option<NaiveDateTime>>> {
        table
            .column(0)
            .enumerate()
            .map(|(i, value)| {
                parse_combined(value)
                    .or_else(|| parse_comma_separated(value))
                    .map(Some)
                    .ok_or_else(|| {
                        DataError::parse(
                            i + 1,
                            value,
                            "no date and time-of-day token, also tried \"<date>, <start - end>\"",
                        )
                    })
            })
            .collect()
    }
}

/// A column literally named `timestamp`, parsed as a full date-time.
pub struct TimestampColumn;

impl LayoutStrategy for TimestampColumn {
    fn layout(&self) -> TimestampLayout {
        TimestampLayout::TimestampColumn
    }

    fn applies(&self, table: &RawTable) -> bool {
        table.has_column("timestamp")
    }

    fn consumed_columns(&self, _table: &RawTable) -> Vec<String> {
        vec!["timestamp".to_string()]
    }

    fn resolve(&self, table: &RawTable) -> DataResult<Vec<Option<NaiveDateTime>>> {
        let Some(idx) = table.column_index("timestamp") else {
            return Err(DataError::schema("missing 'timestamp' column", table.headers()));
        };

        table
            .column(idx)
            .enumerate()
            .map(|(i, value)| {
                parse_datetime(value.trim())
                    .map(Some)
                    .ok_or_else(|| DataError::parse(i + 1, value, "unrecognised date-time format"))
            })
            .collect()
    }
}

/// Tries timestamp layouts in priority order; the first applicable one wins.
pub struct TimestampReconciler {
    strategies: Vec<Box<dyn LayoutStrategy>>,
}

impl TimestampReconciler {
    pub fn new(strategies: Vec<Box<dyn LayoutStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn reconcile(&self, table: &RawTable) -> DataResult<Reconciled> {
        let Some(strategy) = self.strategies.iter().find(|s| s.applies(table)) else {
            return Err(DataError::schema(
                "could not detect a timestamp layout; expected 'date' and 'hour' columns, \
                 a combined first column like 'YYYY/MM/DD HH:MM - HH:MM', or a 'timestamp' column",
                table.headers(),
            ));
        };

        let timestamps = strategy.resolve(table)?;
        let unresolved = timestamps.iter().filter(|t| t.is_none()).count();
        info!(
            layout = %strategy.layout(),
            rows = timestamps.len(),
            unresolved,
            "timestamps reconciled"
        );

        Ok(Reconciled {
            layout: strategy.layout(),
            timestamps,
            consumed: strategy.consumed_columns(table),
        })
    }
}

impl Default for TimestampReconciler {
    fn default() -> Self {
        Self::new(vec![
            Box::new(DateAndHourColumns),
            Box::new(CombinedFirstColumn),
            Box::new(TimestampColumn),
        ])
    }
}

/// First `H:MM`/`HH:MM` token of a time or time-range field.
///
/// `"00:00 - 01:00"` and `"00:00-01:00"` both give `"00:00"`.
pub fn extract_start_time(field: &str) -> Option<&str> {
    RANGE_SEPARATOR
        .split(field)
        .find_map(|part| TIME_TOKEN.find(part))
        .or_else(|| TIME_TOKEN.find(field))
        .map(|m| m.as_str())
}

fn parse_combined(value: &str) -> Option<NaiveDateTime> {
    let date = DATE_TOKEN.find(value)?;
    let time = TIME_TOKEN.find(value)?;
    combine(date.as_str(), time.as_str())
}

fn parse_comma_separated(value: &str) -> Option<NaiveDateTime> {
    let (date, rest) = value.split_once(',')?;
    let start = extract_start_time(rest.trim())?;
    combine(date.trim(), start)
}

fn combine(date: &str, time: &str) -> Option<NaiveDateTime> {
    let date = parse_date(date)?;
    let time = NaiveTime::parse_from_str(time, "%H:%M").ok()?;
    Some(date.and_time(time))
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

/// Parse a full date-time, truncated to the minute.
///
/// RFC 3339 values with an offset are converted to UTC, so the same wall-clock
/// hour on either side of a DST change stays two distinct instants.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let parsed = DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.naive_utc())
        .ok()
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        })
        .or_else(|| parse_date(value).and_then(|d| d.and_hms_opt(0, 0, 0)))?;

    parsed.with_second(0)?.with_nanosecond(0)
}
