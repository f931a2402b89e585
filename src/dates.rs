// Date handling for ledger queries.
//
// Post dates are stored as text. Range bounds are inclusive whole days:
// start at 00:00:00, end at 23:59:59.

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};

use crate::error::{LedgerError, Result};

/// Primary storage format of `transactions.post_date`.
pub const POST_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Compact fallback format, e.g. `20250115000000`.
pub const COMPACT_POST_DATE_FORMAT: &str = "%Y%m%d%H%M%S";
/// Format accepted for caller-supplied dates.
pub const ARG_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a stored post date, trying the primary format and falling back to
/// the compact one.
pub fn parse_post_date(raw: &str) -> std::result::Result<NaiveDateTime, chrono::ParseError> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, POST_DATE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, COMPACT_POST_DATE_FORMAT))
}

/// Parse an optional `YYYY-MM-DD` argument. Blank input counts as omitted.
pub fn parse_date_arg(raw: Option<&str>, field_name: &str) -> Result<Option<NaiveDate>> {
    let text = match raw.map(str::trim) {
        Some(text) if !text.is_empty() => text,
        _ => return Ok(None),
    };
    NaiveDate::parse_from_str(text, ARG_DATE_FORMAT)
        .map(Some)
        .map_err(|_| {
            LedgerError::InvalidInput(format!(
                "{field_name} must be a date in YYYY-MM-DD format, got '{text}'"
            ))
        })
}

/// Lower bound text for a range starting on `date`.
pub fn start_of_day(date: NaiveDate) -> String {
    format!("{} 00:00:00", date.format(ARG_DATE_FORMAT))
}

/// Upper bound text for a range ending on `date`.
pub fn end_of_day(date: NaiveDate) -> String {
    format!("{} 23:59:59", date.format(ARG_DATE_FORMAT))
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the window spanning `months` calendar months that ends in
/// the month of `today`.
pub fn month_window_start(today: NaiveDate, months: u32) -> NaiveDate {
    let first = first_of_month(today);
    first
        .checked_sub_months(Months::new(months.saturating_sub(1)))
        .unwrap_or(NaiveDate::MIN)
}

/// Inclusive date range; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        DateRange { start, end }
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn start_bound(&self) -> Option<String> {
        self.start.map(start_of_day)
    }

    pub fn end_bound(&self) -> Option<String> {
        self.end.map(end_of_day)
    }
}
