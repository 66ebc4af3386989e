// 📅 Month utilities - calendar months, lenient date parsing, formatting
//
// Every fill decision works at (year, month) granularity. The day of an
// agreement date is carried through untouched but never compared.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default textual representation for written dates (month/day/year)
pub const DEFAULT_DATE_FORMAT: &str = "%m/%d/%Y";

/// Date layouts accepted on input, tried in order
const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%y", "%d-%b-%Y"];

/// Datetime layouts accepted on input (spreadsheet exports often carry a time)
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Largest serial Excel accepts (9999-12-31)
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Tokens that spreadsheet tools write for a missing date
const ABSENT_TOKENS: &[&str] = &["nat", "nan", "none", "null", "n/a", "#n/a"];

// ============================================================================
// MONTH
// ============================================================================

/// A calendar month. Ordered by year, then month.
///
/// Always within chrono's representable date range, so `first_day` exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "MonthFields")]
pub struct Month {
    year: i32,
    month: u32,
}

#[derive(Deserialize)]
struct MonthFields {
    year: i32,
    month: u32,
}

impl TryFrom<MonthFields> for Month {
    type Error = String;

    fn try_from(fields: MonthFields) -> Result<Self, Self::Error> {
        Month::new(fields.year, fields.month)
            .ok_or_else(|| format!("invalid month: {}-{}", fields.year, fields.month))
    }
}

impl Month {
    /// Returns `None` unless `month` is in 1..=12 and `year` is a year chrono
    /// can represent
    pub fn new(year: i32, month: u32) -> Option<Self> {
        let years = NaiveDate::MIN.year()..=NaiveDate::MAX.year();
        if (1..=12).contains(&month) && years.contains(&year) {
            Some(Month { year, month })
        } else {
            None
        }
    }

    pub fn of(date: NaiveDate) -> Self {
        Month {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First day of this month
    pub fn first_day(&self) -> NaiveDate {
        // year is within chrono's range and month in 1..=12, so day 1 exists
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// The following month, or `None` past chrono's last representable month
    pub fn succ(&self) -> Option<Self> {
        if self.month == 12 {
            Month::new(self.year.checked_add(1)?, 1)
        } else {
            Month::new(self.year, self.month + 1)
        }
    }

    /// Every month from `start` to `end` inclusive; empty when `end < start`
    pub fn range_inclusive(start: Month, end: Month) -> Vec<Month> {
        let mut months = Vec::new();
        let mut current = start;
        while current <= end {
            months.push(current);
            match current.succ() {
                Some(next) if current < end => current = next,
                _ => break,
            }
        }
        months
    }
}

impl From<NaiveDate> for Month {
    fn from(date: NaiveDate) -> Self {
        Month::of(date)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = String;

    /// Accepts `YYYY-MM`, `MM/YYYY`, or any full date accepted by [`parse_date`]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        if let Some((y, m)) = trimmed.split_once('-') {
            if let (Ok(year), Ok(month)) = (y.parse::<i32>(), m.parse::<u32>()) {
                return Month::new(year, month).ok_or_else(|| format!("invalid month: {}", s));
            }
        }

        if let Some((m, y)) = trimmed.split_once('/') {
            if let (Ok(month), Ok(year)) = (m.parse::<u32>(), y.parse::<i32>()) {
                return Month::new(year, month).ok_or_else(|| format!("invalid month: {}", s));
            }
        }

        parse_date(trimmed)
            .map(Month::of)
            .ok_or_else(|| format!("invalid month: {}", s))
    }
}

// ============================================================================
// PARSING & FORMATTING
// ============================================================================

/// Parse a date leniently. Anything unparseable is absent (`None`), never an error.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    let lower = text.to_ascii_lowercase();
    if ABSENT_TOKENS.contains(&lower.as_str()) {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }

    None
}

/// Format a date with a chrono format string
pub fn format_date(date: NaiveDate, format: &str) -> String {
    date.format(format).to_string()
}

/// Convert an Excel 1900-system serial number to a date.
///
/// Serials count days from 1899-12-30 (which absorbs Excel's fictitious
/// 1900-02-29). The fractional part is time of day and is dropped.
pub fn from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

// ============================================================================
// TESTS
// ============================================================================
