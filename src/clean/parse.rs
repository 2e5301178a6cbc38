//! Field-level parsers shared by the cleaners.
//!
//! None of these fail: malformed input maps to a fixed default so one bad
//! row never aborts a batch.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

/// Standard public-housing lease term in years.
pub const LEASE_TERM_YEARS: i64 = 99;

/// Date format used by the resale and station exports.
pub const DATE_FORMAT: &str = "%m/%d/%Y";

static YEARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*year").expect("valid regex"));
static MONTHS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*month").expect("valid regex"));
static FIRST_INT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)").expect("valid regex"));

/// Parses an `MM/DD/YYYY` date; anything else is `None`.
pub fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value?.trim(), DATE_FORMAT).ok()
}

/// Coerces text to a number; non-numeric and NaN become `None`.
pub fn coerce_numeric(value: Option<&str>) -> Option<f64> {
    value?.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Storey band parsed from text such as `"04 TO 06"`.
///
/// `(0, 0, 0.0)` means the band could not be read. It is indistinguishable
/// from a real zero, so consumers treat 0 as unknown.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StoreyRange {
    pub min: u32,
    pub max: u32,
    pub median: f64,
}

pub fn parse_storey_range(value: Option<&str>) -> StoreyRange {
    let Some(value) = value else {
        return StoreyRange::default();
    };

    let mut parts = value.split(" TO ");
    let (Some(lo), Some(hi)) = (parts.next(), parts.next()) else {
        return StoreyRange::default();
    };

    match (lo.trim().parse::<u32>(), hi.trim().parse::<u32>()) {
        (Ok(min), Ok(max)) => StoreyRange {
            min,
            max,
            median: (f64::from(min) + f64::from(max)) / 2.0,
        },
        _ => StoreyRange::default(),
    }
}

/// Shape of a raw `remaining_lease` cell, decided once when the row is read.
#[derive(Debug, Clone, PartialEq)]
pub enum LeaseValue {
    /// Free text like `"56 years 09 months"`.
    Text(String),
    /// Bare number of years, as in older exports.
    Numeric(f64),
    Missing,
}

impl LeaseValue {
    pub fn from_raw(value: Option<&str>) -> Self {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Self::Missing;
        };

        match value.parse::<f64>() {
            Ok(n) if n.is_nan() => Self::Missing,
            Ok(n) => Self::Numeric(n),
            Err(_) => Self::Text(value.to_string()),
        }
    }
}

/// Converts a remaining lease into whole months.
///
/// Text sums its year and month tokens, a bare number counts as years, and a
/// missing value falls back to the 99-year term counted from the lease start
/// year to the sale year. Anything else is 0.
pub fn parse_remaining_lease(
    lease: &LeaseValue,
    lease_commence_year: Option<i32>,
    sale_date: Option<NaiveDate>,
) -> i64 {
    match lease {
        LeaseValue::Text(text) => {
            let text = text.to_lowercase();
            let years = first_capture(&YEARS_RE, &text).unwrap_or(0);
            let months = first_capture(&MONTHS_RE, &text).unwrap_or(0);
            years * 12 + months
        }
        LeaseValue::Numeric(years) => (years * 12.0) as i64,
        LeaseValue::Missing => match (lease_commence_year, sale_date) {
            (Some(start), Some(sale)) => {
                let elapsed = i64::from(sale.year()) - i64::from(start);
                (LEASE_TERM_YEARS - elapsed).max(0) * 12
            }
            _ => 0,
        },
    }
}

/// Reads the room count out of a flat type such as `"3 ROOM"`.
pub fn extract_room_count(flat_type: Option<&str>) -> u32 {
    let Some(flat_type) = flat_type else {
        return 0;
    };
    let flat_type = flat_type.trim().to_uppercase();

    if flat_type.contains("EXECUTIVE") || flat_type.contains("MULTI-GENERATION") {
        return 6;
    }

    FIRST_INT_RE
        .captures(&flat_type)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0)
}

/// Number of whitespace-separated line codes, e.g. `"NS1 EW24"` is 2.
pub fn count_station_lines(code: Option<&str>) -> usize {
    code.map_or(0, |c| c.split_whitespace().count())
}

fn first_capture(re: &Regex, text: &str) -> Option<i64> {
    re.captures(text).and_then(|c| c[1].parse().ok())
}
