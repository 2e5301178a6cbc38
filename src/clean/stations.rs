//! Transit station reference cleaning.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::parse::{count_station_lines, parse_date};
use crate::source::RawTable;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStation {
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Line")]
    pub line: Option<String>,
    #[serde(rename = "Code")]
    pub code: Option<String>,
    #[serde(rename = "Opening")]
    pub opening: Option<String>,
}

/// An operational station: its opening date parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Line")]
    pub line: Option<String>,
    #[serde(rename = "Code")]
    pub code: Option<String>,
    pub opening_date: NaiveDate,
    pub line_count: usize,
}

impl Station {
    /// `None` for stations without a parseable opening date, i.e. planned
    /// ones listed with text like "mid-2028".
    pub fn from_raw(raw: RawStation) -> Option<Self> {
        let opening_date = parse_date(raw.opening.as_deref())?;
        let line_count = count_station_lines(raw.code.as_deref());

        Some(Self {
            name: raw.name.unwrap_or_default(),
            line: raw.line,
            code: raw.code,
            opening_date,
            line_count,
        })
    }
}

/// Keeps operational stations and counts the lines serving each.
#[tracing::instrument(skip_all, fields(rows = table.len()))]
pub fn clean_mrt_stations(table: &RawTable) -> Vec<Station> {
    info!(records = table.len(), "Cleaning MRT station records");

    let raw: Vec<RawStation> = table.deserialize();
    let total = raw.len();
    let stations: Vec<Station> = raw.into_iter().filter_map(Station::from_raw).collect();

    info!(
        planned = total - stations.len(),
        operational = stations.len(),
        "Filtered out planned stations"
    );

    stations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> RawTable {
        RawTable::from_reader("stations", csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_planned_stations_dropped() {
        let csv = "Name,Line,Code,Opening\n\
                   Jurong East,NSL,NS1 EW24,11/05/1988\n\
                   Future,CRL,CR1,mid-2028\n\
                   Bishan,NSL,NS17 CC15,11/07/1987\n";
        let stations = clean_mrt_stations(&table(csv));

        let names: Vec<&str> = stations.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Jurong East", "Bishan"]);
    }

    #[test]
    fn test_line_count_and_opening_date() {
        let csv = "Name,Line,Code,Opening\nJurong East,NSL,NS1 EW24,11/05/1988\n";
        let stations = clean_mrt_stations(&table(csv));

        assert_eq!(stations[0].line_count, 2);
        assert_eq!(stations[0].opening_date, NaiveDate::from_ymd_opt(1988, 11, 5).unwrap());
    }

    #[test]
    fn test_missing_opening_column_drops_all() {
        let csv = "Name,Line,Code\nJurong East,NSL,NS1\n";
        assert!(clean_mrt_stations(&table(csv)).is_empty());
    }
}
