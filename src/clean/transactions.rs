//! Resale transaction cleaning.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::parse::{
    LeaseValue, coerce_numeric, extract_room_count, parse_date, parse_remaining_lease,
    parse_storey_range,
};
use crate::source::RawTable;

/// Spreadsheet export artefacts such as `Unnamed: 0` or `Column1`.
static UNNAMED_COLUMN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Unnamed|Column\d+$").expect("valid regex"));

/// A transaction row exactly as exported; every cell is optional text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTransaction {
    pub month: Option<String>,
    pub town: Option<String>,
    pub flat_type: Option<String>,
    pub block: Option<String>,
    pub street_name: Option<String>,
    pub storey_range: Option<String>,
    pub floor_area_sqm: Option<String>,
    pub flat_model: Option<String>,
    pub lease_commence_date: Option<String>,
    pub remaining_lease: Option<String>,
    pub resale_price: Option<String>,
}

/// A typed transaction with derived features.
///
/// Unparseable dates and numbers are `None`; unparseable text features
/// fall back to 0 (see [`super::parse`]).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub month: Option<NaiveDate>,
    pub town: Option<String>,
    pub flat_type: Option<String>,
    pub block: Option<String>,
    pub street_name: Option<String>,
    pub storey_range: Option<String>,
    pub floor_area_sqm: Option<f64>,
    pub flat_model: Option<String>,
    pub lease_commence_date: Option<i32>,
    pub remaining_lease: Option<String>,
    pub resale_price: Option<f64>,
    pub storey_min: u32,
    pub storey_max: u32,
    pub storey_median: f64,
    pub remaining_lease_months: i64,
    pub room_count: u32,
}

impl Transaction {
    pub fn from_raw(raw: RawTransaction) -> Self {
        let month = parse_date(raw.month.as_deref());
        let lease_commence_date =
            coerce_numeric(raw.lease_commence_date.as_deref()).map(|year| year as i32);

        let storey = parse_storey_range(raw.storey_range.as_deref());
        let lease = LeaseValue::from_raw(raw.remaining_lease.as_deref());
        let remaining_lease_months = parse_remaining_lease(&lease, lease_commence_date, month);
        let room_count = extract_room_count(raw.flat_type.as_deref());

        Self {
            month,
            floor_area_sqm: coerce_numeric(raw.floor_area_sqm.as_deref()),
            resale_price: coerce_numeric(raw.resale_price.as_deref()),
            lease_commence_date,
            storey_min: storey.min,
            storey_max: storey.max,
            storey_median: storey.median,
            remaining_lease_months,
            room_count,
            town: raw.town,
            flat_type: raw.flat_type,
            block: raw.block,
            street_name: raw.street_name,
            storey_range: raw.storey_range,
            flat_model: raw.flat_model,
            remaining_lease: raw.remaining_lease,
        }
    }

    /// `(block, street_name)` when both are present.
    pub fn address_key(&self) -> Option<(&str, &str)> {
        Some((self.block.as_deref()?, self.street_name.as_deref()?))
    }
}

/// Cleans a raw transaction table. Never fails; every input row yields a
/// cleaned row.
#[tracing::instrument(skip_all, fields(rows = table.len()))]
pub fn clean_resale_prices(table: &RawTable) -> Vec<Transaction> {
    info!(records = table.len(), "Cleaning resale price records");

    let table = table.without_columns_matching(&UNNAMED_COLUMN_RE);
    let cleaned: Vec<Transaction> = table
        .deserialize::<RawTransaction>()
        .into_iter()
        .map(Transaction::from_raw)
        .collect();

    let bad_dates = cleaned.iter().filter(|t| t.month.is_none()).count();
    let bad_prices = cleaned.iter().filter(|t| t.resale_price.is_none()).count();
    let unknown_storey = cleaned.iter().filter(|t| t.storey_max == 0).count();
    let unknown_rooms = cleaned.iter().filter(|t| t.room_count == 0).count();
    let zero_lease = cleaned.iter().filter(|t| t.remaining_lease_months == 0).count();

    info!(
        records = cleaned.len(),
        bad_dates,
        bad_prices,
        unknown_storey,
        unknown_rooms,
        zero_lease,
        "Cleaned resale price records"
    );

    cleaned
}
