//! Geocoded address filtering.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::parse::coerce_numeric;
use crate::geo::{Coordinates, is_valid_position};
use crate::source::RawTable;

/// Minimum geocoder confidence for an address to be kept.
pub const GEOCODING_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Geocoder result type for exact address matches.
const ADDRESS_TYPE: &str = "address";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAddress {
    pub block: Option<String>,
    pub street_name: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    #[serde(rename = "type")]
    pub result_type: Option<String>,
    pub confidence: Option<String>,
}

/// A geocoded address; `(block, street_name)` is unique after cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub block: String,
    pub street_name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Address {
    pub fn new(block: &str, street_name: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            block: block.to_string(),
            street_name: street_name.to_string(),
            latitude,
            longitude,
        }
    }

    pub fn key(&self) -> AddressKey {
        AddressKey {
            block: self.block.clone(),
            street_name: self.street_name.clone(),
        }
    }
}

impl Coordinates for Address {
    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Join key shared by addresses, distance tables, and transactions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AddressKey {
    pub block: String,
    pub street_name: String,
}

/// Keeps exact, high-confidence geocoder matches, one per address.
#[tracing::instrument(skip_all, fields(rows = table.len(), threshold = threshold))]
pub fn clean_address_geodata(table: &RawTable, threshold: f64) -> Vec<Address> {
    info!(records = table.len(), "Cleaning address records");

    let raw: Vec<RawAddress> = table.deserialize();

    let address_only: Vec<RawAddress> = raw
        .into_iter()
        .filter(|r| r.result_type.as_deref().map(str::trim) == Some(ADDRESS_TYPE))
        .collect();
    info!(records = address_only.len(), "After filtering by type='address'");

    let confident: Vec<RawAddress> = address_only
        .into_iter()
        .filter(|r| coerce_numeric(r.confidence.as_deref()).is_some_and(|c| c >= threshold))
        .collect();
    info!(records = confident.len(), threshold, "After filtering by confidence");

    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut duplicates = 0usize;
    let mut incomplete = 0usize;
    let mut addresses = Vec::with_capacity(confident.len());

    for r in confident {
        let key = (
            r.block.clone().unwrap_or_default(),
            r.street_name.clone().unwrap_or_default(),
        );
        if !seen.insert(key) {
            duplicates += 1;
            continue;
        }

        match to_address(&r) {
            Some(address) => addresses.push(address),
            None => incomplete += 1,
        }
    }

    if duplicates > 0 {
        info!(duplicates, "Removed duplicate addresses");
    }
    if incomplete > 0 {
        warn!(incomplete, "Dropped addresses without key or valid coordinates");
    }
    info!(records = addresses.len(), "Final unique, high-confidence addresses");

    addresses
}

fn to_address(r: &RawAddress) -> Option<Address> {
    let block = r.block.as_deref().filter(|b| !b.trim().is_empty())?;
    let street = r.street_name.as_deref().filter(|s| !s.trim().is_empty())?;
    let latitude = coerce_numeric(r.latitude.as_deref())?;
    let longitude = coerce_numeric(r.longitude.as_deref())?;

    is_valid_position(latitude, longitude).then(|| Address::new(block, street, latitude, longitude))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> RawTable {
        RawTable::from_reader("addresses", csv.as_bytes()).unwrap()
    }

    const HEADER: &str = "block,street_name,latitude,longitude,type,confidence";

    #[test]
    fn test_filters_type_and_confidence() {
        let csv = format!(
            "{HEADER}\n\
             1,A ST,1.30,103.80,address,0.9\n\
             2,B ST,1.31,103.81,street,0.95\n\
             3,C ST,1.32,103.82,address,0.79\n\
             4,D ST,1.33,103.83,address,0.8\n\
             5,E ST,1.34,103.84,address,\n"
        );
        let addresses = clean_address_geodata(&table(&csv), GEOCODING_CONFIDENCE_THRESHOLD);
        let blocks: Vec<&str> = addresses.iter().map(|a| a.block.as_str()).collect();
        assert_eq!(blocks, vec!["1", "4"]);
    }

    #[test]
    fn test_duplicate_keys_keep_first() {
        let csv = format!(
            "{HEADER}\n\
             10,MAIN RD,1.30,103.80,address,0.9\n\
             10,MAIN RD,1.99,103.99,address,0.99\n\
             11,MAIN RD,1.31,103.81,address,0.9\n"
        );
        let addresses = clean_address_geodata(&table(&csv), GEOCODING_CONFIDENCE_THRESHOLD);
        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses[0], Address::new("10", "MAIN RD", 1.30, 103.80));
    }

    #[test]
    fn test_rows_without_coordinates_dropped() {
        let csv = format!(
            "{HEADER}\n\
             1,A ST,,103.80,address,0.9\n\
             2,,1.3,103.80,address,0.9\n\
             3,C ST,1.3,103.80,address,0.9\n"
        );
        let addresses = clean_address_geodata(&table(&csv), GEOCODING_CONFIDENCE_THRESHOLD);
        assert_eq!(addresses.len(), 1);
        assert_eq!(addresses[0].block, "3");
    }

    #[test]
    fn test_key() {
        let a = Address::new("406", "ANG MO KIO AVE 10", 1.36, 103.85);
        assert_eq!(
            a.key(),
            AddressKey {
                block: "406".into(),
                street_name: "ANG MO KIO AVE 10".into()
            }
        );
    }
}
