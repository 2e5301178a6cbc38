//! Map-data API documents to location tables.
//!
//! Each element of the `elements` array is either a point carrying `lat` /
//! `lon` or a way/area carrying a `center` centroid. Both shapes collapse
//! into one [`Location`] per distinct name.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::geo::{Location, is_valid_position};

/// One element flattened to dotted field paths (`tags.name`, `center.lat`).
pub type FlatRecord = BTreeMap<String, Value>;

/// Flattens nested objects into dotted keys. Arrays and scalars are leaves.
pub fn flatten_json(value: &Value) -> FlatRecord {
    let mut out = FlatRecord::new();
    if let Value::Object(map) = value {
        flatten_into(map, "", &mut out);
    }
    out
}

fn flatten_into(map: &Map<String, Value>, prefix: &str, out: &mut FlatRecord) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(inner) => flatten_into(inner, &path, out),
            other => {
                out.insert(path, other.clone());
            }
        }
    }
}

/// Flattens every entry of the document's `elements` array.
pub fn convert_geodata_to_records(document: &Value) -> Vec<FlatRecord> {
    document
        .get("elements")
        .and_then(Value::as_array)
        .map(|elements| elements.iter().map(flatten_json).collect())
        .unwrap_or_default()
}

fn number_at(record: &FlatRecord, path: &str) -> Option<f64> {
    match record.get(path)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Direct point coordinates win over the centroid of a way or area.
pub fn standardize_coordinates(record: &FlatRecord) -> (Option<f64>, Option<f64>) {
    let latitude = number_at(record, "lat").or_else(|| number_at(record, "center.lat"));
    let longitude = number_at(record, "lon").or_else(|| number_at(record, "center.lon"));
    (latitude, longitude)
}

/// Builds a location from a flattened record, or `None` if the name or
/// either coordinate is missing.
pub fn location_from_record(record: &FlatRecord) -> Option<Location> {
    let name = record
        .get("tags.name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())?;
    let (latitude, longitude) = standardize_coordinates(record);

    Some(Location::new(name, latitude?, longitude?))
}

/// Merges same-named locations into one at the mean of their coordinates.
///
/// Output is ordered by name. Same-named entries are assumed to be the same
/// place captured more than once, close enough that averaging is sound.
pub fn handle_geodata_duplicates(locations: Vec<Location>, kind: &str) -> Vec<Location> {
    if locations.is_empty() {
        return locations;
    }

    let before = locations.len();
    let mut groups: BTreeMap<String, (f64, f64, usize)> = BTreeMap::new();
    for loc in locations {
        let entry = groups.entry(loc.name).or_insert((0.0, 0.0, 0));
        entry.0 += loc.latitude;
        entry.1 += loc.longitude;
        entry.2 += 1;
    }

    let merged: Vec<Location> = groups
        .into_iter()
        .map(|(name, (lat_sum, lon_sum, n))| Location {
            name,
            latitude: lat_sum / n as f64,
            longitude: lon_sum / n as f64,
        })
        .collect();

    let duplicates = before - merged.len();
    if duplicates > 0 {
        info!(kind, duplicates, "Merged duplicate locations");
    }
    info!(kind, unique = merged.len(), "Final geodata locations");

    merged
}

/// Cleans one geodata document into a deduplicated location table.
#[tracing::instrument(skip(document))]
pub fn clean_geodata(document: &Value, kind: &str) -> Vec<Location> {
    let records = convert_geodata_to_records(document);
    info!(kind, raw = records.len(), "Converted geodata records");

    let mut out_of_range = 0usize;
    let locations: Vec<Location> = records
        .iter()
        .filter_map(location_from_record)
        .filter(|loc| {
            let ok = is_valid_position(loc.latitude, loc.longitude);
            if !ok {
                out_of_range += 1;
            }
            ok
        })
        .collect();

    if out_of_range > 0 {
        warn!(kind, out_of_range, "Dropped locations with invalid coordinates");
    }
    info!(
        kind,
        complete = locations.len(),
        incomplete = records.len() - locations.len() - out_of_range,
        "Removed incomplete geodata records"
    );

    handle_geodata_duplicates(locations, kind)
}

/// Transit station geodata.
pub fn clean_mrt_geodata(document: &Value) -> Vec<Location> {
    clean_geodata(document, "MRT")
}

/// Shopping mall geodata.
pub fn clean_mall_geodata(document: &Value) -> Vec<Location> {
    clean_geodata(document, "mall")
}
