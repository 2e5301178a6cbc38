//! Extraction: validate raw inputs and pass them through unchanged.
//!
//! Each extractor returns the data together with an [`ExtractionMeta`] so
//! callers can record what was read and when.

pub mod validation;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::error::{PipelineError, Result};
use crate::fetch::RawResponse;
use crate::source::RawTable;
use validation::{
    validate_data_quantity, validate_dataset_not_empty, validate_geodata_structure,
    validate_required_columns, validate_response_status,
};

pub const RESALE_REQUIRED_COLUMNS: &[&str] = &["town", "resale_price", "flat_type", "floor_area_sqm"];
pub const STATION_REQUIRED_COLUMNS: &[&str] = &["Name", "Line", "Code"];
pub const ADDRESS_REQUIRED_COLUMNS: &[&str] = &["latitude", "longitude"];

/// What an extractor saw.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionMeta {
    pub source: String,
    pub extracted_at: DateTime<Utc>,
    pub record_count: usize,
    pub missing_columns: Vec<String>,
}

impl ExtractionMeta {
    fn new(source: &str, record_count: usize, missing_columns: Vec<String>) -> Self {
        Self {
            source: source.to_string(),
            extracted_at: Utc::now(),
            record_count,
            missing_columns,
        }
    }
}

/// Data plus extraction metadata.
#[derive(Debug, Clone)]
pub struct Extracted<T> {
    pub data: T,
    pub meta: ExtractionMeta,
}

fn extract_table(table: RawTable, dataset: &str, required: &[&str]) -> Result<Extracted<RawTable>> {
    info!(dataset, records = table.len(), "Processing records");

    validate_dataset_not_empty(&table, dataset)?;
    let missing = validate_required_columns(&table, required, dataset);

    let meta = ExtractionMeta::new(dataset, table.len(), missing);
    Ok(Extracted { data: table, meta })
}

pub fn extract_resale_prices(table: RawTable) -> Result<Extracted<RawTable>> {
    extract_table(table, "HDB resale prices", RESALE_REQUIRED_COLUMNS)
}

pub fn extract_mrt_stations(table: RawTable) -> Result<Extracted<RawTable>> {
    extract_table(table, "MRT stations", STATION_REQUIRED_COLUMNS)
}

pub fn extract_address_geodata(table: RawTable) -> Result<Extracted<RawTable>> {
    extract_table(table, "HDB address geodata", ADDRESS_REQUIRED_COLUMNS)
}

/// Validates a geodata API response and returns the parsed document.
pub fn extract_geodata(response: &RawResponse, kind: &str, expected_minimum: usize) -> Result<Extracted<Value>> {
    let data = match parse_geodata_response(response, kind) {
        Ok(data) => data,
        Err(e) => {
            error!(kind, error = %e, "Error extracting geodata");
            return Err(e);
        }
    };

    let count = data["elements"].as_array().map_or(0, Vec::len);
    info!(kind, elements = count, "Extracted geodata records");
    validate_data_quantity(count, expected_minimum, kind);

    let meta = ExtractionMeta::new(kind, count, Vec::new());
    Ok(Extracted { data, meta })
}

fn parse_geodata_response(response: &RawResponse, kind: &str) -> Result<Value> {
    validate_response_status(response, kind)?;
    let data = response.json().map_err(|source| PipelineError::InvalidJson {
        dataset: kind.to_string(),
        source,
    })?;
    validate_geodata_structure(&data, kind)?;
    Ok(data)
}
