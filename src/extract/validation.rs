//! Reusable input checks.
//!
//! Emptiness and failed fetches abort; missing columns and low counts only
//! warn so the pipeline continues with whatever data is available.

use serde_json::Value;
use tracing::warn;

use crate::error::{PipelineError, Result};
use crate::fetch::RawResponse;
use crate::source::RawTable;

pub fn validate_dataset_not_empty(table: &RawTable, dataset: &str) -> Result<()> {
    if table.is_empty() {
        return Err(PipelineError::EmptyDataset {
            dataset: dataset.to_string(),
        });
    }
    Ok(())
}

/// Returns the missing columns after logging them.
pub fn validate_required_columns(table: &RawTable, required: &[&str], dataset: &str) -> Vec<String> {
    let missing: Vec<String> = required
        .iter()
        .filter(|c| !table.has_column(c))
        .map(|c| c.to_string())
        .collect();

    if !missing.is_empty() {
        warn!(dataset, missing = ?missing, "Missing expected columns");
    }
    missing
}

pub fn validate_response_status(response: &RawResponse, dataset: &str) -> Result<()> {
    if response.status != 200 {
        return Err(PipelineError::ApiStatus {
            dataset: dataset.to_string(),
            status: response.status,
            body: response.text(),
        });
    }
    Ok(())
}

/// The document must be an object whose `elements` is an array.
pub fn validate_geodata_structure(data: &Value, dataset: &str) -> Result<()> {
    let Some(object) = data.as_object() else {
        return Err(PipelineError::NotAnObject {
            dataset: dataset.to_string(),
        });
    };
    if !object.get("elements").is_some_and(Value::is_array) {
        return Err(PipelineError::MissingElements {
            dataset: dataset.to_string(),
        });
    }
    Ok(())
}

pub fn validate_data_quantity(count: usize, expected_minimum: usize, kind: &str) {
    if count == 0 {
        warn!(kind, "No data found in API response");
    } else if count < expected_minimum {
        warn!(kind, count, expected_minimum, "Element count seems low");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(csv: &str) -> RawTable {
        RawTable::from_reader("t", csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_empty_table_is_error() {
        let err = validate_dataset_not_empty(&table("a,b\n"), "HDB resale prices").unwrap_err();
        assert_eq!(err.to_string(), "HDB resale prices data is empty");
    }

    #[test]
    fn test_non_empty_table_ok() {
        assert!(validate_dataset_not_empty(&table("a\n1\n"), "x").is_ok());
    }

    #[test]
    fn test_missing_columns_reported_not_fatal() {
        let missing = validate_required_columns(&table("town,flat_type\nX,3 ROOM\n"), &["town", "resale_price"], "resale");
        assert_eq!(missing, vec!["resale_price".to_string()]);
    }

    #[test]
    fn test_non_200_status_is_error() {
        let resp = RawResponse {
            status: 504,
            body: b"Gateway Timeout".to_vec(),
        };
        let err = validate_response_status(&resp, "MRT").unwrap_err();
        assert!(err.to_string().starts_with("MRT API request failed"));
        assert!(err.to_string().contains("504"));
        assert!(err.to_string().contains("Gateway Timeout"));
    }

    #[test]
    fn test_geodata_structure() {
        assert!(validate_geodata_structure(&json!({"elements": []}), "mall").is_ok());
        assert!(matches!(
            validate_geodata_structure(&json!([1, 2]), "mall"),
            Err(PipelineError::NotAnObject { .. })
        ));
        assert!(matches!(
            validate_geodata_structure(&json!({"version": 0.6}), "mall"),
            Err(PipelineError::MissingElements { .. })
        ));
    }

    #[test]
    fn test_geodata_elements_must_be_array() {
        for doc in [
            json!({"elements": {"a": 1}}),
            json!({"elements": null}),
            json!({"elements": "[]"}),
        ] {
            let err = validate_geodata_structure(&doc, "mall").unwrap_err();
            assert!(matches!(err, PipelineError::MissingElements { .. }));
            assert_eq!(err.to_string(), "mall API response has no 'elements' array");
        }
    }
}
