//! Run configuration.
//!
//! Stored as a JSON object on disk. Every field has a default, so a config
//! only needs to name what differs:
//! ```json
//! {
//!   "inputs": {
//!     "resale_prices": "data/resale_prices.csv",
//!     "mrt_geodata": "https://overpass.example/api/interpreter?data=..."
//!   },
//!   "output_dir": "out",
//!   "gzip": true
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::clean::GEOCODING_CONFIDENCE_THRESHOLD;
use crate::error::{PipelineError, Result};

/// Environment variable holding an optional bearer token for geodata fetches.
pub const GEODATA_API_KEY_ENV: &str = "GEODATA_API_KEY";

/// Where each dataset is read from. Geodata entries may be `http(s)` URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputPaths {
    pub resale_prices: PathBuf,
    pub mrt_stations: PathBuf,
    pub address_geodata: PathBuf,
    pub mrt_geodata: String,
    pub mall_geodata: String,
}

impl Default for InputPaths {
    fn default() -> Self {
        Self {
            resale_prices: PathBuf::from("data/raw/resale_prices.csv"),
            mrt_stations: PathBuf::from("data/raw/mrt_stations.csv"),
            address_geodata: PathBuf::from("data/raw/hdb_address_geodata.csv"),
            mrt_geodata: "data/raw/mrt_geodata.json".to_string(),
            mall_geodata: "data/raw/mall_geodata.json".to_string(),
        }
    }
}

/// Minimum element counts below which a geodata document is suspicious.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpectedCounts {
    pub mrt: usize,
    pub mall: usize,
}

impl Default for ExpectedCounts {
    fn default() -> Self {
        Self { mrt: 50, mall: 10 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub test_size: f64,
    pub random_state: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            random_state: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub inputs: InputPaths,
    pub output_dir: PathBuf,
    /// Compress CSV outputs with gzip.
    pub gzip: bool,
    pub geocoding_confidence_threshold: f64,
    pub expected_geodata: ExpectedCounts,
    pub model: ModelSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inputs: InputPaths::default(),
            output_dir: PathBuf::from("data/processed"),
            gzip: false,
            geocoding_confidence_threshold: GEOCODING_CONFIDENCE_THRESHOLD,
            expected_geodata: ExpectedCounts::default(),
            model: ModelSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.geocoding_confidence_threshold) {
            return Err(PipelineError::Config(format!(
                "geocoding_confidence_threshold must be in [0, 1], got {}",
                self.geocoding_confidence_threshold
            )));
        }
        if !(0.0..1.0).contains(&self.model.test_size) {
            return Err(PipelineError::Config(format!(
                "model.test_size must be in [0, 1), got {}",
                self.model.test_size
            )));
        }
        Ok(())
    }

    /// Bearer token for geodata requests, if one is set in the environment.
    pub fn geodata_api_key() -> Option<String> {
        std::env::var(GEODATA_API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}
