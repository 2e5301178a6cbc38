//! Error taxonomy for the pipeline.
//!
//! Only whole-dataset and configuration problems surface here. Row-level
//! parse failures are recovered inside the cleaners and reported through
//! logging instead.

use thiserror::Error;

use crate::model::ModelError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{dataset} data is empty")]
    EmptyDataset { dataset: String },

    #[error("{dataset} API request failed with status {status}: {body}")]
    ApiStatus {
        dataset: String,
        status: u16,
        body: String,
    },

    #[error("Failed to parse {dataset} JSON response: {source}")]
    InvalidJson {
        dataset: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{dataset} API response is not a valid JSON object")]
    NotAnObject { dataset: String },

    #[error("{dataset} API response has no 'elements' array")]
    MissingElements { dataset: String },

    #[error("Cannot search for nearest {label}: target set is empty")]
    EmptyTargetSet { label: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
