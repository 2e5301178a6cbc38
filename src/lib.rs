pub mod clean;
pub mod config;
pub mod error;
pub mod extract;
pub mod features;
pub mod fetch;
pub mod geo;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod source;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
