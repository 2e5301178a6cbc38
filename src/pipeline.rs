//! Stage wiring for a full run: extract, clean, features, model.
//!
//! Geodata documents are loaded asynchronously up front; everything after
//! that is synchronous and operates on in-memory tables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::clean::{
    clean_address_geodata, clean_mall_geodata, clean_mrt_geodata, clean_mrt_stations,
    clean_resale_prices,
};
use crate::config::{ModelSettings, PipelineConfig};
use crate::error::Result;
use crate::extract::{
    ExtractionMeta, extract_address_geodata, extract_geodata, extract_mrt_stations,
    extract_resale_prices,
};
use crate::features::{FeatureRecord, FeatureReport, create_feature_set};
use crate::fetch::{ApiKey, BasicClient, HttpClient, load_document};
use crate::model::{ModelInfo, evaluate_model_performance, train_linear_regression};
use crate::output::{write_json, write_nearest_table, write_records};
use crate::source::RawTable;

pub const EXTRACTION_MANIFEST: &str = "extraction_manifest.json";
pub const CLEAN_RESALE_PRICES: &str = "clean_resale_prices.csv";
pub const CLEAN_MRT_STATIONS: &str = "clean_mrt_stations.csv";
pub const CLEAN_MRT_GEODATA: &str = "clean_mrt_geodata.csv";
pub const CLEAN_MALL_GEODATA: &str = "clean_mall_geodata.csv";
pub const CLEAN_ADDRESS_GEODATA: &str = "clean_address_geodata.csv";
pub const NEAREST_MRT: &str = "nearest_mrt.csv";
pub const NEAREST_MALL: &str = "nearest_mall.csv";
pub const FEATURE_SET: &str = "feature_set.csv";
pub const FEATURE_REPORT: &str = "feature_report.json";
pub const MODEL_INFO: &str = "model_info.json";
pub const MODEL_PERFORMANCE: &str = "model_performance.csv";

/// What a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub outputs: Vec<PathBuf>,
    pub feature_report: FeatureReport,
    pub model: ModelInfo,
}

/// Overpass-style queries can take minutes on a busy server.
const GEODATA_REQUEST_TIMEOUT: Duration = Duration::from_secs(180);
const GEODATA_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Plain client, with a bearer token layered on when `api_key` is set.
pub fn geodata_client(api_key: Option<&str>) -> Result<Box<dyn HttpClient>> {
    let client = BasicClient::with_timeouts(GEODATA_REQUEST_TIMEOUT, GEODATA_CONNECT_TIMEOUT)?;
    match api_key {
        Some(key) => Ok(Box::new(ApiKey::bearer(client, key)?)),
        None => Ok(Box::new(client)),
    }
}

/// Runs every stage and writes all outputs under `config.output_dir`.
#[tracing::instrument(skip_all, fields(output_dir = %config.output_dir.display()))]
pub async fn run(config: &PipelineConfig, client: &dyn HttpClient) -> Result<RunSummary> {
    let out = |name: &str| config.output_dir.join(name);
    let inputs = &config.inputs;
    let mut outputs = Vec::new();

    info!("Starting extraction");
    let mrt_response = load_document(client, &inputs.mrt_geodata).await?;
    let mall_response = load_document(client, &inputs.mall_geodata).await?;

    let resale = extract_resale_prices(RawTable::from_path("resale prices", &inputs.resale_prices)?)?;
    let stations = extract_mrt_stations(RawTable::from_path("MRT stations", &inputs.mrt_stations)?)?;
    let addresses =
        extract_address_geodata(RawTable::from_path("address geodata", &inputs.address_geodata)?)?;
    let mrt_geo = extract_geodata(&mrt_response, "MRT", config.expected_geodata.mrt)?;
    let mall_geo = extract_geodata(&mall_response, "mall", config.expected_geodata.mall)?;

    let manifest: Vec<&ExtractionMeta> = vec![
        &resale.meta,
        &stations.meta,
        &addresses.meta,
        &mrt_geo.meta,
        &mall_geo.meta,
    ];
    outputs.push(write_json(&out(EXTRACTION_MANIFEST), &manifest)?);

    info!("Starting cleaning");
    let transactions = clean_resale_prices(&resale.data);
    let stations = clean_mrt_stations(&stations.data);
    let mrt_locations = clean_mrt_geodata(&mrt_geo.data);
    let mall_locations = clean_mall_geodata(&mall_geo.data);
    let addresses = clean_address_geodata(&addresses.data, config.geocoding_confidence_threshold);

    let gzip = config.gzip;
    outputs.push(write_records(&out(CLEAN_RESALE_PRICES), &transactions, gzip)?);
    outputs.push(write_records(&out(CLEAN_MRT_STATIONS), &stations, gzip)?);
    outputs.push(write_records(&out(CLEAN_MRT_GEODATA), &mrt_locations, gzip)?);
    outputs.push(write_records(&out(CLEAN_MALL_GEODATA), &mall_locations, gzip)?);
    outputs.push(write_records(&out(CLEAN_ADDRESS_GEODATA), &addresses, gzip)?);

    info!("Starting feature engineering");
    let feature_set = create_feature_set(
        &transactions,
        &addresses,
        &stations,
        &mrt_locations,
        &mall_locations,
    )?;

    outputs.push(write_nearest_table(&out(NEAREST_MRT), &feature_set.nearest_mrt, gzip)?);
    outputs.push(write_nearest_table(&out(NEAREST_MALL), &feature_set.nearest_mall, gzip)?);
    outputs.push(write_records(&out(FEATURE_SET), &feature_set.records, gzip)?);
    outputs.push(write_json(&out(FEATURE_REPORT), &feature_set.report)?);

    let (model, model_outputs) =
        train_and_report(&feature_set.records, &config.output_dir, config.model, gzip)?;
    outputs.extend(model_outputs);

    info!(outputs = outputs.len(), "Pipeline complete");
    Ok(RunSummary {
        outputs,
        feature_report: feature_set.report,
        model,
    })
}

/// Fits the model on `records` and writes its info and performance report.
pub fn train_and_report(
    records: &[FeatureRecord],
    output_dir: &Path,
    settings: ModelSettings,
    gzip: bool,
) -> Result<(ModelInfo, Vec<PathBuf>)> {
    let (_, info) = train_linear_regression(records, settings.test_size, settings.random_state)?;
    let performance = evaluate_model_performance(&info);

    let outputs = vec![
        write_json(&output_dir.join(MODEL_INFO), &info)?,
        write_records(&output_dir.join(MODEL_PERFORMANCE), &performance, gzip)?,
    ];
    Ok((info, outputs))
}

/// Model stage alone, over a feature table saved by an earlier run.
#[tracing::instrument(skip_all, fields(features = %features.display()))]
pub fn train_from_file(
    features: &Path,
    output_dir: &Path,
    settings: ModelSettings,
) -> Result<ModelInfo> {
    let table = RawTable::from_path("feature set", features)?;
    let records: Vec<FeatureRecord> = table.deserialize();
    if records.len() < table.len() {
        warn!(
            read = records.len(),
            rows = table.len(),
            "Some feature rows were incomplete"
        );
    }

    let (info, _) = train_and_report(&records, output_dir, settings, false)?;
    Ok(info)
}

/// Fetches one geodata document, validates it like a run would, and saves
/// the JSON to `output`. Returns the number of elements.
#[tracing::instrument(skip_all, fields(url = %url, label = %label))]
pub async fn fetch_geodata(
    client: &dyn HttpClient,
    url: &str,
    output: &Path,
    expected_minimum: usize,
    label: &str,
) -> Result<usize> {
    let response = load_document(client, url).await?;
    let extracted = extract_geodata(&response, label, expected_minimum)?;
    write_json(output, &extracted.data)?;

    info!(
        elements = extracted.meta.record_count,
        output = %output.display(),
        "Saved geodata"
    );
    Ok(extracted.meta.record_count)
}
