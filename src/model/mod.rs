//! Price model: OLS linear regression over the feature table.

pub mod data;
pub mod linear;
pub mod metrics;

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

pub use data::{Split, feature_names, prepare_features_and_target, train_test_split};
pub use linear::LinearRegression;
pub use metrics::RegressionMetrics;

use crate::features::FeatureRecord;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Matrix is singular and cannot be inverted")]
    SingularMatrix,

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Model has not been fitted yet")]
    NotFitted,

    #[error("Not enough samples to fit: {samples} samples for {features} features")]
    InsufficientSamples { samples: usize, features: usize },

    #[error("Test size must be in [0, 1), got {0}")]
    InvalidTestSize(f64),

    #[error("Computation error: {0}")]
    Computation(String),
}

/// Summary of a trained model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub train_metrics: RegressionMetrics,
    pub test_metrics: Option<RegressionMetrics>,
    /// Raw coefficients; features are unscaled so magnitudes are not comparable.
    pub feature_importance: BTreeMap<String, f64>,
    pub intercept: f64,
    pub n_features: usize,
    pub n_train_samples: usize,
    pub n_test_samples: usize,
}

/// Fits OLS on a seeded train split and scores both partitions.
#[tracing::instrument(skip(records), fields(records = records.len()))]
pub fn train_linear_regression(
    records: &[FeatureRecord],
    test_size: f64,
    random_state: u64,
) -> Result<(LinearRegression, ModelInfo), ModelError> {
    info!("Training linear regression model");

    let (x, y) = prepare_features_and_target(records)?;
    let split = train_test_split(&x, &y, test_size, random_state)?;
    let names = feature_names();

    info!(
        train = split.y_train.len(),
        test = split.y_test.len(),
        features = ?names,
        "Prepared training data"
    );

    let n_features = names.len();
    let mut model = LinearRegression::new().with_feature_names(names);
    model.fit(&split.x_train, &split.y_train)?;

    let train_pred = model.predict(&split.x_train)?;
    let train_metrics = RegressionMetrics::calculate(&split.y_train, &train_pred);

    let test_metrics = if split.y_test.is_empty() {
        None
    } else {
        let test_pred = model.predict(&split.x_test)?;
        Some(RegressionMetrics::calculate(&split.y_test, &test_pred))
    };

    let feature_importance = model.named_coefficients()?;
    let intercept = model.intercept.ok_or(ModelError::NotFitted)?;

    info!(train_r2 = train_metrics.r2, "Model trained");
    if let Some(m) = &test_metrics {
        info!(
            test_r2 = m.r2,
            test_rmse = m.rmse,
            "Test performance"
        );
    }

    let info = ModelInfo {
        train_metrics,
        test_metrics,
        feature_importance,
        intercept,
        n_features,
        n_train_samples: split.y_train.len(),
        n_test_samples: split.y_test.len(),
    };

    Ok((model, info))
}

/// One line of the performance report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceRow {
    #[serde(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Train")]
    pub train: f64,
    #[serde(rename = "Test")]
    pub test: Option<f64>,
}

/// Train/test comparison of R², RMSE, MAE and MSE.
pub fn evaluate_model_performance(info: &ModelInfo) -> Vec<PerformanceRow> {
    let train = &info.train_metrics;
    let test = info.test_metrics.as_ref();

    let row = |metric: &str, pick: fn(&RegressionMetrics) -> f64| PerformanceRow {
        metric: metric.to_string(),
        train: pick(train),
        test: test.map(pick),
    };

    let rows = vec![
        row("R² Score", |m| m.r2),
        row("RMSE ($)", |m| m.rmse),
        row("MAE ($)", |m| m.mae),
        row("MSE", |m| m.mse),
    ];

    if let Some(t) = test {
        info!(
            r2 = t.r2,
            rmse = t.rmse,
            mae = t.mae,
            "Model performance summary"
        );
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(n: usize) -> Vec<FeatureRecord> {
        (0..n)
            .map(|i| {
                let area = 60.0 + (i % 7) as f64 * 10.0;
                let rooms = 2 + (i % 4) as u32;
                let lease = 600 + (i * 13 % 300) as i64;
                let storey = 2.0 + (i % 9) as f64 * 3.0;
                let mrt = 0.2 + (i % 5) as f64 * 0.3;
                let mall = 0.4 + (i * 3 % 11) as f64 * 0.2;
                let price = 50_000.0 + 4_000.0 * area + 10_000.0 * f64::from(rooms)
                    + 150.0 * lease as f64
                    + 2_000.0 * storey
                    - 30_000.0 * mrt
                    - 10_000.0 * mall;
                FeatureRecord {
                    resale_price: price,
                    floor_area_sqm: area,
                    room_count: rooms,
                    remaining_lease_months: lease,
                    storey_median: storey,
                    nearest_mrt_distance_km: mrt,
                    nearest_mall_distance_km: mall,
                }
            })
            .collect()
    }

    #[test]
    fn test_train_on_noiseless_data_fits_well() {
        let records = synthetic(60);
        let (_, info) = train_linear_regression(&records, 0.2, 42).unwrap();

        assert_eq!(info.n_features, 6);
        assert_eq!(info.n_train_samples + info.n_test_samples, 60);
        assert!(info.train_metrics.r2 > 0.999, "r2 = {}", info.train_metrics.r2);
        assert!(info.test_metrics.unwrap().r2 > 0.99);
        assert!((info.feature_importance["floor_area_sqm"] - 4_000.0).abs() < 1.0);
    }

    #[test]
    fn test_train_with_too_few_rows_fails() {
        let result = train_linear_regression(&synthetic(4), 0.2, 42);
        assert!(matches!(result, Err(ModelError::InsufficientSamples { .. })));
    }

    #[test]
    fn test_performance_report_rows() {
        let (_, info) = train_linear_regression(&synthetic(40), 0.25, 1).unwrap();
        let rows = evaluate_model_performance(&info);

        let metrics: Vec<&str> = rows.iter().map(|r| r.metric.as_str()).collect();
        assert_eq!(metrics, vec!["R² Score", "RMSE ($)", "MAE ($)", "MSE"]);
        assert_eq!(rows[0].train, info.train_metrics.r2);
        assert_eq!(rows[3].test, info.test_metrics.map(|m| m.mse));
    }
}
