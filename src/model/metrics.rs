//! Regression metrics.

use ndarray::Array1;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionMetrics {
    pub r2: f64,
    pub mse: f64,
    pub mae: f64,
    pub rmse: f64,
}

impl RegressionMetrics {
    pub fn calculate(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mse = mean_squared_error(y_true, y_pred);
        Self {
            r2: r_squared(y_true, y_pred),
            mse,
            mae: mean_absolute_error(y_true, y_pred),
            rmse: mse.sqrt(),
        }
    }
}

pub fn mean_squared_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let sum: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    sum / y_true.len() as f64
}

pub fn mean_absolute_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let sum: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).abs())
        .sum();
    sum / y_true.len() as f64
}

/// Coefficient of determination. 0 when the target has no variance.
pub fn r_squared(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let mean = y_true.mean().unwrap_or(0.0);
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    if ss_tot < 1e-10 {
        return 0.0;
    }
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    1.0 - ss_res / ss_tot
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_perfect_prediction() {
        let y = array![1.0, 2.0, 3.0];
        let m = RegressionMetrics::calculate(&y, &y);
        assert_eq!(m.mse, 0.0);
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.r2, 1.0);
    }

    #[test]
    fn test_known_errors() {
        let y = array![1.0, 2.0, 3.0, 4.0];
        let p = array![2.0, 2.0, 3.0, 2.0];
        let m = RegressionMetrics::calculate(&y, &p);
        assert_eq!(m.mae, 0.75);
        assert_eq!(m.mse, 1.25);
        assert!((m.rmse - 1.25f64.sqrt()).abs() < 1e-12);
        // ss_tot = 5, ss_res = 5
        assert!(m.r2.abs() < 1e-12);
    }

    #[test]
    fn test_constant_target_r2_is_zero() {
        let y = array![5.0, 5.0];
        assert_eq!(r_squared(&y, &array![4.0, 6.0]), 0.0);
    }
}
