//! Ordinary least squares with an intercept.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, Axis, s};

use super::ModelError;

/// Diagonal jitter added to X'X before factorisation.
const RIDGE_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, Default)]
pub struct LinearRegression {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: Option<f64>,
    pub feature_names: Vec<String>,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = names;
        self
    }

    /// Solves the normal equations `(X'X) β = X'y` by Cholesky decomposition.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        if x.nrows() != y.len() {
            return Err(ModelError::DimensionMismatch {
                expected: x.nrows(),
                got: y.len(),
            });
        }
        if x.nrows() <= x.ncols() {
            return Err(ModelError::InsufficientSamples {
                samples: x.nrows(),
                features: x.ncols(),
            });
        }

        let ones = Array2::ones((x.nrows(), 1));
        let design = ndarray::concatenate(Axis(1), &[ones.view(), x.view()])
            .map_err(|e| ModelError::Computation(e.to_string()))?;

        let mut xtx = design.t().dot(&design);
        for i in 0..xtx.nrows() {
            xtx[[i, i]] += RIDGE_EPSILON;
        }
        let xty = design.t().dot(y);

        let beta = cholesky_solve(&xtx, &xty)?;

        self.intercept = Some(beta[0]);
        self.coefficients = Some(beta.slice(s![1..]).to_owned());
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let coefficients = self.coefficients.as_ref().ok_or(ModelError::NotFitted)?;
        let intercept = self.intercept.ok_or(ModelError::NotFitted)?;

        if x.ncols() != coefficients.len() {
            return Err(ModelError::DimensionMismatch {
                expected: coefficients.len(),
                got: x.ncols(),
            });
        }

        Ok(x.dot(coefficients) + intercept)
    }

    /// Fitted coefficients keyed by feature name.
    pub fn named_coefficients(&self) -> Result<BTreeMap<String, f64>, ModelError> {
        let coefficients = self.coefficients.as_ref().ok_or(ModelError::NotFitted)?;
        if self.feature_names.len() != coefficients.len() {
            return Err(ModelError::DimensionMismatch {
                expected: coefficients.len(),
                got: self.feature_names.len(),
            });
        }

        Ok(self
            .feature_names
            .iter()
            .cloned()
            .zip(coefficients.iter().copied())
            .collect())
    }
}

/// Solves `A x = b` for symmetric positive-definite `A`.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, ModelError> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return Err(ModelError::SingularMatrix);
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[[i, j]] * z[j]).sum();
        z[i] = (b[i] - sum) / l[[i, i]];
    }

    // L' x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = (i + 1..n).map(|j| l[[j, i]] * x[j]).sum();
        x[i] = (z[i] - sum) / l[[i, i]];
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_named_coefficients_follow_feature_names() {
        let x = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [2.0, 1.0], [1.0, 3.0]];
        let y = x.map_axis(Axis(1), |row| 1.0 + 4.0 * row[0] + 0.5 * row[1]);

        let mut model = LinearRegression::new()
            .with_feature_names(vec!["floor_area_sqm".into(), "storey_median".into()]);
        assert!(matches!(model.named_coefficients(), Err(ModelError::NotFitted)));

        model.fit(&x, &y).unwrap();
        let named = model.named_coefficients().unwrap();
        assert!((named["floor_area_sqm"] - 4.0).abs() < 1e-6);
        assert!((named["storey_median"] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_named_coefficients_require_matching_names() {
        let x = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [2.0, 1.0]];
        let y = array![1.0, 2.0, 3.0, 4.0];
        let mut model = LinearRegression::new().with_feature_names(vec!["only_one".into()]);
        model.fit(&x, &y).unwrap();

        assert!(matches!(
            model.named_coefficients(),
            Err(ModelError::DimensionMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn test_recovers_exact_linear_relationship() {
        let x = array![
            [1.0, 2.0],
            [2.0, 1.0],
            [3.0, 5.0],
            [4.0, 3.0],
            [5.0, 8.0],
            [6.0, 2.0]
        ];
        let y = x.map_axis(Axis(1), |row| 3.0 + 2.0 * row[0] - 1.0 * row[1]);

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let coef = model.coefficients.as_ref().unwrap();
        assert!((model.intercept.unwrap() - 3.0).abs() < 1e-6);
        assert!((coef[0] - 2.0).abs() < 1e-6);
        assert!((coef[1] + 1.0).abs() < 1e-6);

        let pred = model.predict(&x).unwrap();
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-6);
        }
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let model = LinearRegression::new();
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(ModelError::NotFitted)
        ));
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut model = LinearRegression::new();
        let result = model.fit(&array![[1.0], [2.0], [3.0]], &array![1.0, 2.0]);
        assert!(matches!(result, Err(ModelError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_too_few_samples() {
        let mut model = LinearRegression::new();
        let result = model.fit(&array![[1.0, 2.0], [2.0, 3.0]], &array![1.0, 2.0]);
        assert!(matches!(
            result,
            Err(ModelError::InsufficientSamples { samples: 2, features: 2 })
        ));
    }

    #[test]
    fn test_cholesky_rejects_non_positive_definite() {
        let a = array![[0.0, 0.0], [0.0, 1.0]];
        let b = array![1.0, 1.0];
        assert!(matches!(cholesky_solve(&a, &b), Err(ModelError::SingularMatrix)));
    }
}
