//! Turning feature records into matrices and splitting them.

use ndarray::{Array1, Array2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::ModelError;
use crate::features::{FEATURE_COLUMNS, FeatureRecord};

/// Input columns: everything but the `resale_price` target.
pub fn feature_names() -> Vec<String> {
    FEATURE_COLUMNS[1..].iter().map(|c| c.to_string()).collect()
}

/// Splits records into an `n × 6` feature matrix and the price target.
pub fn prepare_features_and_target(
    records: &[FeatureRecord],
) -> Result<(Array2<f64>, Array1<f64>), ModelError> {
    let n_features = FEATURE_COLUMNS.len() - 1;
    let mut values = Vec::with_capacity(records.len() * n_features);
    let mut target = Vec::with_capacity(records.len());

    for r in records {
        values.extend_from_slice(&[
            r.floor_area_sqm,
            f64::from(r.room_count),
            r.remaining_lease_months as f64,
            r.storey_median,
            r.nearest_mrt_distance_km,
            r.nearest_mall_distance_km,
        ]);
        target.push(r.resale_price);
    }

    let x = Array2::from_shape_vec((records.len(), n_features), values)
        .map_err(|e| ModelError::Computation(e.to_string()))?;
    Ok((x, Array1::from(target)))
}

/// Train and test partitions of the same data.
#[derive(Debug, Clone)]
pub struct Split {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
}

/// Shuffles rows with a seeded RNG and holds out `ceil(test_size * n)` of
/// them. The same seed always yields the same partition.
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    test_size: f64,
    random_state: u64,
) -> Result<Split, ModelError> {
    if !(0.0..1.0).contains(&test_size) {
        return Err(ModelError::InvalidTestSize(test_size));
    }
    if x.nrows() != y.len() {
        return Err(ModelError::DimensionMismatch {
            expected: x.nrows(),
            got: y.len(),
        });
    }

    let n = x.nrows();
    let n_test = (test_size * n as f64).ceil() as usize;

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(random_state);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);

    Ok(Split {
        x_train: x.select(Axis(0), train_idx),
        x_test: x.select(Axis(0), test_idx),
        y_train: y.select(Axis(0), train_idx),
        y_test: y.select(Axis(0), test_idx),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(price: f64) -> FeatureRecord {
        FeatureRecord {
            resale_price: price,
            floor_area_sqm: 90.0,
            room_count: 4,
            remaining_lease_months: 828,
            storey_median: 8.0,
            nearest_mrt_distance_km: 0.5,
            nearest_mall_distance_km: 1.2,
        }
    }

    #[test]
    fn test_prepare_shapes_and_order() {
        let (x, y) = prepare_features_and_target(&[record(1.0), record(2.0)]).unwrap();
        assert_eq!(x.dim(), (2, 6));
        assert_eq!(y.to_vec(), vec![1.0, 2.0]);
        assert_eq!(x.row(0).to_vec(), vec![90.0, 4.0, 828.0, 8.0, 0.5, 1.2]);
        assert_eq!(feature_names().len(), 6);
        assert_eq!(feature_names()[0], "floor_area_sqm");
    }

    #[test]
    fn test_split_sizes() {
        let records: Vec<FeatureRecord> = (0..10).map(|i| record(i as f64)).collect();
        let (x, y) = prepare_features_and_target(&records).unwrap();
        let split = train_test_split(&x, &y, 0.2, 42).unwrap();
        assert_eq!(split.x_train.nrows(), 8);
        assert_eq!(split.x_test.nrows(), 2);
        assert_eq!(split.y_train.len(), 8);
        assert_eq!(split.y_test.len(), 2);
    }

    #[test]
    fn test_split_rounds_test_size_up() {
        let records: Vec<FeatureRecord> = (0..11).map(|i| record(i as f64)).collect();
        let (x, y) = prepare_features_and_target(&records).unwrap();
        let split = train_test_split(&x, &y, 0.2, 42).unwrap();
        assert_eq!(split.y_test.len(), 3);
    }

    #[test]
    fn test_split_is_deterministic_and_partitions() {
        let records: Vec<FeatureRecord> = (0..20).map(|i| record(i as f64)).collect();
        let (x, y) = prepare_features_and_target(&records).unwrap();
        let a = train_test_split(&x, &y, 0.25, 7).unwrap();
        let b = train_test_split(&x, &y, 0.25, 7).unwrap();
        assert_eq!(a.y_test, b.y_test);

        let mut all: Vec<f64> = a.y_train.iter().chain(a.y_test.iter()).copied().collect();
        all.sort_by(|p, q| p.total_cmp(q));
        assert_eq!(all, (0..20).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn test_invalid_test_size() {
        let (x, y) = prepare_features_and_target(&[record(1.0)]).unwrap();
        assert!(matches!(
            train_test_split(&x, &y, 1.5, 0),
            Err(ModelError::InvalidTestSize(_))
        ));
    }
}
