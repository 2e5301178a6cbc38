//! Brute-force nearest-neighbour search.
//!
//! Every source point is compared against every target point, so the cost is
//! `sources × targets` distance evaluations. Target sets here are tens to low
//! hundreds of points, which keeps the scan cheap; source rows are spread over
//! the rayon pool since each one only reads the shared targets.

use std::collections::HashSet;

use rayon::prelude::*;
use tracing::info;

use super::{Coordinates, Location, haversine_km};
use crate::error::{PipelineError, Result};

/// The closest target found for one source row.
#[derive(Debug, Clone, PartialEq)]
pub struct Nearest<K> {
    pub key: K,
    pub name: String,
    pub distance_km: f64,
}

/// Search results for one target label, in source order.
#[derive(Debug, Clone)]
pub struct NearestTable<K> {
    pub label: String,
    pub rows: Vec<Nearest<K>>,
}

impl<K> NearestTable<K> {
    /// Output column holding the nearest target's name, e.g. `nearest_mrt_name`.
    pub fn name_column(&self) -> String {
        format!("nearest_{}_name", self.label)
    }

    /// Output column holding the distance, e.g. `nearest_mrt_distance_km`.
    pub fn distance_column(&self) -> String {
        format!("nearest_{}_distance_km", self.label)
    }

    pub fn mean_distance_km(&self) -> Option<f64> {
        if self.rows.is_empty() {
            return None;
        }
        Some(self.rows.iter().map(|r| r.distance_km).sum::<f64>() / self.rows.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Returns the target closest to `point` and its distance in km.
///
/// On exactly equal distances the earliest target wins. `None` only when
/// `targets` is empty.
pub fn nearest_to<'a, P: Coordinates + ?Sized>(
    point: &P,
    targets: &'a [Location],
) -> Option<(&'a Location, f64)> {
    let (first, rest) = targets.split_first()?;
    Some(closest(point, first, rest))
}

/// Scans `first` then `rest`; a later target replaces the current best only
/// when strictly closer.
fn closest<'a, P: Coordinates + ?Sized>(
    point: &P,
    first: &'a Location,
    rest: &'a [Location],
) -> (&'a Location, f64) {
    let distance =
        |t: &Location| haversine_km(point.latitude(), point.longitude(), t.latitude, t.longitude);

    let mut best = (first, distance(first));
    for target in rest {
        let d = distance(target);
        if d < best.1 {
            best = (target, d);
        }
    }
    best
}

/// Finds the nearest target for every source row.
///
/// `key` extracts the join key carried into each output row. Output order
/// matches `sources`. An empty target set is an error because the minimum
/// would be undefined for every row.
#[tracing::instrument(skip_all, fields(label = %label, sources = sources.len(), targets = targets.len()))]
pub fn find_nearest_locations<S, K, F>(
    sources: &[S],
    targets: &[Location],
    label: &str,
    key: F,
) -> Result<NearestTable<K>>
where
    S: Coordinates + Sync,
    K: Send,
    F: Fn(&S) -> K + Sync,
{
    let Some((first, rest)) = targets.split_first() else {
        return Err(PipelineError::EmptyTargetSet {
            label: label.to_string(),
        });
    };

    info!(label, sources = sources.len(), "Finding nearest locations");

    let rows: Vec<Nearest<K>> = sources
        .par_iter()
        .map(|source| {
            let (target, distance_km) = closest(source, first, rest);
            Nearest {
                key: key(source),
                name: target.name.clone(),
                distance_km,
            }
        })
        .collect();

    let table = NearestTable {
        label: label.to_string(),
        rows,
    };

    if let Some(avg) = table.mean_distance_km() {
        info!(label, avg_distance_km = avg, "Average nearest distance");
    }

    Ok(table)
}

/// Keeps only targets whose name appears in `operational_names`.
pub fn filter_operational<'a>(
    targets: &[Location],
    operational_names: impl IntoIterator<Item = &'a str>,
) -> Vec<Location> {
    let names: HashSet<&str> = operational_names.into_iter().collect();
    let kept: Vec<Location> = targets
        .iter()
        .filter(|t| names.contains(t.name.as_str()))
        .cloned()
        .collect();

    info!(
        operational = kept.len(),
        total = targets.len(),
        "Filtered to operational stations"
    );
    kept
}
