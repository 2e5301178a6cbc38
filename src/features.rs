//! Feature-set assembly.
//!
//! Runs the nearest-neighbour search once per target set, joins the two
//! distance tables on the address key, fans each address's distances out to
//! its transactions, and keeps only complete rows for modelling.

use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::clean::{Address, AddressKey, Station, Transaction};
use crate::error::Result;
use crate::geo::{Location, NearestTable, filter_operational, find_nearest_locations};

pub const MRT_LABEL: &str = "mrt";
pub const MALL_LABEL: &str = "mall";

/// Target column followed by the model inputs, in output order.
pub const FEATURE_COLUMNS: [&str; 7] = [
    "resale_price",
    "floor_area_sqm",
    "room_count",
    "remaining_lease_months",
    "storey_median",
    "nearest_mrt_distance_km",
    "nearest_mall_distance_km",
];

/// One model-ready row. Every field is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub resale_price: f64,
    pub floor_area_sqm: f64,
    pub room_count: u32,
    pub remaining_lease_months: i64,
    pub storey_median: f64,
    pub nearest_mrt_distance_km: f64,
    pub nearest_mall_distance_km: f64,
}

/// Proximity features for one address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressFeatures {
    pub block: String,
    pub street_name: String,
    pub nearest_mrt_name: String,
    pub nearest_mrt_distance_km: f64,
    pub nearest_mall_name: String,
    pub nearest_mall_distance_km: f64,
}

/// Row counts at each join, so inner-join losses are visible.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureReport {
    pub transactions: usize,
    pub addresses: usize,
    pub mrt_geodata: usize,
    pub operational_mrt: usize,
    pub mall_geodata: usize,
    pub address_features: usize,
    pub joined_rows: usize,
    pub unmatched_transactions: usize,
    pub complete_rows: usize,
    pub incomplete_rows: usize,
}

#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub records: Vec<FeatureRecord>,
    pub address_features: Vec<AddressFeatures>,
    pub nearest_mrt: NearestTable<AddressKey>,
    pub nearest_mall: NearestTable<AddressKey>,
    pub report: FeatureReport,
}

/// Pairs every left row with every right row sharing its key, in left order.
/// Rows whose key is `None` never match.
fn inner_join<'a, L, R, K>(
    left: &'a [L],
    right: &'a [R],
    left_key: impl Fn(&'a L) -> Option<K>,
    right_key: impl Fn(&'a R) -> Option<K>,
) -> Vec<(&'a L, &'a R)>
where
    K: Eq + Hash,
{
    let mut index: HashMap<K, Vec<&'a R>> = HashMap::new();
    for r in right {
        if let Some(k) = right_key(r) {
            index.entry(k).or_default().push(r);
        }
    }

    let mut joined = Vec::new();
    for l in left {
        let Some(k) = left_key(l) else { continue };
        if let Some(matches) = index.get(&k) {
            joined.extend(matches.iter().map(|r| (l, *r)));
        }
    }
    joined
}

fn key_ref(key: &AddressKey) -> Option<(&str, &str)> {
    Some((key.block.as_str(), key.street_name.as_str()))
}

/// Builds the model feature table from the cleaned inputs.
///
/// Station geodata is first restricted to stations present in `stations`.
/// Fails when either target set ends up empty.
#[tracing::instrument(skip_all)]
pub fn create_feature_set(
    transactions: &[Transaction],
    addresses: &[Address],
    stations: &[Station],
    mrt_geodata: &[Location],
    mall_geodata: &[Location],
) -> Result<FeatureSet> {
    info!("Creating ML feature set with distance features");

    let operational_mrt = filter_operational(mrt_geodata, stations.iter().map(|s| s.name.as_str()));

    let nearest_mrt = find_nearest_locations(addresses, &operational_mrt, MRT_LABEL, Address::key)?;
    let nearest_mall = find_nearest_locations(addresses, mall_geodata, MALL_LABEL, Address::key)?;

    let address_features: Vec<AddressFeatures> = inner_join(
        &nearest_mrt.rows,
        &nearest_mall.rows,
        |r| key_ref(&r.key),
        |r| key_ref(&r.key),
    )
    .into_iter()
    .map(|(mrt, mall)| AddressFeatures {
        block: mrt.key.block.clone(),
        street_name: mrt.key.street_name.clone(),
        nearest_mrt_name: mrt.name.clone(),
        nearest_mrt_distance_km: mrt.distance_km,
        nearest_mall_name: mall.name.clone(),
        nearest_mall_distance_km: mall.distance_km,
    })
    .collect();

    let joined = inner_join(
        transactions,
        &address_features,
        Transaction::address_key,
        |a| Some((a.block.as_str(), a.street_name.as_str())),
    );

    let records: Vec<FeatureRecord> = joined
        .iter()
        .filter_map(|(t, a)| to_feature_record(t, a))
        .collect();

    let matched_transactions = {
        let address_keys: std::collections::HashSet<(&str, &str)> = address_features
            .iter()
            .map(|a| (a.block.as_str(), a.street_name.as_str()))
            .collect();
        transactions
            .iter()
            .filter(|t| t.address_key().is_some_and(|k| address_keys.contains(&k)))
            .count()
    };

    let report = FeatureReport {
        transactions: transactions.len(),
        addresses: addresses.len(),
        mrt_geodata: mrt_geodata.len(),
        operational_mrt: operational_mrt.len(),
        mall_geodata: mall_geodata.len(),
        address_features: address_features.len(),
        joined_rows: joined.len(),
        unmatched_transactions: transactions.len() - matched_transactions,
        complete_rows: records.len(),
        incomplete_rows: joined.len() - records.len(),
    };

    info!(
        transactions = report.transactions,
        addresses = report.addresses,
        address_features = report.address_features,
        joined_rows = report.joined_rows,
        unmatched_transactions = report.unmatched_transactions,
        incomplete_rows = report.incomplete_rows,
        "Joined transactions with distance features"
    );
    info!(
        records = records.len(),
        features = FEATURE_COLUMNS.len(),
        columns = ?FEATURE_COLUMNS,
        "Final feature set"
    );

    Ok(FeatureSet {
        records,
        address_features,
        nearest_mrt,
        nearest_mall,
        report,
    })
}

/// Projects a joined row onto the model columns, or `None` if any is missing.
fn to_feature_record(t: &Transaction, a: &AddressFeatures) -> Option<FeatureRecord> {
    let record = FeatureRecord {
        resale_price: t.resale_price?,
        floor_area_sqm: t.floor_area_sqm?,
        room_count: t.room_count,
        remaining_lease_months: t.remaining_lease_months,
        storey_median: t.storey_median,
        nearest_mrt_distance_km: a.nearest_mrt_distance_km,
        nearest_mall_distance_km: a.nearest_mall_distance_km,
    };

    let finite = [
        record.resale_price,
        record.floor_area_sqm,
        record.storey_median,
        record.nearest_mrt_distance_km,
        record.nearest_mall_distance_km,
    ]
    .iter()
    .all(|v| v.is_finite());

    finite.then_some(record)
}
