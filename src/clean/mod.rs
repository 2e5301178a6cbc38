//! Per-source cleaning: type coercion, text parsing, and deduplication.

pub mod addresses;
pub mod geodata;
pub mod parse;
pub mod stations;
pub mod transactions;

pub use addresses::{Address, AddressKey, GEOCODING_CONFIDENCE_THRESHOLD, clean_address_geodata};
pub use geodata::{clean_geodata, clean_mall_geodata, clean_mrt_geodata};
pub use stations::{Station, clean_mrt_stations};
pub use transactions::{Transaction, clean_resale_prices};
