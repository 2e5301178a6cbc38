//! Raw inputs as they arrive from disk.
//!
//! Tabular inputs are kept as untyped [`RawTable`]s so that extractors can
//! check emptiness and column presence before any cleaner commits to a
//! schema. Cleaners deserialize rows into their own typed records.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use flate2::read::GzDecoder;
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::Result;

/// A CSV table held in memory: one header row plus data rows.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub name: String,
    pub headers: StringRecord,
    pub records: Vec<StringRecord>,
}

impl RawTable {
    pub fn new(name: &str, headers: StringRecord, records: Vec<StringRecord>) -> Self {
        Self {
            name: name.to_string(),
            headers,
            records,
        }
    }

    /// Reads a CSV file with a header row. Files ending in `.gz` are
    /// decompressed on the fly.
    pub fn from_path(name: &str, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        if path.extension().is_some_and(|ext| ext == "gz") {
            Self::from_reader(name, GzDecoder::new(file))
        } else {
            Self::from_reader(name, file)
        }
    }

    /// Reads CSV text from any reader. Rows with a different field count than
    /// the header are accepted and padded on deserialization.
    pub fn from_reader<R: Read>(name: &str, reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = rdr.headers()?.clone();

        let mut records = Vec::new();
        for result in rdr.records() {
            records.push(result?);
        }

        debug!(dataset = name, rows = records.len(), columns = headers.len(), "Loaded CSV table");
        Ok(Self::new(name, headers, records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn columns(&self) -> Vec<&str> {
        self.headers.iter().collect()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    /// Returns a copy without the columns whose header matches `pattern`.
    pub fn without_columns_matching(&self, pattern: &Regex) -> Self {
        let keep: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !pattern.is_match(h))
            .map(|(i, _)| i)
            .collect();

        if keep.len() == self.headers.len() {
            return self.clone();
        }

        let project = |record: &StringRecord| -> StringRecord {
            keep.iter().map(|&i| record.get(i).unwrap_or("")).collect()
        };

        debug!(
            dataset = %self.name,
            dropped = self.headers.len() - keep.len(),
            "Dropped columns"
        );

        Self {
            name: self.name.clone(),
            headers: project(&self.headers),
            records: self.records.iter().map(project).collect(),
        }
    }

    /// Deserializes every row into `T` by header name.
    ///
    /// Rows that do not fit `T` are skipped with a warning rather than
    /// failing the batch; absent columns map to `None` on optional fields.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Vec<T> {
        let mut rows = Vec::with_capacity(self.records.len());
        let mut skipped = 0usize;

        for record in &self.records {
            match record.deserialize::<T>(Some(&self.headers)) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    skipped += 1;
                    debug!(dataset = %self.name, error = %e, "Row skipped");
                }
            }
        }

        if skipped > 0 {
            warn!(dataset = %self.name, skipped, "Rows could not be read");
        }

        rows
    }
}
