//! Persistence for cleaned tables, the feature set, and reports.
//!
//! CSV files are written whole (one header row, then data) and optionally
//! gzip-compressed, in which case `.gz` is appended to the file name.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use csv::{Writer, WriterBuilder};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use tracing::{debug, info};

use crate::clean::AddressKey;
use crate::error::Result;
use crate::geo::NearestTable;

/// `path` with `.gz` appended when compressing.
pub fn output_path(path: &Path, gzip: bool) -> PathBuf {
    if !gzip {
        return path.to_path_buf();
    }
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".gz");
    PathBuf::from(name)
}

/// Opens `path` for CSV output, hands the writer to `write_rows`, and
/// finalizes the gzip stream if one is in use.
fn with_csv_writer<F>(path: &Path, gzip: bool, write_rows: F) -> Result<PathBuf>
where
    F: FnOnce(&mut Writer<&mut dyn Write>) -> Result<()>,
{
    let path = output_path(path, gzip);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = BufWriter::new(File::create(&path)?);

    if gzip {
        let mut encoder = GzEncoder::new(file, Compression::default());
        {
            let mut writer = WriterBuilder::new().from_writer(&mut encoder as &mut dyn Write);
            write_rows(&mut writer)?;
            writer.flush()?;
        }
        encoder.finish()?.flush()?;
    } else {
        let mut file = file;
        {
            let mut writer = WriterBuilder::new().from_writer(&mut file as &mut dyn Write);
            write_rows(&mut writer)?;
            writer.flush()?;
        }
        file.flush()?;
    }

    Ok(path)
}

/// Writes `rows` as a CSV table with headers taken from the field names.
///
/// An empty slice produces an empty file, since headers come from the first
/// serialized row.
pub fn write_records<T: Serialize>(path: &Path, rows: &[T], gzip: bool) -> Result<PathBuf> {
    let written = with_csv_writer(path, gzip, |writer| {
        for row in rows {
            writer.serialize(row)?;
        }
        Ok(())
    })?;

    info!(path = %written.display(), rows = rows.len(), "Wrote CSV");
    Ok(written)
}

/// Writes a nearest-neighbour table as
/// `block,street_name,nearest_<label>_name,nearest_<label>_distance_km`.
pub fn write_nearest_table(
    path: &Path,
    table: &NearestTable<AddressKey>,
    gzip: bool,
) -> Result<PathBuf> {
    let written = with_csv_writer(path, gzip, |writer| {
        writer.write_record([
            "block".to_string(),
            "street_name".to_string(),
            table.name_column(),
            table.distance_column(),
        ])?;
        for row in &table.rows {
            let distance = row.distance_km.to_string();
            writer.write_record([
                row.key.block.as_str(),
                row.key.street_name.as_str(),
                row.name.as_str(),
                distance.as_str(),
            ])?;
        }
        Ok(())
    })?;

    info!(
        path = %written.display(),
        label = %table.label,
        rows = table.len(),
        "Wrote nearest table"
    );
    Ok(written)
}

/// Writes `value` as pretty-printed JSON.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut file, value).map_err(std::io::Error::from)?;
    file.flush()?;

    debug!(path = %path.display(), "Wrote JSON");
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Nearest;
    use flate2::read::GzDecoder;
    use std::fs;
    use std::io::Read;

    #[derive(Serialize)]
    struct Row {
        name: &'static str,
        value: Option<f64>,
    }

    fn nearest_table() -> NearestTable<AddressKey> {
        NearestTable {
            label: "mrt".to_string(),
            rows: vec![Nearest {
                key: AddressKey {
                    block: "406".into(),
                    street_name: "ANG MO KIO AVE 10".into(),
                },
                name: "Ang Mo Kio".into(),
                distance_km: 0.5,
            }],
        }
    }

    #[test]
    fn test_output_path_suffix() {
        assert_eq!(output_path(Path::new("out/a.csv"), false), PathBuf::from("out/a.csv"));
        assert_eq!(output_path(Path::new("out/a.csv"), true), PathBuf::from("out/a.csv.gz"));
    }

    #[test]
    fn test_write_records_plain() {
        let dir = tempfile::tempdir().unwrap();
        let rows = [
            Row { name: "a", value: Some(1.5) },
            Row { name: "b", value: None },
        ];
        let path = write_records(&dir.path().join("rows.csv"), &rows, false).unwrap();

        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content, "name,value\na,1.5\nb,\n");
    }

    #[test]
    fn test_write_records_gzip_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let rows = [Row { name: "a", value: Some(2.0) }];
        let path = write_records(&dir.path().join("rows.csv"), &rows, true).unwrap();
        assert!(path.to_string_lossy().ends_with("rows.csv.gz"));

        let mut content = String::new();
        GzDecoder::new(File::open(path).unwrap())
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "name,value\na,2.0\n");
    }

    #[test]
    fn test_write_nearest_table_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_nearest_table(&dir.path().join("nearest_mrt.csv"), &nearest_table(), false)
            .unwrap();

        let content = fs::read_to_string(path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("block,street_name,nearest_mrt_name,nearest_mrt_distance_km")
        );
        assert_eq!(lines.next(), Some("406,ANG MO KIO AVE 10,Ang Mo Kio,0.5"));
    }

    #[test]
    fn test_write_json_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");
        write_json(&path, &serde_json::json!({"rows": 3})).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["rows"], 3);
    }
}
