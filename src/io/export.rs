//! CSV and JSON export of engine results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::error::{PlantError, Result};
use crate::results::ResultHandle;

/// Column header for the long-format results table.
const HEADER: &str = "key,index,value,unit";

/// File names written by [`export_all`].
pub const CSV_FILE: &str = "results.csv";
pub const JSON_FILE: &str = "results.json";

/// Exports results to a CSV file at the given path.
///
/// One row per stored value; series results produce one row per index.
/// Rows follow key order, so identical results give identical files.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(results: &ResultHandle, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(results, buf)
}

/// Writes results as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(results: &ResultHandle, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(','))?;

    for (key, q) in results.iter() {
        for (i, v) in q.values.iter().enumerate() {
            wtr.write_record([key.to_string(), i.to_string(), v.to_string(), q.unit.clone()])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Exports results as pretty-printed JSON in the engine wire format.
///
/// # Errors
///
/// Returns an `io::Error` if file creation, serialization or writing fails.
pub fn export_json(results: &ResultHandle, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let mut buf = io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut buf, results)?;
    buf.write_all(b"\n")?;
    buf.flush()
}

/// Writes `results.csv` and `results.json` into `dir`.
///
/// # Errors
///
/// `Output` naming the file that could not be written.
pub fn export_all(results: &ResultHandle, dir: &Path) -> Result<()> {
    let csv_path = dir.join(CSV_FILE);
    export_csv(results, &csv_path).map_err(|source| PlantError::Output {
        path: csv_path.clone(),
        source,
    })?;
    let json_path = dir.join(JSON_FILE);
    export_json(results, &json_path).map_err(|source| PlantError::Output {
        path: json_path.clone(),
        source,
    })?;
    tracing::debug!(dir = %dir.display(), rows = results.len(), "results exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResultHandle {
        let mut r = ResultHandle::new();
        r.insert("lcoh", 5.25, "USD/kg");
        r.insert("lcoe", 70.5, "USD/(MW*h)");
        r.insert_series("capacity_factor.sweep", vec![0.4, 0.45], "1");
        r
    }

    #[test]
    fn header_matches_schema() {
        let mut buf = Vec::new();
        write_csv(&sample(), &mut buf).ok();
        let output = String::from_utf8(buf).ok();
        let first_line = output.as_deref().unwrap_or("").lines().next().unwrap_or("");
        assert_eq!(first_line, "key,index,value,unit");
    }

    #[test]
    fn series_expand_to_one_row_per_value() {
        let mut buf = Vec::new();
        write_csv(&sample(), &mut buf).ok();
        let output = String::from_utf8(buf).ok();
        let lines: Vec<&str> = output.as_deref().unwrap_or("").lines().collect();
        // 1 header + 2 series rows + 2 scalars
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], "capacity_factor.sweep,0,0.4,1");
        assert_eq!(lines[2], "capacity_factor.sweep,1,0.45,1");
    }

    #[test]
    fn units_read_back_from_csv() {
        let mut buf = Vec::new();
        write_csv(&sample(), &mut buf).ok();

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        let units: Vec<String> = rdr
            .records()
            .filter_map(std::result::Result::ok)
            .map(|rec| rec[3].to_string())
            .collect();
        assert!(units.contains(&"USD/(MW*h)".to_string()));
    }

    #[test]
    fn deterministic_output() {
        let mut buf1 = Vec::new();
        let mut buf2 = Vec::new();
        write_csv(&sample(), &mut buf1).ok();
        write_csv(&sample(), &mut buf2).ok();
        assert_eq!(buf1, buf2);
    }

    #[test]
    fn export_all_writes_both_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        export_all(&sample(), dir.path()).expect("export");
        let json = std::fs::read_to_string(dir.path().join(JSON_FILE)).expect("json");
        let back: ResultHandle = serde_json::from_str(&json).expect("reload");
        assert_eq!(back, sample());
        assert!(dir.path().join(CSV_FILE).exists());
    }
}
