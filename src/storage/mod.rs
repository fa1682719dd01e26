//! Persistence layer.
//!
//! The occupancy log is a flat CSV file, appended to once per successful
//! tick. The header is written only when the file is created. Reads only
//! ever look at the tail to recover the last known count.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::types::{LogRow, Reading, ReadingKind, TrackerError, TrackerResult};

/// Header row of the three-column log.
pub const HEADER: [&str; 3] = ["Timestamp", "Occupancy", "Type"];

/// Append-only occupancy log on disk.
#[derive(Debug, Clone)]
pub struct OccupancyLog {
    path: PathBuf,
}

impl OccupancyLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file with its header row if it doesn't exist yet.
    ///
    /// An existing file is never touched, so the header is written once.
    pub fn ensure_header(&self) -> TrackerResult<()> {
        if self.has_content()? {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut wtr = csv::Writer::from_writer(file);
        wtr.write_record(HEADER)?;
        wtr.flush()?;
        info!(path = %self.path.display(), "Created occupancy log");
        Ok(())
    }

    /// Append one reading, creating the file with a header first if needed.
    pub fn append(&self, reading: &Reading) -> TrackerResult<()> {
        self.ensure_header()?;
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let occupancy = reading.occupancy.to_string();
        let kind = reading.kind.to_string();
        let mut wtr = csv::Writer::from_writer(file);
        wtr.write_record([reading.timestamp.as_str(), occupancy.as_str(), kind.as_str()])?;
        wtr.flush()?;
        debug!(
            path = %self.path.display(),
            occupancy = reading.occupancy,
            kind = %reading.kind,
            "Row appended"
        );
        Ok(())
    }

    /// All data rows, in file order. Missing file means no rows.
    ///
    /// Strict: any malformed row is an error.
    pub fn rows(&self) -> TrackerResult<Vec<LogRow>> {
        self.records()?.iter().map(parse_row).collect()
    }

    /// Occupancy of the last data row, or 0 if there is none.
    ///
    /// Only the final record is parsed; earlier rows never affect the result.
    pub fn last_count(&self) -> TrackerResult<u32> {
        match self.records()?.last() {
            Some(record) => Ok(parse_row(record)?.occupancy),
            None => Ok(0),
        }
    }

    /// Occupancy of the most recent `Real` row, or 0 if there is none.
    ///
    /// Rows that fail to parse are skipped.
    pub fn last_real_count(&self) -> TrackerResult<u32> {
        let records = self.records()?;
        for record in records.iter().rev() {
            match parse_row(record) {
                Ok(row) if row.kind == Some(ReadingKind::Real) => return Ok(row.occupancy),
                Ok(_) => {}
                Err(e) => debug!(error = %e, "Skipping unreadable log row"),
            }
        }
        Ok(0)
    }

    /// Raw non-empty data records, header excluded.
    fn records(&self) -> TrackerResult<Vec<csv::StringRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)?;

        let mut records = Vec::new();
        for (idx, record) in rdr.records().enumerate() {
            let record = record?;
            if idx == 0 && record.get(0) == Some(HEADER[0]) {
                continue;
            }
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }
            records.push(record);
        }
        Ok(records)
    }

    fn has_content(&self) -> TrackerResult<bool> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len() > 0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Parse a data row in either the three-column or the older two-column layout.
fn parse_row(record: &csv::StringRecord) -> TrackerResult<LogRow> {
    let timestamp = record
        .get(0)
        .ok_or_else(|| TrackerError::InvalidRow("empty row".to_string()))?
        .to_string();
    let occupancy_field = record
        .get(1)
        .ok_or_else(|| TrackerError::InvalidRow(format!("no occupancy in row '{timestamp}'")))?;
    let occupancy = occupancy_field.parse::<u32>().map_err(|_| {
        TrackerError::InvalidRow(format!("bad occupancy '{occupancy_field}' in row '{timestamp}'"))
    })?;
    let kind = match record.get(2) {
        Some(k) if !k.is_empty() => Some(k.parse::<ReadingKind>()?),
        _ => None,
    };
    Ok(LogRow {
        timestamp,
        occupancy,
        kind,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("occupancy_test_log_{}.csv", uuid::Uuid::new_v4()));
        p
    }

    #[test]
    fn test_missing_file_has_no_rows() {
        let log = OccupancyLog::new(temp_path());
        assert!(log.rows().unwrap().is_empty());
        assert_eq!(log.last_count().unwrap(), 0);
        assert_eq!(log.last_real_count().unwrap(), 0);
    }

    #[test]
    fn test_header_only_counts_as_empty() {
        let path = temp_path();
        let log = OccupancyLog::new(&path);
        log.ensure_header().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Timestamp,Occupancy,Type\n");
        assert_eq!(log.last_count().unwrap(), 0);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_header_written_once() {
        let path = temp_path();
        let log = OccupancyLog::new(&path);
        for i in 0..5 {
            OccupancyLog::new(&path).ensure_header().unwrap();
            log.append(&Reading::estimated("2026-02-25 08:30:00.000", i)).unwrap();
        }
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.matches("Timestamp,Occupancy,Type").count(), 1);
        assert_eq!(contents.lines().count(), 6);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_and_tail() {
        let path = temp_path();
        let log = OccupancyLog::new(&path);
        log.append(&Reading::real("2026-02-25 08:20:00.000", 40)).unwrap();
        log.append(&Reading::estimated("2026-02-25 08:25:00.000", 42)).unwrap();

        let rows = log.rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp, "2026-02-25 08:20:00.000");
        assert_eq!(rows[1].kind, Some(ReadingKind::Estimated));
        assert_eq!(log.last_count().unwrap(), 42);
        assert_eq!(log.last_real_count().unwrap(), 40);

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.ends_with("2026-02-25 08:25:00.000,42,Estimated\n"));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_creates_parent_dirs() {
        let mut dir = std::env::temp_dir();
        dir.push(format!("occupancy_test_dir_{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("stats.csv");
        let log = OccupancyLog::new(&path);
        log.append(&Reading::real("2026-02-25 08:20:00.000", 1)).unwrap();
        assert!(path.exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_reads_two_column_layout() {
        let path = temp_path();
        fs::write(
            &path,
            "Timestamp, Occupancy\n2026-02-25 08:20:00.000, 55\n2026-02-25 08:25:00.000, 57\n",
        )
        .unwrap();
        let log = OccupancyLog::new(&path);
        let rows = log.rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].kind, None);
        assert_eq!(log.last_count().unwrap(), 57);
        assert_eq!(log.last_real_count().unwrap(), 0);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_bad_history_does_not_block_tail() {
        let path = temp_path();
        fs::write(
            &path,
            "Timestamp,Occupancy,Type\n\
             2026-02-25 08:05:00.000,60,Real\n\
             2026-02-25 08:10:00.000,37.0,Real\n\
             2026-02-25 08:12:00.000,,Estimated\n\
             2026-02-25 08:13:00.000,40,Guessed\n\
             2026-02-25 08:15:00.000,100,Estimated\n",
        )
        .unwrap();
        let log = OccupancyLog::new(&path);
        assert_eq!(log.last_count().unwrap(), 100);
        assert_eq!(log.last_real_count().unwrap(), 60);
        assert!(log.rows().is_err());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_garbage_occupancy_is_an_error() {
        let path = temp_path();
        fs::write(&path, "Timestamp,Occupancy,Type\n2026-02-25 08:20:00.000,lots,Real\n").unwrap();
        let err = OccupancyLog::new(&path).last_count().unwrap_err();
        assert!(matches!(err, TrackerError::InvalidRow(_)));
        fs::remove_file(&path).unwrap();
    }
}
