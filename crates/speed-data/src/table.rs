//! The intermediate `date;scenario;minutes` table.
//!
//! Written by the extractor and read back by the aggregator. The write path
//! serializes [`DailyRecord`]s directly; the read path validates every field
//! by hand so that malformed rows can be skipped (and classified) instead of
//! failing the run.

use std::path::Path;

use chrono::NaiveDate;
use speed_core::models::{DailyRecord, Scenario};
use speed_core::{Result, SpeedError};
use tracing::{debug, warn};

/// Field delimiter of the intermediate table.
const DELIMITER: u8 = b';';

// ── TableStats ────────────────────────────────────────────────────────────────

/// Per-read row accounting, folded into the run summary by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableStats {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub rows_malformed: usize,
    pub rows_unknown_scenario: usize,
}

// ── Write ─────────────────────────────────────────────────────────────────────

/// Write `records` to `path` as a `;`-delimited UTF-8 table with the header
/// `date;scenario;minutes`, creating parent directories as needed. The file
/// is overwritten, not versioned.
pub fn write_table(path: &Path, records: &[DailyRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_path(path)?;

    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    debug!("Wrote {} rows to {}", records.len(), path.display());
    Ok(())
}

// ── Read ──────────────────────────────────────────────────────────────────────

/// Read and validate the table at `path`.
///
/// Fatal errors: the file is missing, or no row survives validation.
/// Everything else is recoverable: a row whose date, scenario or minutes
/// field fails validation is dropped with a warning and counted in the
/// returned [`TableStats`].
pub fn read_table(path: &Path) -> Result<(Vec<DailyRecord>, TableStats)> {
    if !path.exists() {
        return Err(SpeedError::MissingInput(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .flexible(true)
        .from_path(path)?;

    let mut records: Vec<DailyRecord> = Vec::new();
    let mut stats = TableStats::default();

    for (idx, row) in reader.records().enumerate() {
        // Header is line 1; the first data row is line 2.
        let line = idx + 2;
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping unreadable row at line {}: {}", line, e);
                stats.rows_read += 1;
                stats.rows_malformed += 1;
                continue;
            }
        };
        stats.rows_read += 1;

        match parse_row(&row, line) {
            Ok(record) => {
                stats.rows_kept += 1;
                records.push(record);
            }
            Err(err @ SpeedError::UnknownScenario(_)) => {
                warn!("Skipping row at line {}: {}", line, err);
                stats.rows_unknown_scenario += 1;
            }
            Err(err) => {
                warn!("Skipping row at line {}: {}", line, err);
                stats.rows_malformed += 1;
            }
        }
    }

    if records.is_empty() {
        return Err(SpeedError::NoValidRows(path.to_path_buf()));
    }

    debug!(
        "Table {}: {} read, {} kept, {} skipped",
        path.display(),
        stats.rows_read,
        stats.rows_kept,
        stats.rows_malformed + stats.rows_unknown_scenario,
    );

    Ok((records, stats))
}

/// Validate one delimited row into a [`DailyRecord`].
fn parse_row(row: &csv::StringRecord, line: usize) -> Result<DailyRecord> {
    let malformed = |reason: &str| SpeedError::MalformedRow {
        line,
        reason: reason.to_string(),
    };

    if row.len() < 3 {
        return Err(malformed("expected 3 fields"));
    }

    let date = NaiveDate::parse_from_str(row[0].trim(), "%Y-%m-%d")
        .map_err(|_| malformed("date is not YYYY-MM-DD"))?;

    let scenario: Scenario = row[1].parse()?;

    let minutes: f64 = row[2]
        .trim()
        .parse()
        .map_err(|_| malformed("minutes is not a number"))?;
    if !minutes.is_finite() || minutes < 0.0 {
        return Err(malformed("minutes is negative or not finite"));
    }

    Ok(DailyRecord::new(date, scenario, minutes))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
