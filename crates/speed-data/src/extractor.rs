//! HTML run-report extraction.
//!
//! The DU scheduler exports its run history as a saved HTML page. Each data
//! row of the report table carries a start timestamp, an end timestamp and a
//! duration in minutes. This module scans those rows with regexes, tolerates
//! malformed cells by skipping them, sums the durations per end date and
//! assigns the scenario active on each date.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use speed_core::models::{DailyRecord, Scenario};
use speed_core::{Result, SpeedError};
use tracing::{debug, info, warn};

use crate::table;

/// Timestamp format used by the exported report, e.g. `31.07.2025 21:14:03`.
const REPORT_TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Column positions inside a report data row.
const END_TIME_CELL: usize = 1;
const MINUTES_CELL: usize = 4;

/// A data row must have at least this many cells to be considered at all.
const MIN_CELLS: usize = 5;

// ── ExtractStats ──────────────────────────────────────────────────────────────

/// Accounting for one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractStats {
    /// Report files processed.
    pub files_scanned: usize,
    /// Candidate data rows seen across all files.
    pub rows_scanned: usize,
    /// Candidate rows dropped because a timestamp or duration failed to parse.
    pub rows_skipped: usize,
    /// Distinct dates written to the table.
    pub days: usize,
}

// ── Discovery ─────────────────────────────────────────────────────────────────

/// Find all `.htm` / `.html` files recursively under `path`, sorted by path.
pub fn find_html_reports(path: &Path) -> Vec<PathBuf> {
    if !path.exists() {
        warn!("Report path does not exist: {}", path.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("htm") || ext.eq_ignore_ascii_case("html"))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Scan a report document for data rows.
///
/// Returns raw `(end_date, minutes)` pairs plus `(rows_scanned,
/// rows_skipped)` counts. Rows with fewer than [`MIN_CELLS`] `<td>` cells are
/// layout or header rows and are ignored silently; rows that look like data
/// but fail to parse are counted as skipped.
pub fn parse_report(html: &str) -> (Vec<(NaiveDate, f64)>, usize, usize) {
    let row_re = Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").expect("regex is valid");
    let cell_re = Regex::new(r"(?is)<td[^>]*>(.*?)</td>").expect("regex is valid");
    let tag_re = Regex::new(r"(?s)<[^>]*>").expect("regex is valid");

    let mut raw: Vec<(NaiveDate, f64)> = Vec::new();
    let mut scanned = 0usize;
    let mut skipped = 0usize;

    for row in row_re.captures_iter(html) {
        let cells: Vec<String> = cell_re
            .captures_iter(&row[1])
            .map(|cell| clean_cell(&tag_re.replace_all(&cell[1], " ")))
            .collect();

        if cells.len() < MIN_CELLS {
            continue;
        }
        scanned += 1;

        let end = match NaiveDateTime::parse_from_str(&cells[END_TIME_CELL], REPORT_TIMESTAMP_FORMAT)
        {
            Ok(ts) => ts.date(),
            Err(_) => {
                debug!("Skipping row with unparseable end time: {:?}", cells[END_TIME_CELL]);
                skipped += 1;
                continue;
            }
        };

        let minutes = match parse_minutes(&cells[MINUTES_CELL]) {
            Some(m) => m,
            None => {
                debug!("Skipping row with unparseable duration: {:?}", cells[MINUTES_CELL]);
                skipped += 1;
                continue;
            }
        };

        raw.push((end, minutes));
    }

    (raw, scanned, skipped)
}

/// Strip entities and collapse whitespace in a table cell.
fn clean_cell(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a duration cell into minutes.
///
/// The report is locale-formatted: spaces (or NBSP, already normalised away)
/// as thousands separators and either `.` or `,` as the decimal separator.
/// Returns `None` for anything non-numeric, negative or non-finite.
fn parse_minutes(text: &str) -> Option<f64> {
    let normalised: String = text.replace(' ', "").replace(',', ".");
    let minutes: f64 = normalised.parse().ok()?;
    if minutes.is_finite() && minutes >= 0.0 {
        Some(minutes)
    } else {
        None
    }
}

/// Sum raw run durations per end date and assign each date its scenario.
pub fn daily_totals(raw: &[(NaiveDate, f64)]) -> Vec<DailyRecord> {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for &(date, minutes) in raw {
        *totals.entry(date).or_insert(0.0) += minutes;
    }

    totals
        .into_iter()
        .map(|(date, minutes)| DailyRecord::new(date, Scenario::for_date(date), minutes))
        .collect()
}

// ── Stage entry point ─────────────────────────────────────────────────────────

/// Run the extraction stage: parse `input` (a report file, or a directory
/// scanned recursively) and write the normalized table to `out_csv`.
///
/// Fatal when the input is missing, when a directory contains no reports, or
/// when no row survives parsing — in which case nothing is written, so a
/// failed run leaves no partial table behind.
pub fn run_extract(input: &Path, out_csv: &Path) -> Result<ExtractStats> {
    if !input.exists() {
        return Err(SpeedError::MissingInput(input.to_path_buf()));
    }

    let files = if input.is_dir() {
        let found = find_html_reports(input);
        if found.is_empty() {
            return Err(SpeedError::NoReports(input.to_path_buf()));
        }
        found
    } else {
        vec![input.to_path_buf()]
    };

    let mut raw: Vec<(NaiveDate, f64)> = Vec::new();
    let mut stats = ExtractStats::default();

    for file in &files {
        let html = std::fs::read_to_string(file).map_err(|source| SpeedError::FileRead {
            path: file.clone(),
            source,
        })?;
        let (rows, scanned, skipped) = parse_report(&html);

        debug!(
            "Report {}: {} rows scanned, {} skipped",
            file.display(),
            scanned,
            skipped
        );

        raw.extend(rows);
        stats.files_scanned += 1;
        stats.rows_scanned += scanned;
        stats.rows_skipped += skipped;
    }

    let records = daily_totals(&raw);
    if records.is_empty() {
        return Err(SpeedError::NoValidRows(input.to_path_buf()));
    }
    stats.days = records.len();

    table::write_table(out_csv, &records)?;

    for scenario in Scenario::ALL {
        let days: Vec<&DailyRecord> =
            records.iter().filter(|r| r.scenario == scenario).collect();
        if days.is_empty() {
            continue;
        }
        let mean = days.iter().map(|r| r.minutes).sum::<f64>() / days.len() as f64;
        info!(
            "{}: {} days, mean {:.1} min/day",
            scenario.legend(),
            days.len(),
            mean
        );
    }
    info!(
        "Extracted {} days from {} report(s) into {}",
        stats.days,
        stats.files_scanned,
        out_csv.display()
    );

    Ok(stats)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
