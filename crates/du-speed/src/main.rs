mod bootstrap;

use std::process::ExitCode;

use speed_core::models::RunSummary;
use speed_core::settings::Settings;
use speed_data::{analysis, extractor, table};

fn main() -> ExitCode {
    let settings = Settings::load_with_last_used();

    if let Err(e) = bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref()) {
        eprintln!("Failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!("du-speed v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Stage: {}, data: {}, figures: {}, window: {} days",
        settings.stage,
        settings.data.display(),
        settings.figures.display(),
        settings.window
    );

    match run(&settings) {
        Ok(summary) => {
            match serde_json::to_string_pretty(&summary) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::warn!("Failed to serialize run summary: {}", e),
            }
            if summary.rows_skipped() > 0 {
                tracing::warn!(
                    "{} row(s) skipped ({} malformed, {} unknown scenario)",
                    summary.rows_skipped(),
                    summary.rows_malformed,
                    summary.rows_unknown_scenario
                );
            }
            if summary.has_failures() {
                tracing::error!("{} chart(s) failed to render", summary.charts_failed);
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Run the selected stage(s), accumulating recoverable-error counts.
///
/// Skipped rows never fail the run; the only fatal paths are a missing
/// input and an input with no valid rows at all.
fn run(settings: &Settings) -> speed_core::Result<RunSummary> {
    let mut summary = RunSummary::default();

    if matches!(settings.stage.as_str(), "extract" | "all") {
        let stats = extractor::run_extract(&settings.input, &settings.data)?;
        summary.rows_read += stats.rows_scanned;
        summary.rows_kept += stats.rows_scanned - stats.rows_skipped;
        summary.rows_malformed += stats.rows_skipped;
    }

    if matches!(settings.stage.as_str(), "analyze" | "all") {
        let (records, stats) = table::read_table(&settings.data)?;
        summary.rows_read += stats.rows_read;
        summary.rows_kept += stats.rows_kept;
        summary.rows_malformed += stats.rows_malformed;
        summary.rows_unknown_scenario += stats.rows_unknown_scenario;

        let analysis = analysis::analyze(&records, settings.window);
        speed_charts::render_all(&analysis, &settings.figures, &mut summary)?;
    }

    Ok(summary)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn settings_in(dir: &Path, stage: &str) -> Settings {
        use clap::Parser;
        Settings::parse_from([
            "du-speed",
            "--stage",
            stage,
            "--input",
            dir.join("report.htm").to_str().unwrap(),
            "--data",
            dir.join("data/du_tasks_times.csv").to_str().unwrap(),
            "--figures",
            dir.join("figures").to_str().unwrap(),
        ])
    }

    fn write_file(path: &PathBuf, content: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut file = std::fs::File::create(path).unwrap();
        write!(file, "{}", content).unwrap();
    }

    #[test]
    fn test_run_extract_missing_input_is_fatal() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(dir.path(), "extract");

        let err = run(&settings).unwrap_err();
        assert!(err.is_fatal());
        assert!(!dir.path().join("data/du_tasks_times.csv").exists());
    }

    #[test]
    fn test_run_analyze_missing_table_is_fatal() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(dir.path(), "analyze");

        let err = run(&settings).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_run_analyze_counts_skipped_rows() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(dir.path(), "analyze");
        write_file(
            &settings.data,
            "date;scenario;minutes\n\
             2025-10-09;baseline;180\n\
             2025-10-09;dedup_exchanges;90\n\
             2025-10-10;baseline;abc\n\
             2025-10-10;turbo;40\n",
        );

        let summary = run(&settings).expect("run succeeds despite skipped rows");

        assert_eq!(summary.rows_read, 4);
        assert_eq!(summary.rows_kept, 2);
        assert_eq!(summary.rows_malformed, 1);
        assert_eq!(summary.rows_unknown_scenario, 1);
        // Skipped rows are recoverable: no failure recorded for them.
        assert_eq!(summary.rows_skipped(), 2);
    }

    #[test]
    fn test_run_all_extracts_then_analyzes() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(dir.path(), "all");
        write_file(
            &settings.input,
            "<table>\
             <tr><td>09.10.2025 20:00:00</td><td>09.10.2025 23:00:00</td>\
             <td>No</td><td>Batch run</td><td>180</td><td></td><td></td></tr>\
             </table>",
        );

        let summary = run(&settings).expect("pipeline runs");

        assert!(settings.data.exists(), "intermediate table written");
        // One report row plus one table row pass through the two stages.
        assert_eq!(summary.rows_kept, 2);
        assert_eq!(summary.rows_malformed, 0);
    }
}
