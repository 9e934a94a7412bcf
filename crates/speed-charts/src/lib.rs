//! Chart layer for the DU speed pipeline.
//!
//! Renders the aggregated series to PNG files under a figures directory.
//! Every chart runs inside a panic guard: a chart that fails (or whose
//! backend panics) is logged and counted, and the remaining charts still
//! render. Charts with no data to draw are skipped silently.

pub mod charts;

use std::panic;
use std::path::Path;

use speed_core::models::RunSummary;
use speed_core::{Result, SpeedError};
use speed_data::analysis::Analysis;
use tracing::{debug, info, warn};

/// Stable output file names, overwritten on every run.
pub const DAILY_BARS_FILE: &str = "01_daily_bars.png";
pub const ROLLING_AVG_FILE: &str = "02_rolling_avg.png";
pub const ACCELERATION_FILE: &str = "03_acceleration.png";
pub const WEEKLY_FILE: &str = "04_weekly_acceleration.png";

/// Render all charts for `analysis` into `figures_dir`.
///
/// Chart outcomes are accumulated into `summary`: `charts_rendered` for
/// written files, `charts_failed` for render errors. The function itself
/// only fails when the figures directory cannot be created.
pub fn render_all(analysis: &Analysis, figures_dir: &Path, summary: &mut RunSummary) -> Result<()> {
    std::fs::create_dir_all(figures_dir)?;

    let window = analysis.metadata.window_days;
    let mut tally = |name: &str, outcome: Result<bool>, path: &Path| match outcome {
        Ok(true) => {
            info!("Wrote {}", path.display());
            summary.charts_rendered += 1;
        }
        Ok(false) => {
            debug!("No data for {}; skipped", name);
        }
        Err(e) => {
            warn!("{}", e);
            summary.charts_failed += 1;
        }
    };

    let path = figures_dir.join(DAILY_BARS_FILE);
    let outcome = render_guard(DAILY_BARS_FILE, || {
        charts::daily_bars(&analysis.series, &path)
    });
    tally(DAILY_BARS_FILE, outcome, &path);

    let path = figures_dir.join(ROLLING_AVG_FILE);
    let outcome = render_guard(ROLLING_AVG_FILE, || {
        charts::rolling_averages(&analysis.rolling, window, &path)
    });
    tally(ROLLING_AVG_FILE, outcome, &path);

    let path = figures_dir.join(ACCELERATION_FILE);
    let outcome = render_guard(ACCELERATION_FILE, || {
        charts::acceleration_chart(&analysis.acceleration, &path)
    });
    tally(ACCELERATION_FILE, outcome, &path);

    let path = figures_dir.join(WEEKLY_FILE);
    let outcome = render_guard(WEEKLY_FILE, || charts::weekly_chart(&analysis.weekly, &path));
    tally(WEEKLY_FILE, outcome, &path);

    Ok(())
}

/// Run one chart renderer, converting backend panics into a recoverable
/// [`SpeedError::ChartRender`] so a single bad chart never aborts the run.
fn render_guard(chart: &str, render: impl FnOnce() -> Result<bool>) -> Result<bool> {
    panic::catch_unwind(panic::AssertUnwindSafe(render)).unwrap_or_else(|_| {
        Err(SpeedError::ChartRender {
            chart: chart.to_string(),
            reason: "rendering backend panicked".to_string(),
        })
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
