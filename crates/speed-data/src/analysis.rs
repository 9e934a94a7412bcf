//! The aggregation stage.
//!
//! Takes validated daily records and derives everything the reporter needs:
//! per-scenario series, trailing rolling means, baseline-relative
//! acceleration and ISO-week means of the daily ratios.

use chrono::Utc;
use speed_core::calculations::{
    acceleration, group_by_scenario, rolling_mean, weekly_acceleration,
};
use speed_core::models::{
    AccelerationPoint, DailyRecord, RollingPoint, ScenarioSeries, WeeklyAcceleration,
};

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the aggregates.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AnalysisMetadata {
    /// ISO-8601 timestamp when this analysis was generated.
    pub generated_at: String,
    /// Number of daily records that went in.
    pub records_processed: usize,
    /// Number of distinct scenarios seen.
    pub scenarios: usize,
    /// Rolling-mean window in days.
    pub window_days: u32,
}

/// The complete output of [`analyze`], consumed by the chart layer.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Date-sorted daily series per scenario.
    pub series: Vec<ScenarioSeries>,
    /// Trailing rolling means, flat across scenarios.
    pub rolling: Vec<RollingPoint>,
    /// Per-date acceleration ratios vs. the baseline scenario.
    pub acceleration: Vec<AccelerationPoint>,
    /// ISO-week means of the daily ratios.
    pub weekly: Vec<WeeklyAcceleration>,
    /// Metadata about this analysis run.
    pub metadata: AnalysisMetadata,
}

// ── Public function ───────────────────────────────────────────────────────────

/// Run the aggregation stage over validated records.
///
/// 1. Group into per-scenario, date-sorted series (duplicates summed).
/// 2. Compute the trailing `window`-day rolling mean per scenario.
/// 3. Compute per-date acceleration vs. baseline.
/// 4. Bucket the daily ratios into ISO-week means.
///
/// Never fails: an input with no baseline simply yields empty acceleration
/// and weekly series.
pub fn analyze(records: &[DailyRecord], window: u32) -> Analysis {
    let series = group_by_scenario(records);

    let rolling: Vec<RollingPoint> = series
        .iter()
        .flat_map(|s| rolling_mean(s, window))
        .collect();

    let accel = acceleration(&series);
    let weekly = weekly_acceleration(&accel);

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        records_processed: records.len(),
        scenarios: series.len(),
        window_days: window,
    };

    Analysis {
        series,
        rolling,
        acceleration: accel,
        weekly,
        metadata,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
