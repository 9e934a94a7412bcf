use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::SpeedError;

// ── Scenario ──────────────────────────────────────────────────────────────────

/// Processing mode under which a batch run executed.
///
/// The label strings are the ones written to (and accepted from) the
/// intermediate table; anything else is rejected as an unknown scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// The reference processing mode all others are measured against.
    Baseline,
    /// Exchange deduplication enabled.
    DedupExchanges,
    /// Exchange deduplication plus parallel portfolio processing.
    DedupParallel,
}

impl Scenario {
    /// All scenarios, in rollout order.
    pub const ALL: [Scenario; 3] = [
        Scenario::Baseline,
        Scenario::DedupExchanges,
        Scenario::DedupParallel,
    ];

    /// The table label for this scenario.
    pub fn label(&self) -> &'static str {
        match self {
            Scenario::Baseline => "baseline",
            Scenario::DedupExchanges => "dedup_exchanges",
            Scenario::DedupParallel => "dedup_parallel",
        }
    }

    /// Human-readable chart legend text.
    pub fn legend(&self) -> &'static str {
        match self {
            Scenario::Baseline => "Baseline",
            Scenario::DedupExchanges => "Dedup exchanges",
            Scenario::DedupParallel => "Dedup + parallel portfolios",
        }
    }

    /// Assign the scenario active on `date` from the rollout boundaries:
    /// exchange dedup went live on 2025-10-09, parallel portfolios on
    /// 2025-10-17.
    pub fn for_date(date: NaiveDate) -> Scenario {
        let key = (date.year(), date.month(), date.day());
        if key <= (2025, 10, 8) {
            Scenario::Baseline
        } else if key <= (2025, 10, 16) {
            Scenario::DedupExchanges
        } else {
            Scenario::DedupParallel
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Scenario {
    type Err = SpeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "baseline" => Ok(Scenario::Baseline),
            "dedup_exchanges" => Ok(Scenario::DedupExchanges),
            "dedup_parallel" => Ok(Scenario::DedupParallel),
            other => Err(SpeedError::UnknownScenario(other.to_string())),
        }
    }
}

// ── Records and derived points ────────────────────────────────────────────────

/// One day's total processing time under one scenario.
///
/// This is the row format of the intermediate `date;scenario;minutes` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    /// Calendar date the batch run finished.
    pub date: NaiveDate,
    /// Processing mode active that date.
    pub scenario: Scenario,
    /// Total duration in minutes; finite and non-negative.
    pub minutes: f64,
}

impl DailyRecord {
    pub fn new(date: NaiveDate, scenario: Scenario, minutes: f64) -> Self {
        Self {
            date,
            scenario,
            minutes,
        }
    }
}

/// Date-sorted per-scenario sequence of daily totals. Derived, not persisted.
#[derive(Debug, Clone)]
pub struct ScenarioSeries {
    pub scenario: Scenario,
    /// `(date, minutes)` pairs sorted ascending by date, one per date.
    pub points: Vec<(NaiveDate, f64)>,
}

/// Trailing-window mean of daily minutes ending at `date`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingPoint {
    pub date: NaiveDate,
    pub scenario: Scenario,
    pub mean_minutes: f64,
}

/// Baseline-relative speed-up on one date: baseline minutes divided by the
/// comparison scenario's minutes. Only exists when both records exist that
/// date and neither is zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccelerationPoint {
    pub date: NaiveDate,
    pub scenario: Scenario,
    /// `> 1.0` means the comparison scenario was faster than baseline.
    pub ratio: f64,
}

/// Mean of the daily acceleration ratios within one ISO calendar week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyAcceleration {
    /// ISO week-based year (may differ from the calendar year at boundaries).
    pub iso_year: i32,
    /// ISO week number, 1–53.
    pub iso_week: u32,
    pub scenario: Scenario,
    pub mean_ratio: f64,
}

impl WeeklyAcceleration {
    /// Axis label, e.g. `"2025-W42"`.
    pub fn week_label(&self) -> String {
        format!("{}-W{:02}", self.iso_year, self.iso_week)
    }
}

// ── RunSummary ────────────────────────────────────────────────────────────────

/// Accumulated counts of recoverable problems, reported at the end of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Raw rows seen across all inputs.
    pub rows_read: usize,
    /// Rows that survived validation.
    pub rows_kept: usize,
    /// Rows dropped because a field failed to parse.
    pub rows_malformed: usize,
    /// Rows dropped because the scenario label was not recognised.
    pub rows_unknown_scenario: usize,
    /// Charts successfully written.
    pub charts_rendered: usize,
    /// Charts that failed to render (run continues, exit code is non-zero).
    pub charts_failed: usize,
}

impl RunSummary {
    /// Total rows dropped for any recoverable reason.
    pub fn rows_skipped(&self) -> usize {
        self.rows_malformed + self.rows_unknown_scenario
    }

    /// Whether the process exit code should be non-zero.
    pub fn has_failures(&self) -> bool {
        self.charts_failed > 0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    // ── Scenario ──────────────────────────────────────────────────────────────

    #[test]
    fn test_scenario_label_round_trip() {
        for scenario in Scenario::ALL {
            let parsed: Scenario = scenario.label().parse().expect("label parses");
            assert_eq!(parsed, scenario);
        }
    }

    #[test]
    fn test_scenario_parse_trims_whitespace() {
        let parsed: Scenario = " baseline ".parse().expect("parses");
        assert_eq!(parsed, Scenario::Baseline);
    }

    #[test]
    fn test_scenario_parse_unknown_label() {
        let err = "turbo".parse::<Scenario>().unwrap_err();
        assert!(matches!(err, SpeedError::UnknownScenario(s) if s == "turbo"));
    }

    #[test]
    fn test_scenario_for_date_boundaries() {
        assert_eq!(Scenario::for_date(date(2025, 7, 31)), Scenario::Baseline);
        assert_eq!(Scenario::for_date(date(2025, 10, 8)), Scenario::Baseline);
        assert_eq!(
            Scenario::for_date(date(2025, 10, 9)),
            Scenario::DedupExchanges
        );
        assert_eq!(
            Scenario::for_date(date(2025, 10, 16)),
            Scenario::DedupExchanges
        );
        assert_eq!(
            Scenario::for_date(date(2025, 10, 17)),
            Scenario::DedupParallel
        );
        assert_eq!(
            Scenario::for_date(date(2026, 1, 1)),
            Scenario::DedupParallel
        );
    }

    // ── WeeklyAcceleration ────────────────────────────────────────────────────

    #[test]
    fn test_week_label_zero_padded() {
        let weekly = WeeklyAcceleration {
            iso_year: 2025,
            iso_week: 7,
            scenario: Scenario::DedupParallel,
            mean_ratio: 1.5,
        };
        assert_eq!(weekly.week_label(), "2025-W07");
    }

    // ── RunSummary ────────────────────────────────────────────────────────────

    #[test]
    fn test_run_summary_skipped_and_failures() {
        let summary = RunSummary {
            rows_read: 10,
            rows_kept: 7,
            rows_malformed: 2,
            rows_unknown_scenario: 1,
            charts_rendered: 3,
            charts_failed: 1,
        };
        assert_eq!(summary.rows_skipped(), 3);
        assert!(summary.has_failures());

        let clean = RunSummary::default();
        assert_eq!(clean.rows_skipped(), 0);
        assert!(!clean.has_failures());
    }

    #[test]
    fn test_run_summary_serializes_to_json() {
        let summary = RunSummary {
            rows_read: 5,
            rows_kept: 5,
            ..Default::default()
        };
        let json = serde_json::to_string(&summary).expect("serializes");
        assert!(json.contains("\"rows_read\":5"));
        assert!(json.contains("\"charts_failed\":0"));
    }
}
