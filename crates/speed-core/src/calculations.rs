//! Pure calculations over daily processing records.
//!
//! Everything here is deterministic and allocation-light: grouping into
//! per-scenario series, trailing rolling means, baseline-relative
//! acceleration ratios and ISO-week bucketing.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::{
    AccelerationPoint, DailyRecord, RollingPoint, Scenario, ScenarioSeries, WeeklyAcceleration,
};

// ── Grouping ──────────────────────────────────────────────────────────────────

/// Group records into date-sorted per-scenario series.
///
/// Duplicate `(date, scenario)` rows are summed; the extractor itself writes
/// one row per date, so summing keeps the two stages consistent when a table
/// was produced some other way.
pub fn group_by_scenario(records: &[DailyRecord]) -> Vec<ScenarioSeries> {
    let mut map: BTreeMap<Scenario, BTreeMap<NaiveDate, f64>> = BTreeMap::new();

    for record in records {
        *map.entry(record.scenario)
            .or_default()
            .entry(record.date)
            .or_insert(0.0) += record.minutes;
    }

    map.into_iter()
        .map(|(scenario, points)| ScenarioSeries {
            scenario,
            points: points.into_iter().collect(),
        })
        .collect()
}

// ── Rolling mean ──────────────────────────────────────────────────────────────

/// Trailing `window_days`-day mean of a series, one point per input date.
///
/// The window ends at each date (inclusive) and covers the preceding
/// `window_days - 1` calendar days. When fewer days of history exist the
/// mean is taken over the available prefix rather than being undefined, so
/// the first point always equals its own value.
pub fn rolling_mean(series: &ScenarioSeries, window_days: u32) -> Vec<RollingPoint> {
    let window = Duration::days(i64::from(window_days.max(1)) - 1);

    series
        .points
        .iter()
        .map(|&(date, _)| {
            let start = date - window;
            let (sum, count) = series
                .points
                .iter()
                .filter(|(d, _)| *d >= start && *d <= date)
                .fold((0.0, 0usize), |(s, c), (_, m)| (s + m, c + 1));
            RollingPoint {
                date,
                scenario: series.scenario,
                // count >= 1: the window always contains the point itself.
                mean_minutes: sum / count as f64,
            }
        })
        .collect()
}

// ── Acceleration ──────────────────────────────────────────────────────────────

/// Baseline-relative acceleration ratios, per date and comparison scenario.
///
/// For each non-baseline point the ratio is `baseline / comparison` on the
/// same date. Dates where the baseline has no record, or where either side
/// is zero, produce no point at all rather than an error or an infinity.
pub fn acceleration(series: &[ScenarioSeries]) -> Vec<AccelerationPoint> {
    let baseline: BTreeMap<NaiveDate, f64> = series
        .iter()
        .find(|s| s.scenario == Scenario::Baseline)
        .map(|s| s.points.iter().copied().collect())
        .unwrap_or_default();

    let mut points: Vec<AccelerationPoint> = Vec::new();
    for s in series.iter().filter(|s| s.scenario != Scenario::Baseline) {
        for &(date, minutes) in &s.points {
            let Some(&base) = baseline.get(&date) else {
                continue;
            };
            if base <= 0.0 || minutes <= 0.0 {
                continue;
            }
            points.push(AccelerationPoint {
                date,
                scenario: s.scenario,
                ratio: base / minutes,
            });
        }
    }

    points.sort_by_key(|p| (p.date, p.scenario));
    points
}

// ── Weekly bucketing ──────────────────────────────────────────────────────────

/// Mean of the daily acceleration ratios per ISO calendar week and scenario,
/// sorted by week then scenario.
pub fn weekly_acceleration(points: &[AccelerationPoint]) -> Vec<WeeklyAcceleration> {
    let mut buckets: BTreeMap<(i32, u32, Scenario), (f64, usize)> = BTreeMap::new();

    for point in points {
        let week = point.date.iso_week();
        let entry = buckets
            .entry((week.year(), week.week(), point.scenario))
            .or_insert((0.0, 0));
        entry.0 += point.ratio;
        entry.1 += 1;
    }

    buckets
        .into_iter()
        .map(|((iso_year, iso_week, scenario), (sum, count))| WeeklyAcceleration {
            iso_year,
            iso_week,
            scenario,
            mean_ratio: sum / count as f64,
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    fn record(y: i32, m: u32, d: u32, scenario: Scenario, minutes: f64) -> DailyRecord {
        DailyRecord::new(date(y, m, d), scenario, minutes)
    }

    // ── group_by_scenario ─────────────────────────────────────────────────────

    #[test]
    fn test_group_sorts_dates_within_scenario() {
        let records = vec![
            record(2025, 10, 20, Scenario::DedupParallel, 40.0),
            record(2025, 10, 18, Scenario::DedupParallel, 35.0),
            record(2025, 10, 19, Scenario::DedupParallel, 38.0),
        ];
        let series = group_by_scenario(&records);

        assert_eq!(series.len(), 1);
        let dates: Vec<NaiveDate> = series[0].points.iter().map(|(d, _)| *d).collect();
        assert_eq!(
            dates,
            vec![date(2025, 10, 18), date(2025, 10, 19), date(2025, 10, 20)]
        );
    }

    #[test]
    fn test_group_sums_duplicate_date_scenario_rows() {
        // Locked policy: duplicates are summed, not first-wins.
        let records = vec![
            record(2025, 7, 31, Scenario::Baseline, 100.0),
            record(2025, 7, 31, Scenario::Baseline, 82.0),
        ];
        let series = group_by_scenario(&records);

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].points, vec![(date(2025, 7, 31), 182.0)]);
    }

    #[test]
    fn test_group_separates_scenarios() {
        let records = vec![
            record(2025, 10, 8, Scenario::Baseline, 180.0),
            record(2025, 10, 9, Scenario::DedupExchanges, 90.0),
        ];
        let series = group_by_scenario(&records);

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].scenario, Scenario::Baseline);
        assert_eq!(series[1].scenario, Scenario::DedupExchanges);
    }

    #[test]
    fn test_group_empty_input() {
        assert!(group_by_scenario(&[]).is_empty());
    }

    // ── rolling_mean ──────────────────────────────────────────────────────────

    #[test]
    fn test_rolling_mean_window_larger_than_history() {
        // Three days of history, 7-day window: mean over the available prefix.
        let series = ScenarioSeries {
            scenario: Scenario::Baseline,
            points: vec![
                (date(2025, 8, 1), 100.0),
                (date(2025, 8, 2), 200.0),
                (date(2025, 8, 3), 300.0),
            ],
        };
        let rolling = rolling_mean(&series, 7);

        assert_eq!(rolling.len(), 3);
        assert!((rolling[0].mean_minutes - 100.0).abs() < 1e-9);
        assert!((rolling[1].mean_minutes - 150.0).abs() < 1e-9);
        assert!((rolling[2].mean_minutes - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_rolling_mean_drops_days_outside_window() {
        let series = ScenarioSeries {
            scenario: Scenario::Baseline,
            points: vec![
                (date(2025, 8, 1), 100.0),
                (date(2025, 8, 2), 200.0),
                (date(2025, 8, 3), 300.0),
                (date(2025, 8, 4), 400.0),
            ],
        };
        let rolling = rolling_mean(&series, 3);

        // Window ending 08-04 covers 08-02..=08-04.
        let last = rolling.last().expect("non-empty");
        assert!((last.mean_minutes - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_rolling_mean_respects_calendar_gaps() {
        // A gap in the dates: the window is calendar days, not row count.
        let series = ScenarioSeries {
            scenario: Scenario::DedupExchanges,
            points: vec![
                (date(2025, 10, 9), 100.0),
                (date(2025, 10, 15), 50.0),
                (date(2025, 10, 16), 70.0),
            ],
        };
        let rolling = rolling_mean(&series, 3);

        // Window ending 10-15 covers 10-13..=10-15: only the 10-15 point.
        assert!((rolling[1].mean_minutes - 50.0).abs() < 1e-9);
        // Window ending 10-16 covers 10-14..=10-16: the last two points.
        assert!((rolling[2].mean_minutes - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_rolling_mean_window_of_zero_treated_as_one() {
        let series = ScenarioSeries {
            scenario: Scenario::Baseline,
            points: vec![(date(2025, 8, 1), 100.0), (date(2025, 8, 2), 200.0)],
        };
        let rolling = rolling_mean(&series, 0);
        assert!((rolling[1].mean_minutes - 200.0).abs() < 1e-9);
    }

    // ── acceleration ──────────────────────────────────────────────────────────

    #[test]
    fn test_acceleration_basic_ratio() {
        let series = group_by_scenario(&[
            record(2025, 10, 9, Scenario::Baseline, 180.0),
            record(2025, 10, 9, Scenario::DedupExchanges, 90.0),
        ]);
        let points = acceleration(&series);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].scenario, Scenario::DedupExchanges);
        assert!((points[0].ratio - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_acceleration_undefined_on_disjoint_dates() {
        // Baseline 182 min on 2025-07-31, comparison 35 min on 2025-10-22:
        // no baseline record on 2025-10-22, so no point is produced.
        let series = group_by_scenario(&[
            record(2025, 7, 31, Scenario::Baseline, 182.0),
            record(2025, 10, 22, Scenario::DedupParallel, 35.0),
        ]);
        let points = acceleration(&series);
        assert!(points.is_empty());
    }

    #[test]
    fn test_acceleration_zero_baseline_is_omitted() {
        let series = group_by_scenario(&[
            record(2025, 10, 9, Scenario::Baseline, 0.0),
            record(2025, 10, 9, Scenario::DedupExchanges, 90.0),
        ]);
        let points = acceleration(&series);
        assert!(points.is_empty());
    }

    #[test]
    fn test_acceleration_zero_comparison_is_omitted() {
        let series = group_by_scenario(&[
            record(2025, 10, 9, Scenario::Baseline, 180.0),
            record(2025, 10, 9, Scenario::DedupExchanges, 0.0),
        ]);
        let points = acceleration(&series);
        assert!(points.is_empty());
    }

    #[test]
    fn test_acceleration_no_baseline_series_at_all() {
        let series = group_by_scenario(&[record(2025, 10, 22, Scenario::DedupParallel, 35.0)]);
        assert!(acceleration(&series).is_empty());
    }

    #[test]
    fn test_acceleration_sorted_by_date() {
        let series = group_by_scenario(&[
            record(2025, 10, 10, Scenario::Baseline, 100.0),
            record(2025, 10, 9, Scenario::Baseline, 100.0),
            record(2025, 10, 10, Scenario::DedupExchanges, 50.0),
            record(2025, 10, 9, Scenario::DedupExchanges, 25.0),
        ]);
        let points = acceleration(&series);

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, date(2025, 10, 9));
        assert!((points[0].ratio - 4.0).abs() < 1e-9);
        assert_eq!(points[1].date, date(2025, 10, 10));
        assert!((points[1].ratio - 2.0).abs() < 1e-9);
    }

    // ── weekly_acceleration ───────────────────────────────────────────────────

    #[test]
    fn test_weekly_means_daily_ratios() {
        // 2025-10-13..19 is ISO week 42.
        let points = vec![
            AccelerationPoint {
                date: date(2025, 10, 13),
                scenario: Scenario::DedupExchanges,
                ratio: 2.0,
            },
            AccelerationPoint {
                date: date(2025, 10, 15),
                scenario: Scenario::DedupExchanges,
                ratio: 4.0,
            },
        ];
        let weekly = weekly_acceleration(&points);

        assert_eq!(weekly.len(), 1);
        assert_eq!(weekly[0].iso_week, 42);
        assert_eq!(weekly[0].iso_year, 2025);
        assert!((weekly[0].mean_ratio - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_weekly_splits_weeks_and_scenarios() {
        let points = vec![
            AccelerationPoint {
                date: date(2025, 10, 16),
                scenario: Scenario::DedupExchanges,
                ratio: 2.0,
            },
            // Next ISO week.
            AccelerationPoint {
                date: date(2025, 10, 20),
                scenario: Scenario::DedupParallel,
                ratio: 5.0,
            },
        ];
        let weekly = weekly_acceleration(&points);

        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly[0].iso_week, 42);
        assert_eq!(weekly[0].scenario, Scenario::DedupExchanges);
        assert_eq!(weekly[1].iso_week, 43);
        assert_eq!(weekly[1].scenario, Scenario::DedupParallel);
    }

    #[test]
    fn test_weekly_iso_year_boundary() {
        // 2024-12-30 falls in ISO week 1 of 2025.
        let points = vec![AccelerationPoint {
            date: date(2024, 12, 30),
            scenario: Scenario::DedupParallel,
            ratio: 1.5,
        }];
        let weekly = weekly_acceleration(&points);

        assert_eq!(weekly[0].iso_year, 2025);
        assert_eq!(weekly[0].iso_week, 1);
    }

    #[test]
    fn test_weekly_empty_input() {
        assert!(weekly_acceleration(&[]).is_empty());
    }
}
