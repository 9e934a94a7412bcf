//! Individual chart renderers.
//!
//! Each function draws one PNG and returns `Ok(true)` when a file was
//! written, `Ok(false)` when there was nothing to draw. The drawing style
//! (margins, label areas, sans-serif mesh labels, legend boxes) is uniform
//! across charts.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{Duration, NaiveDate};
use plotters::prelude::*;
use speed_core::models::{
    AccelerationPoint, RollingPoint, Scenario, ScenarioSeries, WeeklyAcceleration,
};
use speed_core::{Result, SpeedError};

/// Canvas size of every chart.
const CHART_SIZE: (u32, u32) = (1280, 720);

/// Map any displayable backend error into a recoverable chart error.
fn chart_err<E: std::fmt::Display>(chart: &'static str) -> impl Fn(E) -> SpeedError {
    move |e| SpeedError::ChartRender {
        chart: chart.to_string(),
        reason: e.to_string(),
    }
}

/// Fixed color per scenario across all charts.
fn scenario_color(scenario: Scenario) -> RGBColor {
    match scenario {
        Scenario::Baseline => RGBColor(90, 90, 90),
        Scenario::DedupExchanges => RGBColor(30, 144, 255),
        Scenario::DedupParallel => RGBColor(34, 139, 34),
    }
}

/// Inclusive date bounds over an iterator, widened so the x axis never
/// collapses to a single point.
fn date_bounds(dates: impl Iterator<Item = NaiveDate>) -> Option<(NaiveDate, NaiveDate)> {
    let mut min: Option<NaiveDate> = None;
    let mut max: Option<NaiveDate> = None;
    for d in dates {
        min = Some(min.map_or(d, |m| m.min(d)));
        max = Some(max.map_or(d, |m| m.max(d)));
    }
    let (lo, mut hi) = (min?, max?);
    if hi == lo {
        hi = hi + Duration::days(1);
    }
    Some((lo, hi))
}

// ── Daily bars ────────────────────────────────────────────────────────────────

/// One bar per date and scenario, raw daily minutes.
pub fn daily_bars(series: &[ScenarioSeries], path: &Path) -> Result<bool> {
    let err = chart_err("daily_bars");
    let Some((lo, hi)) = date_bounds(series.iter().flat_map(|s| s.points.iter().map(|p| p.0)))
    else {
        return Ok(false);
    };
    let y_max = series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.1))
        .fold(1.0_f64, f64::max);

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(&err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Daily processing time by scenario", ("sans-serif", 24))
        .margin(25)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(lo..hi + Duration::days(1), 0.0..y_max * 1.1)
        .map_err(&err)?;

    chart
        .configure_mesh()
        .x_label_formatter(&|d: &NaiveDate| d.format("%m-%d").to_string())
        .y_desc("Minutes")
        .label_style(("sans-serif", 18))
        .draw()
        .map_err(&err)?;

    for s in series {
        let color = scenario_color(s.scenario);
        chart
            .draw_series(s.points.iter().map(|&(d, v)| {
                Rectangle::new([(d, 0.0), (d + Duration::days(1), v)], color.mix(0.6).filled())
            }))
            .map_err(&err)?
            .label(s.scenario.legend())
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.mix(0.6).filled())
            });
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(&err)?;

    root.present().map_err(&err)?;
    Ok(true)
}

// ── Rolling averages ──────────────────────────────────────────────────────────

/// Trailing rolling-mean lines, one per scenario.
pub fn rolling_averages(rolling: &[RollingPoint], window: u32, path: &Path) -> Result<bool> {
    let err = chart_err("rolling_avg");
    let Some((lo, hi)) = date_bounds(rolling.iter().map(|p| p.date)) else {
        return Ok(false);
    };
    let y_max = rolling
        .iter()
        .map(|p| p.mean_minutes)
        .fold(1.0_f64, f64::max);

    let mut by_scenario: BTreeMap<Scenario, Vec<(NaiveDate, f64)>> = BTreeMap::new();
    for p in rolling {
        by_scenario
            .entry(p.scenario)
            .or_default()
            .push((p.date, p.mean_minutes));
    }

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(&err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("{window}-day rolling average by scenario"),
            ("sans-serif", 24),
        )
        .margin(25)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(lo..hi, 0.0..y_max * 1.1)
        .map_err(&err)?;

    chart
        .configure_mesh()
        .x_label_formatter(&|d: &NaiveDate| d.format("%m-%d").to_string())
        .y_desc("Minutes (rolling avg)")
        .label_style(("sans-serif", 18))
        .draw()
        .map_err(&err)?;

    for (scenario, points) in &by_scenario {
        let color = scenario_color(*scenario);
        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))
            .map_err(&err)?
            .label(format!("{} (MA{})", scenario.legend(), window))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 30, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(&err)?;

    root.present().map_err(&err)?;
    Ok(true)
}

// ── Acceleration ──────────────────────────────────────────────────────────────

/// Daily acceleration vs. baseline, with a reference line at 1.0×.
pub fn acceleration_chart(points: &[AccelerationPoint], path: &Path) -> Result<bool> {
    let err = chart_err("acceleration");
    let Some((lo, hi)) = date_bounds(points.iter().map(|p| p.date)) else {
        return Ok(false);
    };
    let y_max = points.iter().map(|p| p.ratio).fold(1.0_f64, f64::max);

    let mut by_scenario: BTreeMap<Scenario, Vec<(NaiveDate, f64)>> = BTreeMap::new();
    for p in points {
        by_scenario
            .entry(p.scenario)
            .or_default()
            .push((p.date, p.ratio));
    }

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(&err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Acceleration relative to baseline", ("sans-serif", 24))
        .margin(25)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(lo..hi, 0.0..y_max * 1.1)
        .map_err(&err)?;

    chart
        .configure_mesh()
        .x_label_formatter(&|d: &NaiveDate| d.format("%m-%d").to_string())
        .y_desc("Acceleration vs baseline (x)")
        .label_style(("sans-serif", 18))
        .draw()
        .map_err(&err)?;

    // Parity reference: above this line the scenario beats baseline.
    chart
        .draw_series(LineSeries::new(
            [(lo, 1.0), (hi, 1.0)],
            RGBColor(160, 160, 160),
        ))
        .map_err(&err)?;

    for (scenario, series) in &by_scenario {
        let color = scenario_color(*scenario);
        chart
            .draw_series(LineSeries::new(series.iter().copied(), color.stroke_width(2)))
            .map_err(&err)?
            .label(scenario.legend())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 30, y)], color));
        chart
            .draw_series(
                series
                    .iter()
                    .map(|&(d, v)| Circle::new((d, v), 3, color.filled())),
            )
            .map_err(&err)?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(&err)?;

    root.present().map_err(&err)?;
    Ok(true)
}

// ── Weekly acceleration ───────────────────────────────────────────────────────

/// Mean weekly acceleration per scenario over an ISO-week axis.
pub fn weekly_chart(weekly: &[WeeklyAcceleration], path: &Path) -> Result<bool> {
    let err = chart_err("weekly_acceleration");
    if weekly.is_empty() {
        return Ok(false);
    }

    // Distinct weeks in order; the x axis is the week index.
    let mut labels: Vec<String> = Vec::new();
    for w in weekly {
        let label = w.week_label();
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    let week_index = |w: &WeeklyAcceleration| -> f64 {
        let label = w.week_label();
        labels.iter().position(|l| *l == label).unwrap_or(0) as f64
    };

    let y_max = weekly.iter().map(|w| w.mean_ratio).fold(1.0_f64, f64::max);
    let x_max = (labels.len() - 1).max(1) as f64;

    let mut by_scenario: BTreeMap<Scenario, Vec<(f64, f64)>> = BTreeMap::new();
    for w in weekly {
        by_scenario
            .entry(w.scenario)
            .or_default()
            .push((week_index(w), w.mean_ratio));
    }

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(&err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Weekly average acceleration vs baseline", ("sans-serif", 24))
        .margin(25)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(-0.5..x_max + 0.5, 0.0..y_max * 1.1)
        .map_err(&err)?;

    let week_labels = labels.clone();
    chart
        .configure_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&move |x: &f64| {
            let idx = x.round();
            if (*x - idx).abs() > 0.01 || idx < 0.0 {
                return String::new();
            }
            week_labels
                .get(idx as usize)
                .cloned()
                .unwrap_or_default()
        })
        .y_desc("Avg weekly acceleration (x)")
        .label_style(("sans-serif", 18))
        .draw()
        .map_err(&err)?;

    chart
        .draw_series(LineSeries::new(
            [(-0.5, 1.0), (x_max + 0.5, 1.0)],
            RGBColor(160, 160, 160),
        ))
        .map_err(&err)?;

    for (scenario, series) in &by_scenario {
        let color = scenario_color(*scenario);
        chart
            .draw_series(LineSeries::new(series.iter().copied(), color.stroke_width(2)))
            .map_err(&err)?
            .label(scenario.legend())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 30, y)], color));
        chart
            .draw_series(
                series
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 4, color.filled())),
            )
            .map_err(&err)?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(&err)?;

    root.present().map_err(&err)?;
    Ok(true)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
