/// PNG time-series rendering via plotters
use std::error::Error;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use time::{Date, OffsetDateTime};

use super::{DayStats, SeriesStats};
use crate::storage::LogRow;

/// Matches the 15x6 inch figure of the previous tooling at 100 dpi.
const FIGURE_SIZE: (u32, u32) = (1500, 600);

/// Render the four standard charts and return their paths.
///
/// Two raw time series (specific gravity and °C) and two per-day aggregate
/// charts with min/mean/median/max series.
pub fn render_all(
    rows: &[LogRow],
    days: &[DayStats],
    out_dir: &Path,
) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let gravity_points: Vec<(f64, f64)> = rows
        .iter()
        .filter_map(|r| r.gravity.map(|v| (r.epoch as f64, v)))
        .collect();
    let celsius_points: Vec<(f64, f64)> = rows
        .iter()
        .filter_map(|r| r.celsius.map(|v| (r.epoch as f64, v)))
        .collect();

    let files = vec![
        out_dir.join("density.png"),
        out_dir.join("temperature.png"),
        out_dir.join("density_date.png"),
        out_dir.join("temperature_date.png"),
    ];

    line_chart(&files[0], &gravity_points, "specific gravity")?;
    line_chart(&files[1], &celsius_points, "temperature (°C)")?;
    day_chart(&files[2], days, |d| d.gravity.as_ref(), "specific gravity by day")?;
    day_chart(&files[3], days, |d| d.celsius.as_ref(), "temperature (°C) by day")?;

    Ok(files)
}

fn bounds(points: &[(f64, f64)]) -> Option<((f64, f64), (f64, f64))> {
    if points.is_empty() {
        return None;
    }
    let mut x = (f64::INFINITY, f64::NEG_INFINITY);
    let mut y = (f64::INFINITY, f64::NEG_INFINITY);
    for &(px, py) in points {
        x = (x.0.min(px), x.1.max(px));
        y = (y.0.min(py), y.1.max(py));
    }
    Some((x, y))
}

fn padded(range: (f64, f64), fallback: f64) -> (f64, f64) {
    let span = range.1 - range.0;
    let pad = if span > 0.0 { span * 0.05 } else { fallback };
    (range.0 - pad, range.1 + pad)
}

/// X-axis labels show the day of month, like the earlier charts.
fn day_label(epoch: &f64) -> String {
    OffsetDateTime::from_unix_timestamp(*epoch as i64)
        .map(|t| format!("{:02}", t.day()))
        .unwrap_or_default()
}

fn midnight_epoch(date: Date) -> f64 {
    date.midnight().assume_utc().unix_timestamp() as f64
}

fn line_chart(path: &Path, points: &[(f64, f64)], caption: &str) -> Result<(), Box<dyn Error>> {
    let (x, y) = bounds(points).ok_or_else(|| format!("no data to plot for {caption}"))?;
    let (x0, x1) = padded(x, 3600.0);
    let (y0, y1) = padded(y, 1.0);

    let root = BitMapBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart
        .configure_mesh()
        .x_label_formatter(&day_label)
        .draw()?;
    chart.draw_series(LineSeries::new(points.iter().copied(), &BLUE))?;

    root.present()?;
    Ok(())
}

fn day_chart<F>(
    path: &Path,
    days: &[DayStats],
    select: F,
    caption: &str,
) -> Result<(), Box<dyn Error>>
where
    F: Fn(&DayStats) -> Option<&SeriesStats>,
{
    let series: [(&str, &RGBColor, fn(&SeriesStats) -> f64); 4] = [
        ("min", &BLUE, |s| s.min),
        ("mean", &GREEN, |s| s.mean),
        ("median", &BLACK, |s| s.median),
        ("max", &RED, |s| s.max),
    ];

    let lines: Vec<(&str, &RGBColor, Vec<(f64, f64)>)> = series
        .iter()
        .map(|(name, color, pick)| {
            let points: Vec<(f64, f64)> = days
                .iter()
                .filter_map(|day| select(day).map(|s| (midnight_epoch(day.date), pick(s))))
                .collect();
            (*name, *color, points)
        })
        .collect();

    let all_points: Vec<(f64, f64)> = lines.iter().flat_map(|(_, _, p)| p.iter().copied()).collect();
    let (x, y) = bounds(&all_points).ok_or_else(|| format!("no data to plot for {caption}"))?;
    let (x0, x1) = padded(x, 43_200.0);
    let (y0, y1) = padded(y, 1.0);

    let root = BitMapBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart
        .configure_mesh()
        .x_label_formatter(&day_label)
        .draw()?;

    for (name, color, points) in &lines {
        let color = *color;
        chart
            .draw_series(LineSeries::new(points.iter().copied(), color))?
            .label(*name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
