/// Reporting pipeline: daily aggregation, plots, tables, and mail
pub mod mail;
pub mod plot;
pub mod table;

use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

use log::info;
use time::{Date, OffsetDateTime};

use crate::config::Config;
use crate::storage::{self, LogRow};
use crate::utils::{mean, median, now_epoch, round1};

/// Min/mean/median/max over one day's readings.
///
/// Mean and median are rounded to one decimal; the extremes are kept as
/// logged.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStats {
    pub min: f64,
    pub mean: f64,
    pub median: f64,
    pub max: f64,
}

impl SeriesStats {
    /// None when every sample in the window was blank.
    fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Self {
            min,
            mean: round1(mean(values)),
            median: round1(median(values)),
            max,
        })
    }
}

/// Per-day aggregate of specific gravity and temperature.
#[derive(Debug, Clone)]
pub struct DayStats {
    pub date: Date,
    pub gravity: Option<SeriesStats>,
    pub celsius: Option<SeriesStats>,
}

/// Overall extremes across the whole log.
#[derive(Debug, Clone, PartialEq)]
pub struct OverallStats {
    pub gravity_min: f64,
    pub gravity_max: f64,
    pub celsius_min: f64,
    pub celsius_max: f64,
}

/// Group rows by UTC date and aggregate each day's readings.
///
/// Placeholder rows contribute their date but no values, matching the
/// blank-field handling of the log format.
pub fn daily_stats(rows: &[LogRow]) -> Vec<DayStats> {
    let mut by_date: BTreeMap<Date, (Vec<f64>, Vec<f64>)> = BTreeMap::new();

    for row in rows {
        let Ok(moment) = OffsetDateTime::from_unix_timestamp(row.epoch) else {
            continue;
        };
        let entry = by_date.entry(moment.date()).or_default();
        if let Some(gravity) = row.gravity {
            entry.0.push(gravity);
        }
        if let Some(celsius) = row.celsius {
            entry.1.push(round1(celsius));
        }
    }

    by_date
        .into_iter()
        .map(|(date, (gravities, celsius))| DayStats {
            date,
            gravity: SeriesStats::from_values(&gravities),
            celsius: SeriesStats::from_values(&celsius),
        })
        .collect()
}

/// Overall min/max across the log, None when no numeric readings exist.
pub fn overall_stats(rows: &[LogRow]) -> Option<OverallStats> {
    let gravities: Vec<f64> = rows.iter().filter_map(|r| r.gravity).collect();
    let celsius: Vec<f64> = rows.iter().filter_map(|r| r.celsius).collect();
    if gravities.is_empty() || celsius.is_empty() {
        return None;
    }

    Some(OverallStats {
        gravity_min: gravities.iter().copied().fold(f64::INFINITY, f64::min),
        gravity_max: gravities.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        celsius_min: celsius.iter().copied().fold(f64::INFINITY, f64::min),
        celsius_max: celsius.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    })
}

pub struct ReportOptions {
    pub data: PathBuf,
    pub out_dir: Option<PathBuf>,
    pub mail: bool,
    pub sendmail: bool,
}

/// Render plots and tables from a CSV log, optionally mailing them.
pub fn run_report(options: &ReportOptions, config: Option<&Config>) -> Result<(), Box<dyn Error>> {
    let rows = storage::read_log(&options.data)?;
    if rows.is_empty() {
        return Err("no readings in log".into());
    }

    let days = daily_stats(&rows);
    let overall = overall_stats(&rows).ok_or("no numeric readings in log")?;

    let out_dir = match &options.out_dir {
        Some(dir) => dir.clone(),
        None => std::env::temp_dir().join(format!("hydrometer-plots-{}", now_epoch())),
    };
    fs::create_dir_all(&out_dir)?;

    let plots = plot::render_all(&rows, &days, &out_dir)?;

    let daily_html = table::daily_table(&days);
    let min_max_html = table::min_max_table(&overall);
    fs::write(out_dir.join("daily.html"), &daily_html)?;
    fs::write(out_dir.join("min_max.html"), &min_max_html)?;
    info!("Report written to {}", out_dir.display());

    if options.mail {
        let config = config.ok_or("mailing requires a config file")?;
        let from = config
            .mail_from
            .as_deref()
            .ok_or("mail_from not configured")?;
        if config.mail_to.is_empty() {
            return Err("mail_to not configured".into());
        }
        mail::send_report(
            &config.mail_to,
            from,
            options.sendmail,
            &daily_html,
            &min_max_html,
            &plots,
        )?;
        info!("Report mailed to {}", config.mail_to.join(", "));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(epoch: i64, gravity: Option<f64>, celsius: Option<f64>) -> LogRow {
        LogRow {
            color: "Red".to_string(),
            epoch,
            timestamp: String::new(),
            gravity,
            celsius,
            fahrenheit: celsius.map(|c| round1(c * 1.8 + 32.0)),
            reading_count: Some(u32::from(gravity.is_some())),
        }
    }

    const DAY: i64 = 24 * 60 * 60;

    #[test]
    fn rows_group_by_utc_date() {
        let rows = vec![
            row(DAY, Some(1040.0), Some(20.0)),
            row(DAY + 3600, Some(1030.0), Some(21.0)),
            row(2 * DAY, Some(1020.0), Some(22.0)),
        ];

        let days = daily_stats(&rows);
        assert_eq!(days.len(), 2);
        let first = days[0].gravity.as_ref().unwrap();
        assert_eq!(first.min, 1030.0);
        assert_eq!(first.max, 1040.0);
        assert_eq!(first.mean, 1035.0);
        assert_eq!(first.median, 1035.0);
    }

    #[test]
    fn blank_fields_are_ignored_in_aggregates() {
        let rows = vec![
            row(DAY, Some(1040.0), Some(20.0)),
            row(DAY + 60, None, None),
        ];

        let days = daily_stats(&rows);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].gravity.as_ref().unwrap().mean, 1040.0);
    }

    #[test]
    fn day_of_only_placeholders_has_no_stats() {
        let rows = vec![row(DAY, None, None)];
        let days = daily_stats(&rows);
        assert_eq!(days.len(), 1);
        assert!(days[0].gravity.is_none());
        assert!(days[0].celsius.is_none());
    }

    #[test]
    fn overall_extremes_span_all_days() {
        let rows = vec![
            row(DAY, Some(1040.0), Some(20.0)),
            row(2 * DAY, Some(1020.0), Some(22.0)),
            row(3 * DAY, None, None),
        ];

        let overall = overall_stats(&rows).unwrap();
        assert_eq!(
            overall,
            OverallStats {
                gravity_min: 1020.0,
                gravity_max: 1040.0,
                celsius_min: 20.0,
                celsius_max: 22.0,
            }
        );
    }

    #[test]
    fn overall_stats_need_numeric_readings() {
        let rows = vec![row(DAY, None, None)];
        assert!(overall_stats(&rows).is_none());
    }
}
