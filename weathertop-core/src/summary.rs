//! Station summaries derived from a set of weather reports.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classify::{
    IconRef, WeatherLabel, beaufort_scale, compass_label, icon_url_for, is_icon_token, label_for,
    to_fahrenheit,
};
use crate::model::WeatherReport;

/// Numeric report fields that can be summarized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Temp,
    WindSpeed,
    Pressure,
}

impl Metric {
    fn value(&self, report: &WeatherReport) -> Option<f64> {
        match self {
            Metric::Temp => report.temp,
            Metric::WindSpeed => report.wind_speed,
            Metric::Pressure => report.pressure,
        }
    }
}

/// Observed range of one metric. Both bounds are `None` when no report
/// carries a value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MinMax {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationSummary {
    pub latest: Option<WeatherReport>,
    pub temp: MinMax,
    pub wind: MinMax,
    pub pressure: MinMax,
}

/// The report with the greatest timestamp. Among equal timestamps the first
/// one in `reports` wins.
pub fn latest_report(reports: &[WeatherReport]) -> Option<&WeatherReport> {
    reports.iter().fold(None, |best: Option<&WeatherReport>, report| match best {
        Some(current) if current.time >= report.time => Some(current),
        _ => Some(report),
    })
}

pub fn min_max_of(reports: &[WeatherReport], metric: Metric) -> MinMax {
    reports
        .iter()
        .filter_map(|report| metric.value(report))
        .filter(|value| value.is_finite())
        .fold(MinMax::default(), |range, value| MinMax {
            min: Some(range.min.map_or(value, |min| min.min(value))),
            max: Some(range.max.map_or(value, |max| max.max(value))),
        })
}

pub fn compute_summary(reports: &[WeatherReport]) -> StationSummary {
    StationSummary {
        latest: latest_report(reports).cloned(),
        temp: min_max_of(reports, Metric::Temp),
        wind: min_max_of(reports, Metric::WindSpeed),
        pressure: min_max_of(reports, Metric::Pressure),
    }
}

/// Presentation record for the most recent report of a station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestView {
    pub code: Option<i64>,
    pub label: WeatherLabel,
    pub icon_url: String,
    pub temp_c: Option<f64>,
    pub temp_f: Option<f64>,
    pub wind_beaufort: Option<u8>,
    pub wind_speed_raw: Option<f64>,
    pub wind_dir_label: Option<&'static str>,
    pub pressure: Option<f64>,
    pub time: DateTime<Utc>,
}

impl LatestView {
    /// Uses the dashboard icon rule everywhere: the report's provider icon
    /// when it is token-shaped, otherwise the icon for its code.
    pub fn from_report(report: &WeatherReport) -> Self {
        let icon = match report.icon.as_deref() {
            Some(token) if is_icon_token(token) => IconRef::Token(token),
            _ => IconRef::Code(report.code),
        };

        Self {
            code: report.code,
            label: label_for(report.code),
            icon_url: icon_url_for(icon),
            temp_c: report.temp,
            temp_f: to_fahrenheit(report.temp),
            wind_beaufort: beaufort_scale(report.wind_speed),
            wind_speed_raw: report.wind_speed,
            wind_dir_label: compass_label(report.wind_dir),
            pressure: report.pressure,
            time: report.time,
        }
    }
}

impl StationSummary {
    pub fn latest_view(&self) -> Option<LatestView> {
        self.latest.as_ref().map(LatestView::from_report)
    }
}
