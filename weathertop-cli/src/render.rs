//! Plain-text rendering of dashboard views.

use serde::Serialize;
use weathertop_core::{
    LatestView, MinMax, User, WeatherReport,
    forecast::ForecastView,
    service::{Dashboard, StationView},
};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Account details safe to print.
#[derive(Debug, Serialize)]
pub struct Account<'a> {
    pub id: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
}

impl<'a> From<&'a User> for Account<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            id: &user.id,
            first_name: &user.first_name,
            last_name: &user.last_name,
            email: &user.email,
        }
    }
}

pub fn account(user: &User) -> String {
    format!(
        "{} {} <{}>\nid: {}\n",
        user.first_name, user.last_name, user.email, user.id
    )
}

pub fn dashboard(dashboard: &Dashboard) -> String {
    let mut out = format!("Hello, {}!\n", dashboard.first_name);
    if dashboard.stations.is_empty() {
        out.push_str("No stations yet. Add one with `weathertop station add <name>`.\n");
        return out;
    }

    for card in &dashboard.stations {
        out.push('\n');
        out.push_str(&format!(
            "{} [{}]  {}\n",
            card.station.name,
            card.station.id,
            coords(card.station.lat, card.station.lng)
        ));
        match &card.latest {
            Some(latest) => out.push_str(&latest_block(latest)),
            None => out.push_str("  no reports\n"),
        }
        out.push_str(&ranges(
            &card.summary.temp,
            &card.summary.wind,
            &card.summary.pressure,
        ));
    }
    out
}

pub fn station(view: &StationView) -> String {
    let mut out = format!(
        "{} [{}]  {}\n",
        view.station.name,
        view.station.id,
        coords(view.station.lat, view.station.lng)
    );

    match &view.latest {
        Some(latest) => out.push_str(&latest_block(latest)),
        None => out.push_str("  no reports\n"),
    }
    out.push_str(&ranges(
        &view.summary.temp,
        &view.summary.wind,
        &view.summary.pressure,
    ));

    if !view.reports.is_empty() {
        out.push_str("\nReports:\n");
        for report in &view.reports {
            out.push_str(&report_line(report));
        }
    }
    out
}

pub fn report_line(report: &WeatherReport) -> String {
    format!(
        "  {}  {}  code {}  {}  {}  {}  {}\n",
        report.id,
        report.time.format(TIME_FORMAT),
        report.code.map_or_else(|| "-".to_string(), |c| c.to_string()),
        value(report.temp, "°C"),
        value(report.wind_speed, " km/h"),
        value(report.wind_dir, "°"),
        value(report.pressure, " hPa"),
    )
}

pub fn forecast(view: &ForecastView) -> String {
    let current = &view.current;
    let mut out = format!("{} forecast\n", view.station.name);
    out.push_str(&format!(
        "Now: {}  {}  feels {}  wind {} {}  {}  humidity {}\n",
        if current.description.is_empty() { "-" } else { &current.description },
        int(current.temp, "°C"),
        int(current.feels_like, "°C"),
        int(current.wind_kmh, " km/h"),
        current.wind_dir_label.unwrap_or("-"),
        value(current.pressure, " hPa"),
        value(current.humidity, "%"),
    ));

    out.push_str("\nNext hours:\n");
    for hour in &view.hourly {
        out.push_str(&format!(
            "  {}  {:>4}°C  {:>3}% rain  {}\n",
            hour.time.format(TIME_FORMAT),
            hour.temp,
            hour.pop,
            hour.description
        ));
    }

    out.push_str("\nNext days:\n");
    for day in &view.daily {
        out.push_str(&format!(
            "  {}  {:>4}°C / {:>4}°C  {:>3}% rain  {}\n",
            day.date, day.tmin, day.tmax, day.pop, day.description
        ));
    }
    out
}

fn latest_block(latest: &LatestView) -> String {
    format!(
        "  {} ({})  {} / {}  wind {} bft {}  {}  at {}\n  {}\n",
        latest.label,
        latest.code.map_or_else(|| "-".to_string(), |c| c.to_string()),
        value(latest.temp_c, "°C"),
        value(latest.temp_f, "°F"),
        latest
            .wind_beaufort
            .map_or_else(|| "-".to_string(), |b| b.to_string()),
        latest.wind_dir_label.unwrap_or("-"),
        value(latest.pressure, " hPa"),
        latest.time.format(TIME_FORMAT),
        latest.icon_url,
    )
}

fn ranges(temp: &MinMax, wind: &MinMax, pressure: &MinMax) -> String {
    format!(
        "  temp {}  wind {}  pressure {}\n",
        range(temp, "°C"),
        range(wind, " km/h"),
        range(pressure, " hPa")
    )
}

fn range(range: &MinMax, unit: &str) -> String {
    match (range.min, range.max) {
        (Some(min), Some(max)) => format!("{min}..{max}{unit}"),
        _ => "-".to_string(),
    }
}

fn coords(lat: Option<f64>, lng: Option<f64>) -> String {
    match (lat, lng) {
        (Some(lat), Some(lng)) => format!("({lat:.4}, {lng:.4})"),
        _ => "(no coordinates)".to_string(),
    }
}

fn value(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v}{unit}"))
}

fn int(value: Option<i64>, unit: &str) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v}{unit}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use weathertop_core::summary::compute_summary;

    fn report(temp: Option<f64>) -> WeatherReport {
        WeatherReport {
            id: "r1".into(),
            station_id: "s1".into(),
            code: Some(803),
            temp,
            wind_speed: Some(12.0),
            wind_dir: None,
            pressure: Some(1004.0),
            icon: None,
            time: Utc.with_ymd_and_hms(2025, 11, 3, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn report_line_marks_missing_values() {
        let line = report_line(&report(None));
        assert!(line.contains("2025-11-03 09:30"));
        assert!(line.contains("code 803"));
        assert!(line.contains("12 km/h"));
        assert!(line.contains(" - "));
    }

    #[test]
    fn range_needs_both_bounds() {
        assert_eq!(range(&MinMax::default(), "°C"), "-");
        assert_eq!(
            range(&MinMax { min: Some(-1.5), max: Some(4.0) }, "°C"),
            "-1.5..4°C"
        );
    }

    #[test]
    fn latest_block_shows_label_and_conversions() {
        let summary = compute_summary(&[report(Some(20.0))]);
        let latest = summary.latest_view().unwrap();
        let block = latest_block(&latest);

        assert!(block.contains("Clouds (803)"));
        assert!(block.contains("68°F"));
        assert!(block.contains("04d@2x.png"));
    }
}
