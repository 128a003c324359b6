//! Shaping of provider forecasts into hourly and daily series.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::classify::{IconRef, compass_label, icon_url_for, round_half_up};
use crate::model::{CurrentConditions, ForecastEntry, Station};

/// 16 three-hour slots, roughly 48 hours.
pub const HOURLY_SLOTS: usize = 16;
pub const MAX_DAYS: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentView {
    pub temp: Option<i64>,
    pub feels_like: Option<i64>,
    pub description: String,
    pub icon: Option<String>,
    pub icon_url: Option<String>,
    /// Whole km/h.
    pub wind_kmh: Option<i64>,
    pub wind_deg: Option<f64>,
    pub wind_dir_label: Option<&'static str>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
}

impl CurrentView {
    pub fn from_conditions(current: &CurrentConditions) -> Self {
        Self {
            temp: current.temp.map(round_to_int),
            feels_like: current.feels_like.map(round_to_int),
            description: current.description.clone(),
            icon: current.icon.clone(),
            icon_url: icon_url(current.icon.as_deref()),
            // a calm 0 m/s reading is shown as "no wind data"
            wind_kmh: current
                .wind_speed_mps
                .filter(|speed| *speed != 0.0)
                .map(|speed| round_to_int(speed * 3.6)),
            wind_deg: current.wind_deg,
            wind_dir_label: compass_label(current.wind_deg),
            pressure: current.pressure,
            humidity: current.humidity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyForecast {
    pub time: DateTime<Utc>,
    pub temp: i64,
    /// Probability of precipitation, percent.
    pub pop: u8,
    pub icon: Option<String>,
    pub icon_url: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub tmin: i64,
    pub tmax: i64,
    /// Mean probability of precipitation over the day's slots, percent.
    pub pop: u8,
    pub icon: Option<String>,
    pub icon_url: Option<String>,
    pub description: String,
}

/// Everything the forecast page of a station shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastView {
    pub station: Station,
    pub timezone_offset: Option<i64>,
    pub current: CurrentView,
    pub hourly: Vec<HourlyForecast>,
    pub daily: Vec<DailyForecast>,
}

pub fn hourly(entries: &[ForecastEntry]) -> Vec<HourlyForecast> {
    entries
        .iter()
        .take(HOURLY_SLOTS)
        .map(|entry| HourlyForecast {
            time: entry.time,
            temp: round_to_int(entry.temp),
            pop: percent(entry.pop.unwrap_or(0.0)),
            icon: entry.icon.clone(),
            icon_url: icon_url(entry.icon.as_deref()),
            description: entry.description.clone(),
        })
        .collect()
}

struct DayAccumulator<'a> {
    date: NaiveDate,
    first: &'a ForecastEntry,
    tmin: f64,
    tmax: f64,
    pop_sum: f64,
    count: u32,
}

/// Group entries by UTC calendar date in the order days first appear.
pub fn daily(entries: &[ForecastEntry]) -> Vec<DailyForecast> {
    let mut days: Vec<DayAccumulator<'_>> = Vec::new();

    for entry in entries {
        let date = entry.time.date_naive();
        let existing = days.iter().position(|d| d.date == date);
        let day = match existing {
            Some(idx) => &mut days[idx],
            None => {
                days.push(DayAccumulator {
                    date,
                    first: entry,
                    tmin: f64::INFINITY,
                    tmax: f64::NEG_INFINITY,
                    pop_sum: 0.0,
                    count: 0,
                });
                let last = days.len() - 1;
                &mut days[last]
            }
        };

        day.tmin = day.tmin.min(entry.temp_min);
        day.tmax = day.tmax.max(entry.temp_max);
        day.pop_sum += entry.pop.unwrap_or(0.0);
        day.count += 1;
    }

    days.into_iter()
        .take(MAX_DAYS)
        .map(|day| DailyForecast {
            date: day.date,
            tmin: round_to_int(day.tmin),
            tmax: round_to_int(day.tmax),
            pop: percent(day.pop_sum / f64::from(day.count)),
            icon: day.first.icon.clone(),
            icon_url: icon_url(day.first.icon.as_deref()),
            description: day.first.description.clone(),
        })
        .collect()
}

fn icon_url(icon: Option<&str>) -> Option<String> {
    icon.filter(|i| !i.is_empty())
        .map(|i| icon_url_for(IconRef::Token(i)))
}

fn round_to_int(value: f64) -> i64 {
    round_half_up(value) as i64
}

fn percent(probability: f64) -> u8 {
    round_half_up(probability.clamp(0.0, 1.0) * 100.0) as u8
}
