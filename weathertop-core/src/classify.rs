//! Weather classification helpers.
//!
//! Every function here is total: malformed or missing input maps to a
//! fallback value or `None`, never to an error.

use serde::Serialize;
use std::fmt;

const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";
const DEFAULT_ICON: &str = "02d";

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Upper bounds (inclusive, km/h) for Beaufort forces 0..=11. Anything above
/// the last bound is force 12.
const BEAUFORT_LIMITS: [f64; 12] = [
    1.0, 5.0, 11.0, 19.0, 28.0, 38.0, 49.0, 61.0, 74.0, 88.0, 102.0, 117.0,
];

/// Condition category for a provider weather code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WeatherLabel {
    Thunderstorm,
    Drizzle,
    Rain,
    Snow,
    Atmosphere,
    Clear,
    Clouds,
    /// A numeric code outside every known band.
    Weather,
    /// No code at all.
    Unknown,
}

impl WeatherLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherLabel::Thunderstorm => "Thunderstorm",
            WeatherLabel::Drizzle => "Drizzle",
            WeatherLabel::Rain => "Rain",
            WeatherLabel::Snow => "Snow",
            WeatherLabel::Atmosphere => "Atmosphere",
            WeatherLabel::Clear => "Clear",
            WeatherLabel::Clouds => "Clouds",
            WeatherLabel::Weather => "Weather",
            WeatherLabel::Unknown => "Unknown",
        }
    }

    /// True for the two catch-all labels.
    pub fn is_fallback(&self) -> bool {
        matches!(self, WeatherLabel::Weather | WeatherLabel::Unknown)
    }

    #[cfg(test)]
    pub(crate) const fn all() -> &'static [WeatherLabel] {
        &[
            WeatherLabel::Thunderstorm,
            WeatherLabel::Drizzle,
            WeatherLabel::Rain,
            WeatherLabel::Snow,
            WeatherLabel::Atmosphere,
            WeatherLabel::Clear,
            WeatherLabel::Clouds,
            WeatherLabel::Weather,
            WeatherLabel::Unknown,
        ]
    }
}

impl fmt::Display for WeatherLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to [`icon_url_for`]: either a raw provider icon token or a weather
/// code to derive one from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconRef<'a> {
    /// Exactly two ASCII digits followed by `d` or `n`, e.g. `"10n"`.
    Token(&'a str),
    Code(Option<i64>),
}

impl<'a> IconRef<'a> {
    /// Token-shaped strings become [`IconRef::Token`]; everything else is read
    /// as a weather code, and unparsable text becomes an absent code.
    pub fn parse(input: &'a str) -> Self {
        if is_icon_token(input) {
            IconRef::Token(input)
        } else {
            IconRef::Code(crate::model::parse_code(input))
        }
    }
}

impl From<Option<i64>> for IconRef<'_> {
    fn from(code: Option<i64>) -> Self {
        IconRef::Code(code)
    }
}

impl From<i64> for IconRef<'_> {
    fn from(code: i64) -> Self {
        IconRef::Code(Some(code))
    }
}

/// Whether `input` is a raw icon token (`^[0-9]{2}[dn]$`).
pub fn is_icon_token(input: &str) -> bool {
    matches!(
        input.as_bytes(),
        [a, b, b'd' | b'n'] if a.is_ascii_digit() && b.is_ascii_digit()
    )
}

pub fn label_for(code: Option<i64>) -> WeatherLabel {
    let Some(code) = code else {
        return WeatherLabel::Unknown;
    };

    match code {
        200..=232 => WeatherLabel::Thunderstorm,
        300..=321 => WeatherLabel::Drizzle,
        500..=531 => WeatherLabel::Rain,
        600..=622 => WeatherLabel::Snow,
        701..=781 => WeatherLabel::Atmosphere,
        800 => WeatherLabel::Clear,
        801..=804 => WeatherLabel::Clouds,
        _ => WeatherLabel::Weather,
    }
}

/// Provider icon token for a weather code. Unknown codes get the default
/// few-clouds icon.
pub fn icon_code_for(code: Option<i64>) -> &'static str {
    match code {
        Some(200..=232) => "11d",
        Some(300..=321) => "09d",
        Some(500..=531) => "10d",
        Some(600..=622) => "13d",
        Some(701..=781) => "50d",
        Some(800) => "01d",
        Some(801) => "02d",
        Some(802) => "03d",
        Some(803 | 804) => "04d",
        _ => DEFAULT_ICON,
    }
}

pub fn icon_url_for<'a>(icon: impl Into<IconRef<'a>>) -> String {
    let token = match icon.into() {
        IconRef::Token(token) => token,
        IconRef::Code(code) => icon_code_for(code),
    };
    format!("{ICON_BASE_URL}/{token}@2x.png")
}

/// Celsius to Fahrenheit, rounded to one decimal place.
pub fn to_fahrenheit(celsius: Option<f64>) -> Option<f64> {
    let c = celsius.filter(|c| c.is_finite())?;
    Some(round_to_tenth(c * 9.0 / 5.0 + 32.0))
}

/// Beaufort force 0..=12 for a wind speed in km/h.
pub fn beaufort_scale(kmh: Option<f64>) -> Option<u8> {
    let speed = kmh.filter(|s| !s.is_nan())?;
    let force = BEAUFORT_LIMITS
        .iter()
        .position(|limit| speed <= *limit)
        .unwrap_or(BEAUFORT_LIMITS.len());
    Some(force as u8)
}

/// One of the 16 compass points for a bearing in degrees.
pub fn compass_label(degrees: Option<f64>) -> Option<&'static str> {
    let d = degrees.filter(|d| d.is_finite())?.rem_euclid(360.0);
    let sector = (d / 22.5).round() as usize % COMPASS_POINTS.len();
    Some(COMPASS_POINTS[sector])
}

/// m/s to km/h, rounded to one decimal place.
pub fn ms_to_kmh(mps: f64) -> f64 {
    round_to_tenth(mps * 3.6)
}

/// Round to the nearest integer, halves towards positive infinity.
pub(crate) fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

fn round_to_tenth(value: f64) -> f64 {
    round_half_up(value * 10.0) / 10.0
}
