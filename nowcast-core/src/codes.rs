//! Upstream category codes and their human-readable labels.

use crate::model::WeatherIcon;

pub const UNKNOWN_LABEL: &str = "알수없음";
pub const NO_PRECIPITATION_LABEL: &str = "강수없음";

pub const CATEGORY_TEMPERATURE: &str = "T1H";
pub const CATEGORY_HUMIDITY: &str = "REH";
pub const CATEGORY_WIND_SPEED: &str = "WSD";
pub const CATEGORY_PRECIPITATION_TYPE: &str = "PTY";
pub const CATEGORY_PRECIPITATION_1H: &str = "RN1";
pub const CATEGORY_WIND_DIRECTION: &str = "VEC";
pub const CATEGORY_SKY: &str = "SKY";

/// PTY code that means "no precipitation".
pub const PTY_NONE: &str = "0";

const COMPASS_16: [&str; 16] = [
    "북", "북북동", "북동", "동북동", "동", "동남동", "남동", "남남동", "남", "남남서", "남서",
    "서남서", "서", "서북서", "북서", "북북서",
];

pub fn precipitation_label(code: &str) -> &'static str {
    match code.trim() {
        "0" => "없음",
        "1" => "비",
        "2" => "비/눈",
        "3" => "눈",
        "5" => "빗방울",
        "6" => "빗방울눈날림",
        "7" => "눈날림",
        _ => UNKNOWN_LABEL,
    }
}

pub fn sky_label(code: &str) -> &'static str {
    match code.trim() {
        "1" => "맑음",
        "3" => "구름많음",
        "4" => "흐림",
        _ => UNKNOWN_LABEL,
    }
}

/// Map a bearing in degrees to one of 16 compass labels.
///
/// Sectors are 22.5° wide and centred on each label, so 348.75..11.25 is
/// north.
pub fn wind_direction_label(degrees: f64) -> &'static str {
    let normalized = degrees.rem_euclid(360.0);
    let sector = ((normalized + 11.25) / 22.5).floor() as usize % COMPASS_16.len();
    COMPASS_16[sector]
}

/// Render the hourly precipitation amount.
pub fn format_precipitation(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        None | Some("") => NO_PRECIPITATION_LABEL.to_string(),
        Some(value) => match value.parse::<f64>() {
            Ok(amount) if amount == 0.0 => NO_PRECIPITATION_LABEL.to_string(),
            _ => format!("{value}mm"),
        },
    }
}

/// Precipitation wins over sky condition; without either the label is unknown.
pub fn weather_label(pty_code: Option<&str>, sky: Option<&str>) -> String {
    match pty_code.map(str::trim) {
        Some(PTY_NONE) => sky.unwrap_or(UNKNOWN_LABEL).to_string(),
        Some(code) => precipitation_label(code).to_string(),
        None => UNKNOWN_LABEL.to_string(),
    }
}

pub fn icon_for(pty_code: Option<&str>, sky: Option<&str>) -> Option<WeatherIcon> {
    match pty_code.map(str::trim) {
        Some(PTY_NONE) => match sky? {
            "맑음" => Some(WeatherIcon::Sun),
            "구름많음" => Some(WeatherIcon::CloudySun),
            "흐림" => Some(WeatherIcon::Cloudy),
            _ => None,
        },
        Some("1" | "5") => Some(WeatherIcon::Cloudy),
        Some("2" | "3" | "6" | "7") => Some(WeatherIcon::Snow),
        _ => None,
    }
}
