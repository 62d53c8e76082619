use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Geographic position as reported by the location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Cell address on the KMA forecast grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCoordinate {
    pub nx: i32,
    pub ny: i32,
}

/// Issuance key used by both endpoints: `base_date` is `YYYYMMDD`,
/// `base_time` is `HHMM`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseDateTime {
    pub base_date: String,
    pub base_time: String,
}

/// Category code -> raw value for one nowcast issuance.
///
/// Only the first value seen for a category is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationRecord {
    values: HashMap<String, String>,
}

impl ObservationRecord {
    pub fn insert_first(&mut self, category: impl Into<String>, value: impl Into<String>) {
        self.values.entry(category.into()).or_insert_with(|| value.into());
    }

    pub fn get(&self, category: &str) -> Option<&str> {
        self.values.get(category).map(String::as_str)
    }

    pub fn get_f64(&self, category: &str) -> Option<f64> {
        self.get(category).and_then(|v| v.trim().parse().ok())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ObservationRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::default();
        for (k, v) in iter {
            record.insert_first(k, v);
        }
        record
    }
}

/// One entry of the short-term forecast series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastItem {
    pub category: String,
    pub fcst_date: String,
    pub fcst_time: String,
    pub fcst_value: String,
}

/// Icon keys matching the client's bundled weather artwork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherIcon {
    Sun,
    CloudySun,
    Cloudy,
    Snow,
}

impl WeatherIcon {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherIcon::Sun => "sun",
            WeatherIcon::CloudySun => "cloudy_sun",
            WeatherIcon::Cloudy => "cloudy",
            WeatherIcon::Snow => "snow",
        }
    }
}

/// Normalized current-weather result, as cached and returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub precipitation_type: String,
    pub sky_label: Option<String>,
    pub weather_label: String,
    #[serde(rename = "precipitation1h")]
    pub precipitation_1h: String,
    pub wind_direction: Option<String>,
    pub icon: Option<WeatherIcon>,
    pub base_date: String,
    pub base_time: String,
    pub nx: i32,
    pub ny: i32,
    pub latitude: f64,
    pub longitude: f64,
}

impl WeatherSnapshot {
    pub fn grid(&self) -> GridCoordinate {
        GridCoordinate { nx: self.nx, ny: self.ny }
    }
}
