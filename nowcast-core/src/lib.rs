//! Current-weather acquisition against the KMA ultra-short-term API.
//!
//! This crate defines:
//! - Conversion of latitude/longitude to the KMA forecast grid
//! - Issuance-time selection for the nowcast and forecast endpoints
//! - Tolerant parsing of upstream responses
//! - The fetch pipeline with its single-slot cache and caller handle
//!
//! It is used by `nowcast-cli`, but can also be reused by other binaries or services.

pub mod cache;
pub mod clock;
pub mod codes;
pub mod config;
pub mod error;
pub mod fetch;
pub mod grid;
pub mod location;
pub mod model;
pub mod parse;
pub mod provider;
pub mod schedule;
pub mod timeout;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ApiConfig, Config};
pub use error::{Result, WeatherError};
pub use fetch::{CurrentWeather, FetchOutcome, WeatherFetcher, WeatherState};
pub use grid::to_grid;
pub use location::{Accuracy, LocationProvider, PermissionStatus, StaticLocation};
pub use model::{BaseDateTime, Coordinate, GridCoordinate, WeatherIcon, WeatherSnapshot};
