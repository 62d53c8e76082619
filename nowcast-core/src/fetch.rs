//! The current-weather pipeline: permission, position, grid, cache,
//! nowcast, best-effort sky condition, labels.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use chrono::NaiveDateTime;
use parking_lot::RwLock;
use reqwest::Client;

use crate::{
    cache::SnapshotCache,
    clock::Clock,
    codes::{self, CATEGORY_HUMIDITY, CATEGORY_PRECIPITATION_1H, CATEGORY_PRECIPITATION_TYPE,
        CATEGORY_TEMPERATURE, CATEGORY_WIND_DIRECTION, CATEGORY_WIND_SPEED, UNKNOWN_LABEL},
    config::{ApiConfig, Config, Timeouts},
    error::{Result, Stage},
    grid::to_grid,
    location::{Accuracy, LocationProvider, PermissionStatus},
    model::{BaseDateTime, Coordinate, GridCoordinate, ObservationRecord, WeatherSnapshot},
    provider::{KmaClient, client_from_config},
    schedule::{date_time_keys, fcst_base, nowcast_base, select_sky_for_now, to_kst},
    timeout::with_timeout,
};

/// How a successful [`WeatherFetcher::fetch_weather`] call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Fresh(WeatherSnapshot),
    Cached(WeatherSnapshot),
    /// The user declined location access. Not an error.
    PermissionDenied,
}

impl FetchOutcome {
    pub fn snapshot(&self) -> Option<&WeatherSnapshot> {
        match self {
            FetchOutcome::Fresh(s) | FetchOutcome::Cached(s) => Some(s),
            FetchOutcome::PermissionDenied => None,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, FetchOutcome::Cached(_))
    }
}

/// Owns the cache and the collaborators needed to produce a
/// [`WeatherSnapshot`].
///
/// Calls are coalesced: a second caller waits for the fetch in flight and
/// then normally finds its result in the cache.
#[derive(Debug)]
pub struct WeatherFetcher {
    api: ApiConfig,
    timeouts: Timeouts,
    http: Client,
    location: Arc<dyn LocationProvider>,
    clock: Arc<dyn Clock>,
    cache: SnapshotCache,
    in_flight: tokio::sync::Mutex<()>,
}

impl WeatherFetcher {
    pub fn new(config: &Config, location: Arc<dyn LocationProvider>, clock: Arc<dyn Clock>) -> Self {
        Self {
            api: config.api.clone(),
            timeouts: config.timeouts(),
            http: Client::new(),
            location,
            clock,
            cache: SnapshotCache::new(config.cache_ttl()),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn fetch_weather(&self) -> Result<FetchOutcome> {
        let _in_flight = self.in_flight.lock().await;

        let permission = with_timeout(
            Stage::Permission,
            self.timeouts.permission,
            self.location.request_permission(),
        )
        .await?;
        if permission == PermissionStatus::Denied {
            tracing::warn!("Location permission denied");
            return Ok(FetchOutcome::PermissionDenied);
        }

        let position = with_timeout(
            Stage::Position,
            self.timeouts.position,
            self.location.current_position(Accuracy::Balanced),
        )
        .await?;
        let grid = to_grid(position.latitude, position.longitude);

        if let Some(snapshot) = self.cache.get(grid, self.clock.now()) {
            tracing::debug!(nx = grid.nx, ny = grid.ny, "Serving cached snapshot");
            return Ok(FetchOutcome::Cached(snapshot));
        }

        let client = client_from_config(&self.api, self.http.clone(), self.timeouts.request)?;

        let local = to_kst(self.clock.now());
        let base = nowcast_base(local);
        let record = client.fetch_nowcast(&base, grid).await?;

        let sky = fetch_sky_label(&client, local, grid).await;

        let snapshot = build_snapshot(&record, sky, &base, grid, position);
        self.cache.put(snapshot.clone(), self.clock.now());

        tracing::info!(
            nx = grid.nx,
            ny = grid.ny,
            label = %snapshot.weather_label,
            "Fetched current weather"
        );
        Ok(FetchOutcome::Fresh(snapshot))
    }
}

/// Sky condition from the short-term forecast. Failures only cost the label.
async fn fetch_sky_label(
    client: &KmaClient,
    local: NaiveDateTime,
    grid: GridCoordinate,
) -> Option<String> {
    let base = fcst_base(local);
    let series = match client.fetch_forecast(&base, grid).await {
        Ok(series) => series,
        Err(e) => {
            tracing::warn!(error = %e, "Sky condition unavailable");
            return None;
        }
    };

    let (date, time) = date_time_keys(local);
    match select_sky_for_now(&series, &date, &time) {
        Some(code) => Some(codes::sky_label(&code).to_string()),
        None => {
            tracing::warn!(items = series.len(), "Forecast series has no SKY value for now");
            None
        }
    }
}

/// Merge nowcast observations and the optional sky label into a snapshot.
pub fn build_snapshot(
    record: &ObservationRecord,
    sky_label: Option<String>,
    base: &BaseDateTime,
    grid: GridCoordinate,
    position: Coordinate,
) -> WeatherSnapshot {
    let pty = record.get(CATEGORY_PRECIPITATION_TYPE);

    let precipitation_type = pty
        .map(codes::precipitation_label)
        .unwrap_or(UNKNOWN_LABEL)
        .to_string();

    WeatherSnapshot {
        temperature: record.get_f64(CATEGORY_TEMPERATURE),
        humidity: record.get_f64(CATEGORY_HUMIDITY),
        wind_speed: record.get_f64(CATEGORY_WIND_SPEED),
        precipitation_type,
        weather_label: codes::weather_label(pty, sky_label.as_deref()),
        icon: codes::icon_for(pty, sky_label.as_deref()),
        sky_label,
        precipitation_1h: codes::format_precipitation(record.get(CATEGORY_PRECIPITATION_1H)),
        wind_direction: record
            .get_f64(CATEGORY_WIND_DIRECTION)
            .map(|deg| codes::wind_direction_label(deg).to_string()),
        base_date: base.base_date.clone(),
        base_time: base.base_time.clone(),
        nx: grid.nx,
        ny: grid.ny,
        latitude: position.latitude,
        longitude: position.longitude,
    }
}

/// What a UI layer renders: at most one of `data`, `error` and
/// `permission_denied` describes the last completed fetch, except that
/// `data` from an earlier success survives a later failure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherState {
    pub loading: bool,
    pub error: Option<String>,
    pub data: Option<WeatherSnapshot>,
    pub permission_denied: bool,
}

/// Reactive handle over a [`WeatherFetcher`].
#[derive(Debug)]
pub struct CurrentWeather {
    fetcher: Arc<WeatherFetcher>,
    state: RwLock<WeatherState>,
    mounted: AtomicBool,
}

impl CurrentWeather {
    pub fn new(fetcher: Arc<WeatherFetcher>) -> Self {
        Self {
            fetcher,
            state: RwLock::new(WeatherState::default()),
            mounted: AtomicBool::new(true),
        }
    }

    /// Create the handle and run the initial fetch.
    pub async fn mount(fetcher: Arc<WeatherFetcher>) -> Self {
        let handle = Self::new(fetcher);
        handle.refresh().await;
        handle
    }

    pub fn state(&self) -> WeatherState {
        self.state.read().clone()
    }

    /// Stop publishing state; fetches still in flight complete silently.
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
    }

    pub async fn refresh(&self) {
        self.update(|s| {
            s.loading = true;
            s.error = None;
            s.permission_denied = false;
        });

        let outcome = self.fetcher.fetch_weather().await;

        self.update(|s| {
            match outcome {
                Ok(FetchOutcome::Fresh(snapshot) | FetchOutcome::Cached(snapshot)) => {
                    s.data = Some(snapshot);
                }
                Ok(FetchOutcome::PermissionDenied) => s.permission_denied = true,
                Err(e) => s.error = Some(e.to_string()),
            }
            s.loading = false;
        });
    }

    fn update(&self, apply: impl FnOnce(&mut WeatherState)) {
        if !self.mounted.load(Ordering::Acquire) {
            return;
        }
        apply(&mut self.state.write());
    }
}
