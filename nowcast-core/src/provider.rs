//! HTTP access to the two KMA ultra-short-term endpoints.

use std::{fmt, time::Duration};

use reqwest::Client;

use crate::{
    config::{ApiConfig, ApiSettings},
    error::{Result, Stage, WeatherError},
    model::{BaseDateTime, ForecastItem, GridCoordinate, ObservationRecord},
    parse::{parse_forecast, parse_nowcast, snippet},
    timeout::with_timeout,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// 초단기실황
    Nowcast,
    /// 초단기예보
    Forecast,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Nowcast => "getUltraSrtNcst",
            Endpoint::Forecast => "getUltraSrtFcst",
        }
    }

    pub fn rows(&self) -> u32 {
        match self {
            Endpoint::Nowcast => 100,
            Endpoint::Forecast => 1000,
        }
    }

    fn stage(&self) -> Stage {
        match self {
            Endpoint::Nowcast => Stage::NowcastRequest,
            Endpoint::Forecast => Stage::ForecastRequest,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone)]
pub struct KmaClient {
    settings: ApiSettings,
    http: Client,
    request_timeout: Duration,
}

impl KmaClient {
    pub fn new(settings: ApiSettings, http: Client, request_timeout: Duration) -> Self {
        Self { settings, http, request_timeout }
    }

    pub async fn fetch_nowcast(
        &self,
        base: &BaseDateTime,
        grid: GridCoordinate,
    ) -> Result<ObservationRecord> {
        let body = self.get_text(Endpoint::Nowcast, base, grid).await?;
        parse_nowcast(&body)
    }

    pub async fn fetch_forecast(
        &self,
        base: &BaseDateTime,
        grid: GridCoordinate,
    ) -> Result<Vec<ForecastItem>> {
        let body = self.get_text(Endpoint::Forecast, base, grid).await?;
        parse_forecast(&body)
    }

    /// Issue the request and read the body, both under one timeout.
    async fn get_text(
        &self,
        endpoint: Endpoint,
        base: &BaseDateTime,
        grid: GridCoordinate,
    ) -> Result<String> {
        let url = format!("{}/{}", self.settings.base_url, endpoint.path());
        let rows = endpoint.rows().to_string();
        let nx = grid.nx.to_string();
        let ny = grid.ny.to_string();

        tracing::debug!(
            %endpoint,
            base_date = %base.base_date,
            base_time = %base.base_time,
            nx = grid.nx,
            ny = grid.ny,
            "Requesting KMA data"
        );

        let request = async {
            let res = self
                .http
                .get(&url)
                .query(&[
                    ("serviceKey", self.settings.service_key.as_str()),
                    ("dataType", "JSON"),
                    ("_type", "json"),
                    ("numOfRows", rows.as_str()),
                    ("pageNo", "1"),
                    ("base_date", base.base_date.as_str()),
                    ("base_time", base.base_time.as_str()),
                    ("nx", nx.as_str()),
                    ("ny", ny.as_str()),
                ])
                .send()
                .await?;

            let status = res.status();
            let body = res.text().await?;

            if !status.is_success() {
                return Err(WeatherError::upstream(format!(
                    "{endpoint} request failed with status {status}: {}",
                    snippet(&body),
                )));
            }

            Ok::<_, WeatherError>(body)
        };

        with_timeout(endpoint.stage(), self.request_timeout, request).await
    }
}

/// Build a client from config, failing with
/// [`WeatherError::ConfigMissing`] if the base URL or key is absent.
pub fn client_from_config(
    api: &ApiConfig,
    http: Client,
    request_timeout: Duration,
) -> Result<KmaClient> {
    Ok(KmaClient::new(api.settings()?, http, request_timeout))
}
