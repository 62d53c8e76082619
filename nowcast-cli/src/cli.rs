use std::{fmt::Write, sync::Arc};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Text};
use nowcast_core::{
    Config, FetchOutcome, StaticLocation, SystemClock, WeatherFetcher, WeatherSnapshot,
    schedule::{fcst_base, nowcast_base, to_kst},
    to_grid,
};

const DEFAULT_BASE_URL: &str = "https://apis.data.go.kr/1360000/VilageFcstInfoService_2.0";

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "nowcast", version, about = "Current weather from the KMA nowcast API")]
pub struct Cli {
    /// Log debug output to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API base URL and service key.
    Configure,

    /// Show current weather for a position.
    Show {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Print the snapshot as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the forecast grid cell for a position.
    Grid {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },

    /// Print the issuance times that would be requested right now.
    BaseTime,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { lat, lon, json } => show(lat, lon, json).await,
            Command::Grid { lat, lon } => {
                let grid = to_grid(lat, lon);
                println!("{} {}", grid.nx, grid.ny);
                Ok(())
            }
            Command::BaseTime => {
                let local = to_kst(Utc::now());
                let nowcast = nowcast_base(local);
                let forecast = fcst_base(local);
                println!("nowcast   {} {}", nowcast.base_date, nowcast.base_time);
                println!("forecast  {} {}", forecast.base_date, forecast.base_time);
                Ok(())
            }
        }
    }
}

fn configure() -> Result<()> {
    let mut cfg = Config::load()?;

    let current_url = cfg.api.base_url.clone().unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let base_url = Text::new("API base URL:")
        .with_default(&current_url)
        .prompt()
        .context("Failed to read base URL")?;

    let service_key = Password::new("Service key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read service key")?;

    cfg.set_api(base_url.trim().to_string(), service_key.trim().to_string());
    cfg.save()?;

    println!("Saved to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn show(lat: f64, lon: f64, json: bool) -> Result<()> {
    let cfg = Config::load()?;
    let fetcher = WeatherFetcher::new(
        &cfg,
        Arc::new(StaticLocation::new(lat, lon)),
        Arc::new(SystemClock),
    );

    let snapshot = match fetcher.fetch_weather().await? {
        FetchOutcome::Fresh(s) => s,
        FetchOutcome::Cached(s) => {
            tracing::debug!(nx = s.nx, ny = s.ny, "Using cached snapshot");
            s
        }
        FetchOutcome::PermissionDenied => anyhow::bail!("Location permission denied"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", render_snapshot(&snapshot));
    }
    Ok(())
}

fn render_snapshot(s: &WeatherSnapshot) -> String {
    fn or_dash<T: ToString>(v: Option<T>) -> String {
        v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
    }

    let mut out = String::new();
    let _ = writeln!(out, "{} ({}, {}) grid {},{}", s.weather_label, s.latitude, s.longitude, s.nx, s.ny);
    let _ = writeln!(out, "  temperature    {} °C", or_dash(s.temperature));
    let _ = writeln!(out, "  humidity       {} %", or_dash(s.humidity));
    let _ = writeln!(out, "  wind           {} m/s {}", or_dash(s.wind_speed), or_dash(s.wind_direction.as_deref()));
    let _ = writeln!(out, "  precipitation  {} / {}", s.precipitation_type, s.precipitation_1h);
    let _ = writeln!(out, "  sky            {}", or_dash(s.sky_label.as_deref()));
    let _ = writeln!(out, "  icon           {}", or_dash(s.icon.map(|i| i.as_str())));
    let _ = writeln!(out, "  issued         {} {}", s.base_date, s.base_time);
    out
}
