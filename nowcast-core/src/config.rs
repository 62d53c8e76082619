use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::error::WeatherError;

pub const ENV_BASE_URL: &str = "KMA_API_BASE_URL";
pub const ENV_SERVICE_KEY: &str = "KMA_SERVICE_KEY";

/// Connection settings for the KMA ultra-short-term service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// e.g. `https://apis.data.go.kr/1360000/VilageFcstInfoService_2.0`
    pub base_url: Option<String>,

    /// Service key as issued by the data portal. Either the raw or the
    /// percent-encoded form is accepted.
    pub service_key: Option<String>,
}

/// Validated, ready-to-use API settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub base_url: String,
    pub service_key: String,
}

impl ApiConfig {
    /// Both values present and non-blank, or [`WeatherError::ConfigMissing`].
    pub fn settings(&self) -> Result<ApiSettings, WeatherError> {
        let base_url = non_blank(self.base_url.as_deref()).ok_or(WeatherError::ConfigMissing)?;
        let service_key =
            non_blank(self.service_key.as_deref()).ok_or(WeatherError::ConfigMissing)?;

        Ok(ApiSettings {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: decode_service_key(service_key),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// The portal hands out an "encoding" key that is already percent-encoded.
/// Decode it so the HTTP layer does not encode it a second time.
fn decode_service_key(key: &str) -> String {
    if !key.contains('%') {
        return key.to_string();
    }
    match urlencoding::decode(key) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            tracing::warn!("Service key is not valid percent-encoding, using it verbatim: {e}");
            key.to_string()
        }
    }
}

/// Bounds on each suspension point, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub permission_secs: u64,
    pub position_secs: u64,
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { permission_secs: 8, position_secs: 10, request_secs: 10 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub permission: Duration,
    pub position: Duration,
    pub request: Duration,
}

impl From<TimeoutConfig> for Timeouts {
    fn from(cfg: TimeoutConfig) -> Self {
        Self {
            permission: Duration::from_secs(cfg.permission_secs),
            position: Duration::from_secs(cfg.position_secs),
            request: Duration::from_secs(cfg.request_secs),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        TimeoutConfig::default().into()
    }
}

fn default_cache_ttl_secs() -> u64 {
    300
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// cache_ttl_secs = 300
///
/// [api]
/// base_url = "https://apis.data.go.kr/1360000/VilageFcstInfoService_2.0"
/// service_key = "..."
///
/// [timeouts]
/// request_secs = 10
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    // Plain values first: TOML needs them ahead of any table.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            api: ApiConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let cfg = Self::load_from(&path)?;
        Ok(cfg.with_env_overrides(|name| std::env::var(name).ok()))
    }

    /// Load config from `path`, or return an empty default if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "nowcast", "nowcast-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Environment values win over whatever the file holds.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.api.base_url = Some(url);
        }
        if let Some(key) = lookup(ENV_SERVICE_KEY).filter(|v| !v.trim().is_empty()) {
            self.api.service_key = Some(key);
        }
        self
    }

    pub fn set_api(&mut self, base_url: String, service_key: String) {
        self.api.base_url = Some(base_url);
        self.api.service_key = Some(service_key);
    }

    pub fn is_api_configured(&self) -> bool {
        self.api.settings().is_ok()
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts.into()
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(u32::try_from(self.cache_ttl_secs).unwrap_or(u32::MAX)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn missing_api_settings_error() {
        let cfg = Config::default();
        let err = cfg.api.settings().unwrap_err();

        assert!(matches!(err, WeatherError::ConfigMissing));
        assert_eq!(err.to_string(), "API 설정이 누락되었습니다");
        assert!(!cfg.is_api_configured());
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut cfg = Config::default();
        cfg.set_api("https://example.test".into(), "   ".into());
        assert!(cfg.api.settings().is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = Config::default();
        cfg.set_api("https://file.test".into(), "FILE_KEY".into());

        let cfg = cfg.with_env_overrides(env(&[(ENV_SERVICE_KEY, "ENV_KEY")]));
        let settings = cfg.api.settings().expect("settings must be complete");

        assert_eq!(settings.base_url, "https://file.test");
        assert_eq!(settings.service_key, "ENV_KEY");
    }

    #[test]
    fn env_alone_is_enough() {
        let cfg = Config::default().with_env_overrides(env(&[
            (ENV_BASE_URL, "https://apis.example/svc/"),
            (ENV_SERVICE_KEY, "KEY"),
        ]));

        let settings = cfg.api.settings().expect("settings must be complete");
        assert_eq!(settings.base_url, "https://apis.example/svc");
    }

    #[test]
    fn encoded_service_key_is_decoded() {
        let mut cfg = Config::default();
        cfg.set_api("https://x.test".into(), "abc%2Bdef%2F%3D%3D".into());

        let settings = cfg.api.settings().expect("settings must be complete");
        assert_eq!(settings.service_key, "abc+def/==");
    }

    #[test]
    fn raw_service_key_is_untouched() {
        let mut cfg = Config::default();
        cfg.set_api("https://x.test".into(), "abc+def/==".into());

        let settings = cfg.api.settings().expect("settings must be complete");
        assert_eq!(settings.service_key, "abc+def/==");
    }

    #[test]
    fn defaults_for_timeouts_and_ttl() {
        let cfg: Config = toml::from_str("").expect("empty config parses");
        assert_eq!(cfg.timeouts(), Timeouts {
            permission: Duration::from_secs(8),
            position: Duration::from_secs(10),
            request: Duration::from_secs(10),
        });
        assert_eq!(cfg.cache_ttl(), chrono::Duration::minutes(5));
    }

    #[test]
    fn partial_timeouts_keep_other_defaults() {
        let cfg: Config = toml::from_str("[timeouts]\nrequest_secs = 3\n").expect("parses");
        assert_eq!(cfg.timeouts.request_secs, 3);
        assert_eq!(cfg.timeouts.permission_secs, 8);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_api("https://x.test".into(), "KEY".into());
        cfg.cache_ttl_secs = 60;
        cfg.save_to(&path).expect("save");

        let loaded = Config::load_from(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn missing_file_loads_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = Config::load_from(&dir.path().join("absent.toml")).expect("load");
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "api = 5").expect("write");

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
