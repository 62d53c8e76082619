use std::{fmt, time::Duration};

/// Suspension points that are bounded by a timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Permission,
    Position,
    NowcastRequest,
    ForecastRequest,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Permission => "location permission request",
            Stage::Position => "position fix",
            Stage::NowcastRequest => "nowcast request",
            Stage::ForecastRequest => "forecast request",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced while acquiring a weather snapshot.
///
/// Callers that only need a message render these with `to_string()`;
/// permission denial is not an error and is reported through
/// [`crate::fetch::FetchOutcome`] instead.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("{stage} timed out after {}s", .after.as_secs())]
    Timeout { stage: Stage, after: Duration },

    #[error("API 설정이 누락되었습니다")]
    ConfigMissing,

    #[error("Location unavailable: {0}")]
    Location(String),

    #[error("{0}")]
    Upstream(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl WeatherError {
    pub fn upstream<S: Into<String>>(message: S) -> Self {
        Self::Upstream(message.into())
    }

    pub fn location<S: Into<String>>(message: S) -> Self {
        Self::Location(message.into())
    }
}

pub type Result<T> = std::result::Result<T, WeatherError>;
