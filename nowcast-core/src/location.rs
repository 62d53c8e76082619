//! Location permission and position acquisition.

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{error::Result, model::Coordinate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Requested fix quality, passed through to the platform provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accuracy {
    Low,
    #[default]
    Balanced,
    High,
}

#[async_trait]
pub trait LocationProvider: Send + Sync + Debug {
    /// Ask for foreground location access.
    async fn request_permission(&self) -> Result<PermissionStatus>;

    /// Current position. Failures should be reported as
    /// [`crate::WeatherError::Location`].
    async fn current_position(&self, accuracy: Accuracy) -> Result<Coordinate>;
}

/// Provider that always reports the same position.
///
/// Used where the position is known up front, e.g. coordinates passed on a
/// command line.
#[derive(Debug, Clone)]
pub struct StaticLocation {
    coordinate: Coordinate,
    permission: PermissionStatus,
}

impl StaticLocation {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            coordinate: Coordinate { latitude, longitude },
            permission: PermissionStatus::Granted,
        }
    }

    pub fn denied() -> Self {
        Self {
            coordinate: Coordinate { latitude: 0.0, longitude: 0.0 },
            permission: PermissionStatus::Denied,
        }
    }
}

#[async_trait]
impl LocationProvider for StaticLocation {
    async fn request_permission(&self) -> Result<PermissionStatus> {
        Ok(self.permission)
    }

    async fn current_position(&self, _accuracy: Accuracy) -> Result<Coordinate> {
        Ok(self.coordinate)
    }
}
