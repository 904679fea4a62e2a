//! Configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::secret::SecretString;

/// Root configuration, as found in `.tracely/config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracelySettings {
    /// Reporting credentials and collector address.
    pub sdk: TracelyConfig,
    /// Delivery behaviour.
    pub transport: TransportConfig,
    /// Error capture behaviour.
    pub capture: CaptureConfig,
    /// Dashboard API access.
    pub dashboard: DashboardConfig,
}

/// SDK credentials.
///
/// Supplied once when the client is constructed and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracelyConfig {
    /// Application identifier sent as `X-App-Id`.
    pub app_id: String,
    /// Shared HMAC secret.
    pub app_secret: SecretString,
    /// Collector base URL, e.g. `http://localhost:3001`.
    pub host: String,
    /// Unit of the `X-Timestamp` header.
    pub timestamp_unit: TimestampUnit,
}

impl TracelyConfig {
    /// Create a config with the default timestamp unit.
    pub fn new(
        app_id: impl Into<String>,
        app_secret: impl Into<SecretString>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            host: host.into(),
            timestamp_unit: TimestampUnit::default(),
        }
    }

    /// Override the timestamp unit.
    pub fn with_timestamp_unit(mut self, unit: TimestampUnit) -> Self {
        self.timestamp_unit = unit;
        self
    }
}

/// Unit of the signed request timestamp.
///
/// The collector has to agree with the client on this; it is configuration,
/// not a constant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampUnit {
    /// Epoch milliseconds.
    #[default]
    #[serde(alias = "ms", alias = "milliseconds")]
    Millis,
    /// Epoch seconds.
    #[serde(alias = "s", alias = "secs")]
    Seconds,
}

impl TimestampUnit {
    /// Parse from a loose string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "millis" | "ms" | "milliseconds" => Some(Self::Millis),
            "seconds" | "secs" | "s" => Some(Self::Seconds),
            _ => None,
        }
    }

    /// Render an epoch-milliseconds instant in this unit.
    pub fn render(&self, epoch_millis: u64) -> String {
        match self {
            Self::Millis => epoch_millis.to_string(),
            Self::Seconds => (epoch_millis / 1000).to_string(),
        }
    }
}

/// Report delivery configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Per-request timeout (ms).
    pub timeout_ms: u64,
    /// Pending reports held before new ones are dropped.
    pub queue_capacity: usize,
    /// Delivery attempts per report. 1 disables retries.
    pub max_attempts: u32,
    /// Delay between attempts (ms).
    pub retry_delay_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            queue_capacity: 100,
            max_attempts: 1,
            retry_delay_ms: 1_000,
        }
    }
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Error capture configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Duplicate-suppression window per fingerprint (ms).
    pub throttle_window_ms: u64,
    /// Minimum time between sweeps of expired throttle entries (ms).
    pub sweep_interval_ms: u64,
    /// Fingerprint length cap, in characters.
    pub fingerprint_max_chars: usize,
    /// Install a panic hook on init.
    pub capture_panics: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            throttle_window_ms: 60_000,
            sweep_interval_ms: 60_000,
            fingerprint_max_chars: 200,
            capture_panics: true,
        }
    }
}

impl CaptureConfig {
    pub fn throttle_window(&self) -> Duration {
        Duration::from_millis(self.throttle_window_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

/// Dashboard API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Dashboard API base URL.
    pub base_url: String,
    /// Directory for persisted local state. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            data_dir: None,
        }
    }
}

impl DashboardConfig {
    /// Resolve the state directory.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("tracely")
        })
    }

    /// File holding persisted local state.
    pub fn state_file(&self) -> PathBuf {
        self.resolved_data_dir().join("state.json")
    }
}
