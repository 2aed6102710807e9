use anyhow::{Context, Result, anyhow, bail};
use chrono::Duration as ChronoDuration;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

use crate::{chart::ChartOptions, model::ForecastRequest, transport::RetryPolicy};

/// Upper bound for any retry delay setting, one day.
const MAX_BACKOFF_SECS: f64 = 86_400.0;

/// Horizon the API uses when `forecast_days` is not sent.
const DEFAULT_FORECAST_DAYS: u8 = 7;

/// Where the forecast is taken for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LocationConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA zone name passed through to the API, e.g. "Asia/Tokyo".
    pub timezone: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            name: "Tokyo Disneyland".to_string(),
            latitude: 35.6331,
            longitude: 139.8806,
            timezone: "Asia/Tokyo".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RequestConfig {
    pub endpoint: String,
    pub hourly: Vec<String>,
    /// Forecast horizon; the API defaults to 7 days when absent.
    pub forecast_days: Option<u8>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.open-meteo.com/v1/forecast".to_string(),
            hourly: vec!["temperature_2m".to_string(), "relative_humidity_2m".to_string()],
            forecast_days: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Defaults to the platform cache directory.
    pub dir: Option<PathBuf>,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true, dir: None, ttl_secs: 3600 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_factor_secs: f64,
    pub max_backoff_secs: f64,
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_factor_secs: 0.2,
            max_backoff_secs: 120.0,
            retry_statuses: vec![500, 502, 504],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChartConfig {
    /// Defaults to a title naming the location and the forecast horizon.
    pub title: Option<String>,
    pub tick_hours: u32,
    pub tick_angle: i32,
    /// chrono format string for x-axis tick labels.
    pub tick_format: String,
    pub width: u64,
    pub height: u64,
    /// Defaults to `forecast.html` in the cache directory.
    pub output: Option<PathBuf>,
    pub open: bool,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            title: None,
            tick_hours: 6,
            tick_angle: 60,
            tick_format: "%m/%d(%a) %H:00".to_string(),
            width: 1600,
            height: 800,
            output: None,
            open: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

/// Top-level configuration. Every field has a default, so an absent or
/// partial `config.toml` is fine.
///
/// Example TOML:
/// [location]
/// name = "Osaka"
/// latitude = 34.69
/// longitude = 135.50
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub location: LocationConfig,
    pub request: RequestConfig,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    pub chart: ChartConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load config from the platform config directory, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load config from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        cfg.validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let loc = &self.location;
        if !(-90.0..=90.0).contains(&loc.latitude) {
            bail!("Latitude {} is outside [-90, 90]", loc.latitude);
        }
        if !(-180.0..=180.0).contains(&loc.longitude) {
            bail!("Longitude {} is outside [-180, 180]", loc.longitude);
        }
        if self.request.hourly.is_empty() {
            bail!("At least one hourly variable must be requested");
        }
        if self.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        for (key, secs) in [
            ("retry.backoff_factor_secs", self.retry.backoff_factor_secs),
            ("retry.max_backoff_secs", self.retry.max_backoff_secs),
        ] {
            if !secs.is_finite() || !(0.0..=MAX_BACKOFF_SECS).contains(&secs) {
                bail!("{key} must be between 0 and {MAX_BACKOFF_SECS} seconds, got {secs}");
            }
        }
        if self.chart.tick_hours == 0 {
            bail!("chart.tick_hours must be at least 1");
        }
        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Directory holding cached API responses.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.cache.dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::project_dirs()?.cache_dir().join("responses")),
        }
    }

    /// Where the rendered chart is written.
    pub fn output_path(&self) -> Result<PathBuf> {
        match &self.chart.output {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::project_dirs()?.cache_dir().join("forecast.html")),
        }
    }

    pub fn forecast_request(&self) -> ForecastRequest {
        ForecastRequest {
            latitude: self.location.latitude,
            longitude: self.location.longitude,
            hourly: self.request.hourly.clone(),
            timezone: self.location.timezone.clone(),
            forecast_days: self.request.forecast_days,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            backoff_factor: backoff_duration(self.retry.backoff_factor_secs),
            max_backoff: backoff_duration(self.retry.max_backoff_secs),
            retry_statuses: self.retry.retry_statuses.clone(),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn chart_options(&self) -> ChartOptions {
        let title = self.chart.title.clone().unwrap_or_else(|| {
            let days = self.request.forecast_days.unwrap_or(DEFAULT_FORECAST_DAYS);
            format!(
                "{}: {days}-day hourly temperature and humidity forecast",
                self.location.name
            )
        });

        ChartOptions {
            title,
            tick_spacing: ChronoDuration::hours(i64::from(self.chart.tick_hours)),
            tick_format: self.chart.tick_format.clone(),
            tick_angle: self.chart.tick_angle,
        }
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "forecast-chart", "forecast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }
}

/// Seconds to `Duration`, clamped to `[0, MAX_BACKOFF_SECS]`; NaN becomes zero.
fn backoff_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.clamp(0.0, MAX_BACKOFF_SECS)).unwrap_or(Duration::ZERO)
}
