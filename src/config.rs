//! Configuration management for `TrafficLens`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::TrafficLensError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "TRAFFICLENS_CONFIG";

/// Root configuration structure for the `TrafficLens` service
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrafficLensConfig {
    /// Inbound HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Azure Maps client settings
    #[serde(default)]
    pub maps: MapsConfig,
    /// Upstream query defaults
    #[serde(default)]
    pub defaults: DefaultsConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Inbound HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Whole-request timeout, upstream calls included
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u32,
    /// Maximum accepted request body size in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
    /// PEM certificate, enables HTTPS together with `tls_key_path`
    pub tls_cert_path: Option<String>,
    /// PEM private key
    pub tls_key_path: Option<String>,
}

/// Azure Maps client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapsConfig {
    /// Base URL of the Azure Maps REST surface
    #[serde(default = "default_maps_base_url")]
    pub base_url: String,
    /// Value sent as `api-version` on every call
    #[serde(default = "default_maps_api_version")]
    pub api_version: String,
    /// Per-call timeout in seconds
    #[serde(default = "default_maps_timeout")]
    pub timeout_seconds: u32,
    /// Retries for transient failures (5xx, 429, connection errors)
    #[serde(default = "default_maps_max_retries")]
    pub max_retries: u32,
    /// Used when a request carries no `subscription_key` header
    pub subscription_key: Option<String>,
}

/// Upstream query defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_flow_zoom")]
    pub flow_zoom: u8,
    #[serde(default = "default_flow_style")]
    pub flow_style: String,
    #[serde(default = "default_flow_unit")]
    pub flow_unit: String,
    #[serde(default = "default_incident_zoom")]
    pub incident_zoom: u8,
    #[serde(default = "default_incident_style")]
    pub incident_style: String,
    /// Degrees added to both axes to build the synthetic end of a single-location request
    #[serde(default = "default_synthetic_offset")]
    pub synthetic_offset_degrees: f64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// OTLP/HTTP collector endpoint; span export is off when unset
    pub otlp_endpoint: Option<String>,
}

// Default value functions
fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    7071
}

fn default_request_timeout() -> u32 {
    60
}

fn default_body_limit() -> usize {
    16 * 1024
}

fn default_maps_base_url() -> String {
    "https://atlas.microsoft.com".to_string()
}

fn default_maps_api_version() -> String {
    "1.0".to_string()
}

fn default_maps_timeout() -> u32 {
    30
}

fn default_maps_max_retries() -> u32 {
    3
}

fn default_flow_zoom() -> u8 {
    5
}

fn default_flow_style() -> String {
    "absolute".to_string()
}

fn default_flow_unit() -> String {
    "KMPH".to_string()
}

fn default_incident_zoom() -> u8 {
    5
}

fn default_incident_style() -> String {
    "s1".to_string()
}

fn default_synthetic_offset() -> f64 {
    0.1
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            request_timeout_seconds: default_request_timeout(),
            body_limit_bytes: default_body_limit(),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            base_url: default_maps_base_url(),
            api_version: default_maps_api_version(),
            timeout_seconds: default_maps_timeout(),
            max_retries: default_maps_max_retries(),
            subscription_key: None,
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            flow_zoom: default_flow_zoom(),
            flow_style: default_flow_style(),
            flow_unit: default_flow_unit(),
            incident_zoom: default_incident_zoom(),
            incident_style: default_incident_style(),
            synthetic_offset_degrees: default_synthetic_offset(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            otlp_endpoint: None,
        }
    }
}

impl TrafficLensConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from))
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| PathBuf::from("config.toml"));

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // TRAFFICLENS_SERVER__PORT=8080 overrides server.port
        builder = builder.add_source(
            Environment::with_prefix("TRAFFICLENS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: TrafficLensConfig = settings
            .try_deserialize()
            .with_context(|| {
                format!(
                    "Failed to deserialize configuration from {}",
                    config_file.display()
                )
            })?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Apply default values to empty configuration fields
    pub fn apply_defaults(&mut self) {
        if self.server.host.is_empty() {
            self.server.host = default_server_host();
        }
        if self.server.request_timeout_seconds == 0 {
            self.server.request_timeout_seconds = default_request_timeout();
        }
        if self.server.body_limit_bytes == 0 {
            self.server.body_limit_bytes = default_body_limit();
        }
        if self.maps.base_url.is_empty() {
            self.maps.base_url = default_maps_base_url();
        }
        if self.maps.api_version.is_empty() {
            self.maps.api_version = default_maps_api_version();
        }
        if self.maps.timeout_seconds == 0 {
            self.maps.timeout_seconds = default_maps_timeout();
        }
        if self.defaults.flow_style.is_empty() {
            self.defaults.flow_style = default_flow_style();
        }
        if self.defaults.flow_unit.is_empty() {
            self.defaults.flow_unit = default_flow_unit();
        }
        if self.defaults.incident_style.is_empty() {
            self.defaults.incident_style = default_incident_style();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        // Blank env overrides mean "unset"
        if self.maps.subscription_key.as_deref().is_some_and(str::is_empty) {
            self.maps.subscription_key = None;
        }
        if self.logging.otlp_endpoint.as_deref().is_some_and(str::is_empty) {
            self.logging.otlp_endpoint = None;
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.maps.timeout_seconds > 300 {
            return Err(
                TrafficLensError::config("Maps API timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.maps.max_retries > 10 {
            return Err(TrafficLensError::config("Maps API max retries cannot exceed 10").into());
        }

        if self.server.request_timeout_seconds > 900 {
            return Err(
                TrafficLensError::config("Request timeout cannot exceed 900 seconds").into(),
            );
        }

        if self.defaults.flow_zoom > 22 {
            return Err(TrafficLensError::config("Flow zoom must be between 0 and 22").into());
        }

        if self.defaults.incident_zoom > 22 {
            return Err(TrafficLensError::config("Incident zoom must be between 0 and 22").into());
        }

        let offset = self.defaults.synthetic_offset_degrees;
        if !offset.is_finite() || offset <= 0.0 || offset > 5.0 {
            return Err(TrafficLensError::config(
                "Synthetic offset must be greater than 0 and at most 5 degrees",
            )
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(TrafficLensError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(TrafficLensError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.maps.base_url.starts_with("http://")
            && !self.maps.base_url.starts_with("https://")
        {
            return Err(
                TrafficLensError::config("Maps API base URL must be a valid HTTP or HTTPS URL")
                    .into(),
            );
        }

        if self.server.tls_cert_path.is_some() != self.server.tls_key_path.is_some() {
            return Err(TrafficLensError::config(
                "TLS needs both tls_cert_path and tls_key_path",
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_default_config() {
        let config = TrafficLensConfig::default();
        assert_eq!(config.maps.base_url, "https://atlas.microsoft.com");
        assert_eq!(config.maps.api_version, "1.0");
        assert_eq!(config.defaults.flow_zoom, 5);
        assert_eq!(config.defaults.flow_style, "absolute");
        assert_eq!(config.defaults.flow_unit, "KMPH");
        assert_eq!(config.defaults.incident_style, "s1");
        assert_eq!(config.defaults.synthetic_offset_degrees, 0.1);
        assert_eq!(config.logging.level, "info");
        assert!(config.maps.subscription_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = TrafficLensConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = TrafficLensConfig::default();
        config.maps.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));
    }

    #[test]
    fn test_config_validation_base_url_scheme() {
        let mut config = TrafficLensConfig::default();
        config.maps.base_url = "atlas.microsoft.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_half_tls() {
        let mut config = TrafficLensConfig::default();
        config.server.tls_cert_path = Some("cert.pem".to_string());
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("TLS"));
    }

    #[test]
    fn test_apply_defaults_fills_blanks() {
        let mut config = TrafficLensConfig::default();
        config.maps.base_url.clear();
        config.defaults.flow_unit.clear();
        config.maps.subscription_key = Some(String::new());
        config.apply_defaults();
        assert_eq!(config.maps.base_url, "https://atlas.microsoft.com");
        assert_eq!(config.defaults.flow_unit, "KMPH");
        assert!(config.maps.subscription_key.is_none());
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults_and_env() {
        // SAFETY: Test environment, setting test values only
        unsafe {
            env::set_var("TRAFFICLENS_DEFAULTS__FLOW_UNIT", "MPH");
        }

        let config = TrafficLensConfig::load_from_path(Some(PathBuf::from(
            "does-not-exist/trafficlens.toml",
        )));

        // SAFETY: Test cleanup
        unsafe {
            env::remove_var("TRAFFICLENS_DEFAULTS__FLOW_UNIT");
        }

        let config = config.unwrap();
        assert_eq!(config.defaults.flow_unit, "MPH");
        assert_eq!(config.defaults.flow_zoom, 5);
    }
}
