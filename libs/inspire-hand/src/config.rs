//! Hand connection configuration
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults
//! 2. Config file (YAML, TOML or JSON, picked by extension)
//! 3. `INSPIRE_HAND_*` environment variables
//!
//! Command line overrides are applied by the caller on top of the result.

use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::DriverOptions;
use crate::error::{HandError, Result};
use crate::modbus::SerialParams;

/// Environment variable prefix, e.g. `INSPIRE_HAND_PORT`
pub const ENV_PREFIX: &str = "INSPIRE_HAND_";

/// Highest slave id the hand accepts
pub const MAX_SLAVE_ID: u8 = 254;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandConfig {
    /// Serial device path
    pub port: String,
    pub baud_rate: u32,
    pub slave_id: u8,
    pub response_timeout_ms: u64,
    /// Line-idle gap that ends a reply frame
    pub inter_byte_timeout_ms: u64,
    pub calibration_settle_ms: u64,
    pub gesture_settle_ms: u64,
}

impl Default for HandConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            slave_id: 1,
            response_timeout_ms: 1000,
            inter_byte_timeout_ms: 50,
            calibration_settle_ms: 6000,
            gesture_settle_ms: 500,
        }
    }
}

impl HandConfig {
    /// Load defaults, then `path` if given, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(HandConfig::default()));

        if let Some(path) = path {
            if !path.exists() {
                return Err(HandError::config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            figment = match path.extension().and_then(|s| s.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("toml") => figment.merge(Toml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                other => {
                    return Err(HandError::config(format!(
                        "Unsupported config file format: {}",
                        other.unwrap_or("<none>")
                    )))
                },
            };
            debug!("Config file: {}", path.display());
        }

        let config: HandConfig = figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(|e| HandError::config(format!("Failed to load configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(HandError::config("port must not be empty"));
        }
        if self.baud_rate == 0 {
            return Err(HandError::config("baud_rate must be positive"));
        }
        if self.slave_id == 0 || self.slave_id > MAX_SLAVE_ID {
            return Err(HandError::config(format!(
                "slave_id {} outside 1-{}",
                self.slave_id, MAX_SLAVE_ID
            )));
        }
        if self.response_timeout_ms == 0 {
            return Err(HandError::config("response_timeout_ms must be positive"));
        }
        if self.inter_byte_timeout_ms == 0 {
            return Err(HandError::config("inter_byte_timeout_ms must be positive"));
        }
        Ok(())
    }

    pub fn serial_params(&self) -> SerialParams {
        SerialParams {
            device: self.port.clone(),
            baud_rate: self.baud_rate,
            inter_byte_timeout: Duration::from_millis(self.inter_byte_timeout_ms),
        }
    }

    pub fn driver_options(&self) -> DriverOptions {
        DriverOptions {
            response_timeout: Duration::from_millis(self.response_timeout_ms),
            calibration_settle: Duration::from_millis(self.calibration_settle_ms),
            gesture_settle: Duration::from_millis(self.gesture_settle_ms),
        }
    }
}
