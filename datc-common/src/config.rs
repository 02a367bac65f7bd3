use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::serialization::Format;

/// Zenoh modes accepted by [`ZenohConfig::mode`].
pub const ZENOH_MODES: [&str; 3] = ["client", "peer", "router"];

/// Zenoh session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZenohConfig {
    /// Zenoh mode: "client", "peer", or "router".
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Endpoints to connect to (e.g. a router next to the robot controller).
    #[serde(default)]
    pub connect: Vec<String>,

    /// Endpoints to listen on.
    #[serde(default)]
    pub listen: Vec<String>,
}

fn default_mode() -> String {
    "peer".to_string()
}

impl Default for ZenohConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            connect: Vec::new(),
            listen: Vec::new(),
        }
    }
}

impl ZenohConfig {
    /// Reject modes Zenoh would refuse at session open.
    pub fn validate(&self) -> Result<()> {
        if ZENOH_MODES.contains(&self.mode.as_str()) {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "Invalid Zenoh mode: '{}'. Expected one of {:?}",
                self.mode, ZENOH_MODES
            )))
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive, e.g. "info" or "zenoh_bridge_datc=debug,zenoh=warn".
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Same format, different level (used for the `--log-level` override).
    pub fn with_level(&self, level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: self.format,
        }
    }
}

/// Sections every bridge configuration file carries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaseConfig {
    #[serde(default)]
    pub zenoh: ZenohConfig,

    /// Payload format for published state samples.
    #[serde(default)]
    pub serialization: Format,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Parse a JSON5 configuration string.
pub fn parse_config<T: for<'de> Deserialize<'de>>(content: &str) -> Result<T> {
    json5::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_config() {
        let json5 = r#"
        {
            zenoh: {
                mode: "client",
                connect: ["tcp/10.0.0.2:7447"],
            },
            serialization: "cbor",
            logging: {
                level: "debug",
            },
        }
        "#;

        let config: BaseConfig = parse_config(json5).unwrap();

        assert_eq!(config.zenoh.mode, "client");
        assert_eq!(config.zenoh.connect, vec!["tcp/10.0.0.2:7447"]);
        assert_eq!(config.serialization, Format::Cbor);
        assert_eq!(config.logging.level, "debug");
        assert!(config.zenoh.validate().is_ok());
    }

    #[test]
    fn test_default_config() {
        let config: BaseConfig = parse_config("{}").unwrap();

        assert_eq!(config.zenoh.mode, "peer");
        assert!(config.zenoh.connect.is_empty());
        assert_eq!(config.serialization, Format::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_invalid_zenoh_mode() {
        let config: BaseConfig = parse_config(r#"{ zenoh: { mode: "mesh" } }"#).unwrap();
        assert!(matches!(config.zenoh.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_level_override_keeps_format() {
        let config: BaseConfig =
            parse_config(r#"{ logging: { level: "warn", format: "json" } }"#).unwrap();

        let overridden = config.logging.with_level("trace");
        assert_eq!(overridden.level, "trace");
        assert_eq!(overridden.format, LogFormat::Json);
    }
}
