//! Configuration trait.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{BridgeError, Result};
use crate::{Format, LoggingConfig, ZenohConfig};

/// Implemented by a bridge's top-level configuration struct.
///
/// ```ignore
/// impl BridgeConfig for DatcBridgeConfig {
///     fn zenoh(&self) -> &ZenohConfig { &self.base.zenoh }
///     fn logging(&self) -> &LoggingConfig { &self.base.logging }
///     fn key_prefix(&self) -> &str { &self.gripper.key_prefix }
/// }
/// ```
pub trait BridgeConfig: Sized + DeserializeOwned {
    fn zenoh(&self) -> &ZenohConfig;

    fn logging(&self) -> &LoggingConfig;

    /// Key expression prefix everything of this bridge is published under.
    fn key_prefix(&self) -> &str;

    /// Payload format for published values.
    fn serialization(&self) -> Format {
        Format::Json
    }

    /// Called after loading.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Load a JSON5 file and validate it.
    fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BridgeError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse JSON5 content and validate it.
    fn parse(content: &str) -> Result<Self> {
        let config: Self = json5::from_str(content)?;

        config
            .zenoh()
            .validate()
            .map_err(|e| BridgeError::validation(e.to_string()))?;
        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Deserialize)]
    struct TestConfig {
        #[serde(default)]
        zenoh: ZenohConfig,
        #[serde(default)]
        logging: LoggingConfig,
        key_prefix: String,
    }

    impl BridgeConfig for TestConfig {
        fn zenoh(&self) -> &ZenohConfig {
            &self.zenoh
        }

        fn logging(&self) -> &LoggingConfig {
            &self.logging
        }

        fn key_prefix(&self) -> &str {
            &self.key_prefix
        }

        fn validate(&self) -> Result<()> {
            if self.key_prefix.is_empty() {
                return Err(BridgeError::validation("key_prefix cannot be empty"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_config_not_found() {
        let result = TestConfig::load("/nonexistent/path.json5");
        assert!(matches!(result, Err(BridgeError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{ key_prefix: 'datc/gripper', logging: {{ level: 'debug' }} }}").unwrap();

        let config = TestConfig::load(file.path()).unwrap();
        assert_eq!(config.key_prefix(), "datc/gripper");
        assert_eq!(config.logging().level, "debug");
        assert_eq!(config.serialization(), Format::Json);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let result = TestConfig::parse("{ key_prefix: '' }");
        assert!(matches!(result, Err(BridgeError::ConfigValidation(_))));

        let result = TestConfig::parse("{ key_prefix: 'x', zenoh: { mode: 'bogus' } }");
        assert!(matches!(result, Err(BridgeError::ConfigValidation(_))));
    }

    #[test]
    fn test_parse_error() {
        let result = TestConfig::parse("{ key_prefix: ");
        assert!(matches!(result, Err(BridgeError::ConfigParse(_))));
    }
}
