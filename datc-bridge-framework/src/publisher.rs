//! Zenoh publisher for bridge output.

use std::sync::Arc;

use serde::Serialize;

use datc_common::{Format, encode};

use crate::error::{BridgeError, Result};

/// Publishes serializable values under a key prefix.
#[derive(Clone, Debug)]
pub struct Publisher {
    session: Arc<zenoh::Session>,
    key_prefix: String,
    format: Format,
}

impl Publisher {
    pub fn new(
        session: Arc<zenoh::Session>,
        key_prefix: impl Into<String>,
        format: Format,
    ) -> Self {
        Self {
            session,
            key_prefix: key_prefix.into(),
            format,
        }
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn session(&self) -> &Arc<zenoh::Session> {
        &self.session
    }

    /// Build a full key expression from a suffix.
    pub fn build_key(&self, suffix: &str) -> String {
        join_key(&self.key_prefix, suffix)
    }

    /// Publish `value` at `<key_prefix>/<key_suffix>` in the publisher's format.
    pub async fn publish<T: Serialize>(&self, key_suffix: &str, value: &T) -> Result<()> {
        let key = self.build_key(key_suffix);
        self.publish_to_key(&key, value).await
    }

    /// Publish `value` at a full key, ignoring the prefix.
    pub async fn publish_to_key<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let payload =
            encode(value, self.format).map_err(|e| BridgeError::Serialization(e.to_string()))?;
        self.publish_raw(key, payload).await
    }

    /// Publish raw bytes to a key.
    pub async fn publish_raw(&self, key: &str, payload: Vec<u8>) -> Result<()> {
        self.session
            .put(key, payload)
            .await
            .map_err(|e| BridgeError::publish(key, e))
    }

    /// Publish a value as JSON whatever the configured format (status messages).
    pub async fn publish_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let payload = serde_json::to_vec(value)?;
        self.publish_raw(key, payload).await
    }
}

fn join_key(prefix: &str, suffix: &str) -> String {
    match (prefix.is_empty(), suffix.is_empty()) {
        (_, true) => prefix.to_string(),
        (true, false) => suffix.to_string(),
        (false, false) => format!("{}/{}", prefix, suffix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Publishing needs a live session; key building is covered here.
    #[test]
    fn test_join_key() {
        assert_eq!(
            join_key("datc/gripper", "gripper01/state"),
            "datc/gripper/gripper01/state"
        );
        assert_eq!(join_key("datc/gripper", ""), "datc/gripper");
        assert_eq!(join_key("", "gripper01/state"), "gripper01/state");
    }
}
