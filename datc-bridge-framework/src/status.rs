//! Bridge status reporting.

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::publisher::Publisher;

/// Lifecycle state reported at `<key_prefix>/@/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeState {
    Running,
    Offline,
}

/// Bridge status message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeStatus {
    pub bridge: String,
    pub version: String,
    pub status: BridgeState,
    /// Bridge-specific fields, flattened into the message.
    #[serde(flatten)]
    pub metadata: serde_json::Value,
}

impl BridgeStatus {
    fn with_state(bridge: impl Into<String>, version: impl Into<String>, status: BridgeState) -> Self {
        Self {
            bridge: bridge.into(),
            version: version.into(),
            status,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn running(bridge: impl Into<String>, version: impl Into<String>) -> Self {
        Self::with_state(bridge, version, BridgeState::Running)
    }

    pub fn offline(bridge: impl Into<String>, version: impl Into<String>) -> Self {
        Self::with_state(bridge, version, BridgeState::Offline)
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Publish to `<key_prefix>/@/status`, always as JSON.
    pub async fn publish(&self, publisher: &Publisher) -> Result<()> {
        let key = publisher.build_key("@/status");
        publisher.publish_json(&key, self).await
    }
}

/// Publishes running/offline status for one bridge.
pub struct StatusPublisher {
    publisher: Publisher,
    bridge_name: String,
    version: String,
}

impl StatusPublisher {
    pub fn new(
        publisher: Publisher,
        bridge_name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            publisher,
            bridge_name: bridge_name.into(),
            version: version.into(),
        }
    }

    pub async fn publish_running(&self, metadata: Option<serde_json::Value>) -> Result<()> {
        let mut status = BridgeStatus::running(&self.bridge_name, &self.version);
        if let Some(meta) = metadata {
            status = status.with_metadata(meta);
        }
        status.publish(&self.publisher).await
    }

    pub async fn publish_offline(&self) -> Result<()> {
        BridgeStatus::offline(&self.bridge_name, &self.version)
            .publish(&self.publisher)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_running() {
        let status = BridgeStatus::running("datc", "0.1.0");
        assert_eq!(status.bridge, "datc");
        assert_eq!(status.status, BridgeState::Running);
    }

    #[test]
    fn test_status_serialization() {
        let status = BridgeStatus::running("datc", "1.0.0").with_metadata(serde_json::json!({
            "device": "gripper01",
            "port": "/dev/ttyUSB0",
            "poll_rate_hz": 100
        }));

        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"bridge\":\"datc\""));
        assert!(json.contains("\"status\":\"running\""));
        assert!(json.contains("\"device\":\"gripper01\""));
        assert!(json.contains("\"poll_rate_hz\":100"));
    }

    #[test]
    fn test_offline_without_metadata() {
        let json = serde_json::to_value(BridgeStatus::offline("datc", "1.0.0")).unwrap();
        assert_eq!(json["status"], "offline");
    }
}
