use serde::{Deserialize, Serialize};

/// A timestamped value published by the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample<T> {
    /// Unix epoch milliseconds when the value was read from the device.
    pub timestamp: i64,

    /// Device identifier (the configured gripper name).
    pub source: String,

    pub value: T,
}

impl<T> Sample<T> {
    /// Wrap a value with the current time.
    pub fn new(source: impl Into<String>, value: T) -> Self {
        Self {
            timestamp: current_timestamp_millis(),
            source: source.into(),
            value,
        }
    }
}

/// Current time in milliseconds since the Unix epoch.
pub fn current_timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
