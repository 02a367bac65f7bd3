use crate::error::{Error, Result};

/// Default key expression prefix for the gripper bridge.
pub const KEY_PREFIX: &str = "datc/gripper";

/// Characters with a meaning in Zenoh key expressions.
const RESERVED: [char; 5] = ['/', '*', '$', '?', '#'];

/// What a gripper key expression addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Periodically published device state.
    State,
    /// Command service (queryable).
    Command,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::State => "state",
            Channel::Command => "@/command",
        }
    }
}

/// Builder for gripper key expressions.
///
/// Key expressions follow the pattern `<prefix>/<device>/state` for the
/// published snapshot and `<prefix>/<device>/@/command` for the command
/// service.
#[derive(Debug, Clone)]
pub struct KeyExprBuilder {
    prefix: String,
}

impl Default for KeyExprBuilder {
    fn default() -> Self {
        Self::new(KEY_PREFIX)
    }
}

impl KeyExprBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// # Example
    /// ```
    /// use datc_common::keyexpr::KeyExprBuilder;
    ///
    /// let key = KeyExprBuilder::default().state_key("gripper01");
    /// assert_eq!(key, "datc/gripper/gripper01/state");
    /// ```
    pub fn state_key(&self, device: &str) -> String {
        self.build(device, Channel::State)
    }

    /// # Example
    /// ```
    /// use datc_common::keyexpr::KeyExprBuilder;
    ///
    /// let key = KeyExprBuilder::default().command_key("gripper01");
    /// assert_eq!(key, "datc/gripper/gripper01/@/command");
    /// ```
    pub fn command_key(&self, device: &str) -> String {
        self.build(device, Channel::Command)
    }

    pub fn build(&self, device: &str, channel: Channel) -> String {
        format!("{}/{}/{}", self.prefix, device, channel.as_str())
    }

    /// State samples of every gripper under this prefix.
    pub fn all_states_wildcard(&self) -> String {
        format!("{}/*/state", self.prefix)
    }

    /// Bridge status key, `<prefix>/@/status`.
    pub fn status_key(&self) -> String {
        format!("{}/@/status", self.prefix)
    }

    /// Split a key expression produced by this builder back into device and channel.
    pub fn parse<'a>(&self, key: &'a str) -> Option<ParsedKeyExpr<'a>> {
        let rest = key.strip_prefix(self.prefix.as_str())?.strip_prefix('/')?;
        let (device, channel) = rest.split_once('/')?;

        let channel = match channel {
            "state" => Channel::State,
            "@/command" => Channel::Command,
            _ => return None,
        };

        if device.is_empty() {
            return None;
        }

        Some(ParsedKeyExpr { device, channel })
    }
}

/// Parsed components of a gripper key expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKeyExpr<'a> {
    pub device: &'a str,
    pub channel: Channel,
}

/// Check that a device name can be used as a single key expression chunk.
pub fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(Error::KeyExpr("empty segment".to_string()));
    }

    if segment.starts_with('@') || segment.contains(RESERVED) {
        return Err(Error::KeyExpr(format!(
            "'{}' contains a reserved character",
            segment
        )));
    }

    Ok(())
}
