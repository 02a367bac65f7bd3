//! Zenoh surface of the gripper: command queryable and snapshot publication.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use datc_bridge_framework::{BridgeError, Publisher};
use datc_common::serialization::detect_format;
use datc_common::{Format, decode, encode};

use crate::command::GripperCommand;
use crate::error::CommandError;
use crate::gripper::Gripper;
use crate::poller::SnapshotReceiver;
use crate::transport::RegisterTransport;

/// Reply to a command query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReply {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandReply {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
        }
    }
}

impl From<Result<(), CommandError>> for CommandReply {
    fn from(result: Result<(), CommandError>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => Self::failed(e),
        }
    }
}

/// Parse a request payload (JSON or CBOR).
pub fn parse_command(payload: &[u8]) -> Result<GripperCommand, CommandError> {
    if payload.is_empty() {
        return Err(CommandError::UnknownCommand("empty request".to_string()));
    }
    decode(payload, detect_format(payload)).map_err(|e| CommandError::UnknownCommand(e.to_string()))
}

/// Run one request against the gripper. The reply uses the request's format.
pub async fn handle_request<T: RegisterTransport>(
    gripper: &Gripper<T>,
    payload: &[u8],
) -> (CommandReply, Format) {
    let format = if payload.is_empty() {
        Format::Json
    } else {
        detect_format(payload)
    };

    let result = match parse_command(payload) {
        Ok(command) => {
            debug!(gripper = %gripper.name(), command = command.name(), "Command received");
            gripper.execute(&command).await
        }
        Err(e) => {
            warn!(gripper = %gripper.name(), error = %e, "Unparseable command request");
            Err(e)
        }
    };

    (CommandReply::from(result), format)
}

/// Queryable answering gripper commands.
pub struct CommandService<T> {
    gripper: Arc<Gripper<T>>,
    session: Arc<zenoh::Session>,
    key: String,
}

impl<T: RegisterTransport + 'static> CommandService<T> {
    pub fn new(gripper: Arc<Gripper<T>>, session: Arc<zenoh::Session>, key: impl Into<String>) -> Self {
        Self {
            gripper,
            session,
            key: key.into(),
        }
    }

    /// Serve queries until shutdown. Requests are handled one at a time.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), BridgeError> {
        let queryable = self.session.declare_queryable(&self.key).await?;
        info!(key = %self.key, "Command service ready");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                query = queryable.recv_async() => {
                    let query = match query {
                        Ok(query) => query,
                        Err(e) => {
                            warn!(error = %e, "Command queryable closed");
                            break;
                        }
                    };

                    let payload = query
                        .payload()
                        .map(|p| p.to_bytes().to_vec())
                        .unwrap_or_default();
                    let (reply, format) = handle_request(&self.gripper, &payload).await;

                    let bytes = match encode(&reply, format) {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            warn!(error = %e, "Failed to encode command reply");
                            continue;
                        }
                    };
                    if let Err(e) = query.reply(query.key_expr().clone(), bytes).await {
                        warn!(key = %self.key, error = %e, "Failed to send command reply");
                    }
                }
            }
        }

        if let Err(e) = queryable.undeclare().await {
            warn!(error = %e, "Failed to undeclare command queryable");
        }
        info!(key = %self.key, "Command service stopped");
        Ok(())
    }
}

/// Publish every fresh snapshot on `key` until shutdown.
pub async fn forward_snapshots(
    mut snapshots: SnapshotReceiver,
    publisher: Publisher,
    key: String,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(key = %key, format = %publisher.format(), "Publishing gripper state");

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }

            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let sample = snapshots.borrow_and_update().clone();
                if let Some(sample) = sample {
                    if let Err(e) = publisher.publish_to_key(&key, &sample).await {
                        warn!(error = %e, "Failed to publish gripper state");
                    }
                }
            }
        }
    }

    debug!(key = %key, "State publisher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandLimits, Opcode};
    use crate::config::RegisterMap;
    use crate::error::TransportError;
    use crate::mock::MockTransport;

    fn gripper(mock: &MockTransport) -> Gripper<MockTransport> {
        Gripper::new(
            "test",
            mock.clone(),
            CommandLimits::default(),
            RegisterMap::default(),
        )
    }

    #[tokio::test]
    async fn test_json_request_executes() {
        let mock = MockTransport::connected();
        let gripper = gripper(&mock);

        let (reply, format) =
            handle_request(&gripper, br#"{"type": "set_finger_position", "position": 5000}"#).await;

        assert_eq!(reply, CommandReply::ok());
        assert_eq!(format, Format::Json);
        assert_eq!(mock.writes(), vec![vec![Opcode::SetFingerPosition.code(), 1000]]);
    }

    #[tokio::test]
    async fn test_cbor_request_gets_cbor_reply() {
        let mock = MockTransport::connected();
        let gripper = gripper(&mock);

        let payload = encode(&GripperCommand::GripperClose, Format::Cbor).unwrap();
        let (reply, format) = handle_request(&gripper, &payload).await;

        assert!(reply.success);
        assert_eq!(format, Format::Cbor);
        assert_eq!(mock.writes(), vec![vec![Opcode::GripperClose.code()]]);
    }

    #[tokio::test]
    async fn test_rejected_request_reports_failure() {
        let mock = MockTransport::connected();
        let gripper = gripper(&mock);

        let (reply, _) =
            handle_request(&gripper, br#"{"type": "set_modbus_address", "address": 0}"#).await;

        assert!(!reply.success);
        assert!(reply.error.unwrap().contains("rejected"));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_and_empty_requests() {
        let mock = MockTransport::connected();
        let gripper = gripper(&mock);

        let payloads: [&[u8]; 3] = [br#"{"type": "launch"}"#, b"", b"not a command"];
        for payload in payloads {
            let (reply, _) = handle_request(&gripper, payload).await;
            assert!(!reply.success);
            assert!(reply.error.unwrap().starts_with("Unknown command"));
        }
        assert!(mock.calls().is_empty());

        let (_, format) = handle_request(&gripper, b"").await;
        assert_eq!(format, Format::Json);
    }

    #[tokio::test]
    async fn test_transport_failure_reported() {
        let mock = MockTransport::new();
        let gripper = gripper(&mock);

        let (reply, _) = handle_request(&gripper, br#"{"type": "motor_enable"}"#).await;
        assert_eq!(
            reply,
            CommandReply::failed(TransportError::NotConnected)
        );
    }

    #[test]
    fn test_reply_json_shape() {
        let json = serde_json::to_string(&CommandReply::ok()).unwrap();
        assert_eq!(json, r#"{"success":true}"#);

        let json = serde_json::to_string(&CommandReply::failed("boom")).unwrap();
        assert_eq!(json, r#"{"success":false,"error":"boom"}"#);
    }
}
