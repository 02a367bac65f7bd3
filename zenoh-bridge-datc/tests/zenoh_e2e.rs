//! Command service and state publication over a real Zenoh session.
//!
//! Zenoh requires a multi-thread tokio runtime. Each test uses its own key
//! prefix so tests running in parallel do not see each other.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use datc_bridge_framework::{Format, Publisher, Sample};
use datc_common::{KeyExprBuilder, decode_auto, encode};
use zenoh_bridge_datc::command::{CommandLimits, Opcode};
use zenoh_bridge_datc::config::RegisterMap;
use zenoh_bridge_datc::mock::MockTransport;
use zenoh_bridge_datc::service::forward_snapshots;
use zenoh_bridge_datc::{CommandReply, CommandService, DeviceStatus, Gripper, GripperCommand, Poller};

fn unique_prefix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("test_{}/datc", nanos)
}

async fn open_session() -> Arc<zenoh::Session> {
    Arc::new(
        zenoh::open(zenoh::Config::default())
            .await
            .expect("Failed to open Zenoh session"),
    )
}

async fn query(session: &zenoh::Session, key: &str, payload: Vec<u8>) -> Vec<u8> {
    let replies = session
        .get(key)
        .payload(payload)
        .timeout(Duration::from_secs(5))
        .await
        .expect("Failed to send query");

    let reply = tokio::time::timeout(Duration::from_secs(5), replies.recv_async())
        .await
        .expect("Timeout waiting for reply")
        .expect("No reply");

    reply
        .result()
        .expect("Error reply")
        .payload()
        .to_bytes()
        .to_vec()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_command_queryable() {
    let keys = KeyExprBuilder::new(unique_prefix());
    let session = open_session().await;

    let mock = MockTransport::connected();
    let gripper = Arc::new(Gripper::new(
        "g1",
        mock.clone(),
        CommandLimits::default(),
        RegisterMap::default(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let service = CommandService::new(gripper, session.clone(), keys.command_key("g1"));
    let task = tokio::spawn(service.run(shutdown_rx));
    tokio::time::sleep(Duration::from_millis(200)).await;

    let key = keys.command_key("g1");

    let reply = query(&session, &key, br#"{"type": "gripper_open"}"#.to_vec()).await;
    let reply: CommandReply = decode_auto(&reply).unwrap();
    assert_eq!(reply, CommandReply::ok());

    let request = encode(&GripperCommand::SetModbusAddress { address: 200 }, Format::Cbor).unwrap();
    let reply = query(&session, &key, request).await;
    let reply: CommandReply = decode_auto(&reply).unwrap();
    assert!(!reply.success);
    assert!(reply.error.is_some());

    assert_eq!(mock.writes(), vec![vec![Opcode::GripperOpen.code()]]);

    shutdown_tx.send(true).unwrap();
    task.await.unwrap().unwrap();
    session.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_state_publication() {
    let keys = KeyExprBuilder::new(unique_prefix());
    let session = open_session().await;

    let subscriber = session
        .declare_subscriber(keys.all_states_wildcard())
        .await
        .expect("Failed to create subscriber");
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mock = MockTransport::connected();
    mock.set_registers(10, &[0b1000001, 0, 0, 0, 0, 0, 0, 24]);
    let gripper = Arc::new(Gripper::new(
        "g2",
        mock.clone(),
        CommandLimits::default(),
        RegisterMap::default(),
    ));

    let poller = Poller::new(gripper, Duration::from_millis(20), Duration::from_millis(100));
    let snapshots = poller.subscribe();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let publisher = Publisher::new(session.clone(), keys.prefix(), Format::Cbor);
    let forward = tokio::spawn(forward_snapshots(
        snapshots,
        publisher,
        keys.state_key("g2"),
        shutdown_rx.clone(),
    ));
    let poll = tokio::spawn(poller.run(shutdown_rx));

    let received = tokio::time::timeout(Duration::from_secs(5), subscriber.recv_async())
        .await
        .expect("Timeout waiting for state")
        .expect("Failed to receive state");

    assert_eq!(received.key_expr().as_str(), keys.state_key("g2"));
    let sample: Sample<DeviceStatus> = decode_auto(&received.payload().to_bytes()).unwrap();
    assert_eq!(sample.source, "g2");
    assert!(sample.value.gripper_closed);
    assert_eq!(sample.value.status_label, "Gripper Close");

    shutdown_tx.send(true).unwrap();
    forward.await.unwrap();
    poll.await.unwrap();

    drop(subscriber);
    session.close().await.unwrap();
}
