//! Zenoh bridge for the DATC gripper.
//!
//! Polls the gripper status over Modbus RTU, publishes it to Zenoh and
//! serves gripper commands through a queryable.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use datc_bridge_framework::{BridgeArgs, BridgeConfig, BridgeRunner, DEFAULT_SHUTDOWN_GRACE};
use datc_common::KeyExprBuilder;
use zenoh_bridge_datc::service::forward_snapshots;
use zenoh_bridge_datc::{CommandService, DatcBridgeConfig, Gripper, Poller, RtuTransport};

#[tokio::main]
async fn main() -> Result<()> {
    let args = BridgeArgs::parse_with_default("datc.json5");

    let config = DatcBridgeConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    let gripper_config = config.gripper.clone();

    // Room for the poller to wait out an in-flight transaction and disable the motor.
    let grace = DEFAULT_SHUTDOWN_GRACE.max(gripper_config.timeout() * 4);

    let mut runner = BridgeRunner::start("datc", &config, &args)
        .await?
        .with_status_publishing()
        .with_shutdown_grace(grace);

    let keys = KeyExprBuilder::new(&gripper_config.key_prefix);

    info!(
        gripper = %gripper_config.name,
        port = %gripper_config.serial.port,
        slave = gripper_config.slave_address,
        "Configured gripper"
    );

    let gripper = Arc::new(Gripper::from_config(
        &gripper_config,
        RtuTransport::new(&gripper_config),
    ));

    let poller = Poller::from_config(gripper.clone(), &gripper_config);
    let snapshots = poller.subscribe();

    let shutdown = runner.shutdown_signal();
    runner.spawn("poller", async move {
        poller.run(shutdown).await;
    });

    let service = CommandService::new(
        gripper.clone(),
        runner.session().clone(),
        keys.command_key(&gripper_config.name),
    );
    let shutdown = runner.shutdown_signal();
    runner.spawn_fallible("command-service", service.run(shutdown));

    let publisher = runner.publisher();
    let state_key = keys.state_key(&gripper_config.name);
    let shutdown = runner.shutdown_signal();
    runner.spawn(
        "state-publisher",
        forward_snapshots(snapshots, publisher, state_key.clone(), shutdown),
    );

    let metadata = serde_json::json!({
        "devices": [gripper_config.name],
        "state_key": state_key,
        "command_key": keys.command_key(&gripper_config.name),
    });

    runner.run(Some(metadata)).await?;
    Ok(())
}
