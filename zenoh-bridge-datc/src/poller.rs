//! Fixed-rate status polling.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use datc_common::Sample;

use crate::config::GripperConfig;
use crate::gripper::Gripper;
use crate::status::DeviceStatus;
use crate::transport::RegisterTransport;

/// Latest snapshot, `None` until the first successful poll.
pub type SnapshotReceiver = watch::Receiver<Option<Sample<DeviceStatus>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Link down; reconnect attempts are made.
    Idle,
    /// Link up; status is read every tick.
    Polling,
}

/// Counters returned when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PollStats {
    pub polls: u64,
    pub failures: u64,
    pub published: u64,
    pub connect_attempts: u64,
}

/// Drives status reads at a fixed rate and forwards fresh snapshots.
pub struct Poller<T> {
    gripper: Arc<Gripper<T>>,
    period: Duration,
    reconnect_interval: Duration,
    snapshots: watch::Sender<Option<Sample<DeviceStatus>>>,
}

impl<T: RegisterTransport + 'static> Poller<T> {
    pub fn new(gripper: Arc<Gripper<T>>, period: Duration, reconnect_interval: Duration) -> Self {
        let (snapshots, _) = watch::channel(None);
        Self {
            gripper,
            period,
            reconnect_interval,
            snapshots,
        }
    }

    pub fn from_config(gripper: Arc<Gripper<T>>, config: &GripperConfig) -> Self {
        Self::new(gripper, config.poll_period(), config.reconnect_interval())
    }

    pub fn subscribe(&self) -> SnapshotReceiver {
        self.snapshots.subscribe()
    }

    /// Poll until `shutdown` turns true (or its sender is dropped), then
    /// disable the motor and release the link.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> PollStats {
        let name = self.gripper.name().to_string();
        let mut stats = PollStats::default();
        let mut state = PollState::Idle;
        let mut next_connect = Instant::now();
        let mut failing = false;

        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            gripper = %name,
            period_ms = self.period.as_millis() as u64,
            "Starting status poller"
        );

        while !*shutdown.borrow() {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            let connected = self.gripper.is_connected().await;
            state = match (state, connected) {
                (PollState::Polling, false) => {
                    warn!(gripper = %name, "Modbus link lost");
                    next_connect = Instant::now();
                    PollState::Idle
                }
                (PollState::Idle, true) => {
                    info!(gripper = %name, "Modbus link up, polling");
                    PollState::Polling
                }
                (current, _) => current,
            };

            if state == PollState::Idle {
                if Instant::now() < next_connect {
                    continue;
                }
                stats.connect_attempts += 1;
                match self.gripper.connect().await {
                    Ok(()) => {
                        info!(gripper = %name, "Modbus link up, polling");
                        state = PollState::Polling;
                    }
                    Err(e) => {
                        // Warn once per outage.
                        if !failing {
                            warn!(gripper = %name, error = %e, "Connection attempt failed");
                        } else {
                            debug!(gripper = %name, error = %e, "Connection attempt failed");
                        }
                        failing = true;
                        next_connect = Instant::now() + self.reconnect_interval;
                        continue;
                    }
                }
            }

            stats.polls += 1;
            match self.gripper.read_status().await {
                Ok(status) => {
                    if failing {
                        info!(gripper = %name, failures = stats.failures, "Gripper reachable again");
                        failing = false;
                    }
                    self.snapshots.send_replace(Some(Sample::new(&name, status)));
                    stats.published += 1;
                }
                Err(e) => {
                    stats.failures += 1;
                    if failing {
                        debug!(gripper = %name, error = %e, "Status read failed");
                    } else {
                        warn!(gripper = %name, error = %e, "Status read failed");
                        failing = true;
                    }
                }
            }
        }

        info!(gripper = %name, "Poller stopping, disabling motor");
        if let Err(e) = self.gripper.motor_disable().await {
            warn!(gripper = %name, error = %e, "Motor disable on shutdown failed");
        }
        self.gripper.release().await;

        info!(
            gripper = %name,
            polls = stats.polls,
            failures = stats.failures,
            published = stats.published,
            "Status poller stopped"
        );
        stats
    }
}
