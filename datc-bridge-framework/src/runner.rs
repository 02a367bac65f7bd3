//! Bridge lifecycle: startup, workers, orderly shutdown.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use datc_common::{connect, init_tracing};

use crate::BridgeArgs;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::publisher::Publisher;
use crate::status::StatusPublisher;

/// Default time workers get to finish after the shutdown signal.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

struct Worker {
    name: String,
    handle: JoinHandle<()>,
}

/// Owns the Zenoh session and the bridge's worker tasks.
///
/// Workers watch [`BridgeRunner::shutdown_signal`]. On Ctrl+C or SIGTERM the
/// signal flips to `true` and each worker gets the shutdown grace period to
/// finish (the gripper poller uses it to disable the motor) before it is
/// aborted.
///
/// ```ignore
/// let args = BridgeArgs::parse_with_default("datc.json5");
/// let config = DatcBridgeConfig::load(&args.config)?;
///
/// let mut runner = BridgeRunner::start("datc", &config, &args).await?;
/// let shutdown = runner.shutdown_signal();
/// runner.spawn("poller", async move { poller.run(shutdown).await; });
///
/// runner.run(None).await
/// ```
pub struct BridgeRunner {
    name: String,
    version: String,
    session: Arc<zenoh::Session>,
    publisher: Publisher,
    status: Option<StatusPublisher>,
    shutdown: watch::Sender<bool>,
    grace: Duration,
    workers: Vec<Worker>,
}

impl BridgeRunner {
    /// Initialize tracing (`--log-level` wins over the config) and open the
    /// Zenoh session.
    pub async fn start<C: BridgeConfig>(
        name: impl Into<String>,
        config: &C,
        args: &BridgeArgs,
    ) -> Result<Self> {
        let name = name.into();
        let version = env!("CARGO_PKG_VERSION").to_string();

        let logging = match args.log_level.as_deref() {
            Some(level) => config.logging().with_level(level),
            None => config.logging().clone(),
        };
        init_tracing(&logging).map_err(|e| BridgeError::config(e.to_string()))?;

        tracing::info!(bridge = %name, version = %version, "Starting bridge");

        let session = connect(config.zenoh())
            .await
            .map(Arc::new)
            .map_err(|e| BridgeError::ZenohConnection(e.to_string()))?;

        let publisher = Publisher::new(session.clone(), config.key_prefix(), config.serialization());

        Ok(Self {
            name,
            version,
            session,
            publisher,
            status: None,
            shutdown: watch::Sender::new(false),
            grace: DEFAULT_SHUTDOWN_GRACE,
            workers: Vec::new(),
        })
    }

    /// Publish `running` on start and `offline` on shutdown.
    pub fn with_status_publishing(mut self) -> Self {
        self.status = Some(StatusPublisher::new(
            self.publisher.clone(),
            &self.name,
            &self.version,
        ));
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn session(&self) -> &Arc<zenoh::Session> {
        &self.session
    }

    pub fn publisher(&self) -> Publisher {
        self.publisher.clone()
    }

    /// Receiver that flips to `true` once shutdown starts.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn spawn<F>(&mut self, name: impl Into<String>, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.workers.push(Worker {
            name: name.into(),
            handle: tokio::spawn(future),
        });
    }

    /// Spawn a worker whose error is logged when it returns one.
    pub fn spawn_fallible<F, E>(&mut self, name: impl Into<String>, future: F)
    where
        F: Future<Output = std::result::Result<(), E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let name = name.into();
        let label = name.clone();
        self.spawn(name, async move {
            if let Err(e) = future.await {
                tracing::error!(worker = %label, error = %e, "Worker failed");
            }
        });
    }

    /// Run until Ctrl+C or SIGTERM, then stop workers, publish `offline`
    /// and close the session.
    pub async fn run(self, metadata: Option<serde_json::Value>) -> Result<()> {
        if let Some(status) = &self.status {
            if let Err(e) = status.publish_running(metadata).await {
                tracing::warn!(error = %e, "Failed to publish running status");
            }
        }

        tracing::info!(
            bridge = %self.name,
            workers = self.workers.len(),
            "Bridge running. Press Ctrl+C to stop."
        );

        wait_for_termination().await;
        tracing::info!(bridge = %self.name, "Shutting down");

        self.stop().await;
        Ok(())
    }

    async fn stop(self) {
        // Workers that already exited dropped their receivers.
        let _ = self.shutdown.send(true);

        for Worker { name, mut handle } in self.workers {
            match tokio::time::timeout(self.grace, &mut handle).await {
                Ok(Ok(())) => tracing::debug!(worker = %name, "Worker stopped"),
                Ok(Err(e)) => tracing::warn!(worker = %name, error = %e, "Worker panicked"),
                Err(_) => {
                    tracing::warn!(
                        worker = %name,
                        grace_ms = self.grace.as_millis() as u64,
                        "Worker still running after grace period, aborting"
                    );
                    handle.abort();
                }
            }
        }

        if let Some(status) = &self.status {
            if let Err(e) = status.publish_offline().await {
                tracing::warn!(error = %e, "Failed to publish offline status");
            }
        }

        if let Err(e) = self.session.close().await {
            tracing::warn!(error = %e, "Error closing Zenoh session");
        }

        tracing::info!(bridge = %self.name, "Bridge stopped");
    }
}

async fn wait_for_termination() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(e) = result {
                            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                        }
                    }
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
                }
                return;
            }
            Err(e) => tracing::warn!(error = %e, "Cannot install SIGTERM handler"),
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}
