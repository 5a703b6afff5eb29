//! Cluster change mediator
//!
//! Bridges coordinator change callbacks to the routing manager. Callbacks
//! must return promptly, so each notification type owns a worker task and a
//! [`Notify`]: a callback just deposits a wakeup permit, and the worker runs
//! the corresponding coalesced handler. `Notify` keeps at most one pending
//! permit, so a burst of notifications during a long rebuild collapses into
//! a single follow-up run, which is safe because every handler run walks all
//! known tables and re-checks versions.

use log::{debug, info};
use std::sync::Arc;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;

use super::manager::RoutingManager;

pub struct ClusterChangeMediator {
    external_view_notify: Arc<Notify>,
    instance_config_notify: Arc<Notify>,
    shutdown_tx: broadcast::Sender<()>,
    workers: Vec<JoinHandle<()>>,
}

impl ClusterChangeMediator {
    /// Spawn the change workers. Must be called from within a tokio runtime.
    pub fn new(manager: Arc<RoutingManager>) -> Self {
        let external_view_notify = Arc::new(Notify::new());
        let instance_config_notify = Arc::new(Notify::new());
        let (shutdown_tx, _) = broadcast::channel(1);
        let mut workers = Vec::with_capacity(2);

        {
            let manager = Arc::clone(&manager);
            let notify = Arc::clone(&external_view_notify);
            let mut shutdown_rx = shutdown_tx.subscribe();
            workers.push(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = notify.notified() => manager.process_external_view_change().await,
                        _ = shutdown_rx.recv() => break,
                    }
                }
                debug!("External view change worker stopped");
            }));
        }

        {
            let manager = Arc::clone(&manager);
            let notify = Arc::clone(&instance_config_notify);
            let mut shutdown_rx = shutdown_tx.subscribe();
            workers.push(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = notify.notified() => manager.process_instance_config_change().await,
                        _ = shutdown_rx.recv() => break,
                    }
                }
                debug!("Instance config change worker stopped");
            }));
        }

        Self {
            external_view_notify,
            instance_config_notify,
            shutdown_tx,
            workers,
        }
    }

    /// The coordinator observed an external view change somewhere.
    pub fn on_external_view_change(&self) {
        self.external_view_notify.notify_one();
    }

    /// The coordinator observed an instance config change somewhere.
    pub fn on_instance_config_change(&self) {
        self.instance_config_notify.notify_one();
    }

    /// Live-instance transitions are already reflected in external views, so
    /// this callback intentionally does nothing. Known limitation: a server
    /// that dies without its segments changing state is only dropped from
    /// routing once the external view catches up.
    pub fn on_live_instance_change(&self) {}

    /// Stop both workers and wait for them to drain.
    pub async fn shutdown(self) {
        info!("Shutting down cluster change mediator");
        let _ = self.shutdown_tx.send(());
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}
