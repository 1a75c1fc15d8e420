//!
//! # AppService controller
//!
//! Watches AppService instances and their derived objects, and feeds the keys of
//! affected instances to a pool of workers running the reconciler.
//!
mod queue;
mod watch;

pub use queue::*;
pub use watch::*;

use std::sync::Arc;

use anyhow::Result;
use async_channel::{Receiver, Sender, bounded};
use tracing::{debug, error, info, instrument};

use fluvio_future::task::spawn;
use k8_types::app::deployment::DeploymentSpec;
use k8_types::core::service::ServiceSpec;

use appservice_metadata::appservice::AppServiceSpec;

use crate::client::{ClusterClient, SharedClient};
use crate::config::OperatorConfig;
use crate::core::{ObjectKey, SharedShutdown};
use crate::error::ReconcileError;
use crate::reconciler::{AppServiceReconciler, ReconcileAction};

/// Running controller.
/// Completes `stopped` once every watcher and worker has exited.
pub struct ControllerHandle {
    running: Receiver<()>,
}

impl ControllerHandle {
    pub async fn stopped(self) {
        // closed when last task drops its sender
        let _ = self.running.recv().await;
    }
}

pub struct AppServiceController<C> {
    reconciler: AppServiceReconciler<C>,
    queue: SharedQueue,
    shutdown: SharedShutdown,
}

impl<C> AppServiceController<C>
where
    C: ClusterClient + 'static,
{
    pub fn start(
        client: SharedClient<C>,
        config: OperatorConfig,
        shutdown: SharedShutdown,
    ) -> Result<ControllerHandle> {
        config.validate()?;

        let queue = WorkQueue::shared(config.retry.clone())?;
        let (running_sender, running) = bounded::<()>(1);
        let namespace = config.watch_namespace();

        info!(namespace = ?config.namespace, workers = config.workers, "starting controller");

        ResourceWatcher::<C, AppServiceSpec>::start(
            client.clone(),
            namespace.clone(),
            queue.clone(),
            shutdown.clone(),
            config.watch_retry,
            own_key,
            running_sender.clone(),
        );
        ResourceWatcher::<C, DeploymentSpec>::start(
            client.clone(),
            namespace.clone(),
            queue.clone(),
            shutdown.clone(),
            config.watch_retry,
            owner_key,
            running_sender.clone(),
        );
        ResourceWatcher::<C, ServiceSpec>::start(
            client.clone(),
            namespace,
            queue.clone(),
            shutdown.clone(),
            config.watch_retry,
            owner_key,
            running_sender.clone(),
        );

        let controller = Arc::new(Self {
            reconciler: AppServiceReconciler::new(client, config.resync),
            queue: queue.clone(),
            shutdown: shutdown.clone(),
        });

        for id in 0..config.workers {
            spawn(controller.clone().worker_loop(id, running_sender.clone()));
        }

        let closing = queue.clone();
        spawn(async move {
            shutdown.listen().await;
            debug!("shutdown requested, closing queue");
            closing.close().await;
        });

        Ok(ControllerHandle { running })
    }

    #[instrument(skip(self, _running))]
    async fn worker_loop(self: Arc<Self>, id: usize, _running: Sender<()>) {
        debug!("worker started");
        while let Some(key) = self.queue.next().await {
            self.process(&key).await;
            self.queue.done(&key).await;
        }
        debug!("worker terminated");
    }

    async fn process(&self, key: &ObjectKey) {
        use tokio::select;

        let result = select! {
            _ = self.shutdown.listen() => Err(ReconcileError::Cancelled(key.to_string())),
            result = self.reconciler.reconcile(key) => result,
        };

        match result {
            Ok(ReconcileAction::Await) => {
                self.queue.forget(key).await;
            }
            Ok(ReconcileAction::Requeue(period)) => {
                self.queue.forget(key).await;
                debug!(%key, ?period, "requeue");
                self.queue.add_after(key.clone(), period);
            }
            Err(ReconcileError::Cancelled(_)) => {
                info!(%key, "reconcile cancelled");
            }
            Err(err) => {
                let delay = self.queue.retry_delay(key).await;
                error!(%key, %err, ?delay, "reconcile failed, retrying");
                self.queue.add_after(key.clone(), delay);
            }
        }
    }
}
