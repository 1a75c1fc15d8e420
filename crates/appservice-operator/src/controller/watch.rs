use std::time::Duration;

use async_channel::Sender;
use futures_util::StreamExt;
use tracing::{debug, error, info, instrument, trace};

use fluvio_future::task::spawn;
use fluvio_future::timer::sleep;
use k8_client::meta_client::NameSpace;
use k8_types::{K8Watch, ObjectMeta, Spec};

use appservice_metadata::appservice::AppServiceSpec;

use crate::client::{ClusterClient, SharedClient};
use crate::core::{ObjectKey, SharedShutdown};
use crate::error::StoreError;

use super::SharedQueue;

/// maps changed object to key of AppService to reconcile
pub type KeyMapper = fn(&ObjectMeta) -> Option<ObjectKey>;

/// key of AppService itself
pub fn own_key(metadata: &ObjectMeta) -> Option<ObjectKey> {
    Some(ObjectKey::from(metadata))
}

/// key of AppService controlling derived object
pub fn owner_key(metadata: &ObjectMeta) -> Option<ObjectKey> {
    let kind = AppServiceSpec::kind();
    let api_version = AppServiceSpec::api_version();
    metadata
        .owner_references
        .iter()
        .find(|owner| owner.kind == kind && owner.api_version == api_version)
        .map(|owner| ObjectKey::new(&metadata.namespace, &owner.name))
}

/// Watches objects of kind `S` and queues affected AppService keys.
/// Restarts the watch when stream fails or ends.
pub struct ResourceWatcher<C, S> {
    client: SharedClient<C>,
    namespace: NameSpace,
    queue: SharedQueue,
    shutdown: SharedShutdown,
    retry: Duration,
    key_of: KeyMapper,
    _running: Sender<()>,
    _spec: std::marker::PhantomData<fn() -> S>,
}

impl<C, S> ResourceWatcher<C, S>
where
    C: ClusterClient + 'static,
    S: Spec + 'static,
    S::Status: 'static,
    S::Header: 'static,
{
    pub fn start(
        client: SharedClient<C>,
        namespace: NameSpace,
        queue: SharedQueue,
        shutdown: SharedShutdown,
        retry: Duration,
        key_of: KeyMapper,
        running: Sender<()>,
    ) {
        let watcher = Self {
            client,
            namespace,
            queue,
            shutdown,
            retry,
            key_of,
            _running: running,
            _spec: std::marker::PhantomData,
        };

        spawn(watcher.dispatch_loop());
    }

    #[instrument(skip(self), fields(kind = %S::kind()))]
    async fn dispatch_loop(self) {
        use tokio::select;

        info!("starting watch");
        loop {
            select! {
                _ = self.shutdown.listen() => {
                    break;
                },
                _ = self.inner_loop() => {
                    debug!(retry = ?self.retry, "watch stopped, restarting");
                }
            }

            select! {
                _ = self.shutdown.listen() => {
                    break;
                },
                _ = sleep(self.retry) => {}
            }
        }
        info!("watch terminated");
    }

    async fn inner_loop(&self) {
        let mut stream = self
            .client
            .watch_stream_since::<S>(self.namespace.clone(), None);

        while let Some(result) = stream.next().await {
            match result {
                Ok(events) => self.dispatch_events(events).await,
                Err(err) => {
                    error!(%err, "error occurred during watch");
                    return;
                }
            }
        }

        debug!("watch stream ended");
    }

    async fn dispatch_events(&self, events: Vec<Result<K8Watch<S>, StoreError>>) {
        for event in events {
            match event {
                Ok(
                    K8Watch::ADDED(obj) | K8Watch::MODIFIED(obj) | K8Watch::DELETED(obj),
                ) => {
                    if let Some(key) = (self.key_of)(&obj.metadata) {
                        trace!(%key, name = %obj.metadata.name, "queue");
                        self.queue.add(key).await;
                    }
                }
                Err(err) => error!(%err, "error in watch item"),
            }
        }
    }
}
