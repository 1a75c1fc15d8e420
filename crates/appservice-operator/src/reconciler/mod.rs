//!
//! # AppService reconciler
//!
//! Drives the Deployment and Service of a single AppService toward its spec.
//! Each pass is idempotent; retries are left to the controller.
//!
mod change;
mod sync;

pub use change::*;
pub use sync::*;

use std::time::Duration;

use k8_types::ObjectMeta;
use tracing::{debug, info, instrument};

use appservice_metadata::appservice::AppServiceSpec;

use crate::client::{ClusterClient, SharedClient};
use crate::core::ObjectKey;
use crate::error::ReconcileError;

/// what the controller should do with the key after a successful pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// wait for the next change
    Await,
    Requeue(Duration),
}

pub struct AppServiceReconciler<C> {
    client: SharedClient<C>,
    resync: Option<Duration>,
}

impl<C> AppServiceReconciler<C>
where
    C: ClusterClient,
{
    pub fn new(client: SharedClient<C>, resync: Option<Duration>) -> Self {
        Self { client, resync }
    }

    #[instrument(skip_all, fields(key = %key))]
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileAction, ReconcileError> {
        let Some(mut app) = self.client.retrieve_item::<AppServiceSpec>(key).await? else {
            debug!("not found, nothing to reconcile");
            return Ok(ReconcileAction::Await);
        };

        if is_deleting(&app.metadata) {
            debug!("deletion in progress, skipping");
            return Ok(ReconcileAction::Await);
        }

        let stale = is_stale(&app)?;
        let client = self.client.as_ref();

        let deployment = sync_resource::<DeploymentResource, _>(client, &app, stale).await?;
        let service = sync_resource::<ServiceResource, _>(client, &app, stale).await?;

        if stale {
            record_baseline(&mut app)?;
            self.client.replace_item(app).await?;
            info!(?deployment, ?service, "synchronized");
        }

        Ok(self.completed())
    }

    fn completed(&self) -> ReconcileAction {
        match self.resync {
            Some(period) => ReconcileAction::Requeue(period),
            None => ReconcileAction::Await,
        }
    }
}

fn is_deleting(metadata: &ObjectMeta) -> bool {
    metadata.deletion_timestamp.is_some() || metadata.deletion_grace_period_seconds.is_some()
}
