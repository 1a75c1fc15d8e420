use k8_types::app::deployment::DeploymentSpec;
use k8_types::core::service::ServiceSpec;
use k8_types::{InputK8Obj, Spec};
use tracing::{debug, trace};

use appservice_metadata::appservice::AppServiceObj;

use crate::client::ClusterClient;
use crate::core::ObjectKey;
use crate::error::StoreError;
use crate::k8::objects::{generate_deployment, generate_service};

/// Object kind derived from an AppService
pub trait DerivedResource {
    type Spec: Spec;

    fn build(app: &AppServiceObj) -> InputK8Obj<Self::Spec>;

    /// copy fields the cluster owns from existing spec before replacing it
    fn preserve_immutable(_existing: &Self::Spec, _desired: &mut Self::Spec) {}
}

pub struct DeploymentResource;

impl DerivedResource for DeploymentResource {
    type Spec = DeploymentSpec;

    fn build(app: &AppServiceObj) -> InputK8Obj<Self::Spec> {
        generate_deployment(app)
    }
}

pub struct ServiceResource;

impl DerivedResource for ServiceResource {
    type Spec = ServiceSpec;

    fn build(app: &AppServiceObj) -> InputK8Obj<Self::Spec> {
        generate_service(app)
    }

    fn preserve_immutable(existing: &Self::Spec, desired: &mut Self::Spec) {
        desired.cluster_ip = existing.cluster_ip.clone();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Created,
    Updated,
    Unchanged,
}

/// ensure derived object of kind `R` exists and, if `stale`, matches the instance spec
pub async fn sync_resource<R, C>(
    client: &C,
    app: &AppServiceObj,
    stale: bool,
) -> Result<SyncOutcome, StoreError>
where
    R: DerivedResource,
    C: ClusterClient,
{
    let key = ObjectKey::from(&app.metadata);
    let kind = <R::Spec as Spec>::kind();

    let Some(mut existing) = client.retrieve_item::<R::Spec>(&key).await? else {
        debug!(%key, %kind, "not found, creating");
        client.create_item(R::build(app)).await?;
        return Ok(SyncOutcome::Created);
    };

    if !stale {
        trace!(%key, %kind, "up to date");
        return Ok(SyncOutcome::Unchanged);
    }

    let mut desired = R::build(app).spec;
    R::preserve_immutable(&existing.spec, &mut desired);
    existing.spec = desired;

    debug!(%key, %kind, version = %existing.metadata.resource_version, "updating");
    client.replace_item(existing).await?;
    Ok(SyncOutcome::Updated)
}
