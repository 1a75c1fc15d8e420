use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use fluvio_future::timer::sleep;
use k8_types::app::deployment::DeploymentSpec;
use k8_types::core::service::ServiceSpec;
use k8_types::{InputK8Obj, InputObjectMeta, K8Obj, Spec};

use appservice_operator::client::{ClusterClient, MemoryClient};
use appservice_operator::config::{OperatorConfig, RetryConfig};
use appservice_operator::controller::{AppServiceController, ControllerHandle};
use appservice_operator::core::{ObjectKey, SharedShutdown, ShutdownEvent};
use appservice_operator::metadata::appservice::{AppServicePort, AppServiceSpec};
use appservice_operator::reconciler::{BASELINE_ANNOTATION, is_stale};

const POLL: Duration = Duration::from_millis(20);
const ATTEMPTS: usize = 250;
const CLUSTER_IP: &str = "10.96.0.20";

fn key() -> ObjectKey {
    ObjectKey::new("default", "demo")
}

fn demo_spec(replicas: i32) -> AppServiceSpec {
    AppServiceSpec::new("nginx:1.25")
        .with_replicas(replicas)
        .with_port(AppServicePort::new(80).target(80).node_port(30080))
}

fn test_config() -> OperatorConfig {
    OperatorConfig {
        namespace: Some("default".to_owned()),
        workers: 2,
        resync: None,
        retry: RetryConfig {
            min: Duration::from_millis(10),
            max: Duration::from_millis(100),
            factor: 2.0,
        },
        watch_retry: Duration::from_millis(50),
    }
}

async fn start() -> (Arc<MemoryClient>, SharedShutdown, ControllerHandle) {
    fluvio_future::subscriber::init_logger();

    let client = MemoryClient::new_shared();
    client.immutable_field::<ServiceSpec>("/spec/clusterIP").await;
    let shutdown = ShutdownEvent::shared();
    let handle = AppServiceController::start(client.clone(), test_config(), shutdown.clone())
        .expect("controller started");
    (client, shutdown, handle)
}

async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..ATTEMPTS {
        if check().await {
            return;
        }
        sleep(POLL).await;
    }
    panic!("timed out waiting for {what}");
}

async fn get<S: Spec>(client: &MemoryClient) -> Option<K8Obj<S>> {
    client.retrieve_item::<S>(&key()).await.expect("retrieve")
}

async fn create_app(client: &MemoryClient, spec: AppServiceSpec) {
    let input = InputK8Obj {
        api_version: AppServiceSpec::api_version(),
        kind: AppServiceSpec::kind(),
        metadata: InputObjectMeta::named("demo", "default"),
        spec,
        ..Default::default()
    };
    client.create_item(input).await.expect("app created");
}

/// replace spec, retrying when racing with the controller's baseline write
async fn set_spec(client: &MemoryClient, spec: AppServiceSpec) {
    for _ in 0..ATTEMPTS {
        let mut app = get::<AppServiceSpec>(client).await.expect("app exists");
        app.spec = spec.clone();
        match client.replace_item(app).await {
            Ok(_) => return,
            Err(err) if err.is_conflict() => sleep(POLL).await,
            Err(err) => panic!("update failed: {err}"),
        }
    }
    panic!("unable to update spec");
}

async fn converged(client: &MemoryClient, replicas: i32) -> bool {
    let Some(app) = get::<AppServiceSpec>(client).await else {
        return false;
    };
    if !app.metadata.annotations.contains_key(BASELINE_ANNOTATION)
        || is_stale(&app).unwrap_or(true)
    {
        return false;
    }
    let deployment = get::<DeploymentSpec>(client).await;
    let service = get::<ServiceSpec>(client).await;
    matches!(
        (deployment, service),
        (Some(deployment), Some(_)) if deployment.spec.replicas == Some(replicas)
    )
}

async fn stop(shutdown: SharedShutdown, handle: ControllerHandle) {
    shutdown.notify();
    fluvio_future::future::timeout(Duration::from_secs(5), handle.stopped())
        .await
        .expect("controller stopped");
}

#[fluvio_future::test]
async fn test_new_instance_gets_children() {
    let (client, shutdown, handle) = start().await;

    create_app(&client, demo_spec(1)).await;
    eventually("initial convergence", || {
        let client = client.clone();
        async move { converged(&client, 1).await }
    })
    .await;

    let app = get::<AppServiceSpec>(&client).await.expect("app");
    let service = get::<ServiceSpec>(&client).await.expect("service");
    assert_eq!(service.metadata.owner_references.len(), 1);
    assert_eq!(service.metadata.owner_references[0].uid, app.metadata.uid);
    assert_eq!(service.spec.ports[0].node_port, Some(30080));

    stop(shutdown, handle).await;
}

#[fluvio_future::test]
async fn test_spec_change_propagates() {
    let (client, shutdown, handle) = start().await;

    create_app(&client, demo_spec(1)).await;
    eventually("initial convergence", || {
        let client = client.clone();
        async move { converged(&client, 1).await }
    })
    .await;

    // cluster assigned address must survive updates
    let mut service = get::<ServiceSpec>(&client).await.expect("service");
    service.spec.cluster_ip = CLUSTER_IP.to_owned();
    client.replace_item(service).await.expect("cluster ip");

    set_spec(&client, demo_spec(3)).await;
    eventually("replicas updated", || {
        let client = client.clone();
        async move { converged(&client, 3).await }
    })
    .await;

    let service = get::<ServiceSpec>(&client).await.expect("service");
    assert_eq!(service.spec.cluster_ip, CLUSTER_IP);

    stop(shutdown, handle).await;
}

#[fluvio_future::test]
async fn test_deleted_child_recreated() {
    let (client, shutdown, handle) = start().await;

    create_app(&client, demo_spec(2)).await;
    eventually("initial convergence", || {
        let client = client.clone();
        async move { converged(&client, 2).await }
    })
    .await;

    client
        .delete_item::<DeploymentSpec>(&key())
        .await
        .expect("deployment deleted");

    eventually("deployment recreated", || {
        let client = client.clone();
        async move { get::<DeploymentSpec>(&client).await.is_some() }
    })
    .await;

    stop(shutdown, handle).await;
}

#[fluvio_future::test]
async fn test_failed_pass_is_retried() {
    let (client, shutdown, handle) = start().await;

    client.inject_failure::<DeploymentSpec>().await;
    create_app(&client, demo_spec(2)).await;

    eventually("convergence after retry", || {
        let client = client.clone();
        async move { converged(&client, 2).await }
    })
    .await;

    stop(shutdown, handle).await;
}

#[fluvio_future::test]
async fn test_shutdown_stops_processing() {
    let (client, shutdown, handle) = start().await;

    stop(shutdown, handle).await;

    create_app(&client, demo_spec(1)).await;
    sleep(Duration::from_millis(200)).await;
    assert!(get::<DeploymentSpec>(&client).await.is_none());
}
