use k8_types::app::deployment::DeploymentSpec;
use k8_types::core::pod::{ContainerPortSpec, ContainerSpec, ImagePullPolicy, PodSpec};
use k8_types::{InputK8Obj, LabelProvider, LabelSelector, Spec, TemplateMeta, TemplateSpec};

use appservice_metadata::appservice::{AppServiceObj, AppServicePort};

use super::{APP_LABEL, app_labels, owned_metadata};

/// generate deployment running the instance image, one container port per spec port
pub fn generate_deployment(app: &AppServiceObj) -> InputK8Obj<DeploymentSpec> {
    let name = app.metadata.name.as_str();
    let spec = &app.spec;

    let template = TemplateSpec {
        metadata: Some(TemplateMeta::default().set_labels(vec![(APP_LABEL, name)])),
        spec: PodSpec {
            containers: vec![ContainerSpec {
                name: name.to_owned(),
                image: Some(spec.image.clone()),
                image_pull_policy: Some(ImagePullPolicy::IfNotPresent),
                ports: spec.ports.iter().map(container_port).collect(),
                ..Default::default()
            }],
            ..Default::default()
        },
    };

    let deployment_spec = DeploymentSpec {
        replicas: spec.replicas,
        selector: LabelSelector {
            match_labels: app_labels(name),
        },
        template,
        ..Default::default()
    };

    InputK8Obj {
        api_version: DeploymentSpec::api_version(),
        kind: DeploymentSpec::kind(),
        metadata: owned_metadata(app),
        spec: deployment_spec,
        ..Default::default()
    }
}

fn container_port(port: &AppServicePort) -> ContainerPortSpec {
    ContainerPortSpec {
        container_port: port.container_port(),
        ..Default::default()
    }
}

#[cfg(test)]
mod test {

    use appservice_metadata::appservice::AppServicePort;

    use crate::k8::objects::fixture::{APP_UID, web_app};

    use super::*;

    #[test]
    fn test_generate_deployment() {
        let app = web_app();
        let deployment = generate_deployment(&app);

        assert_eq!(deployment.kind, "Deployment");
        assert_eq!(deployment.metadata.name, "web");
        assert_eq!(deployment.metadata.namespace, "prod");

        let owner = deployment
            .metadata
            .owner_references
            .first()
            .expect("owner reference");
        assert_eq!(owner.kind, "AppService");
        assert_eq!(owner.name, "web");
        assert_eq!(owner.uid, APP_UID);
        assert_eq!(owner.controller, Some(true));
        assert!(owner.block_owner_deletion);

        let spec = deployment.spec;
        assert_eq!(spec.replicas, Some(2));
        assert_eq!(spec.selector.match_labels.get("app"), Some(&"web".to_owned()));

        let pod_labels = &spec.template.metadata.as_ref().expect("template meta").labels;
        assert_eq!(pod_labels.get("app"), Some(&"web".to_owned()));

        let container = spec.template.spec.containers.first().expect("container");
        assert_eq!(container.name, "web");
        assert_eq!(container.image.as_deref(), Some("nginx:1.25"));
        assert!(matches!(
            container.image_pull_policy,
            Some(ImagePullPolicy::IfNotPresent)
        ));
        assert_eq!(container.ports.len(), 1);
        assert_eq!(container.ports[0].container_port, 8080);
    }

    #[test]
    fn test_container_port_without_target() {
        let mut app = web_app();
        app.spec.replicas = None;
        app.spec.ports = vec![AppServicePort::new(9000), AppServicePort::new(80).target("http")];

        let spec = generate_deployment(&app).spec;
        assert_eq!(spec.replicas, None);
        let ports: Vec<u16> = spec.template.spec.containers[0]
            .ports
            .iter()
            .map(|port| port.container_port)
            .collect();
        assert_eq!(ports, vec![9000, 80]);
    }
}
