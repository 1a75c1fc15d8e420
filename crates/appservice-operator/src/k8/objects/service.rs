use k8_types::core::service::{LoadBalancerType, ServicePort, ServiceSpec, TargetPort};
use k8_types::{InputK8Obj, Spec};

use appservice_metadata::appservice::{AppServiceObj, AppServicePort, PortTarget};

use super::{app_labels, owned_metadata};

/// generate node port service selecting the instance pods.
/// cluster ip is left to the cluster
pub fn generate_service(app: &AppServiceObj) -> InputK8Obj<ServiceSpec> {
    let service_spec = ServiceSpec {
        r#type: Some(LoadBalancerType::NodePort),
        selector: Some(app_labels(&app.metadata.name)),
        ports: app.spec.ports.iter().map(service_port).collect(),
        ..Default::default()
    };

    InputK8Obj {
        api_version: ServiceSpec::api_version(),
        kind: ServiceSpec::kind(),
        metadata: owned_metadata(app),
        spec: service_spec,
        ..Default::default()
    }
}

fn service_port(port: &AppServicePort) -> ServicePort {
    ServicePort {
        name: port.name.clone(),
        port: port.port,
        target_port: port.target_port.as_ref().map(|target| match target {
            PortTarget::Number(number) => TargetPort::Number(*number),
            PortTarget::Name(name) => TargetPort::Name(name.clone()),
        }),
        node_port: port.node_port,
        ..Default::default()
    }
}

#[cfg(test)]
mod test {

    use appservice_metadata::appservice::AppServicePort;

    use crate::k8::objects::fixture::{APP_UID, web_app};

    use super::*;

    #[test]
    fn test_generate_service() {
        let app = web_app();
        let service = generate_service(&app);

        assert_eq!(service.kind, "Service");
        assert_eq!(service.metadata.name, "web");
        assert_eq!(service.metadata.namespace, "prod");
        let owner = &service.metadata.owner_references[0];
        assert_eq!(owner.kind, "AppService");
        assert_eq!(owner.uid, APP_UID);
        assert_eq!(owner.controller, Some(true));
        assert!(owner.block_owner_deletion);

        let spec = service.spec;
        assert!(matches!(spec.r#type, Some(LoadBalancerType::NodePort)));
        assert!(spec.cluster_ip.is_empty());
        let selector = spec.selector.expect("selector");
        assert_eq!(selector.get("app"), Some(&"web".to_owned()));

        assert_eq!(spec.ports.len(), 1);
        let port = &spec.ports[0];
        assert_eq!(port.port, 80);
        assert!(matches!(port.target_port, Some(TargetPort::Number(8080))));
        assert_eq!(port.node_port, Some(30002));
    }

    #[test]
    fn test_named_ports_copied() {
        let mut app = web_app();
        app.spec.ports = vec![AppServicePort::new(443).named("https").target("tls")];

        let spec = generate_service(&app).spec;
        let port = &spec.ports[0];
        assert_eq!(port.name.as_deref(), Some("https"));
        assert!(matches!(&port.target_port, Some(TargetPort::Name(name)) if name == "tls"));
        assert_eq!(port.node_port, None);
    }
}
