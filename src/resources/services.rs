//! Service generation.
//!
//! Every instance gets one network-exposure Service. Its type comes from the
//! instance's [`ExposureMode`]; proxies additionally publish their external
//! address when one is set.

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::resources::common::{InstanceTemplate, object_meta, pod_selector_labels};
use crate::resources::units::ExposureMode;

/// Name of the game port on containers and services
pub const GAME_PORT_NAME: &str = "game";

/// Generate the network-exposure Service for an instance
pub fn generate_service(template: &InstanceTemplate) -> Service {
    let external_ips = template
        .external_address
        .as_ref()
        .filter(|address| !address.trim().is_empty())
        .filter(|_| template.exposure != ExposureMode::InternalOnly)
        .map(|address| vec![address.trim().to_string()]);

    Service {
        metadata: object_meta(template),
        spec: Some(ServiceSpec {
            type_: Some(template.exposure.service_type().to_string()),
            selector: Some(pod_selector_labels(template)),
            external_ips,
            ports: Some(vec![ServicePort {
                port: template.service_port,
                target_port: Some(IntOrString::String(GAME_PORT_NAME.to_string())),
                name: Some(GAME_PORT_NAME.to_string()),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::get_unwrap
)]
mod tests {
    use super::*;
    use crate::resources::common::WorkloadFlavor;
    use crate::resources::common::tests::template;

    #[test]
    fn test_generate_node_exposed_service() {
        let svc = generate_service(&template(WorkloadFlavor::StatefulSet));

        assert_eq!(svc.metadata.name, Some("gameserver-lobby-1".to_string()));
        assert_eq!(svc.metadata.namespace, Some("games".to_string()));

        let spec = svc.spec.unwrap();
        assert_eq!(spec.type_, Some("NodePort".to_string()));
        assert_eq!(spec.external_ips, None);

        let ports = spec.ports.unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports.first().unwrap().port, 25565);
        assert_eq!(
            ports.first().unwrap().target_port,
            Some(IntOrString::String(GAME_PORT_NAME.to_string()))
        );
    }

    #[test]
    fn test_selector_matches_pod_labels() {
        let tpl = template(WorkloadFlavor::Deployment);
        let svc = generate_service(&tpl);
        assert_eq!(svc.spec.unwrap().selector, Some(pod_selector_labels(&tpl)));
    }

    #[test]
    fn test_external_address_published_when_exposed() {
        let mut tpl = template(WorkloadFlavor::Deployment);
        tpl.exposure = ExposureMode::LoadBalanced;
        tpl.service_port = 25577;
        tpl.external_address = Some("203.0.113.10".to_string());

        let spec = generate_service(&tpl).spec.unwrap();
        assert_eq!(spec.type_, Some("LoadBalancer".to_string()));
        assert_eq!(spec.external_ips, Some(vec!["203.0.113.10".to_string()]));
        assert_eq!(spec.ports.unwrap().first().unwrap().port, 25577);
    }

    #[test]
    fn test_external_address_ignored_for_internal_services() {
        let mut tpl = template(WorkloadFlavor::Deployment);
        tpl.exposure = ExposureMode::InternalOnly;
        tpl.external_address = Some("203.0.113.10".to_string());

        let spec = generate_service(&tpl).spec.unwrap();
        assert_eq!(spec.type_, Some("ClusterIP".to_string()));
        assert_eq!(spec.external_ips, None);
    }
}
