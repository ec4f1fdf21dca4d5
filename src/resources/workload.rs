//! Workload generation.
//!
//! Renders the pod-running object of an instance, which is either:
//! - a **Deployment** for ephemeral instances and proxies
//! - a **StatefulSet** with a data volume claim for persistent instances
//!
//! Both share one pod template. Memory requests and limits come from the
//! instance's memory budget; CPU uses fixed defaults.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    ConfigMapKeySelector, Container, ContainerPort, EmptyDirVolumeSource,
    EnvVar as K8sEnvVar, EnvVarSource, PersistentVolumeClaim, PersistentVolumeClaimSpec,
    PodSpec, PodTemplateSpec, Probe, ResourceRequirements, TCPSocketAction, Volume, VolumeMount,
    VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::resources::common::{
    InstanceTemplate, merged_env, object_meta, pod_selector_labels, standard_labels,
};
use crate::resources::configmap::ACCESS_TOKEN_KEY;
use crate::resources::services::GAME_PORT_NAME;
use crate::resources::units::memory_quantity;

/// CPU request for every instance container
pub const CPU_REQUEST: &str = "500m";
/// CPU limit for every instance container
pub const CPU_LIMIT: &str = "2";
/// Size of the data volume claimed by persistent instances
pub const DATA_VOLUME_SIZE: &str = "10Gi";
/// Mount path of the data volume
const DATA_MOUNT_PATH: &str = "/data";
/// Grace period for the server to save the world before it is killed
const TERMINATION_GRACE_PERIOD: i64 = 60;

/// Generate a Deployment for an ephemeral instance.
pub fn generate_deployment(template: &InstanceTemplate) -> Deployment {
    Deployment {
        metadata: object_meta(template),
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(pod_selector_labels(template)),
                ..Default::default()
            },
            // One instance per id; never run old and new pods side by side
            strategy: Some(k8s_openapi::api::apps::v1::DeploymentStrategy {
                type_: Some("Recreate".to_string()),
                ..Default::default()
            }),
            template: generate_pod_template(template, false),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Generate a StatefulSet for a persistent instance.
///
/// The StatefulSet provides:
/// - A stable pod name (`<name>-0`)
/// - A persistent data volume claim that survives pod restarts
pub fn generate_statefulset(template: &InstanceTemplate) -> StatefulSet {
    StatefulSet {
        metadata: object_meta(template),
        spec: Some(StatefulSetSpec {
            replicas: Some(1),
            service_name: Some(template.name.clone()),
            selector: LabelSelector {
                match_labels: Some(pod_selector_labels(template)),
                ..Default::default()
            },
            template: generate_pod_template(template, true),
            volume_claim_templates: Some(vec![generate_pvc_template()]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Generate the pod template shared by both workload flavors.
fn generate_pod_template(template: &InstanceTemplate, persistent: bool) -> PodTemplateSpec {
    let volumes = if persistent {
        None
    } else {
        Some(vec![Volume {
            name: "data".to_string(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Default::default()
        }])
    };

    PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(standard_labels(template)),
            ..Default::default()
        }),
        spec: Some(PodSpec {
            termination_grace_period_seconds: Some(TERMINATION_GRACE_PERIOD),
            containers: vec![generate_container(template)],
            volumes,
            ..Default::default()
        }),
    }
}

fn generate_container(template: &InstanceTemplate) -> Container {
    Container {
        name: template.entity.as_str().to_string(),
        image: Some(template.image.clone()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        ports: Some(vec![ContainerPort {
            container_port: template.listen_port,
            name: Some(GAME_PORT_NAME.to_string()),
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]),
        env: Some(generate_env_vars(template)),
        resources: Some(generate_resource_requirements(template)),
        volume_mounts: Some(vec![VolumeMount {
            name: "data".to_string(),
            mount_path: DATA_MOUNT_PATH.to_string(),
            ..Default::default()
        }]),
        // World loading can take minutes on first boot
        startup_probe: Some(tcp_probe(template.listen_port, 10, 60)),
        liveness_probe: Some(tcp_probe(template.listen_port, 20, 3)),
        readiness_probe: Some(tcp_probe(template.listen_port, 10, 3)),
        ..Default::default()
    }
}

/// Generate container environment.
///
/// The access token is read from the config object so it is not duplicated
/// into the workload spec. User entries override built-ins with the same key.
pub fn generate_env_vars(template: &InstanceTemplate) -> Vec<K8sEnvVar> {
    let mut env = Vec::new();

    if !template.env_vars.iter().any(|e| e.key == ACCESS_TOKEN_KEY) {
        env.push(K8sEnvVar {
            name: ACCESS_TOKEN_KEY.to_string(),
            value_from: Some(EnvVarSource {
                config_map_key_ref: Some(ConfigMapKeySelector {
                    name: template.name.clone(),
                    key: ACCESS_TOKEN_KEY.to_string(),
                    optional: Some(false),
                }),
                ..Default::default()
            }),
            ..Default::default()
        });
    }

    env.extend(merged_env(template).into_iter().map(|e| K8sEnvVar {
        name: e.key,
        value: Some(e.value),
        ..Default::default()
    }));

    env
}

/// Generate resource requirements from the memory budget.
pub fn generate_resource_requirements(template: &InstanceTemplate) -> ResourceRequirements {
    let memory = Quantity(memory_quantity(&template.memory_budget));

    let mut requests = BTreeMap::new();
    requests.insert("cpu".to_string(), Quantity(CPU_REQUEST.to_string()));
    requests.insert("memory".to_string(), memory.clone());

    let mut limits = BTreeMap::new();
    limits.insert("cpu".to_string(), Quantity(CPU_LIMIT.to_string()));
    limits.insert("memory".to_string(), memory);

    ResourceRequirements {
        requests: Some(requests),
        limits: Some(limits),
        ..Default::default()
    }
}

fn tcp_probe(port: i32, period_seconds: i32, failure_threshold: i32) -> Probe {
    Probe {
        tcp_socket: Some(TCPSocketAction {
            port: IntOrString::Int(port),
            ..Default::default()
        }),
        period_seconds: Some(period_seconds),
        timeout_seconds: Some(5),
        failure_threshold: Some(failure_threshold),
        ..Default::default()
    }
}

/// Generate the data volume claim template for persistent instances.
fn generate_pvc_template() -> PersistentVolumeClaim {
    let mut requests = BTreeMap::new();
    requests.insert("storage".to_string(), Quantity(DATA_VOLUME_SIZE.to_string()));

    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some("data".to_string()),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(requests),
                ..Default::default()
            }),
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
    use crate::desired::EnvVar;
    use crate::resources::common::WorkloadFlavor;
    use crate::resources::common::tests::template;

    fn container_of(pod: &PodTemplateSpec) -> &Container {
        pod.spec.as_ref().unwrap().containers.first().unwrap()
    }

    #[test]
    fn test_generate_statefulset() {
        let sts = generate_statefulset(&template(WorkloadFlavor::StatefulSet));

        assert_eq!(sts.metadata.name, Some("gameserver-lobby-1".to_string()));
        let spec = sts.spec.unwrap();
        assert_eq!(spec.replicas, Some(1));
        assert_eq!(spec.service_name, Some("gameserver-lobby-1".to_string()));

        let claims = spec.volume_claim_templates.unwrap();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims.first().unwrap().metadata.name, Some("data".to_string()));
        // Persistent pods mount the claim, not an emptyDir
        assert!(spec.template.spec.as_ref().unwrap().volumes.is_none());
    }

    #[test]
    fn test_generate_deployment() {
        let deploy = generate_deployment(&template(WorkloadFlavor::Deployment));

        let spec = deploy.spec.unwrap();
        assert_eq!(spec.replicas, Some(1));
        let volumes = spec.template.spec.as_ref().unwrap().volumes.clone().unwrap();
        assert!(volumes.first().unwrap().empty_dir.is_some());
        let container = container_of(&spec.template);
        assert_eq!(
            container.ports.as_ref().unwrap().first().unwrap().container_port,
            25565
        );
    }

    #[test]
    fn test_resources_follow_memory_budget() {
        let resources = generate_resource_requirements(&template(WorkloadFlavor::StatefulSet));

        let requests = resources.requests.unwrap();
        let limits = resources.limits.unwrap();
        assert_eq!(requests.get("memory"), Some(&Quantity("2Gi".to_string())));
        assert_eq!(limits.get("memory"), Some(&Quantity("2Gi".to_string())));
        assert_eq!(requests.get("cpu"), Some(&Quantity(CPU_REQUEST.to_string())));
        assert_eq!(limits.get("cpu"), Some(&Quantity(CPU_LIMIT.to_string())));
    }

    #[test]
    fn test_env_reads_token_from_configmap() {
        let env = generate_env_vars(&template(WorkloadFlavor::Deployment));

        let token = env.iter().find(|e| e.name == ACCESS_TOKEN_KEY).unwrap();
        assert!(token.value.is_none());
        let selector = token
            .value_from
            .as_ref()
            .unwrap()
            .config_map_key_ref
            .as_ref()
            .unwrap();
        assert_eq!(selector.name, "gameserver-lobby-1");

        let memory = env.iter().find(|e| e.name == "MEMORY").unwrap();
        assert_eq!(memory.value, Some("1638M".to_string()));
        let motd = env.iter().find(|e| e.name == "MOTD").unwrap();
        assert_eq!(motd.value, Some("hello".to_string()));
    }

    #[test]
    fn test_user_env_can_override_token() {
        let mut tpl = template(WorkloadFlavor::Deployment);
        tpl.env_vars.push(EnvVar::new(ACCESS_TOKEN_KEY, "override"));

        let env = generate_env_vars(&tpl);
        let tokens: Vec<_> = env.iter().filter(|e| e.name == ACCESS_TOKEN_KEY).collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens.first().unwrap().value, Some("override".to_string()));
    }
}
