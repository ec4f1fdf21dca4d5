//! ConfigMap generation.
//!
//! The config object carries the instance's non-secret metadata plus the
//! access token the workload uses to call back into the control plane.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ConfigMap;

use crate::resources::common::{InstanceTemplate, object_meta};

/// Key of the access token inside the config object
pub const ACCESS_TOKEN_KEY: &str = "ACCESS_TOKEN";

/// Generate the config object for an instance
pub fn generate_configmap(template: &InstanceTemplate) -> ConfigMap {
    let mut data: BTreeMap<String, String> = template.metadata.clone();
    data.insert("INSTANCE_ID".to_string(), template.id.clone());
    data.insert("LISTEN_PORT".to_string(), template.listen_port.to_string());
    data.insert("MEMORY".to_string(), template.memory_budget.clone());
    data.insert("EXPOSURE".to_string(), template.exposure.to_string());
    data.insert(ACCESS_TOKEN_KEY.to_string(), template.access_token.clone());

    ConfigMap {
        metadata: object_meta(template),
        data: Some(data),
        ..Default::default()
    }
}
