// Service resource generation: one service port per assigned endpoint port,
// selector granularity per deployment strategy.

use super::{
    base_name, ports, require_app_identity, versioned_name, DeploymentType, GenerateConfig,
    GenerateError, GeneratedResource, ResourceKind,
};
use super::names;
use crate::types::{Annotations, Protocol};
use serde_json::{json, Value};

pub fn generate(
    annotations: &Annotations,
    config: &GenerateConfig,
) -> Result<Option<GeneratedResource>, GenerateError> {
    if annotations.endpoints.is_empty() {
        return Ok(None);
    }
    let (app_name, version) = require_app_identity(annotations, ResourceKind::Service)?;
    let base = base_name(app_name);

    // Rolling and canary select every pod of the app; blue-green pins the
    // service to one deployed version.
    let (name, selector) = match config.deployment_type {
        DeploymentType::Rolling | DeploymentType::Canary => {
            (base.clone(), json!({ "app": base }))
        }
        DeploymentType::BlueGreen => {
            let versioned = versioned_name(app_name, version);
            (versioned.clone(), json!({ "appVersion": versioned }))
        }
    };

    let service_ports: Vec<Value> = ports::assign_ports(&annotations.endpoints)
        .iter()
        .map(|assigned| {
            let protocol = match assigned.endpoint.protocol {
                Protocol::Http { .. } | Protocol::Tcp { .. } => "TCP",
                Protocol::Udp { .. } => "UDP",
            };
            json!({
                "name": names::resource_name(&assigned.endpoint.name, &[]),
                "port": assigned.port,
                "protocol": protocol
            })
        })
        .collect();

    let mut spec = json!({
        "ports": service_ports,
        "selector": selector
    });
    if let Some(cluster_ip) = &config.cluster_ip {
        spec["clusterIP"] = json!(cluster_ip);
    }

    let mut metadata = json!({
        "name": name,
        "labels": { "app": base }
    });
    if let Some(namespace) = annotations.namespace.as_deref() {
        metadata["namespace"] = json!(names::resource_name(namespace, &[]));
    }

    let payload = json!({
        "apiVersion": config.service_api_version,
        "kind": "Service",
        "metadata": metadata,
        "spec": spec
    });
    Ok(Some(GeneratedResource {
        resource_type: ResourceKind::Service,
        name,
        payload,
    }))
}
