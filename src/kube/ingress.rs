// Ingress resource generation: HTTP path-expression ACLs become routing
// rules bound to the strategy-derived service.

use super::{
    base_name, names, ports, versioned_name, DeploymentType, GenerateConfig, GenerateError,
    GeneratedResource, ResourceKind,
};
use crate::types::{key, Annotations};
use serde_json::{json, Map as JsonMap, Value};

pub fn generate(
    annotations: &Annotations,
    config: &GenerateConfig,
) -> Result<Option<GeneratedResource>, GenerateError> {
    let assigned = ports::assign_ports(&annotations.endpoints);
    let routed: Vec<(&str, u16)> = assigned
        .iter()
        .flat_map(|a| {
            a.endpoint
                .http_acls()
                .iter()
                .map(move |acl| (acl.expression.as_str(), a.port))
        })
        .collect();
    if routed.is_empty() {
        return Ok(None);
    }

    let Some(app_name) = annotations.app_name.as_deref() else {
        return Err(GenerateError::MissingField {
            kind: ResourceKind::Ingress,
            labels: vec![key::APP_NAME],
        });
    };
    let base = base_name(app_name);
    // The backend service name follows the Service generator's naming.
    let service_name = match config.deployment_type {
        DeploymentType::Rolling | DeploymentType::Canary => base.clone(),
        DeploymentType::BlueGreen => {
            let Some(version) = annotations.version.as_ref() else {
                return Err(GenerateError::MissingField {
                    kind: ResourceKind::Ingress,
                    labels: vec![key::APP_VERSION],
                });
            };
            versioned_name(app_name, version)
        }
    };

    let suffix = config.ingress_path_suffix.as_deref().unwrap_or("");
    let paths: Vec<Value> = routed
        .iter()
        .map(|(expression, port)| {
            json!({
                "path": format!("{expression}{suffix}"),
                "pathType": "Prefix",
                "backend": {
                    "service": {
                        "name": service_name,
                        "port": { "number": port }
                    }
                }
            })
        })
        .collect();

    let mut metadata = JsonMap::new();
    metadata.insert("name".to_string(), json!(base));
    if let Some(namespace) = annotations.namespace.as_deref() {
        metadata.insert(
            "namespace".to_string(),
            json!(names::resource_name(namespace, &[])),
        );
    }
    metadata.insert("labels".to_string(), json!({ "app": base }));
    if !config.ingress_annotations.is_empty() {
        metadata.insert("annotations".to_string(), json!(config.ingress_annotations));
    }

    let payload = json!({
        "apiVersion": config.ingress_api_version,
        "kind": "Ingress",
        "metadata": metadata,
        "spec": {
            "rules": [
                { "http": { "paths": paths } }
            ]
        }
    });
    Ok(Some(GeneratedResource {
        resource_type: ResourceKind::Ingress,
        name: base,
        payload,
    }))
}
