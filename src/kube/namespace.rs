// Namespace resource generation.

use super::{names, GenerateConfig, GenerateError, GeneratedResource, ResourceKind};
use crate::types::Annotations;
use serde_json::json;

/// Emits a Namespace when the descriptor declares one; otherwise a skip.
pub fn generate(
    annotations: &Annotations,
    config: &GenerateConfig,
) -> Result<Option<GeneratedResource>, GenerateError> {
    let Some(namespace) = annotations.namespace.as_deref() else {
        return Ok(None);
    };
    let name = names::resource_name(namespace, &[]);
    let payload = json!({
        "apiVersion": config.namespace_api_version,
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "labels": { "name": name }
        }
    });
    Ok(Some(GeneratedResource {
        resource_type: ResourceKind::Namespace,
        name,
        payload,
    }))
}
