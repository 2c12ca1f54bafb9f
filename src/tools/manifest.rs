// Generate Kubernetes manifests from container image labels.

use crate::decode::{self, RawLabels};
use crate::kube::{
    self, DeploymentType, GenerateConfig, GeneratedResource, ImagePullPolicy, ResourceKind,
};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

const FORMATS: [&str; 2] = ["json", "yaml"];
const DEPLOYMENT_TYPES: [&str; 3] = ["rolling", "canary", "blue-green"];
const PULL_POLICIES: [&str; 3] = ["Never", "IfNotPresent", "Always"];

/// Compiles image labels into manifest documents.
/// labels, ingress_annotations and external_services are JSON object strings.
/// Returns the rendered documents plus per-resource-kind generation errors;
/// the hard `Err` side is reserved for unusable input.
#[allow(clippy::too_many_arguments)]
pub fn generate_manifests(
    labels_json: &str,
    image: &str,
    deployment_type: Option<&str>,
    resource_types: Option<&[String]>,
    replicas: Option<u32>,
    image_pull_policy: Option<&str>,
    cluster_ip: Option<&str>,
    ingress_annotations: Option<&str>,
    ingress_path_suffix: Option<&str>,
    external_services: Option<&str>,
    format: Option<&str>,
) -> Result<(String, Vec<String>), String> {
    let labels = parse_labels(labels_json)?;

    let deployment_type = match deployment_type {
        Some(raw) => DeploymentType::parse(raw).ok_or_else(|| {
            format!(
                "deployment_type must be one of: {}",
                DEPLOYMENT_TYPES.join(", ")
            )
        })?,
        None => DeploymentType::default(),
    };
    let image_pull_policy = match image_pull_policy {
        Some(raw) => ImagePullPolicy::parse(raw).ok_or_else(|| {
            format!(
                "image_pull_policy must be one of: {}",
                PULL_POLICIES.join(", ")
            )
        })?,
        None => ImagePullPolicy::default(),
    };
    let resource_types = match resource_types {
        Some(raw) => raw
            .iter()
            .map(|kind| {
                ResourceKind::parse(kind).ok_or_else(|| {
                    format!(
                        "resource_types entries must be one of: {}",
                        ResourceKind::ALL
                            .iter()
                            .map(|k| k.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => ResourceKind::ALL.to_vec(),
    };
    let format = match format {
        Some(raw) if FORMATS.contains(&raw) => raw,
        Some(_) => return Err(format!("format must be one of: {}", FORMATS.join(", "))),
        None => "json",
    };

    let config = GenerateConfig {
        image: image.to_string(),
        deployment_type,
        resource_types,
        replicas: replicas.unwrap_or(1),
        image_pull_policy,
        cluster_ip: cluster_ip.map(str::to_string),
        ingress_annotations: match ingress_annotations {
            Some(json) => parse_string_map(json)
                .map_err(|e| format!("ingress_annotations invalid: {}", e))?,
            None => BTreeMap::new(),
        },
        ingress_path_suffix: ingress_path_suffix.map(str::to_string),
        external_services: match external_services {
            Some(json) => parse_address_map(json)
                .map_err(|e| format!("external_services invalid: {}", e))?,
            None => BTreeMap::new(),
        },
        ..GenerateConfig::default()
    };

    let annotations = decode::decode(&labels);
    debug!(
        labels = labels.len(),
        endpoints = annotations.endpoints.len(),
        "decoded application descriptor"
    );
    let output = kube::generate(&annotations, &config);
    let diagnostics: Vec<String> = output.errors.iter().map(|e| e.to_string()).collect();
    let rendered = render(&output.resources, format)?;
    Ok((rendered, diagnostics))
}

/// Decodes the labels into the application descriptor and returns it as
/// pretty JSON, without generating anything.
pub fn decode_labels(labels_json: &str) -> Result<String, String> {
    let labels = parse_labels(labels_json)?;
    let annotations = decode::decode(&labels);
    serde_json::to_string_pretty(&annotations).map_err(|e| e.to_string())
}

fn parse_labels(json: &str) -> Result<RawLabels, String> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| format!("labels invalid JSON: {}", e))?;
    let Some(object) = value.as_object() else {
        return Err("labels must be a JSON object mapping label keys to string values".to_string());
    };
    let mut labels = RawLabels::new();
    for (key, value) in object {
        let Some(value) = value.as_str() else {
            return Err(format!("label '{}' must have a string value", key));
        };
        labels.insert(key.clone(), value.to_string());
    }
    Ok(labels)
}

fn parse_string_map(json: &str) -> Result<BTreeMap<String, String>, String> {
    serde_json::from_str(json).map_err(|e| e.to_string())
}

fn parse_address_map(json: &str) -> Result<BTreeMap<String, Vec<String>>, String> {
    serde_json::from_str(json).map_err(|e| e.to_string())
}

/// Renders the documents separated by a `---` marker line, pretty JSON by
/// default or YAML on request.
fn render(resources: &[GeneratedResource], format: &str) -> Result<String, String> {
    let mut documents = Vec::with_capacity(resources.len());
    for resource in resources {
        let text = match format {
            "yaml" => serde_yaml::to_string(&resource.payload).map_err(|e| e.to_string())?,
            _ => {
                let mut json =
                    serde_json::to_string_pretty(&resource.payload).map_err(|e| e.to_string())?;
                json.push('\n');
                json
            }
        };
        documents.push(text);
    }
    Ok(documents.join("---\n"))
}
