// Kubernetes manifest compilation: four independent resource generators
// behind one entry point. Generators are pure; an error in one resource
// kind never suppresses the others.

pub mod deployment;
pub mod ingress;
pub mod names;
pub mod namespace;
pub mod ports;
pub mod service;

use crate::types::{key, Annotations, Version};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Namespace,
    Deployment,
    Service,
    Ingress,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Namespace,
        ResourceKind::Deployment,
        ResourceKind::Service,
        ResourceKind::Ingress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Namespace => "namespace",
            ResourceKind::Deployment => "deployment",
            ResourceKind::Service => "service",
            ResourceKind::Ingress => "ingress",
        }
    }

    pub fn parse(raw: &str) -> Option<ResourceKind> {
        match raw.to_ascii_lowercase().as_str() {
            "namespace" => Some(ResourceKind::Namespace),
            "deployment" => Some(ResourceKind::Deployment),
            "service" => Some(ResourceKind::Service),
            "ingress" => Some(ResourceKind::Ingress),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One compiled manifest document, immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedResource {
    pub resource_type: ResourceKind,
    pub name: String,
    pub payload: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeploymentType {
    #[default]
    Rolling,
    Canary,
    BlueGreen,
}

impl DeploymentType {
    pub fn parse(raw: &str) -> Option<DeploymentType> {
        match raw.to_ascii_lowercase().as_str() {
            "rolling" => Some(DeploymentType::Rolling),
            "canary" => Some(DeploymentType::Canary),
            "blue-green" | "bluegreen" => Some(DeploymentType::BlueGreen),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImagePullPolicy {
    Never,
    #[default]
    IfNotPresent,
    Always,
}

impl ImagePullPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImagePullPolicy::Never => "Never",
            ImagePullPolicy::IfNotPresent => "IfNotPresent",
            ImagePullPolicy::Always => "Always",
        }
    }

    pub fn parse(raw: &str) -> Option<ImagePullPolicy> {
        match raw {
            "Never" => Some(ImagePullPolicy::Never),
            "IfNotPresent" => Some(ImagePullPolicy::IfNotPresent),
            "Always" => Some(ImagePullPolicy::Always),
            _ => None,
        }
    }
}

/// Caller-side configuration for one compile run.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateConfig {
    /// Fully-qualified image reference embedded in the container spec.
    pub image: String,
    pub deployment_type: DeploymentType,
    /// Which resource kinds to emit; everything else is generated and then
    /// discarded.
    pub resource_types: Vec<ResourceKind>,
    pub replicas: u32,
    pub image_pull_policy: ImagePullPolicy,
    pub cluster_ip: Option<String>,
    pub ingress_annotations: BTreeMap<String, String>,
    pub ingress_path_suffix: Option<String>,
    /// Externally resolved service addresses, consumed by service-discovery
    /// environment synthesis.
    pub external_services: BTreeMap<String, Vec<String>>,
    pub namespace_api_version: String,
    pub deployment_api_version: String,
    pub service_api_version: String,
    pub ingress_api_version: String,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        GenerateConfig {
            image: String::new(),
            deployment_type: DeploymentType::default(),
            resource_types: ResourceKind::ALL.to_vec(),
            replicas: 1,
            image_pull_policy: ImagePullPolicy::default(),
            cluster_ip: None,
            ingress_annotations: BTreeMap::new(),
            ingress_path_suffix: None,
            external_services: BTreeMap::new(),
            namespace_api_version: "v1".to_string(),
            deployment_api_version: "apps/v1".to_string(),
            service_api_version: "v1".to_string(),
            ingress_api_version: "networking.k8s.io/v1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    #[error("cannot generate {kind}: missing required label(s): {}", .labels.join(", "))]
    MissingField {
        kind: ResourceKind,
        labels: Vec<&'static str>,
    },
}

/// Everything one compile run produced: the surviving resources plus any
/// per-kind errors, side by side.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOutput {
    pub resources: Vec<GeneratedResource>,
    pub errors: Vec<GenerateError>,
}

/// Runs every generator over the same immutable descriptor, drops skips,
/// and keeps only the resource kinds the caller asked for.
pub fn generate(annotations: &Annotations, config: &GenerateConfig) -> GenerateOutput {
    let results = [
        (
            ResourceKind::Namespace,
            namespace::generate(annotations, config),
        ),
        (
            ResourceKind::Deployment,
            deployment::generate(annotations, config),
        ),
        (
            ResourceKind::Service,
            service::generate(annotations, config),
        ),
        (
            ResourceKind::Ingress,
            ingress::generate(annotations, config),
        ),
    ];

    let mut resources = Vec::new();
    let mut errors = Vec::new();
    for (kind, result) in results {
        if !config.resource_types.contains(&kind) {
            continue;
        }
        match result {
            Ok(Some(resource)) => resources.push(resource),
            Ok(None) => {}
            Err(error) => errors.push(error),
        }
    }
    GenerateOutput { resources, errors }
}

/// Sanitized base resource name for the application.
pub(crate) fn base_name(app_name: &str) -> String {
    names::resource_name(app_name, &[])
}

/// Version-qualified resource name, `myapp-v1.2.3`; dots survive.
pub(crate) fn versioned_name(app_name: &str, version: &Version) -> String {
    names::resource_name(&format!("{}-v{}", app_name, version.raw), &['.'])
}

/// Layered workload labels shared by Deployment metadata, pod template and
/// Service selectors.
pub(crate) fn version_labels(base: &str, version: &Version) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("app".to_string(), base.to_string());
    labels.insert(
        "appVersionMajor".to_string(),
        names::resource_name(&format!("{}-v{}", base, version.major), &['.']),
    );
    labels.insert(
        "appVersionMajorMinor".to_string(),
        names::resource_name(&format!("{}-v{}", base, version.major_minor()), &['.']),
    );
    labels.insert(
        "appVersion".to_string(),
        names::resource_name(&format!("{}-v{}", base, version.raw), &['.']),
    );
    labels
}

/// Deployment and Service both refuse to compile without an application
/// identity; the error names exactly the labels that are missing.
pub(crate) fn require_app_identity<'a>(
    annotations: &'a Annotations,
    kind: ResourceKind,
) -> Result<(&'a str, &'a Version), GenerateError> {
    match (annotations.app_name.as_deref(), annotations.version.as_ref()) {
        (Some(app_name), Some(version)) => Ok((app_name, version)),
        (app_name, version) => {
            let mut labels = Vec::new();
            if app_name.is_none() {
                labels.push(key::APP_NAME);
            }
            if version.is_none() {
                labels.push(key::APP_VERSION);
            }
            Err(GenerateError::MissingField { kind, labels })
        }
    }
}
