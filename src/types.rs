// Typed application descriptor decoded from container image labels.
// Manifest generation builds serde_json::Value documents from these types.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Label namespace under which application metadata is declared,
/// e.g. `com.lightbend.rp.app-name` or `com.lightbend.rp.endpoints.0.port`.
pub const NS: &str = "com.lightbend.rp";

/// Scalar label-key suffixes inside [`NS`].
pub mod key {
    pub const NAMESPACE: &str = "namespace";
    pub const APP_NAME: &str = "app-name";
    pub const APP_TYPE: &str = "app-type";
    pub const APP_VERSION: &str = "app-version";
    pub const DISK_SPACE: &str = "disk-space";
    pub const MEMORY: &str = "memory";
    pub const NR_OF_CPUS: &str = "nr-of-cpus";
    pub const PRIVILEGED: &str = "privileged";
    pub const MODULES: &str = "modules";
    pub const ENDPOINTS: &str = "endpoints";
    pub const VOLUMES: &str = "volumes";
    pub const ENVIRONMENT_VARIABLES: &str = "environment-variables";
    pub const SECRETS: &str = "secrets";
    pub const HEALTH_CHECK: &str = "health-check";
    pub const READINESS_CHECK: &str = "readiness-check";
}

/// Module tag enabling service-discovery environment synthesis.
pub const MODULE_SERVICE_DISCOVERY: &str = "service-discovery";

/// Everything the labels declared about an application. Construction never
/// fails: unrecognized or malformed entries are dropped during decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotations {
    pub namespace: Option<String>,
    pub app_name: Option<String>,
    pub app_type: Option<String>,
    pub version: Option<Version>,
    pub disk_space: Option<i64>,
    pub memory: Option<i64>,
    pub nr_of_cpus: Option<f64>,
    pub privileged: bool,
    pub modules: BTreeSet<String>,
    /// Endpoints keyed by name; names are unique, a later duplicate wins.
    pub endpoints: BTreeMap<String, Endpoint>,
    /// Volumes keyed by guest mount path; a later entry for the same
    /// path overwrites the earlier one.
    pub volumes: BTreeMap<String, Volume>,
    pub environment_variables: BTreeMap<String, EnvironmentVariable>,
    pub secrets: Vec<Secret>,
    pub health_check: Option<Check>,
    pub readiness_check: Option<Check>,
}

/// Application version, `major.minor.patch` with an optional patch label
/// (`1.2.3-SNAPSHOT`). `raw` keeps the label value exactly as declared.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub patch_label: Option<String>,
    pub raw: String,
}

impl Version {
    /// `major.minor`, used for canary / blue-green selector labels.
    pub fn major_minor(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }
}

/// A named network surface the application exposes. The declaration index is
/// assigned once at decode time and drives default port numbering and the
/// index-keyed environment variables.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub name: String,
    pub index: usize,
    pub port: Option<u16>,
    pub protocol: Protocol,
}

/// Endpoint protocol; each variant carries only ACLs of its own shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum Protocol {
    Http { acls: Vec<HttpAcl> },
    Tcp { acls: Vec<PortAcl> },
    Udp { acls: Vec<PortAcl> },
}

/// HTTP access rule: a path expression routed through the ingress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpAcl {
    pub expression: String,
}

/// TCP/UDP access rule: a single port or an inclusive range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum PortAcl {
    Port { port: u16 },
    Range { from: u16, to: u16 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum Volume {
    HostPath { path: String },
    Secret { secret: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum EnvironmentVariable {
    Literal {
        value: String,
    },
    Secret {
        secret_value: String,
    },
    ConfigMap {
        map_name: String,
        key: String,
    },
    FieldRef {
        field_path: String,
    },
    SecretKeyRef {
        secret_namespace: String,
        secret_name: String,
        key: String,
    },
}

/// Liveness/readiness check. `port` may be symbolic (a service name the
/// orchestrator resolves) rather than a concrete number.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum Check {
    Command {
        args: Vec<String>,
    },
    Http {
        port: CheckPort,
        interval_seconds: u32,
        path: String,
    },
    Tcp {
        port: CheckPort,
        interval_seconds: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckPort {
    Number(u16),
    ServiceName(String),
}

/// Reference to an entry in an external secret store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Secret {
    pub namespace: String,
    pub name: String,
}

impl Endpoint {
    /// HTTP path-expression ACLs, empty for TCP/UDP endpoints.
    pub fn http_acls(&self) -> &[HttpAcl] {
        match &self.protocol {
            Protocol::Http { acls } => acls,
            Protocol::Tcp { .. } | Protocol::Udp { .. } => &[],
        }
    }
}
