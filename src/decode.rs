// Best-effort decoding of flat dotted image labels into the typed
// application descriptor. Decoding is total: malformed scalars fall back to
// defaults and elements with unrecognized discriminators are dropped.

use crate::types::{
    key, Annotations, Check, CheckPort, Endpoint, EnvironmentVariable, HttpAcl, PortAcl, Protocol,
    Secret, Version, Volume, NS,
};
use std::collections::{BTreeMap, BTreeSet};

/// Flat image-label mapping, dotted reverse-DNS keys to string values.
pub type RawLabels = BTreeMap<String, String>;

/// Collects the array-shaped entries under `prefix`: for every key
/// `prefix.N.rest` (N a non-negative integer) the element map for `N` gains
/// `rest -> value`; a key exactly `prefix.N` contributes under the empty
/// suffix. Elements come back in ascending numeric order of `N`, gaps
/// tolerated, regardless of input order.
pub fn select_array(labels: &RawLabels, prefix: &str) -> Vec<BTreeMap<String, String>> {
    let head = format!("{prefix}.");
    let mut groups: BTreeMap<usize, BTreeMap<String, String>> = BTreeMap::new();
    for (label, value) in labels {
        let Some(rest) = label.strip_prefix(&head) else {
            continue;
        };
        let (index, suffix) = match rest.split_once('.') {
            Some((index, suffix)) => (index, suffix),
            None => (rest, ""),
        };
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let Ok(index) = index.parse::<usize>() else {
            continue;
        };
        groups
            .entry(index)
            .or_default()
            .insert(suffix.to_string(), value.clone());
    }
    groups.into_values().collect()
}

/// Returns every key sharing `prefix.`, with the prefix and separator
/// stripped. A longer sibling prefix (`prefix-extra.x`) does not match.
pub fn select_subset(labels: &RawLabels, prefix: &str) -> BTreeMap<String, String> {
    let head = format!("{prefix}.");
    labels
        .iter()
        .filter_map(|(label, value)| {
            label
                .strip_prefix(&head)
                .map(|rest| (rest.to_string(), value.clone()))
        })
        .collect()
}

// Scalar decoders: exactly the platform textual representation, otherwise
// absent. A trailing decimal point or stray whitespace is a parse failure.

pub fn decode_boolean(s: &str) -> Option<bool> {
    s.parse().ok()
}

pub fn decode_int(s: &str) -> Option<i32> {
    s.parse().ok()
}

pub fn decode_long(s: &str) -> Option<i64> {
    s.parse().ok()
}

pub fn decode_double(s: &str) -> Option<f64> {
    s.parse().ok()
}

fn decode_port(s: &str) -> Option<u16> {
    decode_int(s).and_then(|port| u16::try_from(port).ok())
}

/// Decodes the label mapping into an [`Annotations`] descriptor. Total and
/// pure: unknown keys are ignored and nothing here ever fails.
pub fn decode(labels: &RawLabels) -> Annotations {
    let scalar = |suffix: &str| labels.get(&format!("{NS}.{suffix}"));
    let prefixed = |suffix: &str| format!("{NS}.{suffix}");

    Annotations {
        namespace: scalar(key::NAMESPACE).cloned(),
        app_name: scalar(key::APP_NAME).cloned(),
        app_type: scalar(key::APP_TYPE).cloned(),
        version: scalar(key::APP_VERSION).and_then(|raw| decode_version(raw)),
        disk_space: scalar(key::DISK_SPACE).and_then(|raw| decode_long(raw)),
        memory: scalar(key::MEMORY).and_then(|raw| decode_long(raw)),
        nr_of_cpus: scalar(key::NR_OF_CPUS).and_then(|raw| decode_double(raw)),
        privileged: scalar(key::PRIVILEGED)
            .and_then(|raw| decode_boolean(raw))
            .unwrap_or(false),
        modules: decode_modules(&select_subset(labels, &prefixed(key::MODULES))),
        endpoints: decode_endpoints(labels, &prefixed(key::ENDPOINTS)),
        volumes: decode_volumes(labels, &prefixed(key::VOLUMES)),
        environment_variables: decode_environment_variables(
            labels,
            &prefixed(key::ENVIRONMENT_VARIABLES),
        ),
        secrets: decode_secrets(labels, &prefixed(key::SECRETS)),
        health_check: decode_check(&select_subset(labels, &prefixed(key::HEALTH_CHECK))),
        readiness_check: decode_check(&select_subset(labels, &prefixed(key::READINESS_CHECK))),
    }
}

/// `major.minor.patch` with an optional `-label` suffix; anything else is
/// not a version.
fn decode_version(raw: &str) -> Option<Version> {
    let (base, patch_label) = match raw.split_once('-') {
        Some((base, label)) => (base, Some(label.to_string())),
        None => (raw, None),
    };
    let mut parts = base.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Version {
        major,
        minor,
        patch,
        patch_label,
        raw: raw.to_string(),
    })
}

fn decode_modules(subset: &BTreeMap<String, String>) -> BTreeSet<String> {
    subset
        .iter()
        .filter_map(|(rest, value)| {
            let name = rest.strip_suffix(".enabled")?;
            (decode_boolean(value) == Some(true)).then(|| name.to_string())
        })
        .collect()
}

fn decode_endpoints(labels: &RawLabels, prefix: &str) -> BTreeMap<String, Endpoint> {
    let mut endpoints = BTreeMap::new();
    for (index, entry) in select_array(labels, prefix).into_iter().enumerate() {
        let Some(endpoint) = decode_endpoint(index, &entry) else {
            continue;
        };
        endpoints.insert(endpoint.name.clone(), endpoint);
    }
    endpoints
}

fn decode_endpoint(index: usize, entry: &BTreeMap<String, String>) -> Option<Endpoint> {
    let name = entry.get("name")?.clone();
    let port = entry.get("port").and_then(|raw| decode_port(raw));
    let acl_entries = select_array(entry, "acls");
    let protocol = match entry.get("protocol").map(String::as_str) {
        Some("http") => Protocol::Http {
            acls: acl_entries
                .iter()
                .filter_map(|acl| decode_http_acl(acl))
                .collect(),
        },
        Some("tcp") => Protocol::Tcp {
            acls: acl_entries
                .iter()
                .filter_map(|acl| decode_port_acl(acl, "tcp"))
                .collect(),
        },
        Some("udp") => Protocol::Udp {
            acls: acl_entries
                .iter()
                .filter_map(|acl| decode_port_acl(acl, "udp"))
                .collect(),
        },
        _ => return None,
    };
    Some(Endpoint {
        name,
        index,
        port,
        protocol,
    })
}

fn decode_http_acl(entry: &BTreeMap<String, String>) -> Option<HttpAcl> {
    if entry.get("type").map(String::as_str) != Some("http") {
        return None;
    }
    Some(HttpAcl {
        expression: entry.get("expression")?.clone(),
    })
}

fn decode_port_acl(entry: &BTreeMap<String, String>, expected: &str) -> Option<PortAcl> {
    if entry.get("type").map(String::as_str) != Some(expected) {
        return None;
    }
    if let Some(port) = entry.get("port").and_then(|raw| decode_port(raw)) {
        return Some(PortAcl::Port { port });
    }
    let from = entry.get("from-port").and_then(|raw| decode_port(raw))?;
    let to = entry.get("to-port").and_then(|raw| decode_port(raw))?;
    Some(PortAcl::Range { from, to })
}

fn decode_volumes(labels: &RawLabels, prefix: &str) -> BTreeMap<String, Volume> {
    let mut volumes = BTreeMap::new();
    for entry in select_array(labels, prefix) {
        let Some((guest_path, volume)) = decode_volume(&entry) else {
            continue;
        };
        // Keyed by guest path: a later element for the same path wins.
        volumes.insert(guest_path, volume);
    }
    volumes
}

fn decode_volume(entry: &BTreeMap<String, String>) -> Option<(String, Volume)> {
    let guest_path = entry.get("guest-path")?.clone();
    let volume = match entry.get("type").map(String::as_str) {
        Some("host-path") => Volume::HostPath {
            path: entry.get("path")?.clone(),
        },
        Some("secret") => Volume::Secret {
            secret: entry.get("secret")?.clone(),
        },
        _ => return None,
    };
    Some((guest_path, volume))
}

fn decode_environment_variables(
    labels: &RawLabels,
    prefix: &str,
) -> BTreeMap<String, EnvironmentVariable> {
    let mut variables = BTreeMap::new();
    for entry in select_array(labels, prefix) {
        let Some((name, variable)) = decode_environment_variable(&entry) else {
            continue;
        };
        variables.insert(name, variable);
    }
    variables
}

fn decode_environment_variable(
    entry: &BTreeMap<String, String>,
) -> Option<(String, EnvironmentVariable)> {
    let name = entry.get("name")?.clone();
    let variable = match entry.get("type").map(String::as_str) {
        Some("literal") => EnvironmentVariable::Literal {
            value: entry.get("value")?.clone(),
        },
        Some("secret") => EnvironmentVariable::Secret {
            secret_value: entry.get("secret-value")?.clone(),
        },
        Some("config-map") => EnvironmentVariable::ConfigMap {
            map_name: entry.get("map-name")?.clone(),
            key: entry.get("key")?.clone(),
        },
        Some("field-ref") => EnvironmentVariable::FieldRef {
            field_path: entry.get("field-path")?.clone(),
        },
        Some("secret-key-ref") => EnvironmentVariable::SecretKeyRef {
            secret_namespace: entry.get("secret-namespace")?.clone(),
            secret_name: entry.get("secret-name")?.clone(),
            key: entry.get("key")?.clone(),
        },
        _ => return None,
    };
    Some((name, variable))
}

fn decode_secrets(labels: &RawLabels, prefix: &str) -> Vec<Secret> {
    select_array(labels, prefix)
        .iter()
        .filter_map(|entry| {
            Some(Secret {
                namespace: entry.get("namespace")?.clone(),
                name: entry.get("name")?.clone(),
            })
        })
        .collect()
}

const DEFAULT_CHECK_INTERVAL_SECONDS: u32 = 10;

fn decode_check(subset: &BTreeMap<String, String>) -> Option<Check> {
    match subset.get("type").map(String::as_str) {
        Some("command") => {
            let args: Vec<String> = select_array(subset, "args")
                .iter()
                .filter_map(|element| element.get("").cloned())
                .collect();
            (!args.is_empty()).then_some(Check::Command { args })
        }
        Some("http") => Some(Check::Http {
            port: decode_check_port(subset)?,
            interval_seconds: decode_check_interval(subset),
            path: subset.get("path").cloned().unwrap_or_default(),
        }),
        Some("tcp") => Some(Check::Tcp {
            port: decode_check_port(subset)?,
            interval_seconds: decode_check_interval(subset),
        }),
        _ => None,
    }
}

fn decode_check_port(subset: &BTreeMap<String, String>) -> Option<CheckPort> {
    if let Some(port) = subset.get("port").and_then(|raw| decode_port(raw)) {
        return Some(CheckPort::Number(port));
    }
    subset
        .get("service-name")
        .map(|name| CheckPort::ServiceName(name.clone()))
}

fn decode_check_interval(subset: &BTreeMap<String, String>) -> u32 {
    subset
        .get("interval")
        .and_then(|raw| decode_int(raw))
        .and_then(|seconds| u32::try_from(seconds).ok())
        .unwrap_or(DEFAULT_CHECK_INTERVAL_SECONDS)
}
