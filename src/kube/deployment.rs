// Deployment (workload controller) generation: strategy-dependent naming
// and labeling, merged environment, container ports and probes.

use super::{
    base_name, names, ports, require_app_identity, version_labels, versioned_name, DeploymentType,
    GenerateConfig, GenerateError, GeneratedResource, ResourceKind,
};
use crate::types::{
    Annotations, Check, CheckPort, EnvironmentVariable, Version, MODULE_SERVICE_DISCOVERY,
};
use serde_json::{json, Map as JsonMap, Value};
use std::collections::BTreeMap;

pub fn generate(
    annotations: &Annotations,
    config: &GenerateConfig,
) -> Result<Option<GeneratedResource>, GenerateError> {
    let (app_name, version) = require_app_identity(annotations, ResourceKind::Deployment)?;
    let base = base_name(app_name);

    let (name, labels, selector) = match config.deployment_type {
        DeploymentType::Rolling => {
            let mut labels = BTreeMap::new();
            labels.insert("app".to_string(), base.clone());
            (base.clone(), labels, json!({ "app": base }))
        }
        DeploymentType::Canary | DeploymentType::BlueGreen => {
            let labels = version_labels(&base, version);
            let selector = json!({
                "appVersionMajorMinor": labels["appVersionMajorMinor"]
            });
            (versioned_name(app_name, version), labels, selector)
        }
    };

    let assigned = ports::assign_ports(&annotations.endpoints);
    let container_ports: Vec<Value> = assigned
        .iter()
        .map(|a| {
            json!({
                "containerPort": a.port,
                "name": names::resource_name(&a.endpoint.name, &[])
            })
        })
        .collect();

    let mut container = JsonMap::new();
    container.insert("name".to_string(), json!(base));
    container.insert("image".to_string(), json!(config.image));
    container.insert(
        "imagePullPolicy".to_string(),
        json!(config.image_pull_policy.as_str()),
    );
    container.insert(
        "env".to_string(),
        environment(annotations, config, &assigned, app_name, version),
    );
    container.insert("ports".to_string(), json!(container_ports));
    if let Some(check) = &annotations.health_check {
        container.insert("livenessProbe".to_string(), probe(check));
    }
    if let Some(check) = &annotations.readiness_check {
        container.insert("readinessProbe".to_string(), probe(check));
    }
    if let Some(limits) = resource_limits(annotations) {
        container.insert("resources".to_string(), limits);
    }
    if annotations.privileged {
        container.insert("securityContext".to_string(), json!({ "privileged": true }));
    }

    let mut metadata = JsonMap::new();
    metadata.insert("name".to_string(), json!(name));
    if let Some(namespace) = annotations.namespace.as_deref() {
        metadata.insert(
            "namespace".to_string(),
            json!(names::resource_name(namespace, &[])),
        );
    }
    metadata.insert("labels".to_string(), json!(labels));

    let payload = json!({
        "apiVersion": config.deployment_api_version,
        "kind": "Deployment",
        "metadata": metadata,
        "spec": {
            "replicas": config.replicas,
            "selector": { "matchLabels": selector },
            "template": {
                "metadata": { "labels": labels },
                "spec": {
                    "containers": [ container ]
                }
            }
        }
    });
    Ok(Some(GeneratedResource {
        resource_type: ResourceKind::Deployment,
        name,
        payload,
    }))
}

/// Merged container environment: synthesized runtime-introspection
/// variables first, annotation-declared variables layered on top (the
/// declaration wins on a name collision), serialized in name order.
fn environment(
    annotations: &Annotations,
    config: &GenerateConfig,
    assigned: &[ports::AssignedPort],
    app_name: &str,
    version: &Version,
) -> Value {
    let mut env: BTreeMap<String, Value> = BTreeMap::new();

    env.insert("RP_PLATFORM".to_string(), json!({ "value": "kubernetes" }));
    env.insert("RP_APP_NAME".to_string(), json!({ "value": app_name }));
    if let Some(app_type) = annotations.app_type.as_deref() {
        env.insert("RP_APP_TYPE".to_string(), json!({ "value": app_type }));
    }
    env.insert("RP_APP_VERSION".to_string(), json!({ "value": version.raw }));
    if !annotations.modules.is_empty() {
        let modules: Vec<&str> = annotations.modules.iter().map(String::as_str).collect();
        env.insert(
            "RP_MODULES".to_string(),
            json!({ "value": modules.join(",") }),
        );
    }
    env.insert(
        "RP_NAMESPACE".to_string(),
        json!({ "valueFrom": { "fieldRef": { "fieldPath": "metadata.namespace" } } }),
    );
    env.insert(
        "RP_ENDPOINTS_COUNT".to_string(),
        json!({ "value": assigned.len().to_string() }),
    );
    for a in assigned {
        let host = json!({ "valueFrom": { "fieldRef": { "fieldPath": "status.podIP" } } });
        let port = json!({ "value": a.port.to_string() });
        let by_name = names::env_name(&a.endpoint.name);
        env.insert(format!("RP_ENDPOINT_{by_name}_HOST"), host.clone());
        env.insert(format!("RP_ENDPOINT_{by_name}_PORT"), port.clone());
        env.insert(format!("RP_ENDPOINT_{}_HOST", a.endpoint.index), host);
        env.insert(format!("RP_ENDPOINT_{}_PORT", a.endpoint.index), port);
    }
    for secret in &annotations.secrets {
        env.insert(
            format!(
                "RP_SECRETS_{}_{}",
                names::env_name(&secret.namespace),
                names::env_name(&secret.name)
            ),
            json!({
                "valueFrom": {
                    "secretKeyRef": {
                        "name": names::resource_name(&secret.namespace, &[]),
                        "key": secret.name
                    }
                }
            }),
        );
    }
    if annotations.modules.contains(MODULE_SERVICE_DISCOVERY) {
        let args: Vec<String> = config
            .external_services
            .iter()
            .flat_map(|(service, addresses)| {
                addresses.iter().enumerate().map(move |(i, address)| {
                    format!(
                        "-Drp.service-discovery.external-service-addresses.{service}.{i}={address}"
                    )
                })
            })
            .collect();
        env.insert("RP_JAVA_OPTS".to_string(), json!({ "value": args.join(" ") }));
    }

    for (name, variable) in &annotations.environment_variables {
        env.insert(names::env_name(name), environment_variable_value(variable));
    }

    let entries: Vec<Value> = env
        .into_iter()
        .map(|(name, body)| {
            let mut entry = JsonMap::new();
            entry.insert("name".to_string(), json!(name));
            if let Value::Object(fields) = body {
                entry.extend(fields);
            }
            Value::Object(entry)
        })
        .collect();
    Value::Array(entries)
}

fn environment_variable_value(variable: &EnvironmentVariable) -> Value {
    match variable {
        EnvironmentVariable::Literal { value } => json!({ "value": value }),
        EnvironmentVariable::Secret { secret_value } => json!({
            "valueFrom": {
                "secretKeyRef": {
                    "name": names::resource_name(secret_value, &[]),
                    "key": "value"
                }
            }
        }),
        EnvironmentVariable::ConfigMap { map_name, key } => json!({
            "valueFrom": {
                "configMapKeyRef": { "name": map_name, "key": key }
            }
        }),
        EnvironmentVariable::FieldRef { field_path } => json!({
            "valueFrom": {
                "fieldRef": { "fieldPath": field_path }
            }
        }),
        EnvironmentVariable::SecretKeyRef {
            secret_namespace,
            secret_name,
            key,
        } => json!({
            "valueFrom": {
                "secretKeyRef": {
                    "name": names::resource_name(&format!("{secret_namespace}-{secret_name}"), &[]),
                    "key": key
                }
            }
        }),
    }
}

fn probe(check: &Check) -> Value {
    match check {
        Check::Command { args } => json!({ "exec": { "command": args } }),
        Check::Http {
            port,
            interval_seconds,
            path,
        } => json!({
            "httpGet": { "path": path, "port": check_port(port) },
            "periodSeconds": interval_seconds
        }),
        Check::Tcp {
            port,
            interval_seconds,
        } => json!({
            "tcpSocket": { "port": check_port(port) },
            "periodSeconds": interval_seconds
        }),
    }
}

fn check_port(port: &CheckPort) -> Value {
    match port {
        CheckPort::Number(number) => json!(number),
        CheckPort::ServiceName(name) => json!(names::resource_name(name, &[])),
    }
}

fn resource_limits(annotations: &Annotations) -> Option<Value> {
    let mut limits = JsonMap::new();
    if let Some(memory) = annotations.memory {
        limits.insert("memory".to_string(), json!(memory));
    }
    if let Some(cpus) = annotations.nr_of_cpus {
        limits.insert("cpu".to_string(), json!(cpus));
    }
    if let Some(disk) = annotations.disk_space {
        limits.insert("ephemeral-storage".to_string(), json!(disk));
    }
    (!limits.is_empty()).then(|| json!({ "limits": limits }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{decode, RawLabels};

    fn annotations(entries: &[(&str, &str)]) -> Annotations {
        let labels: RawLabels = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        decode(&labels)
    }

    fn config() -> GenerateConfig {
        GenerateConfig {
            image: "registry.example.com/myapp:1.2.3".to_string(),
            ..GenerateConfig::default()
        }
    }

    fn env_entry<'a>(payload: &'a Value, name: &str) -> Option<&'a Value> {
        payload["spec"]["template"]["spec"]["containers"][0]["env"]
            .as_array()
            .unwrap()
            .iter()
            .find(|entry| entry["name"] == name)
    }

    #[test]
    fn test_deployment_requires_app_identity() {
        let error = generate(&annotations(&[]), &config()).unwrap_err();
        assert_eq!(
            error,
            GenerateError::MissingField {
                kind: ResourceKind::Deployment,
                labels: vec!["app-name", "app-version"],
            }
        );
    }

    #[test]
    fn test_rolling_deployment_uses_base_name_and_selector() {
        let annotations = annotations(&[
            ("com.lightbend.rp.app-name", "myapp"),
            ("com.lightbend.rp.app-version", "1.2.3"),
        ]);
        let resource = generate(&annotations, &config()).unwrap().unwrap();
        assert_eq!(resource.name, "myapp");
        assert_eq!(
            resource.payload["spec"]["selector"]["matchLabels"],
            json!({"app": "myapp"})
        );
        assert_eq!(resource.payload["metadata"]["labels"], json!({"app": "myapp"}));
        assert_eq!(resource.payload["spec"]["replicas"], 1);
        assert_eq!(
            resource.payload["spec"]["template"]["spec"]["containers"][0]["image"],
            "registry.example.com/myapp:1.2.3"
        );
        assert_eq!(
            resource.payload["spec"]["template"]["spec"]["containers"][0]["imagePullPolicy"],
            "IfNotPresent"
        );
    }

    #[test]
    fn test_blue_green_deployment_uses_versioned_name_and_layered_labels() {
        let annotations = annotations(&[
            ("com.lightbend.rp.app-name", "myapp"),
            ("com.lightbend.rp.app-version", "1.2.3"),
        ]);
        let blue_green = GenerateConfig {
            deployment_type: DeploymentType::BlueGreen,
            ..config()
        };
        let resource = generate(&annotations, &blue_green).unwrap().unwrap();
        assert_eq!(resource.name, "myapp-v1.2.3");
        assert_eq!(
            resource.payload["spec"]["selector"]["matchLabels"],
            json!({"appVersionMajorMinor": "myapp-v1.2"})
        );
        assert_eq!(
            resource.payload["metadata"]["labels"],
            json!({
                "app": "myapp",
                "appVersion": "myapp-v1.2.3",
                "appVersionMajor": "myapp-v1",
                "appVersionMajorMinor": "myapp-v1.2"
            })
        );
    }

    #[test]
    fn test_canary_matches_blue_green_shape() {
        let annotations = annotations(&[
            ("com.lightbend.rp.app-name", "myapp"),
            ("com.lightbend.rp.app-version", "2.0.0-beta"),
        ]);
        let canary = GenerateConfig {
            deployment_type: DeploymentType::Canary,
            ..config()
        };
        let resource = generate(&annotations, &canary).unwrap().unwrap();
        assert_eq!(resource.name, "myapp-v2.0.0-beta");
        assert_eq!(
            resource.payload["spec"]["selector"]["matchLabels"],
            json!({"appVersionMajorMinor": "myapp-v2.0"})
        );
    }

    #[test]
    fn test_endpoint_environment_and_container_ports() {
        let annotations = annotations(&[
            ("com.lightbend.rp.app-name", "myapp"),
            ("com.lightbend.rp.app-version", "1.2.3"),
            ("com.lightbend.rp.endpoints.0.name", "My Endpoint!"),
            ("com.lightbend.rp.endpoints.0.protocol", "http"),
        ]);
        let resource = generate(&annotations, &config()).unwrap().unwrap();

        let ports = resource.payload["spec"]["template"]["spec"]["containers"][0]["ports"]
            .as_array()
            .unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0]["name"], "my-endpoint");
        assert_eq!(ports[0]["containerPort"], 10000);

        let by_name = env_entry(&resource.payload, "RP_ENDPOINT_MY_ENDPOINT_PORT").unwrap();
        assert_eq!(by_name["value"], "10000");
        let by_index = env_entry(&resource.payload, "RP_ENDPOINT_0_PORT").unwrap();
        assert_eq!(by_index["value"], "10000");
        let host = env_entry(&resource.payload, "RP_ENDPOINT_MY_ENDPOINT_HOST").unwrap();
        assert_eq!(host["valueFrom"]["fieldRef"]["fieldPath"], "status.podIP");
        assert_eq!(
            env_entry(&resource.payload, "RP_ENDPOINTS_COUNT").unwrap()["value"],
            "1"
        );
        assert_eq!(
            env_entry(&resource.payload, "RP_NAMESPACE").unwrap()["valueFrom"]["fieldRef"]
                ["fieldPath"],
            "metadata.namespace"
        );
    }

    #[test]
    fn test_secret_and_service_discovery_environment() {
        let annotations = annotations(&[
            ("com.lightbend.rp.app-name", "myapp"),
            ("com.lightbend.rp.app-version", "1.2.3"),
            ("com.lightbend.rp.modules.service-discovery.enabled", "true"),
            ("com.lightbend.rp.secrets.0.namespace", "acme"),
            ("com.lightbend.rp.secrets.0.name", "api-key"),
        ]);
        let mut with_services = config();
        with_services.external_services.insert(
            "cassandra".to_string(),
            vec!["one.example.com:9042".to_string(), "two.example.com:9042".to_string()],
        );
        let resource = generate(&annotations, &with_services).unwrap().unwrap();

        let secret = env_entry(&resource.payload, "RP_SECRETS_ACME_API_KEY").unwrap();
        assert_eq!(secret["valueFrom"]["secretKeyRef"]["name"], "acme");
        assert_eq!(secret["valueFrom"]["secretKeyRef"]["key"], "api-key");

        let java_opts = env_entry(&resource.payload, "RP_JAVA_OPTS").unwrap();
        assert_eq!(
            java_opts["value"],
            "-Drp.service-discovery.external-service-addresses.cassandra.0=one.example.com:9042 \
             -Drp.service-discovery.external-service-addresses.cassandra.1=two.example.com:9042"
        );
        assert_eq!(
            env_entry(&resource.payload, "RP_MODULES").unwrap()["value"],
            "service-discovery"
        );
    }

    #[test]
    fn test_declared_variables_override_synthesized_ones() {
        let annotations = annotations(&[
            ("com.lightbend.rp.app-name", "myapp"),
            ("com.lightbend.rp.app-version", "1.2.3"),
            ("com.lightbend.rp.environment-variables.0.type", "literal"),
            ("com.lightbend.rp.environment-variables.0.name", "RP_APP_NAME"),
            ("com.lightbend.rp.environment-variables.0.value", "override"),
            ("com.lightbend.rp.environment-variables.1.type", "config-map"),
            ("com.lightbend.rp.environment-variables.1.name", "settings file"),
            ("com.lightbend.rp.environment-variables.1.map-name", "app-settings"),
            ("com.lightbend.rp.environment-variables.1.key", "prod.conf"),
        ]);
        let resource = generate(&annotations, &config()).unwrap().unwrap();
        assert_eq!(
            env_entry(&resource.payload, "RP_APP_NAME").unwrap()["value"],
            "override"
        );
        let config_map = env_entry(&resource.payload, "SETTINGS_FILE").unwrap();
        assert_eq!(
            config_map["valueFrom"]["configMapKeyRef"]["name"],
            "app-settings"
        );
        assert_eq!(config_map["valueFrom"]["configMapKeyRef"]["key"], "prod.conf");
    }

    #[test]
    fn test_probes_limits_and_privileged() {
        let annotations = annotations(&[
            ("com.lightbend.rp.app-name", "myapp"),
            ("com.lightbend.rp.app-version", "1.2.3"),
            ("com.lightbend.rp.memory", "268435456"),
            ("com.lightbend.rp.nr-of-cpus", "0.5"),
            ("com.lightbend.rp.privileged", "true"),
            ("com.lightbend.rp.health-check.type", "tcp"),
            ("com.lightbend.rp.health-check.port", "8080"),
            ("com.lightbend.rp.health-check.interval", "30"),
            ("com.lightbend.rp.readiness-check.type", "http"),
            ("com.lightbend.rp.readiness-check.service-name", "web"),
            ("com.lightbend.rp.readiness-check.path", "/ready"),
        ]);
        let resource = generate(&annotations, &config()).unwrap().unwrap();
        let container = &resource.payload["spec"]["template"]["spec"]["containers"][0];
        assert_eq!(container["livenessProbe"]["tcpSocket"]["port"], 8080);
        assert_eq!(container["livenessProbe"]["periodSeconds"], 30);
        assert_eq!(container["readinessProbe"]["httpGet"]["path"], "/ready");
        assert_eq!(container["readinessProbe"]["httpGet"]["port"], "web");
        assert_eq!(container["readinessProbe"]["periodSeconds"], 10);
        assert_eq!(container["resources"]["limits"]["memory"], 268435456i64);
        assert_eq!(container["resources"]["limits"]["cpu"], 0.5);
        assert_eq!(container["securityContext"]["privileged"], true);
    }

    #[test]
    fn test_command_probe_uses_exec() {
        let annotations = annotations(&[
            ("com.lightbend.rp.app-name", "myapp"),
            ("com.lightbend.rp.app-version", "1.2.3"),
            ("com.lightbend.rp.health-check.type", "command"),
            ("com.lightbend.rp.health-check.args.0", "/bin/check"),
            ("com.lightbend.rp.health-check.args.1", "--quiet"),
        ]);
        let resource = generate(&annotations, &config()).unwrap().unwrap();
        let probe = &resource.payload["spec"]["template"]["spec"]["containers"][0]["livenessProbe"];
        assert_eq!(probe["exec"]["command"], json!(["/bin/check", "--quiet"]));
    }
}
