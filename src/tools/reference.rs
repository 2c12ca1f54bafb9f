// Reference data for the supported label schema (list_annotation_keys).

use serde_json::{Map as JsonMap, Value};

pub fn list_annotation_keys_json() -> String {
    let keys: JsonMap<String, Value> = annotation_keys();
    serde_json::to_string_pretty(&keys).unwrap_or_else(|_| annotation_keys_raw().to_string())
}

fn annotation_keys() -> JsonMap<String, Value> {
    serde_json::from_str(annotation_keys_raw()).unwrap_or_default()
}

fn annotation_keys_raw() -> &'static str {
    r#"{
  "namespace": "com.lightbend.rp",
  "scalars": {
    "namespace": { "type": "string", "description": "Target namespace; emits a Namespace resource when set" },
    "app-name": { "type": "string", "description": "Application name, required for Deployment and Service" },
    "app-type": { "type": "string", "description": "Free-form application type tag" },
    "app-version": { "type": "string", "description": "major.minor.patch with optional -label, e.g. 1.2.3-SNAPSHOT" },
    "disk-space": { "type": "long", "description": "Disk space in bytes" },
    "memory": { "type": "long", "description": "Memory in bytes" },
    "nr-of-cpus": { "type": "double", "description": "CPU share" },
    "privileged": { "type": "boolean", "description": "Run the container privileged (default false)" }
  },
  "structured": {
    "modules.<name>.enabled": { "type": "boolean", "description": "Enables a capability module, e.g. service-discovery" },
    "endpoints.<n>": {
      "fields": ["name", "protocol", "port"],
      "protocols": ["http", "tcp", "udp"],
      "acls": {
        "http": ["type", "expression"],
        "tcp": ["type", "port", "from-port", "to-port"],
        "udp": ["type", "port", "from-port", "to-port"]
      }
    },
    "volumes.<n>": {
      "types": { "host-path": ["guest-path", "path"], "secret": ["guest-path", "secret"] }
    },
    "environment-variables.<n>": {
      "types": {
        "literal": ["name", "value"],
        "secret": ["name", "secret-value"],
        "config-map": ["name", "map-name", "key"],
        "field-ref": ["name", "field-path"],
        "secret-key-ref": ["name", "secret-namespace", "secret-name", "key"]
      }
    },
    "secrets.<n>": { "fields": ["namespace", "name"] },
    "health-check": {
      "types": {
        "command": ["args.<n>"],
        "http": ["port", "service-name", "interval", "path"],
        "tcp": ["port", "service-name", "interval"]
      }
    },
    "readiness-check": { "description": "Same shape as health-check" }
  }
}"#
}
