//! kubegen MCP server: compile container image labels into Kubernetes
//! deployment manifests (namespace, deployment, service, ingress).

mod decode;
mod kube;
mod tools;
mod types;

use rmcp::{
    handler::server::ServerHandler,
    model::{CallToolResult, Content},
    tool, tool_handler, tool_router,
    transport::stdio,
    ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct GenerateParams {
    /// Image labels as a JSON object string (label key -> string value)
    labels: String,
    /// Fully-qualified container image reference to embed in the Deployment
    image: String,
    /// Deployment strategy: rolling, canary, blue-green (default rolling)
    #[serde(default)]
    deployment_type: Option<String>,
    /// Resource kinds to emit: namespace, deployment, service, ingress (default all)
    #[serde(default)]
    resource_types: Option<Vec<String>>,
    /// Replica count for the Deployment (default 1)
    #[serde(default)]
    replicas: Option<u32>,
    /// Image pull policy: Never, IfNotPresent, Always (default IfNotPresent)
    #[serde(default)]
    image_pull_policy: Option<String>,
    /// Cluster IP override for the Service (optional)
    #[serde(default)]
    cluster_ip: Option<String>,
    /// Ingress annotations as a JSON object string (optional)
    #[serde(default)]
    ingress_annotations: Option<String>,
    /// Suffix appended to every ingress path, e.g. "*" (optional)
    #[serde(default)]
    ingress_path_suffix: Option<String>,
    /// Externally resolved service addresses as a JSON object string:
    /// service name -> array of addresses (optional)
    #[serde(default)]
    external_services: Option<String>,
    /// Output format: json (default) or yaml
    #[serde(default)]
    format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct DecodeParams {
    /// Image labels as a JSON object string (label key -> string value)
    labels: String,
}

#[derive(Clone)]
struct KubegenMcpService {
    tool_router: rmcp::handler::server::tool::ToolRouter<Self>,
}

#[tool_router]
impl KubegenMcpService {
    fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Compile container image labels into Kubernetes manifests (Namespace, Deployment, Service, Ingress)")]
    async fn generate_kube_manifests(
        &self,
        params: rmcp::handler::server::wrapper::Parameters<GenerateParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let p = params.0;
        tracing::debug!(image = %p.image, "generate_kube_manifests called");
        match tools::manifest::generate_manifests(
            &p.labels,
            &p.image,
            p.deployment_type.as_deref(),
            p.resource_types.as_deref(),
            p.replicas,
            p.image_pull_policy.as_deref(),
            p.cluster_ip.as_deref(),
            p.ingress_annotations.as_deref(),
            p.ingress_path_suffix.as_deref(),
            p.external_services.as_deref(),
            p.format.as_deref(),
        ) {
            Ok((out, diagnostics)) => {
                let mut content = vec![Content::text(out)];
                if !diagnostics.is_empty() {
                    content.push(Content::text(format!(
                        "Generation errors:\n{}",
                        diagnostics.join("\n")
                    )));
                }
                Ok(CallToolResult::success(content))
            }
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e)])),
        }
    }

    #[tool(description = "Decode container image labels into the application descriptor without generating manifests")]
    async fn decode_image_labels(
        &self,
        params: rmcp::handler::server::wrapper::Parameters<DecodeParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        match tools::manifest::decode_labels(&params.0.labels) {
            Ok(out) => Ok(CallToolResult::success(vec![Content::text(out)])),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e)])),
        }
    }

    #[tool(description = "List the supported image label keys and their shapes")]
    async fn list_annotation_keys(&self) -> Result<CallToolResult, rmcp::ErrorData> {
        let out = tools::reference::list_annotation_keys_json();
        Ok(CallToolResult::success(vec![Content::text(out)]))
    }
}

#[tool_handler]
impl ServerHandler for KubegenMcpService {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        let mut info = rmcp::model::ServerInfo::default();
        info.instructions = Some(
            "MCP for kubegen: compile container image labels into Kubernetes manifests."
                .to_string(),
        );
        info.capabilities = rmcp::model::ServerCapabilities::builder()
            .enable_tools()
            .build();
        info
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // stdout carries the MCP transport; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("kubegen MCP server starting on stdio");

    let service = KubegenMcpService::new();
    let transport = stdio();
    let server = service.serve(transport).await?;
    server.waiting().await?;
    Ok(())
}
