use k8s_openapi::api::apps::v1::DeploymentSpec;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Spec object for WebDeployment
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[kube(group = "webapp.webapp.ivyxjc.com", version = "v1", kind = "WebDeployment", namespaced)]
#[kube(status = "WebDeploymentStatus")]
#[kube(shortname = "webdep")]
#[serde(rename_all = "camelCase")]
pub struct WebDeploymentSpec {
    /// Embedded workload copied verbatim onto the managed Deployment.
    pub deployment: DeploymentSpec,
}

/// Status object for WebDeployment
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebDeploymentStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_replicas: Option<i32>,
    #[serde(default)]
    pub phase: WebDeploymentPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum WebDeploymentPhase {
    #[default]
    Pending,
    Synced,
    Invalid,
}
