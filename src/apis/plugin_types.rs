use super::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct RegistryAuth {
    #[serde(default)]
    pub secretRef: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct PluginSource {
    /// `official` | `community` | `custom` | `url`
    pub r#type: String,
    #[serde(default)]
    pub registryAuth: Option<RegistryAuth>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub checksum: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct PluginSecuritySpec {
    #[serde(default)]
    pub allowedProcedures: Vec<String>,
    #[serde(default)]
    pub sandbox: bool,
}

/// Translated into `NEO4J_PLUGINS` and `NEO4J_*` env vars on the owning
/// cluster's StatefulSet.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[cfg_attr(test, derive(Default))]
#[kube(
    kind = "Neo4jPlugin",
    group = "neo4j.neo4j.com",
    version = "v1alpha1",
    namespaced
)]
#[kube(status = "PluginStatus", shortname = "neo4jplugin")]
#[allow(non_snake_case)]
pub struct PluginSpec {
    pub clusterRef: String,
    pub name: String,
    pub version: String,
    #[serde(default = "crate::defaults::default_true")]
    pub enabled: bool,
    pub source: PluginSource,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub security: Option<PluginSecuritySpec>,
    #[serde(default)]
    pub resources: Option<k8s_openapi::api::core::v1::ResourceRequirements>,
}

/// Status subresource for `Neo4jPlugin`.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct PluginStatus {
    /// `Pending` | `Waiting` | `Installing` | `Ready` | `Failed`
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub installedVersion: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}
