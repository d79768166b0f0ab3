use super::cluster_types::{
    AuraFleetManagementSpec, AuthSpec, ClusterImage, McpSpec, PropertyShardingSpec,
    QueryMonitoringSpec, ServiceSpec, StorageSpec, TlsSpec, UpgradeStatus,
};
use super::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Single-node variant of `EnterpriseCluster`: same feature surface minus
/// topology, fixed at one replica and unable to scale.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[cfg_attr(test, derive(Default))]
#[kube(
    kind = "Neo4jEnterpriseStandalone",
    group = "neo4j.neo4j.com",
    version = "v1alpha1",
    namespaced
)]
#[kube(status = "EnterpriseStandaloneStatus", shortname = "neo4jstandalone")]
#[allow(non_snake_case)]
pub struct EnterpriseStandaloneSpec {
    pub image: ClusterImage,
    #[serde(default)]
    pub storage: StorageSpec,
    #[serde(default)]
    pub tls: Option<TlsSpec>,
    #[serde(default)]
    pub auth: Option<AuthSpec>,
    #[serde(default)]
    pub service: Option<ServiceSpec>,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
    #[serde(default)]
    pub mcp: Option<McpSpec>,
    #[serde(default)]
    pub propertySharding: Option<PropertyShardingSpec>,
    #[serde(default)]
    pub auraFleetManagement: Option<AuraFleetManagementSpec>,
    #[serde(default)]
    pub queryMonitoring: Option<QueryMonitoringSpec>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct EnterpriseStandaloneStatus {
    /// `Initializing` | `Forming` | `Ready` | `Upgrading` | `Paused` | `Failed`
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub endpoints: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub upgradeStatus: Option<UpgradeStatus>,
    #[serde(default)]
    pub observedGeneration: Option<i64>,
}
