use crate::defaults;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Condition;

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct ClusterImage {
    #[serde(default = "defaults::default_image_repository")]
    pub repository: String,
    /// Encodes the Neo4j version: either `MAJOR.MINOR.PATCH` (MAJOR=5, MINOR>=26)
    /// or `YYYY.MM.PATCH` (YYYY>=2025) — see `crate::version`.
    pub tag: String,
    #[serde(default = "defaults::default_image_pull_policy")]
    pub pullPolicy: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct TopologySpreadSpec {
    #[serde(default = "defaults::default_true")]
    pub enabled: bool,
    #[serde(default = "defaults::default_topology_key")]
    pub topologyKey: String,
    #[serde(default = "defaults::default_max_skew")]
    pub maxSkew: i32,
    #[serde(default = "defaults::default_when_unsatisfiable")]
    pub whenUnsatisfiable: String,
    #[serde(default)]
    pub minDomains: Option<i32>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct AntiAffinitySpec {
    #[serde(default = "defaults::default_true")]
    pub enabled: bool,
    #[serde(default = "defaults::default_topology_key")]
    pub topologyKey: String,
    /// `required` | `preferred`
    #[serde(default = "defaults::default_anti_affinity_type")]
    pub r#type: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct PlacementSpec {
    #[serde(default)]
    pub topologySpread: Option<TopologySpreadSpec>,
    #[serde(default)]
    pub antiAffinity: Option<AntiAffinitySpec>,
    #[serde(default)]
    pub nodeSelector: Option<BTreeMap<String, String>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct TopologySpec {
    pub servers: i32,
    #[serde(default)]
    pub placement: Option<PlacementSpec>,
    #[serde(default)]
    pub availabilityZones: Vec<String>,
    #[serde(default = "defaults::default_enforce_distribution")]
    pub enforceDistribution: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct StorageSpec {
    #[serde(default)]
    pub storageClassName: Option<String>,
    #[serde(default = "defaults::default_storage_size")]
    pub size: k8s_openapi::apimachinery::pkg::api::resource::Quantity,
    #[serde(default = "defaults::default_storage_retention_policy")]
    pub retentionPolicy: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct IssuerRef {
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct TlsSpec {
    /// `disabled` | `secret` | `cert-manager`
    pub mode: String,
    #[serde(default)]
    pub secretName: Option<String>,
    #[serde(default)]
    pub issuerRef: Option<IssuerRef>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct AuthSpec {
    /// Overrides the operator's generated admin Secret name when set.
    #[serde(default)]
    pub adminSecret: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct ServiceSpec {
    #[serde(default = "defaults::default_service_type")]
    pub r#type: String,
    #[serde(default)]
    pub annotations: Option<BTreeMap<String, String>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct McpAuthSpec {
    pub secretName: String,
    pub usernameKey: String,
    pub passwordKey: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct McpSpec {
    #[serde(default = "defaults::default_false")]
    pub enabled: bool,
    /// `http` | `stdio`
    #[serde(default)]
    pub transport: Option<String>,
    #[serde(default)]
    pub auth: Option<McpAuthSpec>,
    #[serde(default)]
    pub tls: Option<TlsSpec>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct PropertyShardingSpec {
    #[serde(default = "defaults::default_false")]
    pub enabled: bool,
    #[serde(default)]
    pub shards: Option<i32>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct AuraFleetManagementSpec {
    #[serde(default = "defaults::default_false")]
    pub enabled: bool,
    #[serde(default)]
    pub tokenSecretRef: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
#[allow(non_snake_case)]
pub struct UpgradeStrategySpec {
    /// `RollingUpgrade` | `Recreate`
    #[serde(default = "defaults::default_upgrade_strategy")]
    pub strategy: String,
    #[serde(default = "defaults::default_true")]
    pub preCheck: bool,
    #[serde(default = "defaults::default_true")]
    pub postCheck: bool,
    #[serde(default = "defaults::default_max_unavailable_during_upgrade")]
    pub maxUnavailableDuringUpgrade: i32,
    #[serde(default = "defaults::default_upgrade_timeout_secs")]
    pub upgradeTimeoutSecs: u64,
    #[serde(default = "defaults::default_health_check_timeout_secs")]
    pub healthCheckTimeoutSecs: u64,
    #[serde(default = "defaults::default_stabilization_timeout_secs")]
    pub stabilizationTimeoutSecs: u64,
    #[serde(default = "defaults::default_auto_pause_on_failure")]
    pub autoPauseOnFailure: bool,
}

impl Default for UpgradeStrategySpec {
    fn default() -> Self {
        Self {
            strategy: defaults::default_upgrade_strategy(),
            preCheck: true,
            postCheck: true,
            maxUnavailableDuringUpgrade: defaults::default_max_unavailable_during_upgrade(),
            upgradeTimeoutSecs: defaults::default_upgrade_timeout_secs(),
            healthCheckTimeoutSecs: defaults::default_health_check_timeout_secs(),
            stabilizationTimeoutSecs: defaults::default_stabilization_timeout_secs(),
            autoPauseOnFailure: defaults::default_auto_pause_on_failure(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct QueryMonitoringSpec {
    #[serde(default = "defaults::default_false")]
    pub enabled: bool,
    #[serde(default)]
    pub slowQueryThresholdMs: Option<u64>,
}

/// Generate the Kubernetes wrapper struct `EnterpriseCluster` from our
/// spec and status structs. Used by `crdgen` to emit the CRD manifest.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[cfg_attr(test, derive(Default))]
#[kube(
    kind = "Neo4jEnterpriseCluster",
    group = "neo4j.neo4j.com",
    version = "v1alpha1",
    namespaced
)]
#[kube(status = "EnterpriseClusterStatus", shortname = "neo4jcluster")]
#[allow(non_snake_case)]
pub struct EnterpriseClusterSpec {
    pub image: ClusterImage,
    pub topology: TopologySpec,
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
    pub upgradeStrategy: UpgradeStrategySpec,
    #[serde(default)]
    pub queryMonitoring: Option<QueryMonitoringSpec>,
    /// Additive, optional feature surface. No-op if absent.
    #[serde(default)]
    pub autoScaling: Option<serde_json::Value>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct ReplicaCounts {
    pub desired: i32,
    pub ready: i32,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct UpgradeProgress {
    pub total: i32,
    pub upgraded: i32,
    pub inProgress: i32,
    pub pending: i32,
    #[serde(default)]
    pub currentLeader: Option<i32>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct UpgradeStatus {
    /// `Pending` | `InProgress` | `Paused` | `Completed` | `Failed`
    pub phase: String,
    #[serde(default)]
    pub previousVersion: Option<String>,
    #[serde(default)]
    pub targetVersion: Option<String>,
    #[serde(default)]
    pub progress: Option<UpgradeProgress>,
    #[serde(default)]
    pub startTime: Option<String>,
    #[serde(default)]
    pub completionTime: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct AuraFleetManagementStatus {
    pub outcome: String,
    #[serde(default)]
    pub registeredGeneration: Option<i64>,
}

/// Status subresource for `EnterpriseCluster`.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct EnterpriseClusterStatus {
    /// `Initializing` | `Forming` | `Ready` | `Upgrading` | `Paused` | `Failed`
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub replicas: ReplicaCounts,
    #[serde(default)]
    pub endpoints: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub upgradeStatus: Option<UpgradeStatus>,
    #[serde(default)]
    pub auraFleetManagement: Option<AuraFleetManagementStatus>,
    #[serde(default)]
    pub observedGeneration: Option<i64>,
}
