use super::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct DatabaseTopology {
    #[serde(default)]
    pub primaries: i32,
    #[serde(default)]
    pub secondaries: i32,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct CypherInitialData {
    #[serde(default)]
    pub statements: Vec<String>,
    #[serde(default)]
    pub configMapRef: Option<String>,
    #[serde(default)]
    pub secretRef: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct SeedCredentials {
    pub secretRef: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct SeedSpec {
    pub uri: String,
    #[serde(default)]
    pub credentials: Option<SeedCredentials>,
    /// Only honored on CalVer (>= 2025) targets.
    #[serde(default)]
    pub restoreUntil: Option<String>,
}

/// Logical database hosted inside an `EnterpriseCluster` or
/// `EnterpriseStandalone`.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[cfg_attr(test, derive(Default))]
#[kube(
    kind = "Neo4jDatabase",
    group = "neo4j.neo4j.com",
    version = "v1alpha1",
    namespaced
)]
#[kube(status = "DatabaseStatus", shortname = "neo4jdb")]
#[allow(non_snake_case)]
pub struct DatabaseSpec {
    pub clusterRef: String,
    pub name: String,
    #[serde(default)]
    pub topology: Option<DatabaseTopology>,
    #[serde(default)]
    pub options: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    pub initialData: Option<CypherInitialData>,
    #[serde(default)]
    pub seedURI: Option<SeedSpec>,
    #[serde(default = "crate::defaults::default_wait")]
    pub wait: bool,
    #[serde(default = "crate::defaults::default_false")]
    pub ifNotExists: bool,
    /// Only valid when the owning cluster targets a CalVer (>= 2025) image.
    #[serde(default)]
    pub defaultCypherLanguage: Option<String>,
}

/// Status subresource for `Neo4jDatabase`.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct DatabaseStatus {
    #[serde(default)]
    pub phase: String,
    /// `online` | `offline` | `starting` | `stopped`
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub dataImported: bool,
    #[serde(default)]
    pub servers: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub observedGeneration: Option<i64>,
}
