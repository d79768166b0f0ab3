use super::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct PitrSpec {
    #[serde(default)]
    pub baseBackup: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct RestoreSource {
    /// `backup` | `storage` | `s3` | `gcs` | `azure` | `pitr`
    pub r#type: String,
    #[serde(default)]
    pub backupRef: Option<String>,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub credentialsSecretRef: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct HookSpec {
    #[serde(default)]
    pub statements: Vec<String>,
    #[serde(default)]
    pub jobTemplate: Option<serde_json::Value>,
    #[serde(default)]
    pub timeoutSecs: Option<u64>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct RestoreOptions {
    #[serde(default)]
    pub replaceExisting: bool,
    #[serde(default)]
    pub verifyBackup: bool,
    #[serde(default)]
    pub additionalArgs: Vec<String>,
    #[serde(default)]
    pub preRestore: Option<HookSpec>,
    #[serde(default)]
    pub postRestore: Option<HookSpec>,
}

/// One-shot restore of a database from a backup, storage location, or
/// point-in-time target.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[cfg_attr(test, derive(Default))]
#[kube(
    kind = "Neo4jRestore",
    group = "neo4j.neo4j.com",
    version = "v1alpha1",
    namespaced
)]
#[kube(status = "RestoreStatus", shortname = "neo4jrestore")]
#[allow(non_snake_case)]
pub struct RestoreSpec {
    /// Resolves to a Cluster or Standalone by type auto-detection.
    pub targetCluster: String,
    pub databaseName: String,
    pub source: RestoreSource,
    #[serde(default)]
    pub pointInTime: Option<String>,
    #[serde(default)]
    pub pitr: Option<PitrSpec>,
    #[serde(default)]
    pub options: RestoreOptions,
    #[serde(default = "crate::defaults::default_false")]
    pub force: bool,
    #[serde(default = "crate::defaults::default_false")]
    pub stopCluster: bool,
    #[serde(default = "crate::defaults::default_timeout_secs")]
    pub timeoutSecs: u64,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct BackupInfo {
    #[serde(default)]
    pub originalPath: Option<String>,
    #[serde(default)]
    pub createdAt: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub neo4jVersion: Option<String>,
    #[serde(default)]
    pub sizeBytes: Option<i64>,
}

/// Status subresource for `Neo4jRestore`.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct RestoreStatus {
    /// `Pending` | `Running` | `Completed` | `Failed`
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub startTime: Option<String>,
    #[serde(default)]
    pub completionTime: Option<String>,
    #[serde(default)]
    pub stats: Option<super::backup_types::BackupStats>,
    #[serde(default)]
    pub backupInfo: Option<BackupInfo>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}
