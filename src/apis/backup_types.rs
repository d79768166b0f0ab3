use super::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct BackupTarget {
    /// `Cluster` | `Database`
    pub kind: String,
    pub name: String,
    /// Required when `kind=Database`.
    #[serde(default)]
    pub clusterRef: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct CloudIdentityAutoCreate {
    #[serde(default)]
    pub annotations: std::collections::BTreeMap<String, String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct CloudIdentity {
    #[serde(default)]
    pub autoCreate: Option<CloudIdentityAutoCreate>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct CloudStorageSpec {
    #[serde(default)]
    pub credentialsSecretRef: Option<String>,
    #[serde(default)]
    pub identity: Option<CloudIdentity>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct BackupStorageSpec {
    /// `s3` | `gcs` | `azure` | `pvc`
    pub r#type: String,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub cloud: Option<CloudStorageSpec>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct BackupOptions {
    #[serde(default = "crate::defaults::default_backup_type")]
    pub backupType: String,
    #[serde(default)]
    pub compress: bool,
    #[serde(default)]
    pub verify: bool,
    #[serde(default)]
    pub tempPath: Option<String>,
    /// Ignored before CalVer 2025.04.
    #[serde(default)]
    pub preferDiffAsParent: bool,
    #[serde(default)]
    pub encryption: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct RetentionSpec {
    #[serde(default)]
    pub maxAge: Option<String>,
    #[serde(default = "crate::defaults::default_max_count")]
    pub maxCount: i32,
    #[serde(default = "crate::defaults::default_delete_policy")]
    pub deletePolicy: String,
}

/// A single completed (or failed) backup run, retained up to
/// `retention.maxCount` entries.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct BackupRun {
    pub name: String,
    pub phase: String,
    pub startTime: String,
    #[serde(default)]
    pub completionTime: Option<String>,
    pub backupType: String,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct BackupStats {
    #[serde(default)]
    pub sizeBytes: Option<i64>,
    #[serde(default)]
    pub durationSecs: Option<i64>,
    #[serde(default)]
    pub throughputBytesPerSec: Option<i64>,
    #[serde(default)]
    pub fileCount: Option<i64>,
}

/// Backup job descriptor, one-shot or cron-scheduled.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[cfg_attr(test, derive(Default))]
#[kube(
    kind = "Neo4jBackup",
    group = "neo4j.neo4j.com",
    version = "v1alpha1",
    namespaced
)]
#[kube(status = "BackupStatus", shortname = "neo4jbackup")]
#[allow(non_snake_case)]
pub struct BackupSpec {
    pub target: BackupTarget,
    pub storage: BackupStorageSpec,
    /// Cron expression; absent means one-shot.
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub options: BackupOptions,
    #[serde(default)]
    pub retention: RetentionSpec,
    #[serde(default = "crate::defaults::default_false")]
    pub suspend: bool,
}

/// Status subresource for `Neo4jBackup`.
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[allow(non_snake_case)]
pub struct BackupStatus {
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub lastRunTime: Option<String>,
    #[serde(default)]
    pub lastSuccessTime: Option<String>,
    #[serde(default)]
    pub nextRunTime: Option<String>,
    #[serde(default)]
    pub history: Vec<BackupRun>,
    #[serde(default)]
    pub stats: Option<BackupStats>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}
