pub mod backup_types;
pub mod cluster_types;
pub mod database_types;
pub mod plugin_types;
pub mod restore_types;
pub mod standalone_types;

pub use backup_types::{BackupSpec, BackupStatus, Neo4jBackup};
pub use cluster_types::{EnterpriseClusterSpec, EnterpriseClusterStatus, Neo4jEnterpriseCluster};
pub use database_types::{DatabaseSpec, DatabaseStatus, Neo4jDatabase};
pub use plugin_types::{Neo4jPlugin, PluginSpec, PluginStatus};
pub use restore_types::{Neo4jRestore, RestoreSpec, RestoreStatus};
pub use standalone_types::{EnterpriseStandaloneSpec, EnterpriseStandaloneStatus, Neo4jEnterpriseStandalone};

/// Shared condition shape used by every status subresource, mirroring
/// `metav1.Condition`.
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, schemars::JsonSchema, PartialEq)]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    pub reason: String,
    pub message: String,
    #[serde(rename = "lastTransitionTime", skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}
