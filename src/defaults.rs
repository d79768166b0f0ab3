use k8s_openapi::{
    api::core::v1::ResourceRequirements,
    apimachinery::pkg::api::resource::Quantity,
};
use std::collections::BTreeMap;

pub fn default_image_repository() -> String {
    "neo4j".to_string()
}

pub fn default_image_pull_policy() -> String {
    "IfNotPresent".to_string()
}

pub fn default_replicas() -> i32 {
    3
}

pub fn default_resources() -> ResourceRequirements {
    let limits: BTreeMap<String, Quantity> = BTreeMap::from([
        ("cpu".to_owned(), Quantity("2".to_string())),
        ("memory".to_owned(), Quantity("4Gi".to_string())),
    ]);
    let requests: BTreeMap<String, Quantity> = BTreeMap::from([
        ("cpu".to_owned(), Quantity("500m".to_string())),
        ("memory".to_owned(), Quantity("1Gi".to_string())),
    ]);
    ResourceRequirements {
        limits: Some(limits),
        requests: Some(requests),
        ..ResourceRequirements::default()
    }
}

pub fn default_storage_size() -> Quantity {
    Quantity("10Gi".to_string())
}

pub fn default_storage_retention_policy() -> String {
    "Delete".to_string()
}

pub fn default_service_type() -> String {
    "ClusterIP".to_string()
}

pub fn default_uid() -> i64 {
    7474
}

pub fn default_enforce_distribution() -> bool {
    false
}

pub fn default_topology_key() -> String {
    "topology.kubernetes.io/zone".to_string()
}

pub fn default_max_skew() -> i32 {
    1
}

pub fn default_when_unsatisfiable() -> String {
    "DoNotSchedule".to_string()
}

pub fn default_anti_affinity_type() -> String {
    "preferred".to_string()
}

pub fn default_upgrade_strategy() -> String {
    "RollingUpgrade".to_string()
}

pub fn default_max_unavailable_during_upgrade() -> i32 {
    1
}

pub fn default_upgrade_timeout_secs() -> u64 {
    1800
}

pub fn default_health_check_timeout_secs() -> u64 {
    300
}

pub fn default_stabilization_timeout_secs() -> u64 {
    180
}

pub fn default_auto_pause_on_failure() -> bool {
    true
}

pub fn default_true() -> bool {
    true
}

pub fn default_false() -> bool {
    false
}

pub fn default_wait() -> bool {
    true
}

pub fn default_backup_type() -> String {
    "AUTO".to_string()
}

pub fn default_max_count() -> i32 {
    3
}

pub fn default_delete_policy() -> String {
    "Delete".to_string()
}

pub fn default_timeout_secs() -> u64 {
    1800
}
