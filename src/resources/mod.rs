//! Resource builders: pure functions `(desired spec, owner metadata) ->
//! Kubernetes object`. Reconcilers sequence these and apply them via
//! server-side apply with the owning resource as controller reference.

pub mod configmap;
pub mod job;
pub mod rbac;
pub mod secret;
pub mod service;
pub mod statefulset;

use std::collections::BTreeMap;

pub const CLUSTER_LABEL: &str = "neo4j.com/cluster";
pub const CLUSTERING_LABEL: &str = "neo4j.com/clustering";
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "neo4j-operator";

/// Common pod/selector labels for every object a cluster owns.
pub fn cluster_labels(cluster_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (CLUSTER_LABEL.to_string(), cluster_name.to_string()),
        (MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string()),
    ])
}

/// Labels selecting only the headless discovery Service's pods: only
/// pods labeled `clustering=true` are selected by Neo4j's K8s discovery.
pub fn clustering_labels(cluster_name: &str) -> BTreeMap<String, String> {
    let mut labels = cluster_labels(cluster_name);
    labels.insert(CLUSTERING_LABEL.to_string(), "true".to_string());
    labels
}

pub const PATCH_MANAGER: &str = "neo4j-operator";
