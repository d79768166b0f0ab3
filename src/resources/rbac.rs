//! Discovery RBAC: a ServiceAccount, Role, and RoleBinding granting
//! `get/list/watch` on `services` and `endpoints` — required for Neo4j's
//! Kubernetes discovery to resolve pod IPs.

use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{PolicyRule, Role, RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};

pub fn service_account_name(cluster_name: &str) -> String {
    format!("{cluster_name}-discovery")
}

pub fn build_service_account(cluster_name: &str, namespace: &str, owner: OwnerReference) -> ServiceAccount {
    ServiceAccount {
        metadata: ObjectMeta {
            name: Some(service_account_name(cluster_name)),
            namespace: Some(namespace.to_string()),
            labels: Some(crate::resources::cluster_labels(cluster_name)),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn build_role(cluster_name: &str, namespace: &str, owner: OwnerReference) -> Role {
    Role {
        metadata: ObjectMeta {
            name: Some(service_account_name(cluster_name)),
            namespace: Some(namespace.to_string()),
            labels: Some(crate::resources::cluster_labels(cluster_name)),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        rules: Some(vec![PolicyRule {
            api_groups: Some(vec!["".to_string()]),
            resources: Some(vec!["services".to_string(), "endpoints".to_string()]),
            verbs: vec!["get".to_string(), "list".to_string(), "watch".to_string()],
            ..Default::default()
        }]),
    }
}

pub fn build_role_binding(cluster_name: &str, namespace: &str, owner: OwnerReference) -> RoleBinding {
    let name = service_account_name(cluster_name);
    RoleBinding {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: Some(namespace.to_string()),
            labels: Some(crate::resources::cluster_labels(cluster_name)),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "Role".to_string(),
            name,
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: service_account_name(cluster_name),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        }]),
    }
}
