//! One reconciler per primary resource kind. Each module
//! owns a `run()` that boots a `kube::runtime::Controller` against its
//! own watch, plus a `reconcile()`/`error_policy()` pair following a
//! finalizer-protected reconcile pattern.

pub mod backup;
pub mod cluster;
pub mod database;
pub mod plugin;
pub mod restore;
pub mod standalone;

/// Finalizer name shared by every controller.
pub const FINALIZER: &str = "neo4j.neo4j.com/finalizer";

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};

/// Builds a controller owner reference for `obj`, used by every
/// resource builder to set `ownerReferences` on children.
pub fn owner_reference<K>(obj: &K) -> OwnerReference
where
    K: Resource<DynamicType = ()>,
{
    OwnerReference {
        api_version: K::api_version(&()).to_string(),
        kind: K::kind(&()).to_string(),
        name: obj.name_any(),
        uid: obj.uid().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}
