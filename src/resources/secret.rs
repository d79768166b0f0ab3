//! Admin auth Secret generation: `passwords::PasswordGenerator` plus a
//! reuse-existing-password pattern so reconciles never rotate a live
//! admin credential out from under a running cluster.

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use k8s_openapi::ByteString;
use passwords::PasswordGenerator;
use std::collections::BTreeMap;

pub const NEO4J_ADMIN_USER: &str = "neo4j";

pub fn admin_secret_name(cluster_name: &str) -> String {
    format!("{cluster_name}-admin-auth")
}

fn generate_password() -> String {
    PasswordGenerator {
        length: 24,
        numbers: true,
        lowercase_letters: true,
        uppercase_letters: true,
        symbols: false,
        spaces: false,
        exclude_similar_characters: true,
        strict: true,
    }
    .generate_one()
    .expect("password generator with a fixed valid configuration cannot fail")
}

/// Builds a new admin Secret. Callers must look up any existing Secret
/// of this name first and reuse its password so rotating the
/// StatefulSet does not invalidate already-provisioned databases.
pub fn build_admin_secret(
    cluster_name: &str,
    namespace: &str,
    owner: OwnerReference,
    existing_password: Option<String>,
) -> Secret {
    let password = existing_password.unwrap_or_else(generate_password);
    let mut data = BTreeMap::new();
    data.insert(
        "NEO4J_AUTH".to_string(),
        ByteString(format!("{NEO4J_ADMIN_USER}/{password}").into_bytes()),
    );
    data.insert("username".to_string(), ByteString(NEO4J_ADMIN_USER.into()));
    data.insert("password".to_string(), ByteString(password.into_bytes()));

    Secret {
        metadata: ObjectMeta {
            name: Some(admin_secret_name(cluster_name)),
            namespace: Some(namespace.to_string()),
            labels: Some(crate::resources::cluster_labels(cluster_name)),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        data: Some(data),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    }
}
