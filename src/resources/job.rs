//! Backup/restore Job builders.
//! Cloud credential resolution prefers workload-identity (no secretRef,
//! annotations-only ServiceAccount) and falls back to an explicit
//! credentials Secret.

use crate::apis::backup_types::{BackupSpec, CloudStorageSpec};
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    Container, EnvVar, EnvVarSource, PodSpec, PodTemplateSpec, SecretKeySelector, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};

/// `AWS_ACCESS_KEY_ID`/`AWS_SECRET_ACCESS_KEY`/etc. sourced from the
/// Secret named by `cloud.credentialsSecretRef`, or nothing when the
/// cloud block relies on workload identity (IAM role / Workload
/// Identity annotations on the ServiceAccount instead).
pub fn s3_credential_env(cloud: &CloudStorageSpec) -> Vec<EnvVar> {
    let Some(secret_ref) = &cloud.credentialsSecretRef else {
        return Vec::new();
    };
    ["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY", "AWS_SESSION_TOKEN", "AWS_REGION"]
        .iter()
        .map(|key| secret_env_optional(key, secret_ref, key))
        .collect()
}

/// `GOOGLE_APPLICATION_CREDENTIALS_JSON` from the Secret is mounted as a
/// file by `secret_volume` and pointed at via this env var, rather than
/// passed inline.
pub fn gcs_credential_env(cloud: &CloudStorageSpec) -> Vec<EnvVar> {
    if cloud.credentialsSecretRef.is_none() {
        return Vec::new();
    }
    vec![EnvVar {
        name: "GOOGLE_APPLICATION_CREDENTIALS".to_string(),
        value: Some("/var/run/secrets/gcs/credentials.json".to_string()),
        ..Default::default()
    }]
}

pub fn azure_credential_env(cloud: &CloudStorageSpec) -> Vec<EnvVar> {
    let Some(secret_ref) = &cloud.credentialsSecretRef else {
        return Vec::new();
    };
    vec![
        secret_env_optional("AZURE_STORAGE_ACCOUNT", secret_ref, "AZURE_STORAGE_ACCOUNT"),
        secret_env_optional("AZURE_STORAGE_KEY", secret_ref, "AZURE_STORAGE_KEY"),
    ]
}

fn secret_env_optional(env_name: &str, secret_name: &str, key: &str) -> EnvVar {
    EnvVar {
        name: env_name.to_string(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: Some(secret_name.to_string()),
                key: key.to_string(),
                optional: Some(true),
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn cloud_env_for(cloud: &CloudStorageSpec, storage_type: &str) -> Vec<EnvVar> {
    match storage_type {
        "s3" => s3_credential_env(cloud),
        "gcs" => gcs_credential_env(cloud),
        "azure" => azure_credential_env(cloud),
        _ => Vec::new(),
    }
}

fn secret_volume(secret_ref: &str) -> (Volume, VolumeMount) {
    (
        Volume {
            name: "cloud-credentials".to_string(),
            secret: Some(k8s_openapi::api::core::v1::SecretVolumeSource {
                secret_name: Some(secret_ref.to_string()),
                optional: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        },
        VolumeMount {
            name: "cloud-credentials".to_string(),
            mount_path: "/var/run/secrets/gcs".to_string(),
            read_only: Some(true),
            ..Default::default()
        },
    )
}

/// Builds the `neo4j-admin database backup` Job.
pub fn build_backup_job(
    job_name: &str,
    namespace: &str,
    owner: OwnerReference,
    image: &str,
    service_account: &str,
    server_fqdn: &str,
    dest_path: &str,
    backup_type: &str,
    cloud: Option<&CloudStorageSpec>,
    storage_type: &str,
) -> Job {
    let mut args = vec![
        "database".to_string(),
        "backup".to_string(),
        format!("--from={server_fqdn}:6362"),
        format!("--to-path={dest_path}"),
    ];
    if backup_type != "AUTO" {
        args.push(format!("--type={backup_type}"));
    }

    let mut env = Vec::new();
    let mut volumes = Vec::new();
    let mut mounts = Vec::new();
    if let Some(cloud) = cloud {
        env.extend(cloud_env_for(cloud, storage_type));
        if storage_type == "gcs" {
            if let Some(secret_ref) = &cloud.credentialsSecretRef {
                let (vol, mount) = secret_volume(secret_ref);
                volumes.push(vol);
                mounts.push(mount);
            }
        }
    }

    build_job(job_name, namespace, owner, image, service_account, "neo4j-admin", args, env, volumes, mounts)
}

/// Builds the `neo4j-admin database restore` Job.
#[allow(clippy::too_many_arguments)]
pub fn build_restore_job(
    job_name: &str,
    namespace: &str,
    owner: OwnerReference,
    image: &str,
    service_account: &str,
    source_path: &str,
    overwrite_destination: bool,
    restore_until: Option<&str>,
    additional_args: &[String],
    data_pvc: Option<&str>,
    cloud: Option<&CloudStorageSpec>,
    storage_type: &str,
) -> Job {
    let mut args = vec!["database".to_string(), "restore".to_string(), format!("--from-path={source_path}")];
    if overwrite_destination {
        args.push("--overwrite-destination".to_string());
    }
    if let Some(pit) = restore_until {
        args.push(format!("--restore-until={pit}"));
    }
    args.extend(additional_args.iter().cloned());

    let mut env = Vec::new();
    let mut volumes = Vec::new();
    let mut mounts = Vec::new();
    if let Some(cloud) = cloud {
        env.extend(cloud_env_for(cloud, storage_type));
    }
    if let Some(pvc) = data_pvc {
        volumes.push(Volume {
            name: "data".to_string(),
            persistent_volume_claim: Some(k8s_openapi::api::core::v1::PersistentVolumeClaimVolumeSource {
                claim_name: pvc.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        });
        mounts.push(VolumeMount {
            name: "data".to_string(),
            mount_path: "/data".to_string(),
            ..Default::default()
        });
    }

    build_job(job_name, namespace, owner, image, service_account, "neo4j-admin", args, env, volumes, mounts)
}

#[allow(clippy::too_many_arguments)]
fn build_job(
    job_name: &str,
    namespace: &str,
    owner: OwnerReference,
    image: &str,
    service_account: &str,
    command: &str,
    args: Vec<String>,
    env: Vec<EnvVar>,
    volumes: Vec<Volume>,
    volume_mounts: Vec<VolumeMount>,
) -> Job {
    Job {
        metadata: ObjectMeta {
            name: Some(job_name.to_string()),
            namespace: Some(namespace.to_string()),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        spec: Some(JobSpec {
            backoff_limit: Some(2),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta::default()),
                spec: Some(PodSpec {
                    service_account_name: Some(service_account.to_string()),
                    restart_policy: Some("Never".to_string()),
                    containers: vec![Container {
                        name: "neo4j-admin".to_string(),
                        image: Some(image.to_string()),
                        command: Some(vec![command.to_string()]),
                        args: Some(args),
                        env: Some(env),
                        volume_mounts: if volume_mounts.is_empty() { None } else { Some(volume_mounts) },
                        ..Default::default()
                    }],
                    volumes: if volumes.is_empty() { None } else { Some(volumes) },
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// A handful of defined fields from `BackupSpec` that job-building
/// call sites read directly; kept here to avoid importing the whole
/// spec module into every call site.
pub fn backup_dest_path(spec: &BackupSpec, temp_path_default: &str) -> String {
    match spec.storage.r#type.as_str() {
        "pvc" => "/backups".to_string(),
        _ => spec
            .options
            .tempPath
            .clone()
            .unwrap_or_else(|| temp_path_default.to_string()),
    }
}
