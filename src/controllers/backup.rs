//! `Neo4jBackup` reconciler: one-shot and
//! cron-scheduled backups via a `neo4j-admin database backup` Job,
//! `DIFF`-as-parent selection gated on CalVer >= 2025.04, and retention
//! trimming of `status.history`.

use std::str::FromStr;
use std::sync::Arc;

use cron::Schedule;
use futures::StreamExt;
use k8s_openapi::api::batch::v1::Job;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::{controller::Action, finalizer, watcher, Controller};
use kube::{client::Client, Resource, ResourceExt};
use tracing::{instrument, warn};

use crate::apis::backup_types::{BackupRun, BackupStatus};
use crate::apis::{Condition, Neo4jBackup, Neo4jEnterpriseCluster, Neo4jEnterpriseStandalone};
use crate::controller::{backoff_for, requeue_normal_with_jitter, Context};
use crate::controllers::{owner_reference, FINALIZER};
use crate::errors::Error;
use crate::resources::job;
use crate::telemetry;
use crate::version::Neo4jVersion;

type Result<T> = crate::errors::Result<T>;

pub async fn run(client: Client, ctx: Arc<Context>) {
    let backups = Api::<Neo4jBackup>::all(client);
    crate::controller::assert_crd_installed(&backups, "Neo4jBackup").await;

    Controller::new(backups, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .filter_map(|x| async move { x.ok() })
        .for_each(|_| futures::future::ready(()))
        .await;
}

fn error_policy(backup: Arc<Neo4jBackup>, error: &Error, ctx: Arc<Context>) -> Action {
    warn!(backup = %backup.name_any(), %error, "backup reconcile failed");
    ctx.metrics.set_failure(backup.as_ref(), error);
    backoff_for(error)
}

#[instrument(skip(ctx, backup), fields(name = %backup.name_any()))]
async fn reconcile(backup: Arc<Neo4jBackup>, ctx: Arc<Context>) -> Result<Action> {
    let trace_id = telemetry::get_trace_id();
    let _timer = ctx.metrics.count_and_measure(&trace_id);
    ctx.diagnostics.write().await.last_event = chrono::Utc::now();

    let ns = backup.namespace().unwrap_or_default();
    let api: Api<Neo4jBackup> = Api::namespaced(ctx.client.clone(), &ns);

    finalizer::finalizer(&api, FINALIZER, backup, |event| async {
        match event {
            finalizer::Event::Apply(b) => apply(b, ctx.clone()).await,
            finalizer::Event::Cleanup(_) => Ok(Action::await_change()),
        }
    })
    .await
    .map_err(|e| Error::FinalizerError(Box::new(e)))
}

/// Resolves the backup target to `(image, service_account, server_fqdn, version)`.
async fn resolve_target(
    client: &Client,
    ns: &str,
    target_name: &str,
) -> Result<(String, String, String, Neo4jVersion)> {
    let clusters: Api<Neo4jEnterpriseCluster> = Api::namespaced(client.clone(), ns);
    if let Some(c) = clusters.get_opt(target_name).await? {
        let version = Neo4jVersion::parse(&c.spec.image.tag)?;
        return Ok((
            format!("{}:{}", c.spec.image.repository, c.spec.image.tag),
            crate::resources::rbac::service_account_name(target_name),
            format!("{target_name}-client.{ns}.svc"),
            version,
        ));
    }
    let standalones: Api<Neo4jEnterpriseStandalone> = Api::namespaced(client.clone(), ns);
    if let Some(s) = standalones.get_opt(target_name).await? {
        let version = Neo4jVersion::parse(&s.spec.image.tag)?;
        return Ok((
            format!("{}:{}", s.spec.image.repository, s.spec.image.tag),
            crate::resources::rbac::service_account_name(target_name),
            format!("{target_name}-client.{ns}.svc"),
            version,
        ));
    }
    Err(Error::MissingReference(target_name.to_string()))
}

fn due(schedule: &str, last_run: Option<&str>, now: chrono::DateTime<chrono::Utc>) -> Result<bool> {
    let parsed = Schedule::from_str(schedule)
        .map_err(|e| crate::errors::ValidationError::InvalidCronSchedule(schedule.to_string(), e.to_string()))?;
    let Some(last) = last_run.and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok()) else {
        return Ok(true);
    };
    Ok(parsed.after(&last.with_timezone(&chrono::Utc)).next().is_some_and(|next| next <= now))
}

async fn apply(backup: Arc<Neo4jBackup>, ctx: Arc<Context>) -> Result<Action> {
    let name = backup.name_any();
    let ns = backup.namespace().unwrap_or_default();
    let spec = &backup.spec;
    let owner = owner_reference(backup.as_ref());
    let pp = PatchParams::apply(crate::resources::PATCH_MANAGER).force();

    if spec.target.kind == "Database" && spec.target.clusterRef.is_none() {
        return Err(crate::errors::ValidationError::BackupTargetClusterRefRequired.into());
    }
    let cluster_ref = spec.target.clusterRef.clone().unwrap_or_else(|| spec.target.name.clone());
    let (image, service_account, server_fqdn, version) = resolve_target(&ctx.client, &ns, &cluster_ref).await?;

    let mut status = backup.status.clone().unwrap_or_default();
    let now = chrono::Utc::now();

    if spec.suspend {
        status.phase = "Suspended".to_string();
    } else {
        let should_run = match &spec.schedule {
            Some(cron_expr) => due(cron_expr, status.lastRunTime.as_deref(), now)?,
            None => status.lastRunTime.is_none(),
        };

        if should_run {
            let prefer_diff = spec.options.preferDiffAsParent && version.is_calver_at_least_2025_04();
            let backup_type = if prefer_diff { "DIFF" } else { spec.options.backupType.as_str() };
            let dest_path = job::backup_dest_path(spec, "/tmp/neo4j-backups");
            let job_name = format!("{name}-{}", now.timestamp());

            let jobs: Api<Job> = Api::namespaced(ctx.client.clone(), &ns);
            let desired = job::build_backup_job(
                &job_name,
                &ns,
                owner.clone(),
                &image,
                &service_account,
                &server_fqdn,
                &dest_path,
                backup_type,
                spec.storage.cloud.as_ref(),
                &spec.storage.r#type,
            );
            jobs.patch(&job_name, &pp, &Patch::Apply(&desired)).await?;

            status.lastRunTime = Some(now.to_rfc3339());
            status.history.push(BackupRun {
                name: job_name,
                phase: "Running".to_string(),
                startTime: now.to_rfc3339(),
                completionTime: None,
                backupType: backup_type.to_string(),
                path: Some(dest_path),
            });
            apply_retention(&mut status, &spec.retention);
        }

        status.phase = if status.history.last().is_some_and(|r| r.phase == "Running") {
            "Running".to_string()
        } else {
            "Idle".to_string()
        };
        if let Some(cron_expr) = &spec.schedule {
            if let Ok(parsed) = Schedule::from_str(cron_expr) {
                status.nextRunTime = parsed.after(&now).next().map(|t| t.to_rfc3339());
            }
        }
    }

    status.conditions = vec![Condition {
        type_: "Ready".to_string(),
        status: "True".to_string(),
        reason: status.phase.clone(),
        message: String::new(),
        last_transition_time: Some(now.to_rfc3339()),
    }];

    let api: Api<Neo4jBackup> = Api::namespaced(ctx.client.clone(), &ns);
    let patch = serde_json::json!({ "status": status });
    api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch)).await?;

    Ok(requeue_normal_with_jitter(&ctx))
}

/// Trims `status.history` to `retention.maxCount`, oldest first.
/// `deletePolicy=Retain` keeps the entries in status but callers are
/// expected to leave the underlying backup artifact alone.
fn apply_retention(status: &mut BackupStatus, retention: &crate::apis::backup_types::RetentionSpec) {
    while status.history.len() > retention.maxCount.max(1) as usize {
        status.history.remove(0);
    }
}
