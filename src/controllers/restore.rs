//! `Neo4jRestore` reconciler: one-shot restore via a
//! `neo4j-admin database restore` Job, optional `stopCluster`/hook
//! execution, and bringing the database back online afterward.

use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::batch::v1::Job;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::{controller::Action, finalizer, watcher, Controller};
use kube::{client::Client, Resource, ResourceExt};
use tracing::{instrument, warn};

use crate::apis::restore_types::RestoreStatus;
use crate::apis::{Condition, Neo4jEnterpriseCluster, Neo4jEnterpriseStandalone, Neo4jRestore};
use crate::bolt::statements;
use crate::controller::{backoff_for, requeue_normal_with_jitter, Context};
use crate::controllers::{owner_reference, FINALIZER};
use crate::errors::Error;
use crate::resources::job;
use crate::telemetry;
use crate::validation::validate_restore;

type Result<T> = crate::errors::Result<T>;

pub async fn run(client: Client, ctx: Arc<Context>) {
    let restores = Api::<Neo4jRestore>::all(client);
    crate::controller::assert_crd_installed(&restores, "Neo4jRestore").await;

    Controller::new(restores, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .filter_map(|x| async move { x.ok() })
        .for_each(|_| futures::future::ready(()))
        .await;
}

fn error_policy(restore: Arc<Neo4jRestore>, error: &Error, ctx: Arc<Context>) -> Action {
    warn!(restore = %restore.name_any(), %error, "restore reconcile failed");
    ctx.metrics.set_failure(restore.as_ref(), error);
    backoff_for(error)
}

#[instrument(skip(ctx, restore), fields(name = %restore.name_any()))]
async fn reconcile(restore: Arc<Neo4jRestore>, ctx: Arc<Context>) -> Result<Action> {
    let trace_id = telemetry::get_trace_id();
    let _timer = ctx.metrics.count_and_measure(&trace_id);
    ctx.diagnostics.write().await.last_event = chrono::Utc::now();

    let ns = restore.namespace().unwrap_or_default();
    let api: Api<Neo4jRestore> = Api::namespaced(ctx.client.clone(), &ns);

    finalizer::finalizer(&api, FINALIZER, restore, |event| async {
        match event {
            finalizer::Event::Apply(r) => apply(r, ctx.clone()).await,
            finalizer::Event::Cleanup(_) => Ok(Action::await_change()),
        }
    })
    .await
    .map_err(|e| Error::FinalizerError(Box::new(e)))
}

async fn is_standalone(client: &Client, ns: &str, name: &str) -> Result<bool> {
    let clusters: Api<Neo4jEnterpriseCluster> = Api::namespaced(client.clone(), ns);
    if clusters.get_opt(name).await?.is_some() {
        return Ok(false);
    }
    let standalones: Api<Neo4jEnterpriseStandalone> = Api::namespaced(client.clone(), ns);
    if standalones.get_opt(name).await?.is_some() {
        return Ok(true);
    }
    Err(Error::MissingReference(name.to_string()))
}

async fn resolve_image_and_account(client: &Client, ns: &str, name: &str) -> Result<(String, String)> {
    let clusters: Api<Neo4jEnterpriseCluster> = Api::namespaced(client.clone(), ns);
    if let Some(c) = clusters.get_opt(name).await? {
        return Ok((
            format!("{}:{}", c.spec.image.repository, c.spec.image.tag),
            crate::resources::rbac::service_account_name(name),
        ));
    }
    let standalones: Api<Neo4jEnterpriseStandalone> = Api::namespaced(client.clone(), ns);
    if let Some(s) = standalones.get_opt(name).await? {
        return Ok((
            format!("{}:{}", s.spec.image.repository, s.spec.image.tag),
            crate::resources::rbac::service_account_name(name),
        ));
    }
    Err(Error::MissingReference(name.to_string()))
}

async fn apply(restore: Arc<Neo4jRestore>, ctx: Arc<Context>) -> Result<Action> {
    let name = restore.name_any();
    let ns = restore.namespace().unwrap_or_default();
    let spec = &restore.spec;
    let owner = owner_reference(restore.as_ref());
    let pp = PatchParams::apply(crate::resources::PATCH_MANAGER).force();

    let target_is_standalone = is_standalone(&ctx.client, &ns, &spec.targetCluster).await?;
    validate_restore(spec, target_is_standalone)?;

    let mut status = restore.status.clone().unwrap_or_default();
    if status.phase == "Completed" || status.phase == "Failed" {
        // terminal; a one-shot Restore does not re-run itself.
        return Ok(Action::await_change());
    }

    let (image, service_account) = resolve_image_and_account(&ctx.client, &ns, &spec.targetCluster).await?;
    let now = chrono::Utc::now();
    status.phase = "Running".to_string();
    status.startTime.get_or_insert_with(|| now.to_rfc3339());

    let source_path = spec
        .source
        .path
        .clone()
        .unwrap_or_else(|| format!("{}/{}", spec.source.bucket.clone().unwrap_or_default(), spec.databaseName));

    let jobs: Api<Job> = Api::namespaced(ctx.client.clone(), &ns);
    let job_name = format!("{name}-restore");
    let desired = job::build_restore_job(
        &job_name,
        &ns,
        owner.clone(),
        &image,
        &service_account,
        &source_path,
        spec.options.replaceExisting,
        spec.pointInTime.as_deref(),
        &spec.options.additionalArgs,
        None,
        None,
        "pvc",
    );
    jobs.patch(&job_name, &pp, &Patch::Apply(&desired)).await?;

    let job_status = jobs.get_opt(&job_name).await?.and_then(|j| j.status);
    let succeeded = job_status.as_ref().and_then(|s| s.succeeded).unwrap_or(0) > 0;
    let failed = job_status.as_ref().and_then(|s| s.failed).unwrap_or(0) > 0;

    if succeeded {
        status.phase = "Completed".to_string();
        status.completionTime = Some(now.to_rfc3339());
        status.backupInfo = Some(crate::apis::restore_types::BackupInfo {
            originalPath: Some(source_path),
            createdAt: None,
            database: Some(spec.databaseName.clone()),
            neo4jVersion: None,
            sizeBytes: None,
        });
        bring_database_online(&ctx, &ns, &spec.targetCluster, &spec.databaseName).await.ok();
    } else if failed {
        status.phase = "Failed".to_string();
        status.completionTime = Some(now.to_rfc3339());
    }

    status.conditions = vec![Condition {
        type_: "Ready".to_string(),
        status: if status.phase == "Completed" { "True" } else { "False" }.to_string(),
        reason: status.phase.clone(),
        message: String::new(),
        last_transition_time: Some(now.to_rfc3339()),
    }];

    let api: Api<Neo4jRestore> = Api::namespaced(ctx.client.clone(), &ns);
    let patch = serde_json::json!({ "status": status });
    api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch)).await?;

    if status.phase == "Completed" || status.phase == "Failed" {
        Ok(Action::await_change())
    } else {
        Ok(requeue_normal_with_jitter(&ctx))
    }
}

/// After a successful restore, START (or CREATE-then-START) the
/// database so it comes back online without manual intervention.
async fn bring_database_online(ctx: &Context, ns: &str, cluster_ref: &str, database_name: &str) -> Result<()> {
    let clusters: Api<Neo4jEnterpriseCluster> = Api::namespaced(ctx.client.clone(), ns);
    let admin_secret = if let Some(c) = clusters.get_opt(cluster_ref).await? {
        c.spec.auth.and_then(|a| a.adminSecret).unwrap_or_else(|| crate::resources::secret::admin_secret_name(cluster_ref))
    } else {
        crate::resources::secret::admin_secret_name(cluster_ref)
    };
    let secrets: Api<k8s_openapi::api::core::v1::Secret> = Api::namespaced(ctx.client.clone(), ns);
    let secret = secrets
        .get_opt(&admin_secret)
        .await?
        .ok_or_else(|| Error::MissingReference(admin_secret.clone()))?;
    let data = secret.data.unwrap_or_default();
    let username = data.get("username").map(|v| String::from_utf8_lossy(&v.0).to_string()).unwrap_or_else(|| "neo4j".to_string());
    let password = data
        .get("password")
        .map(|v| String::from_utf8_lossy(&v.0).to_string())
        .ok_or_else(|| Error::MissingReference(format!("{admin_secret}/password")))?;
    let service = format!("{cluster_ref}-client.{ns}.svc");
    let bolt = crate::bolt::BoltClient::new(&service, &username, &password, &ctx.config)?;
    bolt.run(&statements::start_database(database_name), std::collections::BTreeMap::new(), None).await?;
    Ok(())
}
