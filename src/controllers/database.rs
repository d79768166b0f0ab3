//! `Neo4jDatabase` reconciler: resolves `clusterRef`
//! to a cluster or standalone's admin credentials and client Service,
//! opens a `BoltClient`, and runs the `SHOW DATABASES` / `CREATE
//! DATABASE` branch appropriate to `seedURI`/`initialData`/plain.

use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::{controller::Action, finalizer, watcher, Controller};
use kube::{client::Client, Resource, ResourceExt};
use tracing::{instrument, warn};

use crate::apis::database_types::DatabaseStatus;
use crate::apis::{Condition, Neo4jDatabase, Neo4jEnterpriseCluster, Neo4jEnterpriseStandalone};
use crate::bolt::statements;
use crate::bolt::BoltClient;
use crate::controller::{backoff_for, requeue_normal_with_jitter, Context};
use crate::controllers::FINALIZER;
use crate::errors::Error;
use crate::telemetry;
use crate::validation::validate_database;

type Result<T> = crate::errors::Result<T>;

pub async fn run(client: Client, ctx: Arc<Context>) {
    let databases = Api::<Neo4jDatabase>::all(client);
    crate::controller::assert_crd_installed(&databases, "Neo4jDatabase").await;

    Controller::new(databases, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .filter_map(|x| async move { x.ok() })
        .for_each(|_| futures::future::ready(()))
        .await;
}

fn error_policy(db: Arc<Neo4jDatabase>, error: &Error, ctx: Arc<Context>) -> Action {
    warn!(database = %db.name_any(), %error, "database reconcile failed");
    ctx.metrics.set_failure(db.as_ref(), error);
    backoff_for(error)
}

#[instrument(skip(ctx, db), fields(name = %db.name_any()))]
async fn reconcile(db: Arc<Neo4jDatabase>, ctx: Arc<Context>) -> Result<Action> {
    let trace_id = telemetry::get_trace_id();
    let _timer = ctx.metrics.count_and_measure(&trace_id);
    ctx.diagnostics.write().await.last_event = chrono::Utc::now();

    let ns = db.namespace().unwrap_or_default();
    let api: Api<Neo4jDatabase> = Api::namespaced(ctx.client.clone(), &ns);

    finalizer::finalizer(&api, FINALIZER, db, |event| async {
        match event {
            finalizer::Event::Apply(d) => apply(d, ctx.clone()).await,
            finalizer::Event::Cleanup(d) => cleanup(d, ctx.clone()).await,
        }
    })
    .await
    .map_err(|e| Error::FinalizerError(Box::new(e)))
}

/// Resolves `clusterRef` against both CRD kinds and returns
/// `(client_service_fqdn, admin_secret_name, cluster_server_count)`.
async fn resolve_target(client: &Client, ns: &str, cluster_ref: &str) -> Result<(String, String, i32)> {
    let clusters: Api<Neo4jEnterpriseCluster> = Api::namespaced(client.clone(), ns);
    if let Some(c) = clusters.get_opt(cluster_ref).await? {
        let admin_secret = c
            .spec
            .auth
            .as_ref()
            .and_then(|a| a.adminSecret.clone())
            .unwrap_or_else(|| crate::resources::secret::admin_secret_name(cluster_ref));
        return Ok((format!("{cluster_ref}-client.{ns}.svc"), admin_secret, c.spec.topology.servers));
    }
    let standalones: Api<Neo4jEnterpriseStandalone> = Api::namespaced(client.clone(), ns);
    if let Some(s) = standalones.get_opt(cluster_ref).await? {
        let admin_secret = s
            .spec
            .auth
            .as_ref()
            .and_then(|a| a.adminSecret.clone())
            .unwrap_or_else(|| crate::resources::secret::admin_secret_name(cluster_ref));
        return Ok((format!("{cluster_ref}-client.{ns}.svc"), admin_secret, 1));
    }
    Err(Error::MissingReference(cluster_ref.to_string()))
}

async fn open_client(ctx: &Context, ns: &str, service: &str, admin_secret: &str) -> Result<BoltClient> {
    let secrets: Api<Secret> = Api::namespaced(ctx.client.clone(), ns);
    let secret = secrets
        .get_opt(admin_secret)
        .await?
        .ok_or_else(|| Error::MissingReference(admin_secret.to_string()))?;
    let data = secret.data.unwrap_or_default();
    let username = data
        .get("username")
        .map(|v| String::from_utf8_lossy(&v.0).to_string())
        .unwrap_or_else(|| "neo4j".to_string());
    let password = data
        .get("password")
        .map(|v| String::from_utf8_lossy(&v.0).to_string())
        .ok_or_else(|| Error::MissingReference(format!("{admin_secret}/password")))?;
    Ok(BoltClient::new(service, &username, &password, &ctx.config)?)
}

async fn apply(db: Arc<Neo4jDatabase>, ctx: Arc<Context>) -> Result<Action> {
    let name = db.name_any();
    let ns = db.namespace().unwrap_or_default();
    let spec = &db.spec;

    let (service, admin_secret, cluster_servers) = resolve_target(&ctx.client, &ns, &spec.clusterRef).await?;
    validate_database(spec, cluster_servers)?;
    let bolt = open_client(&ctx, &ns, &service, &admin_secret).await?;

    let mut params = std::collections::BTreeMap::new();
    params.insert("name".to_string(), serde_json::json!(spec.name));
    let existing = bolt.run(statements::SHOW_DATABASES_BY_NAME, params, None).await?;

    let mut data_imported = false;
    if existing.is_empty() {
        let primaries = spec.topology.as_ref().map(|t| t.primaries);
        let secondaries = spec.topology.as_ref().map(|t| t.secondaries);
        if let Some(seed) = &spec.seedURI {
            let has_credentials = seed.credentials.is_some();
            let (stmt, seed_params) = statements::create_database_from_seed(
                &spec.name,
                primaries,
                secondaries,
                &seed.uri,
                has_credentials,
                seed.restoreUntil.as_deref(),
            );
            bolt.run(&stmt, seed_params, None).await?;
            data_imported = true;
        } else {
            let stmt = statements::create_database_plain(&spec.name, primaries, secondaries);
            bolt.run(&stmt, std::collections::BTreeMap::new(), None).await?;
            if let Some(initial) = &spec.initialData {
                for cypher in &initial.statements {
                    bolt.run(cypher, std::collections::BTreeMap::new(), None).await?;
                }
                data_imported = !initial.statements.is_empty();
            }
        }
    } else if spec.ifNotExists {
        // database already present and `ifNotExists=true`: no-op.
    }

    let mut params = std::collections::BTreeMap::new();
    params.insert("name".to_string(), serde_json::json!(spec.name));
    let rows = bolt.run(statements::SHOW_DATABASES_BY_NAME, params, None).await?;
    let state = rows
        .first()
        .and_then(|r| r.get("currentStatus"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();
    let servers = rows
        .first()
        .and_then(|r| r.get("requestedStatus"))
        .map(|_| vec![service.clone()])
        .unwrap_or_default();

    let status = DatabaseStatus {
        phase: if state == "online" { "Ready".to_string() } else { "Pending".to_string() },
        state: Some(state.clone()),
        dataImported: data_imported,
        servers,
        conditions: vec![Condition {
            type_: "Ready".to_string(),
            status: if state == "online" { "True" } else { "False" }.to_string(),
            reason: state,
            message: String::new(),
            last_transition_time: Some(chrono::Utc::now().to_rfc3339()),
        }],
        observedGeneration: db.meta().generation,
    };

    let api: Api<Neo4jDatabase> = Api::namespaced(ctx.client.clone(), &ns);
    let patch = serde_json::json!({ "status": status });
    api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch)).await?;

    Ok(requeue_normal_with_jitter(&ctx))
}

async fn cleanup(db: Arc<Neo4jDatabase>, ctx: Arc<Context>) -> Result<Action> {
    let ns = db.namespace().unwrap_or_default();
    let spec = &db.spec;
    match resolve_target(&ctx.client, &ns, &spec.clusterRef).await {
        Ok((service, admin_secret, _)) => {
            if let Ok(bolt) = open_client(&ctx, &ns, &service, &admin_secret).await {
                let stmt = statements::drop_database(&spec.name, true);
                let _ = bolt.run(&stmt, std::collections::BTreeMap::new(), None).await;
            }
        }
        Err(_) => {
            // the owning cluster is already gone; nothing to drop against.
        }
    }
    Ok(Action::await_change())
}
