//! `Neo4jPlugin` reconciler:
//! validates the plugin against its cluster, and marks it `Ready` once
//! the owning cluster's StatefulSet has rolled out the resulting
//! `NEO4J_PLUGINS` env var to every pod. The actual env var injection
//! happens inside `controllers::cluster::apply`, which lists every
//! `Neo4jPlugin` referencing it each reconcile.

use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::apps::v1::StatefulSet;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::{controller::Action, finalizer, watcher, Controller};
use kube::{client::Client, Resource, ResourceExt};
use tracing::{instrument, warn};

use crate::apis::plugin_types::PluginStatus;
use crate::apis::{Condition, Neo4jEnterpriseCluster, Neo4jPlugin};
use crate::controller::{backoff_for, requeue_normal_with_jitter, Context};
use crate::controllers::FINALIZER;
use crate::errors::Error;
use crate::resources::statefulset;
use crate::telemetry;

type Result<T> = crate::errors::Result<T>;

pub async fn run(client: Client, ctx: Arc<Context>) {
    let plugins = Api::<Neo4jPlugin>::all(client);
    crate::controller::assert_crd_installed(&plugins, "Neo4jPlugin").await;

    Controller::new(plugins, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .filter_map(|x| async move { x.ok() })
        .for_each(|_| futures::future::ready(()))
        .await;
}

fn error_policy(plugin: Arc<Neo4jPlugin>, error: &Error, ctx: Arc<Context>) -> Action {
    warn!(plugin = %plugin.name_any(), %error, "plugin reconcile failed");
    ctx.metrics.set_failure(plugin.as_ref(), error);
    backoff_for(error)
}

#[instrument(skip(ctx, plugin), fields(name = %plugin.name_any()))]
async fn reconcile(plugin: Arc<Neo4jPlugin>, ctx: Arc<Context>) -> Result<Action> {
    let trace_id = telemetry::get_trace_id();
    let _timer = ctx.metrics.count_and_measure(&trace_id);
    ctx.diagnostics.write().await.last_event = chrono::Utc::now();

    let ns = plugin.namespace().unwrap_or_default();
    let api: Api<Neo4jPlugin> = Api::namespaced(ctx.client.clone(), &ns);

    finalizer::finalizer(&api, FINALIZER, plugin, |event| async {
        match event {
            finalizer::Event::Apply(p) => apply(p, ctx.clone()).await,
            finalizer::Event::Cleanup(_) => Ok(Action::await_change()),
        }
    })
    .await
    .map_err(|e| Error::FinalizerError(Box::new(e)))
}

async fn apply(plugin: Arc<Neo4jPlugin>, ctx: Arc<Context>) -> Result<Action> {
    let name = plugin.name_any();
    let ns = plugin.namespace().unwrap_or_default();
    let spec = &plugin.spec;

    let clusters: Api<Neo4jEnterpriseCluster> = Api::namespaced(ctx.client.clone(), &ns);
    let cluster = clusters
        .get_opt(&spec.clusterRef)
        .await?
        .ok_or_else(|| Error::MissingReference(spec.clusterRef.clone()))?;

    if spec.dependencies.contains(&spec.name) {
        return Err(Error::InvalidErr(format!("plugin {} cannot depend on itself", spec.name)));
    }

    let statefulsets: Api<StatefulSet> = Api::namespaced(ctx.client.clone(), &ns);
    let sts = statefulsets.get_opt(&statefulset::statefulset_name(&spec.clusterRef)).await?;
    let rolled_out = sts
        .as_ref()
        .and_then(|s| s.status.as_ref())
        .map(|s| s.updated_replicas.unwrap_or(0) >= cluster.spec.topology.servers)
        .unwrap_or(false);

    let phase = if !spec.enabled {
        "Pending"
    } else if rolled_out {
        "Ready"
    } else {
        "Installing"
    };

    let status = PluginStatus {
        phase: phase.to_string(),
        installedVersion: if phase == "Ready" { Some(spec.version.clone()) } else { None },
        message: None,
        conditions: vec![Condition {
            type_: "Ready".to_string(),
            status: if phase == "Ready" { "True" } else { "False" }.to_string(),
            reason: phase.to_string(),
            message: String::new(),
            last_transition_time: Some(chrono::Utc::now().to_rfc3339()),
        }],
    };

    let api: Api<Neo4jPlugin> = Api::namespaced(ctx.client.clone(), &ns);
    let patch = serde_json::json!({ "status": status });
    api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch)).await?;

    Ok(requeue_normal_with_jitter(&ctx))
}
