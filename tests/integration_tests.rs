// Functional tests assume a live cluster with a context already
// configured, and with the operator + CRDs already installed. They are
// `#[ignore]`d so `cargo test` skips them by default; run with
// `cargo test -- --ignored` against a real cluster.
//
// https://doc.rust-lang.org/book/ch11-02-running-tests.html

#[cfg(test)]
mod test {
    use controller::apis::{
        backup_types::{BackupOptions, BackupSpec, BackupStatus, BackupStorageSpec, BackupTarget, RetentionSpec},
        cluster_types::{ClusterImage, EnterpriseClusterSpec, EnterpriseClusterStatus, StorageSpec, TopologySpec},
        database_types::{DatabaseSpec, DatabaseStatus, SeedCredentials, SeedSpec},
        plugin_types::{PluginSource, PluginSpec, PluginStatus},
        Neo4jBackup, Neo4jDatabase, Neo4jEnterpriseCluster, Neo4jPlugin,
    };
    use k8s_openapi::api::{apps::v1::StatefulSet, core::v1::Namespace};
    use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
    use kube::{
        api::{DeleteParams, ListParams, Patch, PatchParams},
        runtime::wait::{await_condition, conditions},
        Api, Client, Config, Error, ResourceExt,
    };
    use std::{collections::BTreeMap, time::Duration};
    use tokio::time::timeout;

    const TIMEOUT_SECONDS_CLUSTER_READY: u64 = 600;
    const TIMEOUT_SECONDS_DATABASE_READY: u64 = 300;
    const TIMEOUT_SECONDS_NS_DELETED: u64 = 300;

    async fn kube_client() -> Client {
        let kube_config = Config::infer()
            .await
            .expect("Please configure your Kubernetes context.");
        let client = Client::try_from(kube_config).expect("Failed to initialize Kubernetes client");

        let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
        timeout(
            Duration::from_secs(30),
            await_condition(
                crds,
                "neo4jenterpriseclusters.neo4j.neo4j.com",
                conditions::is_crd_established(),
            ),
        )
        .await
        .expect("Neo4jEnterpriseCluster CRD was not found; is the operator installed?")
        .unwrap();

        client
    }

    async fn create_namespace(client: Client, name: &str) -> Result<String, Error> {
        let ns_api: Api<Namespace> = Api::all(client);
        let params = ListParams::default().fields(&format!("metadata.name={name}"));
        if !ns_api.list(&params).await?.items.is_empty() {
            return Ok(name.to_string());
        }
        let ns = serde_json::json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": { "name": name }
        });
        ns_api
            .patch(name, &PatchParams::apply("neo4j-operator-integration-tests"), &Patch::Apply(ns))
            .await?;
        Ok(name.to_string())
    }

    async fn delete_namespace(client: Client, name: &str) -> Result<(), Error> {
        let ns_api: Api<Namespace> = Api::all(client);
        if ns_api.get_opt(name).await?.is_none() {
            return Ok(());
        }
        ns_api.delete(name, &DeleteParams::default()).await?;
        timeout(
            Duration::from_secs(TIMEOUT_SECONDS_NS_DELETED),
            await_condition(ns_api, name, conditions::is_deleted("")),
        )
        .await
        .ok();
        Ok(())
    }

    async fn wait_for_cluster_ready(clusters: &Api<Neo4jEnterpriseCluster>, name: &str) -> EnterpriseClusterStatus {
        timeout(Duration::from_secs(TIMEOUT_SECONDS_CLUSTER_READY), async {
            loop {
                if let Some(c) = clusters.get_opt(name).await.unwrap() {
                    if let Some(status) = &c.status {
                        if status.phase == "Ready" {
                            return status.clone();
                        }
                    }
                }
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
        })
        .await
        .expect("cluster never reached phase=Ready")
    }

    fn three_server_cluster(name: &str) -> Neo4jEnterpriseCluster {
        Neo4jEnterpriseCluster::new(
            name,
            EnterpriseClusterSpec {
                image: ClusterImage {
                    repository: "neo4j".to_string(),
                    tag: "5.26.1-enterprise".to_string(),
                    pullPolicy: "IfNotPresent".to_string(),
                },
                topology: TopologySpec {
                    servers: 3,
                    placement: None,
                    availabilityZones: vec!["a".to_string(), "b".to_string(), "c".to_string()],
                    enforceDistribution: true,
                },
                storage: StorageSpec {
                    storageClassName: None,
                    size: k8s_openapi::apimachinery::pkg::api::resource::Quantity("10Gi".to_string()),
                    retentionPolicy: "Retain".to_string(),
                },
                ..Default::default()
            },
        )
    }

    // Scenario A: cluster creation produces a Parallel-managed 3-replica
    // StatefulSet and reaches phase=Ready.
    #[tokio::test]
    #[ignore]
    async fn functional_test_cluster_creation() {
        let client = kube_client().await;
        let ns = create_namespace(client.clone(), "neo4j-it-cluster-creation").await.unwrap();
        let clusters: Api<Neo4jEnterpriseCluster> = Api::namespaced(client.clone(), &ns);
        let statefulsets: Api<StatefulSet> = Api::namespaced(client.clone(), &ns);

        let cluster = three_server_cluster("prod-a");
        clusters
            .patch(
                "prod-a",
                &PatchParams::apply("neo4j-operator-integration-tests").force(),
                &Patch::Apply(&cluster),
            )
            .await
            .unwrap();

        let status = wait_for_cluster_ready(&clusters, "prod-a").await;
        assert_eq!(status.replicas.ready, 3);

        let sts = statefulsets.get("prod-a-server").await.unwrap();
        assert_eq!(sts.spec.as_ref().unwrap().replicas, Some(3));
        assert_eq!(
            sts.spec
                .as_ref()
                .unwrap()
                .pod_management_policy
                .as_deref(),
            Some("Parallel")
        );

        clusters.delete("prod-a", &DeleteParams::default()).await.unwrap();
        delete_namespace(client, &ns).await.unwrap();
    }

    // Scenario C: a Database seeded from S3 reaches state=online with
    // dataImported=true.
    #[tokio::test]
    #[ignore]
    async fn functional_test_database_from_seed() {
        let client = kube_client().await;
        let ns = create_namespace(client.clone(), "neo4j-it-database-seed").await.unwrap();
        let clusters: Api<Neo4jEnterpriseCluster> = Api::namespaced(client.clone(), &ns);
        let databases: Api<Neo4jDatabase> = Api::namespaced(client.clone(), &ns);

        clusters
            .patch(
                "prod-a",
                &PatchParams::apply("neo4j-operator-integration-tests").force(),
                &Patch::Apply(&three_server_cluster("prod-a")),
            )
            .await
            .unwrap();
        wait_for_cluster_ready(&clusters, "prod-a").await;

        let db = Neo4jDatabase::new(
            "orders",
            DatabaseSpec {
                clusterRef: "prod-a".to_string(),
                name: "orders".to_string(),
                topology: None,
                options: BTreeMap::new(),
                initialData: None,
                seedURI: Some(SeedSpec {
                    uri: "s3://bkt/orders.backup".to_string(),
                    credentials: Some(SeedCredentials { secretRef: "aws-creds".to_string() }),
                    restoreUntil: None,
                }),
                wait: true,
                ifNotExists: true,
                defaultCypherLanguage: None,
            },
        );
        databases
            .patch(
                "orders",
                &PatchParams::apply("neo4j-operator-integration-tests").force(),
                &Patch::Apply(&db),
            )
            .await
            .unwrap();

        let status: DatabaseStatus = timeout(Duration::from_secs(TIMEOUT_SECONDS_DATABASE_READY), async {
            loop {
                if let Some(d) = databases.get_opt("orders").await.unwrap() {
                    if let Some(s) = &d.status {
                        if s.state.as_deref() == Some("online") {
                            return s.clone();
                        }
                    }
                }
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
        })
        .await
        .expect("database never reached state=online");
        assert!(status.dataImported);

        databases.delete("orders", &DeleteParams::default()).await.unwrap();
        clusters.delete("prod-a", &DeleteParams::default()).await.unwrap();
        delete_namespace(client, &ns).await.unwrap();
    }

    // Scenario D: a scheduled backup with retention.maxCount=3 trims its
    // history even after a 4th successful run.
    #[tokio::test]
    #[ignore]
    async fn functional_test_backup_retention() {
        let client = kube_client().await;
        let ns = create_namespace(client.clone(), "neo4j-it-backup-retention").await.unwrap();
        let clusters: Api<Neo4jEnterpriseCluster> = Api::namespaced(client.clone(), &ns);
        let backups: Api<Neo4jBackup> = Api::namespaced(client.clone(), &ns);

        clusters
            .patch(
                "prod-a",
                &PatchParams::apply("neo4j-operator-integration-tests").force(),
                &Patch::Apply(&three_server_cluster("prod-a")),
            )
            .await
            .unwrap();
        wait_for_cluster_ready(&clusters, "prod-a").await;

        let backup = Neo4jBackup::new(
            "daily",
            BackupSpec {
                target: BackupTarget { kind: "Cluster".to_string(), name: "prod-a".to_string(), clusterRef: None },
                storage: BackupStorageSpec {
                    r#type: "pvc".to_string(),
                    bucket: None,
                    path: Some("/backups/daily".to_string()),
                    cloud: None,
                },
                schedule: Some("0 2 * * *".to_string()),
                options: BackupOptions::default(),
                retention: RetentionSpec { maxAge: None, maxCount: 3, deletePolicy: "Delete".to_string() },
                suspend: false,
            },
        );
        backups
            .patch(
                "daily",
                &PatchParams::apply("neo4j-operator-integration-tests").force(),
                &Patch::Apply(&backup),
            )
            .await
            .unwrap();

        let status: BackupStatus = timeout(Duration::from_secs(600), async {
            loop {
                if let Some(b) = backups.get_opt("daily").await.unwrap() {
                    if let Some(s) = &b.status {
                        if s.history.len() >= 4 {
                            return s.clone();
                        }
                    }
                }
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
        })
        .await
        .expect("backup never accumulated 4 runs");
        assert!(status.history.len() <= 3, "history not trimmed to retention.maxCount");

        backups.delete("daily", &DeleteParams::default()).await.unwrap();
        clusters.delete("prod-a", &DeleteParams::default()).await.unwrap();
        delete_namespace(client, &ns).await.unwrap();
    }

    // Scenario F: enabling a plugin injects NEO4J_PLUGINS and drives the
    // plugin through Pending -> Installing -> Ready.
    #[tokio::test]
    #[ignore]
    async fn functional_test_plugin_installation() {
        let client = kube_client().await;
        let ns = create_namespace(client.clone(), "neo4j-it-plugin-install").await.unwrap();
        let clusters: Api<Neo4jEnterpriseCluster> = Api::namespaced(client.clone(), &ns);
        let plugins: Api<Neo4jPlugin> = Api::namespaced(client.clone(), &ns);
        let statefulsets: Api<StatefulSet> = Api::namespaced(client.clone(), &ns);

        clusters
            .patch(
                "prod-a",
                &PatchParams::apply("neo4j-operator-integration-tests").force(),
                &Patch::Apply(&three_server_cluster("prod-a")),
            )
            .await
            .unwrap();
        wait_for_cluster_ready(&clusters, "prod-a").await;

        let plugin = Neo4jPlugin::new(
            "apoc-on-prod-a",
            PluginSpec {
                clusterRef: "prod-a".to_string(),
                name: "apoc".to_string(),
                version: "5.26.0".to_string(),
                enabled: true,
                source: PluginSource { r#type: "official".to_string(), registryAuth: None, url: None, checksum: None },
                dependencies: Vec::new(),
                config: BTreeMap::from([("apoc.export.file.enabled".to_string(), "true".to_string())]),
                license: None,
                security: None,
                resources: None,
            },
        );
        plugins
            .patch(
                "apoc-on-prod-a",
                &PatchParams::apply("neo4j-operator-integration-tests").force(),
                &Patch::Apply(&plugin),
            )
            .await
            .unwrap();

        let status: PluginStatus = timeout(Duration::from_secs(300), async {
            loop {
                if let Some(p) = plugins.get_opt("apoc-on-prod-a").await.unwrap() {
                    if let Some(s) = &p.status {
                        if s.phase == "Ready" {
                            return s.clone();
                        }
                    }
                }
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
        })
        .await
        .expect("plugin never reached phase=Ready");
        assert_eq!(status.installedVersion.as_deref(), Some("5.26.0"));

        let sts = statefulsets.get("prod-a-server").await.unwrap();
        let env = &sts.spec.unwrap().template.spec.unwrap().containers[0].env;
        assert!(env
            .as_ref()
            .unwrap()
            .iter()
            .any(|e| e.name == "NEO4J_PLUGINS" && e.value.as_deref() == Some("[\"apoc\"]")));

        plugins.delete("apoc-on-prod-a", &DeleteParams::default()).await.unwrap();
        clusters.delete("prod-a", &DeleteParams::default()).await.unwrap();
        delete_namespace(client, &ns).await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn functional_test_cluster_cleanup_on_delete() {
        let client = kube_client().await;
        let ns = create_namespace(client.clone(), "neo4j-it-cleanup").await.unwrap();
        let clusters: Api<Neo4jEnterpriseCluster> = Api::namespaced(client.clone(), &ns);

        clusters
            .patch(
                "prod-a",
                &PatchParams::apply("neo4j-operator-integration-tests").force(),
                &Patch::Apply(&three_server_cluster("prod-a")),
            )
            .await
            .unwrap();
        wait_for_cluster_ready(&clusters, "prod-a").await;

        clusters.delete("prod-a", &DeleteParams::default()).await.unwrap();
        timeout(
            Duration::from_secs(120),
            await_condition(clusters.clone(), "prod-a", conditions::is_deleted("")),
        )
        .await
        .expect("cluster was not removed after delete")
        .ok();
        assert!(clusters.get_opt("prod-a").await.unwrap().is_none());
        assert!(!clusters
            .get_opt("prod-a")
            .await
            .unwrap()
            .map(|c| c.finalizers().iter().any(|f| f == controller::controllers::FINALIZER))
            .unwrap_or(false));

        delete_namespace(client, &ns).await.unwrap();
    }
}
