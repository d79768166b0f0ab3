use controller::apis::{
    Neo4jBackup, Neo4jDatabase, Neo4jEnterpriseCluster, Neo4jEnterpriseStandalone, Neo4jPlugin, Neo4jRestore,
};
use kube::CustomResourceExt;

fn emit<K: CustomResourceExt>() -> String {
    let mut crd = K::crd();

    if crd.metadata.annotations.is_none() {
        crd.metadata.annotations = Some(Default::default());
    }
    if let Some(annotations) = crd.metadata.annotations.as_mut() {
        annotations.insert("helm.sh/resource-policy".to_string(), "keep".to_string());
    }

    serde_yaml::to_string(&crd).unwrap()
}

fn main() {
    let docs = [
        emit::<Neo4jEnterpriseCluster>(),
        emit::<Neo4jEnterpriseStandalone>(),
        emit::<Neo4jDatabase>(),
        emit::<Neo4jBackup>(),
        emit::<Neo4jRestore>(),
        emit::<Neo4jPlugin>(),
    ];

    let prepend_string =
        "{{- if (index .Values \"controller\").enabled }}\n{{- if (index .Values \"controller\").crds.create }}\n";
    let append_string = "{{- end }}\n{{- end }}";
    for doc in docs {
        print!("---\n{prepend_string}{doc}{append_string}");
    }
}
