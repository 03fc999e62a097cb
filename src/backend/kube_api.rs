//! [`KubeApi`] over a live `kube::Client`

use crate::domain::KubeApi;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Node, Pod};
use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::Client;
use serde_json::json;
use std::collections::BTreeMap;

type KubeResult<T> = std::result::Result<T, kube::Error>;

/// Native object access through the API server
#[derive(Clone)]
pub struct ClientKubeApi {
    client: Client,
}

impl ClientKubeApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KubeApi for ClientKubeApi {
    async fn list_namespaces(&self) -> KubeResult<Vec<Namespace>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn get_namespace(&self, name: &str) -> KubeResult<Namespace> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        api.get(name).await
    }

    async fn list_pods(&self) -> KubeResult<Vec<Pod>> {
        let api: Api<Pod> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> KubeResult<Pod> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        api.get(name).await
    }

    async fn patch_pod_ip(&self, namespace: &str, name: &str, ip: &str) -> KubeResult<Pod> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let patch = json!({ "status": { "podIP": ip } });
        api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
    }

    async fn list_network_policies(&self) -> KubeResult<Vec<NetworkPolicy>> {
        let api: Api<NetworkPolicy> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn get_network_policy(&self, namespace: &str, name: &str) -> KubeResult<NetworkPolicy> {
        let api: Api<NetworkPolicy> = Api::namespaced(self.client.clone(), namespace);
        api.get(name).await
    }

    async fn list_nodes(&self) -> KubeResult<Vec<Node>> {
        let api: Api<Node> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn get_node(&self, name: &str) -> KubeResult<Node> {
        let api: Api<Node> = Api::all(self.client.clone());
        api.get(name).await
    }

    async fn patch_node_annotations(
        &self,
        name: &str,
        annotations: BTreeMap<String, Option<String>>,
    ) -> KubeResult<Node> {
        let api: Api<Node> = Api::all(self.client.clone());
        // Merge patch semantics: null removes the key
        let patch = json!({ "metadata": { "annotations": annotations } });
        api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
    }
}
