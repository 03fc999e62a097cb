//! Node client
//!
//! Datastore nodes are projected onto the platform's `Node` objects. The
//! platform owns their lifecycle, so only the BGP annotations are writable.

use crate::convert::node::{k8s_node_to_node, node_annotation_patch};
use crate::domain::{KubeApiRef, ResourceClient};
use crate::error::{Error, Result};
use crate::model::{KVPair, Key, ListQuery};
use async_trait::async_trait;
use tracing::debug;

pub struct NodeClient {
    api: KubeApiRef,
}

impl NodeClient {
    pub fn new(api: KubeApiRef) -> Self {
        Self { api }
    }

    async fn patch(&self, kvp: KVPair) -> Result<KVPair> {
        let Key::Node { hostname } = &kvp.key else {
            return Err(Error::Internal(format!("Node client received key {}", kvp.key)));
        };
        let value = kvp.value.as_node().ok_or_else(|| {
            Error::decode(format!(
                "{} requires a Node value, got {}",
                kvp.key,
                kvp.value.type_name()
            ))
        })?;

        debug!(node = %hostname, "Patching node BGP annotations");
        let node = self
            .api
            .patch_node_annotations(hostname, node_annotation_patch(value))
            .await
            .map_err(|e| Error::from_kube(e, &kvp.key))?;
        k8s_node_to_node(&node)
    }
}

#[async_trait]
impl ResourceClient for NodeClient {
    async fn ensure_initialized(&self) -> Result<()> {
        Ok(())
    }

    async fn create(&self, kvp: KVPair) -> Result<KVPair> {
        Err(Error::not_supported(kvp.key, "Create"))
    }

    async fn update(&self, kvp: KVPair) -> Result<KVPair> {
        self.patch(kvp).await
    }

    async fn apply(&self, kvp: KVPair) -> Result<KVPair> {
        self.patch(kvp).await
    }

    async fn delete(&self, kvp: KVPair) -> Result<KVPair> {
        Err(Error::not_supported(kvp.key, "Delete"))
    }

    async fn get(&self, key: &Key) -> Result<KVPair> {
        let Key::Node { hostname } = key else {
            return Err(Error::Internal(format!("Node client received key {}", key)));
        };
        let node = self
            .api
            .get_node(hostname)
            .await
            .map_err(|e| Error::from_kube(e, key))?;
        k8s_node_to_node(&node)
    }

    async fn list(&self, query: &ListQuery) -> Result<(Vec<KVPair>, Option<String>)> {
        if let ListQuery::Node {
            hostname: Some(hostname),
        } = query
        {
            let key = Key::Node {
                hostname: hostname.clone(),
            };
            return match self.get(&key).await {
                Ok(kvp) => Ok((vec![kvp], None)),
                Err(e) if e.is_not_found() => Ok((Vec::new(), None)),
                Err(e) => Err(e),
            };
        }

        let nodes = self
            .api
            .list_nodes()
            .await
            .map_err(|e| Error::from_kube(e, query))?;
        let kvps = nodes
            .iter()
            .map(k8s_node_to_node)
            .collect::<Result<Vec<_>>>()?;
        Ok((kvps, None))
    }
}
