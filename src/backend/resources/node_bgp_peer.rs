//! Per-node BGP peer client
//!
//! Each peer is a JSON annotation `peer.bgp.projectcalico.org/<ip>` on the
//! node it belongs to. Writes are read-then-patch with no revision check.

use crate::convert::node::{bgp_peer_annotation, find_node_bgp_peer, node_bgp_peers};
use crate::domain::{KubeApiRef, ResourceClient};
use crate::error::{Error, Result};
use crate::model::{KVPair, Key, ListQuery, Value};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use std::collections::BTreeMap;
use std::net::IpAddr;

pub struct NodeBgpPeerClient {
    api: KubeApiRef,
}

fn peer_key(key: &Key) -> Result<(&str, &IpAddr)> {
    match key {
        Key::NodeBgpPeer { nodename, peer_ip } => Ok((nodename, peer_ip)),
        other => Err(Error::Internal(format!(
            "NodeBGPPeer client received key {}",
            other
        ))),
    }
}

impl NodeBgpPeerClient {
    pub fn new(api: KubeApiRef) -> Self {
        Self { api }
    }

    async fn node(&self, key: &Key, nodename: &str) -> Result<Node> {
        self.api
            .get_node(nodename)
            .await
            .map_err(|e| Error::from_kube(e, key))
    }

    async fn write(&self, kvp: &KVPair) -> Result<KVPair> {
        let (nodename, peer_ip) = peer_key(&kvp.key)?;
        let mut peer = kvp.value.as_bgp_peer().cloned().ok_or_else(|| {
            Error::decode(format!(
                "{} requires a BGPPeer value, got {}",
                kvp.key,
                kvp.value.type_name()
            ))
        })?;
        peer.peer_ip = *peer_ip;

        let patch = BTreeMap::from([(
            bgp_peer_annotation(peer_ip),
            Some(serde_json::to_string(&peer)?),
        )]);
        let node = self
            .api
            .patch_node_annotations(nodename, patch)
            .await
            .map_err(|e| Error::from_kube(e, &kvp.key))?;

        let mut written = KVPair::new(kvp.key.clone(), Value::BgpPeer(peer));
        written.revision = node.metadata.resource_version;
        Ok(written)
    }
}

#[async_trait]
impl ResourceClient for NodeBgpPeerClient {
    async fn ensure_initialized(&self) -> Result<()> {
        Ok(())
    }

    async fn create(&self, kvp: KVPair) -> Result<KVPair> {
        let (nodename, peer_ip) = peer_key(&kvp.key)?;
        let node = self.node(&kvp.key, nodename).await?;
        if find_node_bgp_peer(&node, peer_ip)?.is_some() {
            return Err(Error::ResourceAlreadyExists {
                identifier: kvp.key.into(),
            });
        }
        self.write(&kvp).await
    }

    async fn update(&self, kvp: KVPair) -> Result<KVPair> {
        let (nodename, peer_ip) = peer_key(&kvp.key)?;
        let node = self.node(&kvp.key, nodename).await?;
        if find_node_bgp_peer(&node, peer_ip)?.is_none() {
            return Err(Error::does_not_exist(kvp.key));
        }
        self.write(&kvp).await
    }

    async fn apply(&self, kvp: KVPair) -> Result<KVPair> {
        self.write(&kvp).await
    }

    async fn delete(&self, kvp: KVPair) -> Result<KVPair> {
        let existing = self.get(&kvp.key).await?;
        let (nodename, peer_ip) = peer_key(&kvp.key)?;

        let patch = BTreeMap::from([(bgp_peer_annotation(peer_ip), None)]);
        self.api
            .patch_node_annotations(nodename, patch)
            .await
            .map_err(|e| Error::from_kube(e, &kvp.key))?;
        Ok(existing)
    }

    async fn get(&self, key: &Key) -> Result<KVPair> {
        let (nodename, peer_ip) = peer_key(key)?;
        let node = self.node(key, nodename).await?;
        find_node_bgp_peer(&node, peer_ip)?.ok_or_else(|| Error::does_not_exist(key))
    }

    async fn list(&self, query: &ListQuery) -> Result<(Vec<KVPair>, Option<String>)> {
        let nodes = match query {
            ListQuery::NodeBgpPeer {
                nodename: Some(nodename),
                ..
            } => match self.api.get_node(nodename).await {
                Ok(node) => vec![node],
                Err(e) => {
                    let err = Error::from_kube(e, query);
                    if err.is_not_found() {
                        return Ok((Vec::new(), None));
                    }
                    return Err(err);
                }
            },
            _ => self
                .api
                .list_nodes()
                .await
                .map_err(|e| Error::from_kube(e, query))?,
        };

        let mut kvps = Vec::new();
        for node in &nodes {
            kvps.extend(
                node_bgp_peers(node)?
                    .into_iter()
                    .filter(|kvp| query.matches(&kvp.key)),
            );
        }
        Ok((kvps, None))
    }
}
