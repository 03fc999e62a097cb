//! Kubernetes Node annotations ↔ datastore Node and per-node BGP peers
//!
//! Node objects are owned by the platform, so per-node datastore state lives
//! in annotations on them.

use crate::error::{Error, Result};
use crate::model::{BgpPeer, KVPair, Key, Node as NodeValue, Value};
use k8s_openapi::api::core::v1::Node;
use std::collections::BTreeMap;
use std::net::IpAddr;

pub const IPV4_ADDRESS_ANNOTATION: &str = "projectcalico.org/IPv4Address";
pub const AS_NUMBER_ANNOTATION: &str = "projectcalico.org/ASNumber";

/// Prefix of per-node BGP peer annotations
pub const BGP_PEER_ANNOTATION_PREFIX: &str = "peer.bgp.projectcalico.org/";

/// Annotation changes applied by a merge patch; `None` removes the key.
pub type AnnotationPatch = BTreeMap<String, Option<String>>;

fn node_name(node: &Node) -> Result<&str> {
    node.metadata
        .name
        .as_deref()
        .ok_or_else(|| Error::decode("node has no name"))
}

fn annotations(node: &Node) -> impl Iterator<Item = (&String, &String)> {
    node.metadata.annotations.iter().flatten()
}

// =============================================================================
// Node
// =============================================================================

pub fn k8s_node_to_node(node: &Node) -> Result<KVPair> {
    let name = node_name(node)?;
    let mut value = NodeValue::default();
    for (k, v) in annotations(node) {
        match k.as_str() {
            IPV4_ADDRESS_ANNOTATION => value.bgp_ipv4_address = Some(v.clone()),
            AS_NUMBER_ANNOTATION => {
                let asn = v.parse().map_err(|e| {
                    Error::decode(format!("node {} has invalid AS number {:?}: {}", name, v, e))
                })?;
                value.bgp_as_number = Some(asn);
            }
            _ => {}
        }
    }

    let mut kvp = KVPair::new(
        Key::Node {
            hostname: name.to_string(),
        },
        Value::Node(value),
    );
    kvp.revision = node.metadata.resource_version.clone();
    Ok(kvp)
}

/// Annotation patch that makes a node carry exactly `value`'s BGP settings.
pub fn node_annotation_patch(value: &NodeValue) -> AnnotationPatch {
    BTreeMap::from([
        (IPV4_ADDRESS_ANNOTATION.to_string(), value.bgp_ipv4_address.clone()),
        (
            AS_NUMBER_ANNOTATION.to_string(),
            value.bgp_as_number.map(|asn| asn.to_string()),
        ),
    ])
}

// =============================================================================
// Per-node BGP Peers
// =============================================================================

pub fn bgp_peer_annotation(peer_ip: &IpAddr) -> String {
    format!(
        "{}{}",
        BGP_PEER_ANNOTATION_PREFIX,
        peer_ip.to_string().replace(':', "-")
    )
}

/// Every BGP peer recorded on a node, in annotation order.
pub fn node_bgp_peers(node: &Node) -> Result<Vec<KVPair>> {
    let name = node_name(node)?;
    let mut peers = Vec::new();
    for (k, v) in annotations(node) {
        if !k.starts_with(BGP_PEER_ANNOTATION_PREFIX) {
            continue;
        }
        let peer: BgpPeer = serde_json::from_str(v).map_err(|e| {
            Error::decode(format!("node {} has invalid BGP peer annotation {}: {}", name, k, e))
        })?;
        let mut kvp = KVPair::new(
            Key::NodeBgpPeer {
                nodename: name.to_string(),
                peer_ip: peer.peer_ip,
            },
            Value::BgpPeer(peer),
        );
        kvp.revision = node.metadata.resource_version.clone();
        peers.push(kvp);
    }
    Ok(peers)
}

/// The peer stored on `node` for `peer_ip`, if any.
pub fn find_node_bgp_peer(node: &Node, peer_ip: &IpAddr) -> Result<Option<KVPair>> {
    Ok(node_bgp_peers(node)?
        .into_iter()
        .find(|kvp| matches!(&kvp.key, Key::NodeBgpPeer { peer_ip: ip, .. } if ip == peer_ip)))
}
