//! Node pod CIDR → tunnel address HostConfig

use crate::error::{Error, Result};
use crate::model::{KVPair, Key, Value};
use k8s_openapi::api::core::v1::Node;
use std::net::Ipv4Addr;
use tracing::warn;

/// The only per-host configuration served from node objects
pub const TUNNEL_ADDRESS_CONFIG: &str = "IpInIpTunnelAddr";

/// Tunnel address for a subnet: its network address with the last octet
/// incremented.
pub fn tunnel_address(cidr: &str) -> Result<Ipv4Addr> {
    let (addr, prefix) = cidr
        .split_once('/')
        .ok_or_else(|| Error::decode(format!("invalid CIDR {:?}: missing prefix length", cidr)))?;
    let addr: Ipv4Addr = addr
        .parse()
        .map_err(|e| Error::decode(format!("invalid IPv4 CIDR {:?}: {}", cidr, e)))?;
    let prefix: u32 = prefix
        .parse()
        .ok()
        .filter(|p| *p <= 32)
        .ok_or_else(|| Error::decode(format!("invalid prefix length in CIDR {:?}", cidr)))?;

    let mask = u32::MAX.checked_shl(32 - prefix).unwrap_or(0);
    let mut octets = Ipv4Addr::from(u32::from(addr) & mask).octets();
    octets[3] = octets[3].wrapping_add(1);
    Ok(Ipv4Addr::from(octets))
}

/// Tunnel address HostConfig for a node.
///
/// `Ok(None)` when the node has no pod CIDR assigned yet.
pub fn node_tunnel_config(node: &Node) -> Result<Option<KVPair>> {
    let name = node.metadata.name.as_deref().unwrap_or_default();
    let cidr = match node.spec.as_ref().and_then(|s| s.pod_cidr.as_deref()) {
        Some(cidr) if !cidr.is_empty() => cidr,
        _ => {
            warn!(node = name, "Node does not have a podCIDR for HostConfig");
            return Ok(None);
        }
    };

    let tunnel = tunnel_address(cidr).map_err(|e| {
        warn!(node = name, pod_cidr = cidr, "Invalid podCIDR for HostConfig");
        e
    })?;

    Ok(Some(KVPair::new(
        Key::host_config(name, TUNNEL_ADDRESS_CONFIG),
        Value::String(tunnel.to_string()),
    )))
}
