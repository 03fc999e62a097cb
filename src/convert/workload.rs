//! Pod → WorkloadEndpoint translation

use super::names::{profile_name, workload_id, NAMESPACE_LABEL};
use crate::error::{Error, Result};
use crate::model::{KVPair, Key, Value, WorkloadEndpoint};
use k8s_openapi::api::core::v1::Pod;
use std::net::IpAddr;
use uuid::Uuid;

/// Orchestrator identifier recorded on every derived endpoint
pub const ORCHESTRATOR_ID: &str = "k8s";

/// Endpoint identifier; pods have a single interface
pub const ENDPOINT_ID: &str = "eth0";

/// Prefix of host-side interface names
pub const INTERFACE_PREFIX: &str = "cali";

/// Decide whether a pod is visible as a workload endpoint.
///
/// The pod must be scheduled to a node, use pod networking, not have
/// terminated, and already have an address assigned.
pub fn is_ready_pod(pod: &Pod) -> bool {
    let Some(spec) = pod.spec.as_ref() else {
        return false;
    };
    if spec.node_name.as_deref().unwrap_or_default().is_empty() {
        return false;
    }
    if spec.host_network.unwrap_or(false) {
        return false;
    }

    let Some(status) = pod.status.as_ref() else {
        return false;
    };
    if matches!(status.phase.as_deref(), Some("Succeeded") | Some("Failed")) {
        return false;
    }
    !status.pod_ip.as_deref().unwrap_or_default().is_empty()
}

/// Host-side interface name for a workload: `cali` plus 11 hex digits.
pub fn interface_name(workload_id: &str) -> String {
    let digest = Uuid::new_v5(&Uuid::NAMESPACE_OID, workload_id.as_bytes())
        .simple()
        .to_string();
    format!("{}{}", INTERFACE_PREFIX, &digest[..11])
}

/// Translate a pod into its workload endpoint.
pub fn pod_to_workload_endpoint(pod: &Pod) -> Result<KVPair> {
    let name = pod
        .metadata
        .name
        .as_deref()
        .ok_or_else(|| Error::decode("pod has no name"))?;
    let namespace = pod
        .metadata
        .namespace
        .as_deref()
        .ok_or_else(|| Error::decode(format!("pod {} has no namespace", name)))?;
    let wid = workload_id(namespace, name);

    let mut ipv4_nets = Vec::new();
    let mut ipv6_nets = Vec::new();
    if let Some(ip) = pod
        .status
        .as_ref()
        .and_then(|s| s.pod_ip.as_deref())
        .filter(|ip| !ip.is_empty())
    {
        match ip.parse::<IpAddr>() {
            Ok(IpAddr::V4(v4)) => ipv4_nets.push(format!("{}/32", v4)),
            Ok(IpAddr::V6(v6)) => ipv6_nets.push(format!("{}/128", v6)),
            Err(e) => {
                return Err(Error::decode(format!(
                    "pod {} has invalid podIP {:?}: {}",
                    wid, ip, e
                )))
            }
        }
    }

    let mut labels = pod.metadata.labels.clone().unwrap_or_default();
    labels.insert(NAMESPACE_LABEL.to_string(), namespace.to_string());

    let endpoint = WorkloadEndpoint {
        state: "active".to_string(),
        name: interface_name(&wid),
        mac: None,
        profile_ids: vec![profile_name(namespace)],
        ipv4_nets,
        ipv6_nets,
        labels,
    };

    let hostname = pod
        .spec
        .as_ref()
        .and_then(|s| s.node_name.clone())
        .unwrap_or_default();
    let key = Key::WorkloadEndpoint {
        hostname,
        orchestrator_id: ORCHESTRATOR_ID.to_string(),
        workload_id: wid,
        endpoint_id: ENDPOINT_ID.to_string(),
    };

    let mut kvp = KVPair::new(key, Value::WorkloadEndpoint(endpoint));
    kvp.revision = pod.metadata.resource_version.clone();
    Ok(kvp)
}
