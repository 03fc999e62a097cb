//! Handlers for kinds derived from native objects
//!
//! Profiles come from namespaces, workload endpoints from pods, policies from
//! NetworkPolicies (plus the system policy resource), and the tunnel address
//! HostConfig from node pod CIDRs. None of them are stored by the datastore.

use crate::convert::{
    classify_policy_name, is_ready_pod, namespace_to_profile, network_policy_to_policy,
    node_tunnel_config, parse_profile_name, parse_workload_id, pod_to_workload_endpoint,
    PolicyName, TUNNEL_ADDRESS_CONFIG,
};
use crate::domain::{KubeApi, ResourceClient};
use crate::error::{Error, Result};
use crate::model::{KVPair, Key, ListQuery, Value};
use std::net::Ipv4Addr;
use tracing::{debug, warn};

/// Turn a not-found into an empty list; other errors pass through.
fn none_if_missing(result: Result<KVPair>) -> Result<Vec<KVPair>> {
    match result {
        Ok(kvp) => Ok(vec![kvp]),
        Err(e) if e.is_not_found() => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

fn unexpected_key(kind: &str, key: &Key) -> Error {
    Error::Internal(format!("{} handler received key {}", kind, key))
}

// =============================================================================
// Profiles
// =============================================================================

pub async fn get_profile(api: &dyn KubeApi, key: &Key) -> Result<KVPair> {
    let Key::Profile { name } = key else {
        return Err(unexpected_key("Profile", key));
    };
    if name.is_empty() {
        return Err(Error::decode("missing profile name"));
    }
    let namespace = parse_profile_name(name)?;

    let ns = api
        .get_namespace(&namespace)
        .await
        .map_err(|e| Error::from_kube(e, key))?;
    namespace_to_profile(&ns)
}

pub async fn list_profiles(api: &dyn KubeApi, query: &ListQuery) -> Result<Vec<KVPair>> {
    let query = &query.normalized();
    if let ListQuery::Profile { name: Some(name) } = query {
        // Any failure resolving a single profile lists as empty
        return Ok(get_profile(api, &Key::profile(name))
            .await
            .map(|kvp| vec![kvp])
            .unwrap_or_default());
    }

    let namespaces = api
        .list_namespaces()
        .await
        .map_err(|e| Error::from_kube(e, query))?;
    namespaces.iter().map(namespace_to_profile).collect()
}

// =============================================================================
// Workload Endpoints
// =============================================================================

pub async fn get_workload_endpoint(api: &dyn KubeApi, key: &Key) -> Result<KVPair> {
    let Key::WorkloadEndpoint { workload_id, .. } = key else {
        return Err(unexpected_key("WorkloadEndpoint", key));
    };
    let (namespace, name) = parse_workload_id(workload_id)?;

    let pod = api
        .get_pod(&namespace, &name)
        .await
        .map_err(|e| Error::from_kube(e, key))?;
    if !is_ready_pod(&pod) {
        debug!(workload = %workload_id, "Pod is not ready for a workload endpoint");
        return Err(Error::does_not_exist(key));
    }
    pod_to_workload_endpoint(&pod)
}

pub async fn list_workload_endpoints(api: &dyn KubeApi, query: &ListQuery) -> Result<Vec<KVPair>> {
    let query = &query.normalized();
    let ListQuery::WorkloadEndpoint {
        workload_id,
        hostname,
    } = query
    else {
        return Err(Error::Internal(format!(
            "WorkloadEndpoint handler received query {}",
            query
        )));
    };

    let kvps = match workload_id {
        Some(wid) => none_if_missing(get_workload_endpoint(api, &Key::workload(wid)).await)?,
        None => {
            let pods = api
                .list_pods()
                .await
                .map_err(|e| Error::from_kube(e, query))?;
            pods.iter()
                .filter(|p| is_ready_pod(p))
                .map(pod_to_workload_endpoint)
                .collect::<Result<Vec<_>>>()?
        }
    };

    Ok(match hostname {
        Some(_) => kvps.into_iter().filter(|kvp| query.matches(&kvp.key)).collect(),
        None => kvps,
    })
}

/// Write the endpoint's first IPv4 address back to its pod.
///
/// Endpoints without an IPv4 address are returned unchanged.
pub async fn apply_workload_endpoint(api: &dyn KubeApi, kvp: KVPair) -> Result<KVPair> {
    let Key::WorkloadEndpoint { workload_id, .. } = &kvp.key else {
        return Err(unexpected_key("WorkloadEndpoint", &kvp.key));
    };
    let endpoint = kvp.value.as_workload_endpoint().ok_or_else(|| {
        Error::decode(format!(
            "{} requires a WorkloadEndpoint value, got {}",
            kvp.key,
            kvp.value.type_name()
        ))
    })?;
    let Some(ip) = endpoint.first_ipv4() else {
        return Ok(kvp);
    };
    let ip: Ipv4Addr = ip.parse().map_err(|_| {
        Error::decode(format!("{} has invalid IPv4 address {:?}", kvp.key, ip))
    })?;
    let ip = ip.to_string();
    let (namespace, name) = parse_workload_id(workload_id)?;

    api.get_pod(&namespace, &name)
        .await
        .map_err(|e| Error::from_kube(e, &kvp.key))?;
    debug!(workload = %workload_id, ip = %ip, "Recording pod IP");
    let pod = api
        .patch_pod_ip(&namespace, &name, &ip)
        .await
        .map_err(|e| Error::from_kube(e, &kvp.key))?;
    pod_to_workload_endpoint(&pod)
}

// =============================================================================
// Policies
// =============================================================================

pub async fn get_policy(
    api: &dyn KubeApi,
    system_policies: &dyn ResourceClient,
    key: &Key,
) -> Result<KVPair> {
    let Key::Policy { name } = key else {
        return Err(unexpected_key("Policy", key));
    };
    if name.is_empty() {
        return Err(Error::decode("missing policy name"));
    }

    match classify_policy_name(name) {
        Ok(PolicyName::Network { namespace, name }) => {
            let np = api
                .get_network_policy(&namespace, &name)
                .await
                .map_err(|e| Error::from_kube(e, key))?;
            network_policy_to_policy(&np)
        }
        Ok(PolicyName::System(_)) => system_policies.get(key).await,
        Ok(PolicyName::Unrecognized) | Err(_) => Err(Error::does_not_exist(key)),
    }
}

pub async fn list_policies(
    api: &dyn KubeApi,
    system_policies: &dyn ResourceClient,
    query: &ListQuery,
) -> Result<Vec<KVPair>> {
    let query = &query.normalized();
    if let ListQuery::Policy { name: Some(name) } = query {
        return none_if_missing(get_policy(api, system_policies, &Key::policy(name)).await);
    }

    let nps = api
        .list_network_policies()
        .await
        .map_err(|e| Error::from_kube(e, query))?;
    let mut kvps = nps
        .iter()
        .map(network_policy_to_policy)
        .collect::<Result<Vec<_>>>()?;

    let (system, _) = system_policies
        .list(&ListQuery::Policy { name: None })
        .await?;
    kvps.extend(system);
    Ok(kvps)
}

// =============================================================================
// Host Config
// =============================================================================

pub async fn get_host_config(api: &dyn KubeApi, key: &Key) -> Result<KVPair> {
    let Key::HostConfig { hostname, name } = key else {
        return Err(unexpected_key("HostConfig", key));
    };
    if name != TUNNEL_ADDRESS_CONFIG {
        return Err(Error::does_not_exist(key));
    }

    let node = api
        .get_node(hostname)
        .await
        .map_err(|e| Error::from_kube(e, key))?;
    node_tunnel_config(&node)?.ok_or_else(|| Error::does_not_exist(key))
}

pub async fn list_host_configs(api: &dyn KubeApi, query: &ListQuery) -> Result<Vec<KVPair>> {
    let query = &query.normalized();
    let ListQuery::HostConfig { hostname, name } = query else {
        return Err(Error::Internal(format!(
            "HostConfig handler received query {}",
            query
        )));
    };
    if name.as_deref().is_some_and(|n| n != TUNNEL_ADDRESS_CONFIG) {
        return Ok(Vec::new());
    }

    if let Some(hostname) = hostname {
        // A missing node is an error; a node without a usable podCIDR lists empty
        let node = api
            .get_node(hostname)
            .await
            .map_err(|e| Error::from_kube(e, query))?;
        return match node_tunnel_config(&node) {
            Ok(kvp) => Ok(kvp.into_iter().collect()),
            Err(Error::Decode(msg)) => {
                debug!(node = %hostname, error = %msg, "Node has no usable podCIDR");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        };
    }

    let nodes = api
        .list_nodes()
        .await
        .map_err(|e| Error::from_kube(e, query))?;
    let mut kvps = Vec::new();
    for node in &nodes {
        match node_tunnel_config(node) {
            Ok(Some(kvp)) => kvps.push(kvp),
            Ok(None) => {}
            Err(e) => warn!(
                node = node.metadata.name.as_deref().unwrap_or_default(),
                error = %e,
                "Skipping node with unusable podCIDR"
            ),
        }
    }
    Ok(kvps)
}

// =============================================================================
// Ready Flag
// =============================================================================

/// The datastore is always ready once constructed.
pub fn ready_flag() -> KVPair {
    KVPair::new(Key::ReadyFlag, Value::Bool(true))
}
