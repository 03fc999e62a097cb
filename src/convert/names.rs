//! Name codecs between datastore names and Kubernetes object names
//!
//! Every encoding here round-trips: `parse_x(x(..)) == ..` for any input that
//! is a valid Kubernetes name.

use crate::error::{Error, Result};
use std::net::IpAddr;

/// Prefix of profile names derived from namespaces
pub const PROFILE_NAME_PREFIX: &str = "k8s_ns.";

/// Prefix of policy names derived from NetworkPolicy objects
pub const NETWORK_POLICY_NAME_PREFIX: &str = "np.projectcalico.org/";

/// Prefix of policy names backed by the SystemNetworkPolicy resource
pub const SYSTEM_POLICY_NAME_PREFIX: &str = "snp.projectcalico.org/";

/// Label added to every workload endpoint carrying its namespace
pub const NAMESPACE_LABEL: &str = "calico/k8s_ns";

/// Prefix applied to namespace labels when copied onto profiles
pub const NAMESPACE_LABEL_PREFIX: &str = "k8s_ns/label/";

// =============================================================================
// Workloads
// =============================================================================

/// Workload identifier for a pod: `<namespace>.<pod>`.
pub fn workload_id(namespace: &str, pod: &str) -> String {
    format!("{}.{}", namespace, pod)
}

/// Split a workload identifier into namespace and pod name.
///
/// Namespace names cannot contain dots, so the first dot is the separator.
pub fn parse_workload_id(id: &str) -> Result<(String, String)> {
    match id.split_once('.') {
        Some((ns, pod)) if !ns.is_empty() && !pod.is_empty() => Ok((ns.to_string(), pod.to_string())),
        _ => Err(Error::decode(format!("malformed workload ID: {:?}", id))),
    }
}

// =============================================================================
// Profiles
// =============================================================================

pub fn profile_name(namespace: &str) -> String {
    format!("{}{}", PROFILE_NAME_PREFIX, namespace)
}

pub fn parse_profile_name(name: &str) -> Result<String> {
    match name.strip_prefix(PROFILE_NAME_PREFIX) {
        Some(ns) if !ns.is_empty() => Ok(ns.to_string()),
        _ => Err(Error::decode(format!("not a namespace profile name: {:?}", name))),
    }
}

// =============================================================================
// Policies
// =============================================================================

/// Backing store a policy name resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyName {
    /// Derived from `NetworkPolicy <namespace>/<name>`
    Network { namespace: String, name: String },
    /// Stored as a SystemNetworkPolicy resource with this object name
    System(String),
    /// Neither prefix matched
    Unrecognized,
}

pub fn network_policy_name(namespace: &str, name: &str) -> String {
    format!("{}{}.{}", NETWORK_POLICY_NAME_PREFIX, namespace, name)
}

pub fn parse_network_policy_name(name: &str) -> Result<(String, String)> {
    let rest = name
        .strip_prefix(NETWORK_POLICY_NAME_PREFIX)
        .ok_or_else(|| Error::decode(format!("not a NetworkPolicy name: {:?}", name)))?;
    match rest.split_once('.') {
        Some((ns, np)) if !ns.is_empty() && !np.is_empty() => Ok((ns.to_string(), np.to_string())),
        _ => Err(Error::decode(format!("malformed NetworkPolicy name: {:?}", name))),
    }
}

pub fn system_policy_name(resource_name: &str) -> String {
    format!("{}{}", SYSTEM_POLICY_NAME_PREFIX, resource_name)
}

pub fn parse_system_policy_name(name: &str) -> Result<String> {
    match name.strip_prefix(SYSTEM_POLICY_NAME_PREFIX) {
        Some(rest) if !rest.is_empty() => Ok(rest.to_string()),
        _ => Err(Error::decode(format!("not a SystemNetworkPolicy name: {:?}", name))),
    }
}

/// Decide which backing store serves a policy name.
///
/// A prefixed name whose remainder does not decode is an error.
pub fn classify_policy_name(name: &str) -> Result<PolicyName> {
    if name.starts_with(NETWORK_POLICY_NAME_PREFIX) {
        let (namespace, name) = parse_network_policy_name(name)?;
        Ok(PolicyName::Network { namespace, name })
    } else if name.starts_with(SYSTEM_POLICY_NAME_PREFIX) {
        Ok(PolicyName::System(parse_system_policy_name(name)?))
    } else {
        Ok(PolicyName::Unrecognized)
    }
}

// =============================================================================
// Resource Names
// =============================================================================

/// Object name for a CIDR: separators replaced by `-`.
pub fn cidr_resource_name(cidr: &str) -> String {
    cidr.replace(['.', ':', '/'], "-")
}

/// Object name for an IP address.
pub fn ip_resource_name(ip: &IpAddr) -> String {
    ip.to_string().replace(['.', ':'], "-")
}
