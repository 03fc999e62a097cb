//! Value records stored under datastore keys

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;

// =============================================================================
// Rules
// =============================================================================

/// Action taken when a rule matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Deny,
}

impl std::fmt::Display for RuleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleAction::Allow => write!(f, "allow"),
            RuleAction::Deny => write!(f, "deny"),
        }
    }
}

/// A single policy or profile rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub action: RuleAction,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_net: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_selector: Option<String>,

    /// Destination ports, numeric or named
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dst_ports: Vec<String>,
}

impl Rule {
    pub fn allow_all() -> Self {
        Self::with_action(RuleAction::Allow)
    }

    pub fn deny_all() -> Self {
        Self::with_action(RuleAction::Deny)
    }

    fn with_action(action: RuleAction) -> Self {
        Self {
            action,
            protocol: None,
            src_net: None,
            src_selector: None,
            dst_ports: Vec::new(),
        }
    }
}

// =============================================================================
// Independently Stored Values
// =============================================================================

/// IP address pool used for workload address assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IpPool {
    pub cidr: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipip_interface: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipip_mode: Option<String>,

    #[serde(default)]
    pub masquerade: bool,

    #[serde(default = "default_true")]
    pub ipam: bool,

    #[serde(default)]
    pub disabled: bool,
}

fn default_true() -> bool {
    true
}

/// BGP configuration of a cluster node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bgp_ipv4_address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bgp_as_number: Option<u32>,
}

/// BGP peer, either global or scoped to one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BgpPeer {
    #[serde(rename = "peerIP")]
    pub peer_ip: IpAddr,
    #[serde(rename = "asNumber")]
    pub as_number: u32,
}

// =============================================================================
// Derived Values
// =============================================================================

/// Profile derived from a namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub inbound_rules: Vec<Rule>,
    pub outbound_rules: Vec<Rule>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Workload endpoint derived from a pod
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadEndpoint {
    pub state: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,

    #[serde(default)]
    pub profile_ids: Vec<String>,

    /// Addresses in `a.b.c.d/len` form
    #[serde(default)]
    pub ipv4_nets: Vec<String>,

    #[serde(default)]
    pub ipv6_nets: Vec<String>,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl WorkloadEndpoint {
    /// First IPv4 address without its prefix length.
    pub fn first_ipv4(&self) -> Option<&str> {
        self.ipv4_nets
            .first()
            .map(|net| net.split('/').next().unwrap_or(net))
    }
}

/// Network policy, derived from a NetworkPolicy or stored as a custom resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,

    #[serde(default)]
    pub selector: String,

    #[serde(default)]
    pub inbound_rules: Vec<Rule>,

    #[serde(default)]
    pub outbound_rules: Vec<Rule>,

    #[serde(default)]
    pub untracked: bool,
}

// =============================================================================
// Status Reports
// =============================================================================

/// Periodic liveness report from a dataplane agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub uptime_seconds: f64,
    #[serde(default)]
    pub first_update: bool,
}

/// Programming status of a single endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointStatus {
    pub status: String,
}
