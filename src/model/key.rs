//! Datastore keys and list queries
//!
//! Every entity reachable through the datastore is addressed by exactly one
//! [`Key`] variant. [`ListQuery`] mirrors the key kinds with optional filter
//! fields; a query with every filter unset enumerates the whole kind.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

// =============================================================================
// Key Kind
// =============================================================================

/// Discriminant shared by keys and list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyKind {
    GlobalConfig,
    IpPool,
    Node,
    GlobalBgpPeer,
    NodeBgpPeer,
    Profile,
    WorkloadEndpoint,
    Policy,
    HostConfig,
    ReadyFlag,
    ActiveStatusReport,
    LastStatusReport,
    HostEndpointStatus,
    WorkloadEndpointStatus,
}

impl KeyKind {
    /// Kinds persisted in a store owned by this datastore.
    pub fn is_independently_stored(&self) -> bool {
        matches!(
            self,
            KeyKind::GlobalConfig
                | KeyKind::IpPool
                | KeyKind::Node
                | KeyKind::GlobalBgpPeer
                | KeyKind::NodeBgpPeer
        )
    }

    /// Kinds written periodically by the dataplane agent and dropped on Apply.
    pub fn is_status_report(&self) -> bool {
        matches!(
            self,
            KeyKind::ActiveStatusReport
                | KeyKind::LastStatusReport
                | KeyKind::HostEndpointStatus
                | KeyKind::WorkloadEndpointStatus
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::GlobalConfig => "GlobalConfig",
            KeyKind::IpPool => "IPPool",
            KeyKind::Node => "Node",
            KeyKind::GlobalBgpPeer => "GlobalBGPPeer",
            KeyKind::NodeBgpPeer => "NodeBGPPeer",
            KeyKind::Profile => "Profile",
            KeyKind::WorkloadEndpoint => "WorkloadEndpoint",
            KeyKind::Policy => "Policy",
            KeyKind::HostConfig => "HostConfig",
            KeyKind::ReadyFlag => "ReadyFlag",
            KeyKind::ActiveStatusReport => "ActiveStatusReport",
            KeyKind::LastStatusReport => "LastStatusReport",
            KeyKind::HostEndpointStatus => "HostEndpointStatus",
            KeyKind::WorkloadEndpointStatus => "WorkloadEndpointStatus",
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Key
// =============================================================================

/// Identifies exactly one logical entity in the datastore
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Key {
    GlobalConfig {
        name: String,
    },
    IpPool {
        cidr: String,
    },
    Node {
        hostname: String,
    },
    GlobalBgpPeer {
        peer_ip: IpAddr,
    },
    NodeBgpPeer {
        nodename: String,
        peer_ip: IpAddr,
    },
    Profile {
        name: String,
    },
    WorkloadEndpoint {
        hostname: String,
        orchestrator_id: String,
        workload_id: String,
        endpoint_id: String,
    },
    Policy {
        name: String,
    },
    HostConfig {
        hostname: String,
        name: String,
    },
    ReadyFlag,
    ActiveStatusReport {
        hostname: String,
    },
    LastStatusReport {
        hostname: String,
    },
    HostEndpointStatus {
        hostname: String,
        endpoint_id: String,
    },
    WorkloadEndpointStatus {
        hostname: String,
        orchestrator_id: String,
        workload_id: String,
        endpoint_id: String,
    },
}

impl Key {
    pub fn kind(&self) -> KeyKind {
        match self {
            Key::GlobalConfig { .. } => KeyKind::GlobalConfig,
            Key::IpPool { .. } => KeyKind::IpPool,
            Key::Node { .. } => KeyKind::Node,
            Key::GlobalBgpPeer { .. } => KeyKind::GlobalBgpPeer,
            Key::NodeBgpPeer { .. } => KeyKind::NodeBgpPeer,
            Key::Profile { .. } => KeyKind::Profile,
            Key::WorkloadEndpoint { .. } => KeyKind::WorkloadEndpoint,
            Key::Policy { .. } => KeyKind::Policy,
            Key::HostConfig { .. } => KeyKind::HostConfig,
            Key::ReadyFlag => KeyKind::ReadyFlag,
            Key::ActiveStatusReport { .. } => KeyKind::ActiveStatusReport,
            Key::LastStatusReport { .. } => KeyKind::LastStatusReport,
            Key::HostEndpointStatus { .. } => KeyKind::HostEndpointStatus,
            Key::WorkloadEndpointStatus { .. } => KeyKind::WorkloadEndpointStatus,
        }
    }

    pub fn global_config(name: impl Into<String>) -> Self {
        Key::GlobalConfig { name: name.into() }
    }

    pub fn profile(name: impl Into<String>) -> Self {
        Key::Profile { name: name.into() }
    }

    pub fn policy(name: impl Into<String>) -> Self {
        Key::Policy { name: name.into() }
    }

    pub fn host_config(hostname: impl Into<String>, name: impl Into<String>) -> Self {
        Key::HostConfig {
            hostname: hostname.into(),
            name: name.into(),
        }
    }

    /// Workload endpoint key with only the workload identifier set.
    pub fn workload(workload_id: impl Into<String>) -> Self {
        Key::WorkloadEndpoint {
            hostname: String::new(),
            orchestrator_id: String::new(),
            workload_id: workload_id.into(),
            endpoint_id: String::new(),
        }
    }
}

/// Renders keys in the hierarchical path form used by the etcd datastore.
impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::GlobalConfig { name } => write!(f, "/calico/v1/config/{}", name),
            Key::IpPool { cidr } => write!(f, "/calico/v1/ipam/pool/{}", cidr.replace('/', "-")),
            Key::Node { hostname } => write!(f, "/calico/v1/host/{}/metadata", hostname),
            Key::GlobalBgpPeer { peer_ip } => write!(f, "/calico/bgp/v1/global/peer/{}", peer_ip),
            Key::NodeBgpPeer { nodename, peer_ip } => {
                write!(f, "/calico/bgp/v1/host/{}/peer/{}", nodename, peer_ip)
            }
            Key::Profile { name } => write!(f, "/calico/v1/policy/profile/{}", name),
            Key::WorkloadEndpoint {
                hostname,
                orchestrator_id,
                workload_id,
                endpoint_id,
            } => write!(
                f,
                "/calico/v1/host/{}/workload/{}/{}/endpoint/{}",
                hostname, orchestrator_id, workload_id, endpoint_id
            ),
            Key::Policy { name } => write!(f, "/calico/v1/policy/tier/default/policy/{}", name),
            Key::HostConfig { hostname, name } => {
                write!(f, "/calico/v1/host/{}/config/{}", hostname, name)
            }
            Key::ReadyFlag => write!(f, "/calico/v1/Ready"),
            Key::ActiveStatusReport { hostname } => {
                write!(f, "/calico/felix/v1/host/{}/status", hostname)
            }
            Key::LastStatusReport { hostname } => {
                write!(f, "/calico/felix/v1/host/{}/last_reported_status", hostname)
            }
            Key::HostEndpointStatus {
                hostname,
                endpoint_id,
            } => write!(f, "/calico/felix/v1/host/{}/endpoint/{}", hostname, endpoint_id),
            Key::WorkloadEndpointStatus {
                hostname,
                orchestrator_id,
                workload_id,
                endpoint_id,
            } => write!(
                f,
                "/calico/felix/v1/host/{}/workload/{}/{}/endpoint/{}",
                hostname, orchestrator_id, workload_id, endpoint_id
            ),
        }
    }
}

// =============================================================================
// List Query
// =============================================================================

/// Filtered enumeration of one key kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ListQuery {
    GlobalConfig {
        name: Option<String>,
    },
    IpPool {
        cidr: Option<String>,
    },
    Node {
        hostname: Option<String>,
    },
    GlobalBgpPeer {
        peer_ip: Option<IpAddr>,
    },
    NodeBgpPeer {
        nodename: Option<String>,
        peer_ip: Option<IpAddr>,
    },
    Profile {
        name: Option<String>,
    },
    WorkloadEndpoint {
        hostname: Option<String>,
        workload_id: Option<String>,
    },
    Policy {
        name: Option<String>,
    },
    HostConfig {
        hostname: Option<String>,
        name: Option<String>,
    },
    ReadyFlag,
    ActiveStatusReport {
        hostname: Option<String>,
    },
    LastStatusReport {
        hostname: Option<String>,
    },
    HostEndpointStatus {
        hostname: Option<String>,
    },
    WorkloadEndpointStatus {
        hostname: Option<String>,
    },
}

impl ListQuery {
    pub fn kind(&self) -> KeyKind {
        match self {
            ListQuery::GlobalConfig { .. } => KeyKind::GlobalConfig,
            ListQuery::IpPool { .. } => KeyKind::IpPool,
            ListQuery::Node { .. } => KeyKind::Node,
            ListQuery::GlobalBgpPeer { .. } => KeyKind::GlobalBgpPeer,
            ListQuery::NodeBgpPeer { .. } => KeyKind::NodeBgpPeer,
            ListQuery::Profile { .. } => KeyKind::Profile,
            ListQuery::WorkloadEndpoint { .. } => KeyKind::WorkloadEndpoint,
            ListQuery::Policy { .. } => KeyKind::Policy,
            ListQuery::HostConfig { .. } => KeyKind::HostConfig,
            ListQuery::ReadyFlag => KeyKind::ReadyFlag,
            ListQuery::ActiveStatusReport { .. } => KeyKind::ActiveStatusReport,
            ListQuery::LastStatusReport { .. } => KeyKind::LastStatusReport,
            ListQuery::HostEndpointStatus { .. } => KeyKind::HostEndpointStatus,
            ListQuery::WorkloadEndpointStatus { .. } => KeyKind::WorkloadEndpointStatus,
        }
    }

    /// Unfiltered query for the given kind.
    pub fn all(kind: KeyKind) -> Self {
        match kind {
            KeyKind::GlobalConfig => ListQuery::GlobalConfig { name: None },
            KeyKind::IpPool => ListQuery::IpPool { cidr: None },
            KeyKind::Node => ListQuery::Node { hostname: None },
            KeyKind::GlobalBgpPeer => ListQuery::GlobalBgpPeer { peer_ip: None },
            KeyKind::NodeBgpPeer => ListQuery::NodeBgpPeer {
                nodename: None,
                peer_ip: None,
            },
            KeyKind::Profile => ListQuery::Profile { name: None },
            KeyKind::WorkloadEndpoint => ListQuery::WorkloadEndpoint {
                hostname: None,
                workload_id: None,
            },
            KeyKind::Policy => ListQuery::Policy { name: None },
            KeyKind::HostConfig => ListQuery::HostConfig {
                hostname: None,
                name: None,
            },
            KeyKind::ReadyFlag => ListQuery::ReadyFlag,
            KeyKind::ActiveStatusReport => ListQuery::ActiveStatusReport { hostname: None },
            KeyKind::LastStatusReport => ListQuery::LastStatusReport { hostname: None },
            KeyKind::HostEndpointStatus => ListQuery::HostEndpointStatus { hostname: None },
            KeyKind::WorkloadEndpointStatus => {
                ListQuery::WorkloadEndpointStatus { hostname: None }
            }
        }
    }
}

impl ListQuery {
    /// Copy of this query with empty-string filters cleared.
    ///
    /// An empty name filter selects every entry, the same as an unset one.
    pub fn normalized(&self) -> ListQuery {
        fn clear(filter: &Option<String>) -> Option<String> {
            filter.clone().filter(|f| !f.is_empty())
        }

        match self {
            ListQuery::GlobalConfig { name } => ListQuery::GlobalConfig { name: clear(name) },
            ListQuery::IpPool { cidr } => ListQuery::IpPool { cidr: clear(cidr) },
            ListQuery::Node { hostname } => ListQuery::Node {
                hostname: clear(hostname),
            },
            ListQuery::GlobalBgpPeer { peer_ip } => ListQuery::GlobalBgpPeer { peer_ip: *peer_ip },
            ListQuery::NodeBgpPeer { nodename, peer_ip } => ListQuery::NodeBgpPeer {
                nodename: clear(nodename),
                peer_ip: *peer_ip,
            },
            ListQuery::Profile { name } => ListQuery::Profile { name: clear(name) },
            ListQuery::WorkloadEndpoint {
                hostname,
                workload_id,
            } => ListQuery::WorkloadEndpoint {
                hostname: clear(hostname),
                workload_id: clear(workload_id),
            },
            ListQuery::Policy { name } => ListQuery::Policy { name: clear(name) },
            ListQuery::HostConfig { hostname, name } => ListQuery::HostConfig {
                hostname: clear(hostname),
                name: clear(name),
            },
            ListQuery::ReadyFlag => ListQuery::ReadyFlag,
            ListQuery::ActiveStatusReport { hostname } => ListQuery::ActiveStatusReport {
                hostname: clear(hostname),
            },
            ListQuery::LastStatusReport { hostname } => ListQuery::LastStatusReport {
                hostname: clear(hostname),
            },
            ListQuery::HostEndpointStatus { hostname } => ListQuery::HostEndpointStatus {
                hostname: clear(hostname),
            },
            ListQuery::WorkloadEndpointStatus { hostname } => ListQuery::WorkloadEndpointStatus {
                hostname: clear(hostname),
            },
        }
    }

    /// Whether `key` satisfies every filter set on this query.
    pub fn matches(&self, key: &Key) -> bool {
        fn eq<T: PartialEq>(filter: &Option<T>, value: &T) -> bool {
            filter.as_ref().map_or(true, |f| f == value)
        }

        match (self, key) {
            (ListQuery::GlobalConfig { name: f }, Key::GlobalConfig { name })
            | (ListQuery::Profile { name: f }, Key::Profile { name })
            | (ListQuery::Policy { name: f }, Key::Policy { name }) => eq(f, name),
            (ListQuery::IpPool { cidr: f }, Key::IpPool { cidr }) => eq(f, cidr),
            (ListQuery::Node { hostname: f }, Key::Node { hostname })
            | (ListQuery::ActiveStatusReport { hostname: f }, Key::ActiveStatusReport { hostname })
            | (ListQuery::LastStatusReport { hostname: f }, Key::LastStatusReport { hostname })
            | (ListQuery::HostEndpointStatus { hostname: f }, Key::HostEndpointStatus { hostname, .. })
            | (
                ListQuery::WorkloadEndpointStatus { hostname: f },
                Key::WorkloadEndpointStatus { hostname, .. },
            ) => eq(f, hostname),
            (ListQuery::GlobalBgpPeer { peer_ip: f }, Key::GlobalBgpPeer { peer_ip }) => {
                eq(f, peer_ip)
            }
            (
                ListQuery::NodeBgpPeer {
                    nodename: fnode,
                    peer_ip: fip,
                },
                Key::NodeBgpPeer { nodename, peer_ip },
            ) => eq(fnode, nodename) && eq(fip, peer_ip),
            (
                ListQuery::WorkloadEndpoint {
                    hostname: fhost,
                    workload_id: fwid,
                },
                Key::WorkloadEndpoint {
                    hostname,
                    workload_id,
                    ..
                },
            ) => eq(fhost, hostname) && eq(fwid, workload_id),
            (
                ListQuery::HostConfig {
                    hostname: fhost,
                    name: fname,
                },
                Key::HostConfig { hostname, name },
            ) => eq(fhost, hostname) && eq(fname, name),
            (ListQuery::ReadyFlag, Key::ReadyFlag) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ListQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filters: Vec<String> = match self {
            ListQuery::GlobalConfig { name }
            | ListQuery::Profile { name }
            | ListQuery::Policy { name } => opt_filter("name", name),
            ListQuery::IpPool { cidr } => opt_filter("cidr", cidr),
            ListQuery::Node { hostname }
            | ListQuery::ActiveStatusReport { hostname }
            | ListQuery::LastStatusReport { hostname }
            | ListQuery::HostEndpointStatus { hostname }
            | ListQuery::WorkloadEndpointStatus { hostname } => opt_filter("hostname", hostname),
            ListQuery::GlobalBgpPeer { peer_ip } => opt_filter("peerIP", peer_ip),
            ListQuery::NodeBgpPeer { nodename, peer_ip } => {
                let mut v = opt_filter("nodename", nodename);
                v.extend(opt_filter("peerIP", peer_ip));
                v
            }
            ListQuery::WorkloadEndpoint {
                hostname,
                workload_id,
            } => {
                let mut v = opt_filter("hostname", hostname);
                v.extend(opt_filter("workloadID", workload_id));
                v
            }
            ListQuery::HostConfig { hostname, name } => {
                let mut v = opt_filter("hostname", hostname);
                v.extend(opt_filter("name", name));
                v
            }
            ListQuery::ReadyFlag => Vec::new(),
        };
        write!(f, "{}List({})", self.kind(), filters.join(","))
    }
}

fn opt_filter<T: fmt::Display>(field: &str, value: &Option<T>) -> Vec<String> {
    value
        .as_ref()
        .map(|v| vec![format!("{}={}", field, v)])
        .unwrap_or_default()
}
