//! Key/value pairs exchanged across the datastore contract

use super::key::Key;
use super::values::{
    BgpPeer, EndpointStatus, IpPool, Node, Policy, Profile, StatusReport, WorkloadEndpoint,
};
use serde::{Deserialize, Serialize};

/// Kind-specific value shapes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum Value {
    String(String),
    Bool(bool),
    IpPool(IpPool),
    Node(Node),
    BgpPeer(BgpPeer),
    Profile(Profile),
    WorkloadEndpoint(WorkloadEndpoint),
    Policy(Policy),
    StatusReport(StatusReport),
    EndpointStatus(EndpointStatus),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_ip_pool(&self) -> Option<&IpPool> {
        match self {
            Value::IpPool(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_bgp_peer(&self) -> Option<&BgpPeer> {
        match self {
            Value::BgpPeer(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_profile(&self) -> Option<&Profile> {
        match self {
            Value::Profile(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_workload_endpoint(&self) -> Option<&WorkloadEndpoint> {
        match self {
            Value::WorkloadEndpoint(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_policy(&self) -> Option<&Policy> {
        match self {
            Value::Policy(p) => Some(p),
            _ => None,
        }
    }

    /// Name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Bool(_) => "bool",
            Value::IpPool(_) => "IPPool",
            Value::Node(_) => "Node",
            Value::BgpPeer(_) => "BGPPeer",
            Value::Profile(_) => "Profile",
            Value::WorkloadEndpoint(_) => "WorkloadEndpoint",
            Value::Policy(_) => "Policy",
            Value::StatusReport(_) => "StatusReport",
            Value::EndpointStatus(_) => "EndpointStatus",
        }
    }
}

/// A key, its value and the opaque revision it was read at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KVPair {
    pub key: Key,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

impl KVPair {
    pub fn new(key: Key, value: Value) -> Self {
        Self {
            key,
            value,
            revision: None,
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }
}
