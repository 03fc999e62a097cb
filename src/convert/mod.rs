//! Entity translators
//!
//! Stateless mappings from native Kubernetes objects to datastore entries,
//! together with the name codecs and visibility predicates they rely on.

pub mod host_config;
pub mod names;
pub mod node;
pub mod policy;
pub mod profile;
pub mod workload;

pub use host_config::{node_tunnel_config, tunnel_address, TUNNEL_ADDRESS_CONFIG};
pub use names::*;
pub use policy::network_policy_to_policy;
pub use profile::namespace_to_profile;
pub use workload::{is_ready_pod, pod_to_workload_endpoint};
