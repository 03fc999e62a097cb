//! Custom Resource Definitions registered by the datastore
//!
//! This module contains all CRD types:
//! - GlobalConfig: cluster-wide configuration entries
//! - IPPool: workload address pools
//! - GlobalBGPPeer: BGP peers shared by every node
//! - SystemNetworkPolicy: cluster-scoped policies

pub mod bgp_peer;
pub mod global_config;
pub mod ip_pool;
pub mod system_policy;

pub use bgp_peer::*;
pub use global_config::*;
pub use ip_pool::*;
pub use system_policy::*;
