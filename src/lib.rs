//! Kubernetes Datastore (KDD)
//!
//! A key/value datastore facade for network policy data that keeps its state
//! in the Kubernetes API server instead of a dedicated key/value store.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      KubeDatastore (dispatch)                       │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌───────────────────────────┐   ┌───────────────────────────────┐  │
//! │  │     Resource Clients      │   │       Derived Handlers        │  │
//! │  │  GlobalConfig, IPPool,    │   │  Profile, WorkloadEndpoint,   │  │
//! │  │  GlobalBGPPeer, Node,     │   │  Policy, HostConfig,          │  │
//! │  │  NodeBGPPeer, SysPolicy   │   │  ReadyFlag                    │  │
//! │  └─────────────┬─────────────┘   └───────────────┬───────────────┘  │
//! │                │                                 │                  │
//! │  ┌─────────────┴─────────────┐   ┌───────────────┴───────────────┐  │
//! │  │   Custom Resources (CRD)  │   │  Namespaces, Pods, Nodes,     │  │
//! │  │                           │   │  NetworkPolicies (KubeApi)    │  │
//! │  └───────────────────────────┘   └───────────────────────────────┘  │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                     Kubernetes API server (kube)                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`backend`]: Datastore facade, resource clients and bootstrap
//! - [`convert`]: Translation from native objects to datastore entries
//! - [`crd`]: Custom Resource Definitions
//! - [`domain`]: Ports implemented by adapters
//! - [`model`]: Keys, list queries and values
//! - [`error`]: Error types and translation

pub mod backend;
pub mod config;
pub mod convert;
pub mod crd;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod model;
pub mod retry;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use backend::{KubeDatastore, ResourceClients, Syncer};

pub use config::ClientConfig;

pub use domain::{
    KubeApi, ResourceClient, SyncStatus, SyncerCallbacks, Update, UpdateType,
};

pub use error::{Error, Identifier, Result};

pub use model::{KVPair, Key, KeyKind, ListQuery, Value};

pub use retry::PollPolicy;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
