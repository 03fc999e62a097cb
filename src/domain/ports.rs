//! Domain Ports - Core trait definitions for the datastore
//!
//! These traits define the boundaries between the dispatch logic and the
//! Kubernetes API server. Adapters implement them over `kube::Client`; tests
//! implement them in memory.

use crate::error::Result;
use crate::model::{KVPair, Key, ListQuery};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Node, Pod};
use k8s_openapi::api::networking::v1::NetworkPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// Resource Client Port
// =============================================================================

/// Persistence adapter for one independently stored kind.
///
/// All methods translate native API failures through
/// [`Error::from_kube`](crate::error::Error::from_kube).
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Make sure the backing store for this kind exists
    async fn ensure_initialized(&self) -> Result<()>;

    /// Create a new entry; fails if it already exists
    async fn create(&self, kvp: KVPair) -> Result<KVPair>;

    /// Replace an existing entry at the revision carried by `kvp`
    async fn update(&self, kvp: KVPair) -> Result<KVPair>;

    /// Create or replace an entry
    async fn apply(&self, kvp: KVPair) -> Result<KVPair>;

    /// Remove an entry, returning what was stored
    async fn delete(&self, kvp: KVPair) -> Result<KVPair>;

    /// Fetch a single entry
    async fn get(&self, key: &Key) -> Result<KVPair>;

    /// Enumerate entries matching `query`, plus the list revision if known
    async fn list(&self, query: &ListQuery) -> Result<(Vec<KVPair>, Option<String>)>;
}

// =============================================================================
// Native Object Port
// =============================================================================

/// Native Kubernetes objects the derived kinds are read from.
///
/// Errors are returned untranslated so callers can attach the datastore key
/// they were resolving.
#[async_trait]
pub trait KubeApi: Send + Sync {
    async fn list_namespaces(&self) -> std::result::Result<Vec<Namespace>, kube::Error>;

    async fn get_namespace(&self, name: &str) -> std::result::Result<Namespace, kube::Error>;

    /// Pods in every namespace
    async fn list_pods(&self) -> std::result::Result<Vec<Pod>, kube::Error>;

    async fn get_pod(&self, namespace: &str, name: &str) -> std::result::Result<Pod, kube::Error>;

    /// Record `ip` as the pod's address, returning the patched pod
    async fn patch_pod_ip(
        &self,
        namespace: &str,
        name: &str,
        ip: &str,
    ) -> std::result::Result<Pod, kube::Error>;

    /// NetworkPolicies in every namespace
    async fn list_network_policies(&self) -> std::result::Result<Vec<NetworkPolicy>, kube::Error>;

    async fn get_network_policy(
        &self,
        namespace: &str,
        name: &str,
    ) -> std::result::Result<NetworkPolicy, kube::Error>;

    async fn list_nodes(&self) -> std::result::Result<Vec<Node>, kube::Error>;

    async fn get_node(&self, name: &str) -> std::result::Result<Node, kube::Error>;

    /// Merge-patch node annotations; `None` values remove the annotation
    async fn patch_node_annotations(
        &self,
        name: &str,
        annotations: BTreeMap<String, Option<String>>,
    ) -> std::result::Result<Node, kube::Error>;
}

// =============================================================================
// Syncer Callbacks Port
// =============================================================================

/// Progress of a sync session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncStatus {
    WaitForDatastore,
    ResyncInProgress,
    InSync,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::WaitForDatastore => write!(f, "wait-for-ready"),
            SyncStatus::ResyncInProgress => write!(f, "resync"),
            SyncStatus::InSync => write!(f, "in-sync"),
        }
    }
}

/// Kind of change carried by an [`Update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateType {
    New,
    Updated,
    Deleted,
}

/// A single change delivered to a sync consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub kvp: KVPair,
    pub update_type: UpdateType,
}

/// Consumer of a sync session
pub trait SyncerCallbacks: Send + Sync {
    fn on_status_updated(&self, status: SyncStatus);

    fn on_updates(&self, updates: Vec<Update>);
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type ResourceClientRef = Arc<dyn ResourceClient>;
pub type KubeApiRef = Arc<dyn KubeApi>;
pub type SyncerCallbacksRef = Arc<dyn SyncerCallbacks>;
