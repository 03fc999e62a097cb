//! Kubernetes datastore facade
//!
//! [`KubeDatastore`] routes each datastore call by key kind:
//!
//! | Kind | Create/Update/Delete | Apply | Get/List |
//! |---|---|---|---|
//! | GlobalConfig, IPPool, Node, GlobalBGPPeer, NodeBGPPeer | resource client | resource client | resource client |
//! | WorkloadEndpoint | unsupported | pod IP write-back | derived |
//! | Profile, Policy, HostConfig, ReadyFlag | unsupported | unsupported | derived |
//! | status reports | unsupported | dropped | Get unsupported, List empty |

use super::bootstrap;
use super::derived;
use super::kube_api::ClientKubeApi;
use super::resources::{
    CustomResourceClient, GlobalBgpPeerConverter, GlobalConfigConverter, IpPoolConverter,
    NodeBgpPeerClient, NodeClient, SystemPolicyConverter,
};
use super::syncer::Syncer;
use crate::config::ClientConfig;
use crate::domain::{KubeApiRef, ResourceClientRef, SyncerCallbacksRef};
use crate::error::{Error, Identifier, Result};
use crate::metrics;
use crate::model::{KVPair, Key, KeyKind, ListQuery};
use crate::retry::PollPolicy;
use kube::Client;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One client per independently stored kind, plus the system policy store
#[derive(Clone)]
pub struct ResourceClients {
    pub global_config: ResourceClientRef,
    pub ip_pool: ResourceClientRef,
    pub node: ResourceClientRef,
    pub global_bgp_peer: ResourceClientRef,
    pub node_bgp_peer: ResourceClientRef,
    pub system_policy: ResourceClientRef,
}

/// Datastore over the Kubernetes API server
#[derive(Clone)]
pub struct KubeDatastore {
    api: KubeApiRef,
    clients: ResourceClients,
    poll: PollPolicy,
    disable_node_poll: bool,
}

impl KubeDatastore {
    /// Connect to the API server described by `config`.
    pub async fn new(config: &ClientConfig) -> Result<Self> {
        let kube_config = config.to_kube_config().await?;
        let client = Client::try_from(kube_config).map_err(|e| Error::Kube {
            identifier: Identifier::None,
            source: e,
        })?;
        info!("Kubernetes datastore client created");

        let api: KubeApiRef = Arc::new(ClientKubeApi::new(client.clone()));
        let clients = ResourceClients {
            global_config: Arc::new(CustomResourceClient::new(
                client.clone(),
                GlobalConfigConverter,
            )),
            ip_pool: Arc::new(CustomResourceClient::new(client.clone(), IpPoolConverter)),
            node: Arc::new(NodeClient::new(api.clone())),
            global_bgp_peer: Arc::new(CustomResourceClient::new(
                client.clone(),
                GlobalBgpPeerConverter,
            )),
            node_bgp_peer: Arc::new(NodeBgpPeerClient::new(api.clone())),
            system_policy: Arc::new(CustomResourceClient::new(client, SystemPolicyConverter)),
        };

        Ok(Self::from_parts(api, clients).with_node_poll_disabled(config.disable_node_poll))
    }

    /// Assemble a datastore from existing ports.
    pub fn from_parts(api: KubeApiRef, clients: ResourceClients) -> Self {
        Self {
            api,
            clients,
            poll: PollPolicy::default(),
            disable_node_poll: false,
        }
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_node_poll_disabled(mut self, disabled: bool) -> Self {
        self.disable_node_poll = disabled;
        self
    }

    pub fn poll_policy(&self) -> &PollPolicy {
        &self.poll
    }

    pub fn node_poll_disabled(&self) -> bool {
        self.disable_node_poll
    }

    fn stored_client(&self, kind: KeyKind) -> Option<&ResourceClientRef> {
        match kind {
            KeyKind::GlobalConfig => Some(&self.clients.global_config),
            KeyKind::IpPool => Some(&self.clients.ip_pool),
            KeyKind::Node => Some(&self.clients.node),
            KeyKind::GlobalBgpPeer => Some(&self.clients.global_bgp_peer),
            KeyKind::NodeBgpPeer => Some(&self.clients.node_bgp_peer),
            _ => None,
        }
    }

    fn unsupported(key: Key, operation: &'static str) -> Error {
        warn!(key = %key, operation, "Operation not supported by the Kubernetes datastore");
        Error::not_supported(key, operation)
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Kinds that need registering before use
    fn registrations(&self) -> Vec<ResourceClientRef> {
        vec![
            self.clients.ip_pool.clone(),
            self.clients.system_policy.clone(),
            self.clients.global_bgp_peer.clone(),
            self.clients.global_config.clone(),
        ]
    }

    /// Register the custom resource kinds and mark the cluster type.
    pub async fn ensure_initialized(&self) -> Result<()> {
        bootstrap::initialize(
            &self.registrations(),
            self.clients.global_config.as_ref(),
            &self.poll,
        )
        .await
    }

    /// Nodes are created by the platform; nothing to do.
    pub async fn ensure_node_initialized(&self, nodename: &str) -> Result<()> {
        debug!(node = nodename, "Node initialization is handled by the platform");
        Ok(())
    }

    /// Build a sync session delivering to `callbacks`.
    pub fn syncer(&self, callbacks: SyncerCallbacksRef) -> Syncer {
        Syncer::new(self.clone(), callbacks)
    }

    // =========================================================================
    // Datastore Operations
    // =========================================================================

    pub async fn create(&self, kvp: KVPair) -> Result<KVPair> {
        let kind = kvp.key.kind();
        let result = match self.stored_client(kind) {
            Some(client) => client.create(kvp).await,
            None => Err(Self::unsupported(kvp.key, "Create")),
        };
        metrics::observe("create", kind, result)
    }

    pub async fn update(&self, kvp: KVPair) -> Result<KVPair> {
        let kind = kvp.key.kind();
        let result = match self.stored_client(kind) {
            Some(client) => client.update(kvp).await,
            None => Err(Self::unsupported(kvp.key, "Update")),
        };
        metrics::observe("update", kind, result)
    }

    /// Create or replace an entry.
    ///
    /// Status reports are accepted and dropped.
    pub async fn apply(&self, kvp: KVPair) -> Result<KVPair> {
        let kind = kvp.key.kind();
        let result = match (self.stored_client(kind), kind) {
            (Some(client), _) => client.apply(kvp).await,
            (None, KeyKind::WorkloadEndpoint) => {
                derived::apply_workload_endpoint(self.api.as_ref(), kvp).await
            }
            (None, kind) if kind.is_status_report() => {
                debug!(key = %kvp.key, "Dropping status report");
                Ok(kvp)
            }
            (None, _) => Err(Self::unsupported(kvp.key, "Apply")),
        };
        metrics::observe("apply", kind, result)
    }

    /// Remove an entry, returning what was stored.
    pub async fn delete(&self, kvp: KVPair) -> Result<KVPair> {
        let kind = kvp.key.kind();
        let result = match self.stored_client(kind) {
            Some(client) => client.delete(kvp).await,
            None => Err(Self::unsupported(kvp.key, "Delete")),
        };
        metrics::observe("delete", kind, result)
    }

    pub async fn get(&self, key: &Key) -> Result<KVPair> {
        let kind = key.kind();
        let api = self.api.as_ref();
        let result = match kind {
            KeyKind::Profile => derived::get_profile(api, key).await,
            KeyKind::WorkloadEndpoint => derived::get_workload_endpoint(api, key).await,
            KeyKind::Policy => {
                derived::get_policy(api, self.clients.system_policy.as_ref(), key).await
            }
            KeyKind::HostConfig => derived::get_host_config(api, key).await,
            KeyKind::ReadyFlag => Ok(derived::ready_flag()),
            _ => match self.stored_client(kind) {
                Some(client) => client.get(key).await,
                None => Err(Self::unsupported(key.clone(), "Get")),
            },
        };
        metrics::observe("get", kind, result)
    }

    /// Enumerate entries matching `query`.
    ///
    /// Status report kinds list as empty even though Get rejects them.
    pub async fn list(&self, query: &ListQuery) -> Result<Vec<KVPair>> {
        let query = &query.normalized();
        let kind = query.kind();
        let api = self.api.as_ref();
        let result = match kind {
            KeyKind::Profile => derived::list_profiles(api, query).await,
            KeyKind::WorkloadEndpoint => derived::list_workload_endpoints(api, query).await,
            KeyKind::Policy => {
                derived::list_policies(api, self.clients.system_policy.as_ref(), query).await
            }
            KeyKind::HostConfig => derived::list_host_configs(api, query).await,
            KeyKind::ReadyFlag => Ok(vec![derived::ready_flag()]),
            kind if kind.is_status_report() => Ok(Vec::new()),
            _ => match self.stored_client(kind) {
                Some(client) => client.list(query).await.map(|(kvps, _)| kvps),
                None => Ok(Vec::new()),
            },
        };
        metrics::observe("list", kind, result)
    }
}
