//! Snapshot syncer
//!
//! Lists every synced kind concurrently and hands the result to the
//! callbacks as one batch of new entries. A failed snapshot is retried
//! once per poll interval until it succeeds or the task is aborted.

use super::datastore::KubeDatastore;
use crate::domain::{SyncStatus, SyncerCallbacksRef, Update, UpdateType};
use crate::error::Result;
use crate::model::{KVPair, KeyKind, ListQuery};
use futures::future::try_join_all;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Kinds delivered by every snapshot
const SYNCED_KINDS: &[KeyKind] = &[
    KeyKind::Profile,
    KeyKind::Policy,
    KeyKind::WorkloadEndpoint,
    KeyKind::GlobalConfig,
    KeyKind::IpPool,
];

/// Kinds read from Node objects, skipped when node polling is disabled
const NODE_KINDS: &[KeyKind] = &[KeyKind::HostConfig, KeyKind::Node];

/// One sync session against a datastore
pub struct Syncer {
    datastore: KubeDatastore,
    callbacks: SyncerCallbacksRef,
}

impl Syncer {
    pub fn new(datastore: KubeDatastore, callbacks: SyncerCallbacksRef) -> Self {
        Self {
            datastore,
            callbacks,
        }
    }

    /// Kinds this session will list.
    pub fn kinds(&self) -> Vec<KeyKind> {
        let mut kinds = SYNCED_KINDS.to_vec();
        if !self.datastore.node_poll_disabled() {
            kinds.extend_from_slice(NODE_KINDS);
        }
        kinds
    }

    /// Run the session in the background.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) {
        self.callbacks.on_status_updated(SyncStatus::WaitForDatastore);

        let interval = self.datastore.poll_policy().interval;
        let mut reported_resync = false;
        loop {
            match self.snapshot().await {
                Ok(kvps) => {
                    if !reported_resync {
                        self.callbacks.on_status_updated(SyncStatus::ResyncInProgress);
                    }
                    info!(count = kvps.len(), "Initial snapshot complete");
                    let updates = kvps
                        .into_iter()
                        .map(|kvp| Update {
                            kvp,
                            update_type: UpdateType::New,
                        })
                        .collect();
                    self.callbacks.on_updates(updates);
                    self.callbacks.on_status_updated(SyncStatus::InSync);
                    return;
                }
                Err(e) => {
                    if !reported_resync {
                        self.callbacks.on_status_updated(SyncStatus::ResyncInProgress);
                        reported_resync = true;
                    }
                    warn!(error = %e, "Snapshot failed, retrying...");
                    tokio::time::sleep(interval).await;
                }
            }
        }
    }

    async fn snapshot(&self) -> Result<Vec<KVPair>> {
        let kinds = self.kinds();
        let lists = try_join_all(kinds.iter().map(|kind| {
            let query = ListQuery::all(*kind);
            let datastore = &self.datastore;
            async move { datastore.list(&query).await }
        }))
        .await?;
        Ok(lists.into_iter().flatten().collect())
    }
}
