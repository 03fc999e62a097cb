//! Datastore bootstrap
//!
//! Registers the custom resource kinds and stamps the `ClusterType` global
//! config with the `KDD` marker. Both steps are idempotent and run under a
//! bounded [`PollPolicy`].

use crate::domain::{ResourceClient, ResourceClientRef};
use crate::error::{Error, Result};
use crate::model::{KVPair, Key, Value};
use crate::retry::PollPolicy;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Global config entry listing the datastore types in use
pub const CLUSTER_TYPE_CONFIG: &str = "ClusterType";

/// Marker identifying this datastore in `ClusterType`
pub const CLUSTER_TYPE_MARKER: &str = "KDD";

/// Register every kind, then converge the cluster type.
pub async fn initialize(
    registrations: &[ResourceClientRef],
    global_config: &dyn ResourceClient,
    poll: &PollPolicy,
) -> Result<()> {
    ensure_registrations(registrations, poll)
        .await
        .map_err(|e| e.context("failed to ensure custom resource definitions exist"))?;
    ensure_cluster_type(global_config, poll)
        .await
        .map_err(|e| e.context("failed to ensure ClusterType contains KDD"))?;
    Ok(())
}

// =============================================================================
// Registrations
// =============================================================================

/// Register all kinds, retrying until one attempt has no failures.
pub async fn ensure_registrations(clients: &[ResourceClientRef], poll: &PollPolicy) -> Result<()> {
    poll.poll_immediate("custom resource registration", move || async move {
        register_all(clients).await.map(|()| true)
    })
    .await?;
    info!(count = clients.len(), "Custom resource kinds registered");
    Ok(())
}

/// One registration attempt: every client concurrently, all awaited.
async fn register_all(clients: &[ResourceClientRef]) -> Result<()> {
    let mut tasks = JoinSet::new();
    for client in clients {
        let client = client.clone();
        tasks.spawn(async move { client.ensure_initialized().await });
    }

    let mut results = Vec::with_capacity(clients.len());
    while let Some(joined) = tasks.join_next().await {
        let result = joined
            .map_err(|e| Error::Internal(format!("registration task failed: {}", e)))
            .and_then(|r| r);
        if let Err(e) = &result {
            error!(error = %e, "Failed to register custom resource kind");
        }
        results.push(result);
    }
    reduce_last_error(results)
}

/// Collapse results in completion order; the last failure wins.
pub fn reduce_last_error(results: impl IntoIterator<Item = Result<()>>) -> Result<()> {
    results
        .into_iter()
        .fold(Ok(()), |acc, r| match r {
            Err(e) => Err(e),
            Ok(()) => acc,
        })
}

// =============================================================================
// Cluster Type
// =============================================================================

/// `ClusterType` value that includes the marker, keeping existing tokens.
pub fn cluster_type_value(existing: Option<&str>) -> String {
    match existing {
        None | Some("") => CLUSTER_TYPE_MARKER.to_string(),
        Some(v) if v.split(',').any(|t| t.trim() == CLUSTER_TYPE_MARKER) => v.to_string(),
        Some(v) => format!("{},{}", v, CLUSTER_TYPE_MARKER),
    }
}

/// Make sure the `ClusterType` global config carries the marker.
///
/// Read then write with no revision check; concurrent writers may race.
pub async fn ensure_cluster_type(global_config: &dyn ResourceClient, poll: &PollPolicy) -> Result<()> {
    let key = &Key::global_config(CLUSTER_TYPE_CONFIG);

    poll.poll_immediate("ClusterType convergence", move || async move {
        let existing = match global_config.get(key).await {
            Ok(kvp) => kvp.value.as_str().map(str::to_string),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        let value = cluster_type_value(existing.as_deref());
        match global_config
            .apply(KVPair::new(key.clone(), Value::String(value.clone())))
            .await
        {
            Ok(_) => {
                info!(cluster_type = %value, "ClusterType set");
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "Failed to set ClusterType");
                Ok(false)
            }
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryResourceClient;
    use assert_matches::assert_matches;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_cluster_type_value() {
        assert_eq!(cluster_type_value(None), "KDD");
        assert_eq!(cluster_type_value(Some("")), "KDD");
        assert_eq!(cluster_type_value(Some("foo")), "foo,KDD");
        assert_eq!(cluster_type_value(Some("foo,KDD")), "foo,KDD");
        assert_eq!(cluster_type_value(Some("KDD")), "KDD");
        // Tokens are compared whole
        assert_eq!(cluster_type_value(Some("KDDX")), "KDDX,KDD");
    }

    #[test]
    fn test_reduce_last_error_wins() {
        assert!(reduce_last_error(vec![Ok(()), Ok(())]).is_ok());
        let err = reduce_last_error(vec![
            Err(Error::Internal("first".into())),
            Ok(()),
            Err(Error::Internal("second".into())),
            Ok(()),
        ])
        .unwrap_err();
        assert_matches!(err, Error::Internal(m) if m == "second");
    }

    fn clients(n: usize) -> Vec<Arc<MemoryResourceClient>> {
        (0..n).map(|_| Arc::new(MemoryResourceClient::new())).collect()
    }

    fn refs(clients: &[Arc<MemoryResourceClient>]) -> Vec<ResourceClientRef> {
        clients.iter().map(|c| c.clone() as ResourceClientRef).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_registration_retried_after_one_failure() {
        let mut cs = clients(3);
        cs.push(Arc::new(MemoryResourceClient::new().fail_when(
            "ensure_initialized",
            |attempt| (attempt == 1).then(|| Error::Internal("apiserver warming up".into())),
        )));

        ensure_registrations(&refs(&cs), &PollPolicy::default())
            .await
            .unwrap();
        for c in &cs {
            assert_eq!(c.calls("ensure_initialized"), 2);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_registration_gives_up_with_last_error() {
        let mut cs = clients(3);
        cs.push(Arc::new(MemoryResourceClient::new().fail_when(
            "ensure_initialized",
            |attempt| Some(Error::Internal(format!("attempt {}", attempt))),
        )));
        let poll = PollPolicy::new(Duration::from_secs(1), Duration::from_secs(5));

        let err = ensure_registrations(&refs(&cs), &poll).await.unwrap_err();
        assert_matches!(err, Error::Internal(m) if m == "attempt 6");
        assert_eq!(cs[0].calls("ensure_initialized"), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_wraps_registration_failure() {
        let failing: Vec<ResourceClientRef> = vec![Arc::new(
            MemoryResourceClient::new()
                .fail_when("ensure_initialized", |_| Some(Error::Internal("denied".into()))),
        )];
        let global_config = MemoryResourceClient::new();
        let poll = PollPolicy::new(Duration::from_secs(1), Duration::from_secs(2));

        let err = initialize(&failing, &global_config, &poll).await.unwrap_err();
        assert!(err
            .to_string()
            .starts_with("failed to ensure custom resource definitions exist"));
        assert_eq!(global_config.calls("get"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cluster_type_created_when_absent() {
        let gc = MemoryResourceClient::new();
        ensure_cluster_type(&gc, &PollPolicy::default()).await.unwrap();
        let stored = gc.entry(&Key::global_config(CLUSTER_TYPE_CONFIG)).unwrap();
        assert_eq!(stored.value, Value::String("KDD".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cluster_type_appends_marker() {
        let gc = MemoryResourceClient::new().with_entry(KVPair::new(
            Key::global_config(CLUSTER_TYPE_CONFIG),
            Value::String("foo".into()),
        ));
        ensure_cluster_type(&gc, &PollPolicy::default()).await.unwrap();
        let stored = gc.entry(&Key::global_config(CLUSTER_TYPE_CONFIG)).unwrap();
        assert_eq!(stored.value, Value::String("foo,KDD".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cluster_type_apply_failure_retried() {
        let gc = MemoryResourceClient::new().fail_when("apply", |attempt| {
            (attempt < 3).then(|| Error::ResourceUpdateConflict {
                identifier: Key::global_config(CLUSTER_TYPE_CONFIG).into(),
            })
        });
        ensure_cluster_type(&gc, &PollPolicy::default()).await.unwrap();
        assert_eq!(gc.calls("apply"), 3);
        assert_eq!(gc.calls("get"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cluster_type_apply_never_succeeds_times_out() {
        let gc = MemoryResourceClient::new()
            .fail_when("apply", |_| Some(Error::Internal("read-only".into())));
        let poll = PollPolicy::new(Duration::from_secs(1), Duration::from_secs(3));
        assert_matches!(
            ensure_cluster_type(&gc, &poll).await,
            Err(Error::Timeout { .. })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cluster_type_read_error_returned() {
        let gc = MemoryResourceClient::new()
            .fail_when("get", |_| Some(Error::Internal("unreachable".into())));
        let poll = PollPolicy::new(Duration::from_secs(1), Duration::from_secs(3));
        assert_matches!(
            ensure_cluster_type(&gc, &poll).await,
            Err(Error::Internal(m)) if m == "unreachable"
        );
        assert_eq!(gc.calls("apply"), 0);
    }
}
