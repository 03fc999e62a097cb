//! Namespace → Profile translation

use super::names::{profile_name, NAMESPACE_LABEL_PREFIX};
use crate::error::{Error, Result};
use crate::model::{KVPair, Key, Profile, Rule, Value};
use k8s_openapi::api::core::v1::Namespace;
use serde::Deserialize;

/// Namespace annotation selecting default-deny ingress
pub const NAMESPACE_ISOLATION_ANNOTATION: &str = "net.beta.kubernetes.io/network-policy";

#[derive(Debug, Default, Deserialize)]
struct NamespacePolicy {
    #[serde(default)]
    ingress: NamespaceIngress,
}

#[derive(Debug, Default, Deserialize)]
struct NamespaceIngress {
    #[serde(default)]
    isolation: String,
}

/// Build the profile for a namespace.
///
/// Ingress is allowed unless the namespace opts into `DefaultDeny` isolation;
/// egress is always allowed. A malformed isolation annotation is an error.
pub fn namespace_to_profile(ns: &Namespace) -> Result<KVPair> {
    let name = ns
        .metadata
        .name
        .as_deref()
        .ok_or_else(|| Error::decode("namespace has no name"))?;

    let mut inbound = Rule::allow_all();
    if let Some(raw) = ns
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(NAMESPACE_ISOLATION_ANNOTATION))
    {
        let policy: NamespacePolicy = serde_json::from_str(raw).map_err(|e| {
            Error::decode(format!(
                "failed to parse {} annotation on namespace {}: {}",
                NAMESPACE_ISOLATION_ANNOTATION, name, e
            ))
        })?;
        if policy.ingress.isolation == "DefaultDeny" {
            inbound = Rule::deny_all();
        }
    }

    let labels = ns
        .metadata
        .labels
        .iter()
        .flatten()
        .map(|(k, v)| (format!("{}{}", NAMESPACE_LABEL_PREFIX, k), v.clone()))
        .collect();

    let profile = Profile {
        inbound_rules: vec![inbound],
        outbound_rules: vec![Rule::allow_all()],
        labels,
    };

    let mut kvp = KVPair::new(Key::profile(profile_name(name)), Value::Profile(profile));
    kvp.revision = ns.metadata.resource_version.clone();
    Ok(kvp)
}
