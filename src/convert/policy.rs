//! NetworkPolicy → Policy translation
//!
//! Kubernetes label selectors are rewritten into the datastore selector
//! expression language, and each ingress rule expands into one allow rule per
//! (peer, port) combination.

use super::names::{network_policy_name, NAMESPACE_LABEL, NAMESPACE_LABEL_PREFIX};
use crate::error::{Error, Result};
use crate::model::{KVPair, Key, Policy, Rule, Value};
use k8s_openapi::api::networking::v1::{NetworkPolicy, NetworkPolicyPeer, NetworkPolicyPort};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

/// Order assigned to every NetworkPolicy-derived policy
pub const NETWORK_POLICY_ORDER: f64 = 1000.0;

/// Translate a NetworkPolicy into a datastore policy.
pub fn network_policy_to_policy(np: &NetworkPolicy) -> Result<KVPair> {
    let name = np
        .metadata
        .name
        .as_deref()
        .ok_or_else(|| Error::decode("NetworkPolicy has no name"))?;
    let namespace = np
        .metadata
        .namespace
        .as_deref()
        .ok_or_else(|| Error::decode(format!("NetworkPolicy {} has no namespace", name)))?;

    let spec = np.spec.clone().unwrap_or_default();
    let selector = namespaced_selector(namespace, Some(&spec.pod_selector));

    let mut inbound_rules = Vec::new();
    for ingress in spec.ingress.iter().flatten() {
        let peers: Vec<Option<&NetworkPolicyPeer>> = match ingress.from.as_deref() {
            Some(from) if !from.is_empty() => from.iter().map(Some).collect(),
            _ => vec![None],
        };
        let ports: Vec<Option<&NetworkPolicyPort>> = match ingress.ports.as_deref() {
            Some(ports) if !ports.is_empty() => ports.iter().map(Some).collect(),
            _ => vec![None],
        };
        for peer in &peers {
            for port in &ports {
                inbound_rules.push(build_rule(namespace, *peer, *port));
            }
        }
    }

    let policy = Policy {
        order: Some(NETWORK_POLICY_ORDER),
        selector,
        inbound_rules,
        outbound_rules: vec![Rule::allow_all()],
        untracked: false,
    };

    let mut kvp = KVPair::new(
        Key::policy(network_policy_name(namespace, name)),
        Value::Policy(policy),
    );
    kvp.revision = np.metadata.resource_version.clone();
    Ok(kvp)
}

fn build_rule(namespace: &str, peer: Option<&NetworkPolicyPeer>, port: Option<&NetworkPolicyPort>) -> Rule {
    let mut rule = Rule::allow_all();

    if let Some(peer) = peer {
        if let Some(block) = &peer.ip_block {
            // TODO: translate ipBlock.except once rules support negated nets
            rule.src_net = Some(block.cidr.clone());
        } else {
            rule.src_selector = Some(peer_selector(namespace, peer));
        }
    }

    if let Some(port) = port {
        let protocol = port.protocol.as_deref().unwrap_or("TCP");
        rule.protocol = Some(protocol.to_lowercase());
        if let Some(p) = &port.port {
            let value = match p {
                IntOrString::Int(n) => n.to_string(),
                IntOrString::String(s) => s.clone(),
            };
            rule.dst_ports = vec![match port.end_port {
                Some(end) => format!("{}:{}", value, end),
                None => value,
            }];
        }
    }

    rule
}

fn peer_selector(namespace: &str, peer: &NetworkPolicyPeer) -> String {
    match (&peer.namespace_selector, &peer.pod_selector) {
        (Some(ns_sel), pod_sel) => {
            let mut clauses = selector_clauses(ns_sel, NAMESPACE_LABEL_PREFIX);
            if clauses.is_empty() {
                clauses.push(format!("has({})", NAMESPACE_LABEL));
            }
            if let Some(pod_sel) = pod_sel {
                clauses.extend(selector_clauses(pod_sel, ""));
            }
            clauses.join(" && ")
        }
        (None, pod_sel) => namespaced_selector(namespace, pod_sel.as_ref()),
    }
}

/// Selector matching pods in `namespace` that also satisfy `selector`.
fn namespaced_selector(namespace: &str, selector: Option<&LabelSelector>) -> String {
    let mut clauses = vec![format!("{} == '{}'", NAMESPACE_LABEL, namespace)];
    if let Some(sel) = selector {
        clauses.extend(selector_clauses(sel, ""));
    }
    clauses.join(" && ")
}

/// Translate a Kubernetes label selector into a selector expression.
///
/// An empty selector yields an empty expression, which selects everything.
pub fn label_selector_to_selector(sel: &LabelSelector) -> String {
    selector_clauses(sel, "").join(" && ")
}

fn selector_clauses(sel: &LabelSelector, key_prefix: &str) -> Vec<String> {
    let mut clauses = Vec::new();

    for (k, v) in sel.match_labels.iter().flatten() {
        clauses.push(format!("{}{} == '{}'", key_prefix, k, v));
    }

    for req in sel.match_expressions.iter().flatten() {
        let key = format!("{}{}", key_prefix, req.key);
        let values = req
            .values
            .iter()
            .flatten()
            .map(|v| format!("'{}'", v))
            .collect::<Vec<_>>()
            .join(", ");
        match req.operator.as_str() {
            "In" => clauses.push(format!("{} in {{ {} }}", key, values)),
            "NotIn" => clauses.push(format!("{} not in {{ {} }}", key, values)),
            "Exists" => clauses.push(format!("has({})", key)),
            "DoesNotExist" => clauses.push(format!("! has({})", key)),
            other => tracing::warn!(operator = other, key = %req.key, "Ignoring unknown selector operator"),
        }
    }

    clauses
}
