//! SystemNetworkPolicy CRD
//!
//! Cluster-scoped policy authored directly against the datastore rather than
//! derived from a namespaced NetworkPolicy.

use crate::model::Rule;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Name of the CustomResourceDefinition object
pub const SYSTEM_NETWORK_POLICY_CRD_NAME: &str = "systemnetworkpolicies.alpha.projectcalico.org";

#[derive(CustomResource, Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "alpha.projectcalico.org",
    version = "v1",
    kind = "SystemNetworkPolicy",
    plural = "systemnetworkpolicies",
    shortname = "snp",
    printcolumn = r#"{"name": "Order", "type": "number", "jsonPath": ".spec.order"}"#,
    printcolumn = r#"{"name": "Selector", "type": "string", "jsonPath": ".spec.selector"}"#,
    namespaced = false
)]
#[serde(rename_all = "camelCase")]
pub struct SystemNetworkPolicySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,

    #[serde(default)]
    pub selector: String,

    #[serde(default)]
    pub inbound_rules: Vec<Rule>,

    #[serde(default)]
    pub outbound_rules: Vec<Rule>,

    /// Bypass connection tracking
    #[serde(default)]
    pub untracked: bool,
}
