//! GlobalConfig CRD
//!
//! Cluster-wide configuration entries. Kubernetes object names must be
//! lowercase, so the original mixed-case key name is kept in the spec.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Name of the CustomResourceDefinition object
pub const GLOBAL_CONFIG_CRD_NAME: &str = "globalconfigs.projectcalico.org";

/// A single global configuration value
#[derive(CustomResource, Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "projectcalico.org",
    version = "v1",
    kind = "GlobalConfig",
    plural = "globalconfigs",
    printcolumn = r#"{"name": "Key", "type": "string", "jsonPath": ".spec.name"}"#,
    printcolumn = r#"{"name": "Value", "type": "string", "jsonPath": ".spec.value"}"#,
    namespaced = false
)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfigSpec {
    /// Configuration key as presented by the datastore
    pub name: String,

    /// Raw configuration value
    #[serde(default)]
    pub value: String,
}
