//! IPPool CRD

use crate::model::IpPool;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Name of the CustomResourceDefinition object
pub const IP_POOL_CRD_NAME: &str = "ippools.projectcalico.org";

/// Address pool from which workload addresses are assigned
#[derive(CustomResource, Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "projectcalico.org",
    version = "v1",
    kind = "IPPool",
    plural = "ippools",
    printcolumn = r#"{"name": "CIDR", "type": "string", "jsonPath": ".spec.value.cidr"}"#,
    printcolumn = r#"{"name": "Disabled", "type": "boolean", "jsonPath": ".spec.value.disabled"}"#,
    namespaced = false
)]
#[serde(rename_all = "camelCase")]
pub struct IPPoolSpec {
    pub value: IpPool,
}
