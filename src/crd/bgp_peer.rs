//! GlobalBGPPeer CRD

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Name of the CustomResourceDefinition object
pub const GLOBAL_BGP_PEER_CRD_NAME: &str = "globalbgppeers.projectcalico.org";

/// BGP peer shared by every node in the cluster
#[derive(CustomResource, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "projectcalico.org",
    version = "v1",
    kind = "GlobalBGPPeer",
    plural = "globalbgppeers",
    printcolumn = r#"{"name": "Peer", "type": "string", "jsonPath": ".spec.peerIP"}"#,
    printcolumn = r#"{"name": "AS", "type": "integer", "jsonPath": ".spec.asNumber"}"#,
    namespaced = false
)]
pub struct GlobalBGPPeerSpec {
    #[serde(rename = "peerIP")]
    pub peer_ip: String,

    #[serde(rename = "asNumber")]
    pub as_number: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::CustomResourceExt;

    #[test]
    fn test_crd_identity() {
        let crd = GlobalBGPPeer::crd();
        assert_eq!(crd.metadata.name.as_deref(), Some(GLOBAL_BGP_PEER_CRD_NAME));
    }
}
