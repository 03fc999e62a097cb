//! Converters for the custom resource backed kinds

use super::custom::{unexpected_key, CustomResourceConverter};
use crate::convert::{
    cidr_resource_name, ip_resource_name, parse_system_policy_name, system_policy_name,
};
use crate::crd::{
    GlobalBGPPeer, GlobalBGPPeerSpec, GlobalConfig, GlobalConfigSpec, IPPool, IPPoolSpec,
    SystemNetworkPolicy, SystemNetworkPolicySpec, GLOBAL_BGP_PEER_CRD_NAME,
    GLOBAL_CONFIG_CRD_NAME, IP_POOL_CRD_NAME, SYSTEM_NETWORK_POLICY_CRD_NAME,
};
use crate::error::{Error, Result};
use crate::model::{BgpPeer, KVPair, Key, ListQuery, Policy, Value};
use kube::api::ObjectMeta;

fn object_meta(name: String, kvp: &KVPair) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        resource_version: kvp.revision.clone(),
        ..Default::default()
    }
}

fn object_name(meta: &ObjectMeta) -> Result<&str> {
    meta.name
        .as_deref()
        .ok_or_else(|| Error::decode("custom resource has no name"))
}

fn wrong_value(key: &Key, expected: &str, value: &Value) -> Error {
    Error::decode(format!(
        "{} requires a {} value, got {}",
        key,
        expected,
        value.type_name()
    ))
}

// =============================================================================
// GlobalConfig
// =============================================================================

/// Object names must be lowercase; the original name is kept in the spec.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalConfigConverter;

impl CustomResourceConverter for GlobalConfigConverter {
    type Resource = GlobalConfig;
    const CRD_NAME: &'static str = GLOBAL_CONFIG_CRD_NAME;

    fn resource_name(&self, key: &Key) -> Result<String> {
        match key {
            Key::GlobalConfig { name } => Ok(name.to_lowercase()),
            other => Err(unexpected_key("GlobalConfig", other)),
        }
    }

    fn exact_key(&self, query: &ListQuery) -> Option<Key> {
        match query {
            ListQuery::GlobalConfig { name: Some(name) } => Some(Key::global_config(name)),
            _ => None,
        }
    }

    fn to_resource(&self, kvp: &KVPair) -> Result<GlobalConfig> {
        let Key::GlobalConfig { name } = &kvp.key else {
            return Err(unexpected_key("GlobalConfig", &kvp.key));
        };
        let value = kvp
            .value
            .as_str()
            .ok_or_else(|| wrong_value(&kvp.key, "string", &kvp.value))?;

        Ok(GlobalConfig {
            metadata: object_meta(self.resource_name(&kvp.key)?, kvp),
            spec: GlobalConfigSpec {
                name: name.clone(),
                value: value.to_string(),
            },
        })
    }

    fn from_resource(&self, resource: &GlobalConfig) -> Result<KVPair> {
        let mut kvp = KVPair::new(
            Key::global_config(&resource.spec.name),
            Value::String(resource.spec.value.clone()),
        );
        kvp.revision = resource.metadata.resource_version.clone();
        Ok(kvp)
    }
}

// =============================================================================
// IPPool
// =============================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct IpPoolConverter;

impl CustomResourceConverter for IpPoolConverter {
    type Resource = IPPool;
    const CRD_NAME: &'static str = IP_POOL_CRD_NAME;

    fn resource_name(&self, key: &Key) -> Result<String> {
        match key {
            Key::IpPool { cidr } => Ok(cidr_resource_name(cidr)),
            other => Err(unexpected_key("IPPool", other)),
        }
    }

    fn exact_key(&self, query: &ListQuery) -> Option<Key> {
        match query {
            ListQuery::IpPool { cidr: Some(cidr) } => Some(Key::IpPool { cidr: cidr.clone() }),
            _ => None,
        }
    }

    fn to_resource(&self, kvp: &KVPair) -> Result<IPPool> {
        let Key::IpPool { cidr } = &kvp.key else {
            return Err(unexpected_key("IPPool", &kvp.key));
        };
        let mut pool = kvp
            .value
            .as_ip_pool()
            .cloned()
            .ok_or_else(|| wrong_value(&kvp.key, "IPPool", &kvp.value))?;
        pool.cidr = cidr.clone();

        Ok(IPPool {
            metadata: object_meta(self.resource_name(&kvp.key)?, kvp),
            spec: IPPoolSpec { value: pool },
        })
    }

    fn from_resource(&self, resource: &IPPool) -> Result<KVPair> {
        let pool = resource.spec.value.clone();
        let mut kvp = KVPair::new(
            Key::IpPool {
                cidr: pool.cidr.clone(),
            },
            Value::IpPool(pool),
        );
        kvp.revision = resource.metadata.resource_version.clone();
        Ok(kvp)
    }
}

// =============================================================================
// GlobalBGPPeer
// =============================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalBgpPeerConverter;

impl CustomResourceConverter for GlobalBgpPeerConverter {
    type Resource = GlobalBGPPeer;
    const CRD_NAME: &'static str = GLOBAL_BGP_PEER_CRD_NAME;

    fn resource_name(&self, key: &Key) -> Result<String> {
        match key {
            Key::GlobalBgpPeer { peer_ip } => Ok(ip_resource_name(peer_ip)),
            other => Err(unexpected_key("GlobalBGPPeer", other)),
        }
    }

    fn exact_key(&self, query: &ListQuery) -> Option<Key> {
        match query {
            ListQuery::GlobalBgpPeer {
                peer_ip: Some(peer_ip),
            } => Some(Key::GlobalBgpPeer { peer_ip: *peer_ip }),
            _ => None,
        }
    }

    fn to_resource(&self, kvp: &KVPair) -> Result<GlobalBGPPeer> {
        let Key::GlobalBgpPeer { peer_ip } = &kvp.key else {
            return Err(unexpected_key("GlobalBGPPeer", &kvp.key));
        };
        let peer = kvp
            .value
            .as_bgp_peer()
            .ok_or_else(|| wrong_value(&kvp.key, "BGPPeer", &kvp.value))?;

        Ok(GlobalBGPPeer {
            metadata: object_meta(self.resource_name(&kvp.key)?, kvp),
            spec: GlobalBGPPeerSpec {
                peer_ip: peer_ip.to_string(),
                as_number: peer.as_number,
            },
        })
    }

    fn from_resource(&self, resource: &GlobalBGPPeer) -> Result<KVPair> {
        let peer_ip = resource.spec.peer_ip.parse().map_err(|e| {
            Error::decode(format!(
                "GlobalBGPPeer {} has invalid peer IP {:?}: {}",
                object_name(&resource.metadata).unwrap_or_default(),
                resource.spec.peer_ip,
                e
            ))
        })?;
        let mut kvp = KVPair::new(
            Key::GlobalBgpPeer { peer_ip },
            Value::BgpPeer(BgpPeer {
                peer_ip,
                as_number: resource.spec.as_number,
            }),
        );
        kvp.revision = resource.metadata.resource_version.clone();
        Ok(kvp)
    }
}

// =============================================================================
// SystemNetworkPolicy
// =============================================================================

/// Policies named `snp.projectcalico.org/<object name>`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPolicyConverter;

impl CustomResourceConverter for SystemPolicyConverter {
    type Resource = SystemNetworkPolicy;
    const CRD_NAME: &'static str = SYSTEM_NETWORK_POLICY_CRD_NAME;

    fn resource_name(&self, key: &Key) -> Result<String> {
        match key {
            Key::Policy { name } => parse_system_policy_name(name),
            other => Err(unexpected_key("SystemNetworkPolicy", other)),
        }
    }

    fn exact_key(&self, query: &ListQuery) -> Option<Key> {
        match query {
            ListQuery::Policy { name: Some(name) } => Some(Key::policy(name)),
            _ => None,
        }
    }

    fn to_resource(&self, kvp: &KVPair) -> Result<SystemNetworkPolicy> {
        let policy = kvp
            .value
            .as_policy()
            .ok_or_else(|| wrong_value(&kvp.key, "Policy", &kvp.value))?;

        Ok(SystemNetworkPolicy {
            metadata: object_meta(self.resource_name(&kvp.key)?, kvp),
            spec: SystemNetworkPolicySpec {
                order: policy.order,
                selector: policy.selector.clone(),
                inbound_rules: policy.inbound_rules.clone(),
                outbound_rules: policy.outbound_rules.clone(),
                untracked: policy.untracked,
            },
        })
    }

    fn from_resource(&self, resource: &SystemNetworkPolicy) -> Result<KVPair> {
        let name = object_name(&resource.metadata)?;
        let spec = &resource.spec;
        let mut kvp = KVPair::new(
            Key::policy(system_policy_name(name)),
            Value::Policy(Policy {
                order: spec.order,
                selector: spec.selector.clone(),
                inbound_rules: spec.inbound_rules.clone(),
                outbound_rules: spec.outbound_rules.clone(),
                untracked: spec.untracked,
            }),
        );
        kvp.revision = resource.metadata.resource_version.clone();
        Ok(kvp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IpPool, Rule};
    use assert_matches::assert_matches;

    #[test]
    fn test_global_config_names_are_lowercased() {
        let conv = GlobalConfigConverter;
        let kvp = KVPair::new(Key::global_config("ClusterType"), Value::String("KDD".into()))
            .with_revision("12");

        let res = conv.to_resource(&kvp).unwrap();
        assert_eq!(res.metadata.name.as_deref(), Some("clustertype"));
        assert_eq!(res.metadata.resource_version.as_deref(), Some("12"));
        assert_eq!(res.spec.name, "ClusterType");

        assert_eq!(conv.from_resource(&res).unwrap(), kvp);
    }

    #[test]
    fn test_global_config_rejects_non_string() {
        let kvp = KVPair::new(Key::global_config("LogSeverity"), Value::Bool(true));
        assert_matches!(GlobalConfigConverter.to_resource(&kvp), Err(Error::Decode(_)));
    }

    #[test]
    fn test_ip_pool_resource_name() {
        let conv = IpPoolConverter;
        let key = Key::IpPool {
            cidr: "10.1.0.0/16".into(),
        };
        assert_eq!(conv.resource_name(&key).unwrap(), "10-1-0-0-16");

        let pool = IpPool {
            cidr: "10.1.0.0/16".into(),
            ipip_interface: None,
            ipip_mode: Some("always".into()),
            masquerade: true,
            ipam: true,
            disabled: false,
        };
        let res = conv
            .to_resource(&KVPair::new(key.clone(), Value::IpPool(pool.clone())))
            .unwrap();
        assert_eq!(conv.from_resource(&res).unwrap().value, Value::IpPool(pool));
    }

    #[test]
    fn test_global_bgp_peer_round_trips_ip() {
        let conv = GlobalBgpPeerConverter;
        let peer_ip = "fd00::10".parse().unwrap();
        let kvp = KVPair::new(
            Key::GlobalBgpPeer { peer_ip },
            Value::BgpPeer(BgpPeer {
                peer_ip,
                as_number: 64512,
            }),
        );
        let res = conv.to_resource(&kvp).unwrap();
        assert_eq!(res.metadata.name.as_deref(), Some("fd00--10"));
        assert_eq!(conv.from_resource(&res).unwrap(), kvp);

        let mut bad = res;
        bad.spec.peer_ip = "not-an-ip".into();
        assert_matches!(conv.from_resource(&bad), Err(Error::Decode(_)));
    }

    #[test]
    fn test_system_policy_names() {
        let conv = SystemPolicyConverter;
        let key = Key::policy("snp.projectcalico.org/deny-metadata");
        assert_eq!(conv.resource_name(&key).unwrap(), "deny-metadata");
        assert_matches!(
            conv.resource_name(&Key::policy("np.projectcalico.org/a.b")),
            Err(Error::Decode(_))
        );

        let kvp = KVPair::new(
            key,
            Value::Policy(Policy {
                order: Some(10.0),
                selector: "all()".into(),
                inbound_rules: vec![Rule::deny_all()],
                outbound_rules: vec![Rule::allow_all()],
                untracked: false,
            }),
        );
        let res = conv.to_resource(&kvp).unwrap();
        assert_eq!(conv.from_resource(&res).unwrap(), kvp);
    }

    #[test]
    fn test_exact_keys() {
        assert_eq!(
            GlobalConfigConverter.exact_key(&ListQuery::GlobalConfig {
                name: Some("ClusterType".into())
            }),
            Some(Key::global_config("ClusterType"))
        );
        assert_eq!(
            IpPoolConverter.exact_key(&ListQuery::IpPool { cidr: None }),
            None
        );
    }

    #[test]
    fn test_unexpected_key_kind() {
        assert_matches!(
            IpPoolConverter.resource_name(&Key::ReadyFlag),
            Err(Error::Internal(_))
        );
    }
}
