//! Resource clients for the independently stored kinds

pub mod converters;
pub mod custom;
pub mod node;
pub mod node_bgp_peer;

pub use converters::{
    GlobalBgpPeerConverter, GlobalConfigConverter, IpPoolConverter, SystemPolicyConverter,
};
pub use custom::{CustomResourceClient, CustomResourceConverter};
pub use node::NodeClient;
pub use node_bgp_peer::NodeBgpPeerClient;
