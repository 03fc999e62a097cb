//! Kubernetes backend
//!
//! - [`KubeDatastore`]: per-kind dispatch of datastore operations
//! - [`resources`]: clients for independently stored kinds
//! - [`derived`]: read paths for kinds computed from native objects
//! - [`bootstrap`]: kind registration and cluster type marker
//! - [`Syncer`]: snapshot delivery to sync callbacks

pub mod bootstrap;
pub mod datastore;
pub mod derived;
pub mod kube_api;
pub mod resources;
pub mod syncer;

pub use datastore::{KubeDatastore, ResourceClients};
pub use kube_api::ClientKubeApi;
pub use syncer::Syncer;
