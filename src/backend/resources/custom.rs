//! Generic client for kinds stored as cluster-scoped custom resources
//!
//! A [`CustomResourceConverter`] supplies the kind-specific mapping between
//! datastore entries and resource objects; [`CustomResourceClient`] supplies
//! the create/update/apply/delete/get/list mechanics once for all of them.

use crate::domain::ResourceClient;
use crate::error::{Error, Identifier, Result};
use crate::model::{KVPair, Key, ListQuery};
use async_trait::async_trait;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams};
use k8s_openapi::ClusterResourceScope;
use kube::{Client, CustomResourceExt, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

/// Field manager used for server-side apply
pub const FIELD_MANAGER: &str = "kdd-datastore";

/// Kind-specific mapping for a [`CustomResourceClient`]
pub trait CustomResourceConverter: Send + Sync + 'static {
    type Resource: Resource<DynamicType = (), Scope = ClusterResourceScope>
        + CustomResourceExt
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    /// Name of the CustomResourceDefinition backing this kind
    const CRD_NAME: &'static str;

    /// Object name for a key.
    fn resource_name(&self, key: &Key) -> Result<String>;

    /// The single key a query pins down, if every identifying filter is set.
    fn exact_key(&self, query: &ListQuery) -> Option<Key>;

    /// Build the object for an entry; `metadata.resourceVersion` carries the revision.
    fn to_resource(&self, kvp: &KVPair) -> Result<Self::Resource>;

    fn from_resource(&self, resource: &Self::Resource) -> Result<KVPair>;
}

/// Error for a key of the wrong kind reaching a converter
pub(crate) fn unexpected_key(expected: &str, key: &Key) -> Error {
    Error::Internal(format!("{} client received key {}", expected, key))
}

/// [`ResourceClient`] over a cluster-scoped custom resource
pub struct CustomResourceClient<C: CustomResourceConverter> {
    client: Client,
    converter: C,
}

impl<C: CustomResourceConverter> CustomResourceClient<C> {
    pub fn new(client: Client, converter: C) -> Self {
        Self { client, converter }
    }

    fn api(&self) -> Api<C::Resource> {
        Api::all(self.client.clone())
    }
}

#[async_trait]
impl<C: CustomResourceConverter> ResourceClient for CustomResourceClient<C> {
    async fn ensure_initialized(&self) -> Result<()> {
        let crds: Api<CustomResourceDefinition> = Api::all(self.client.clone());
        let params = PatchParams::apply(FIELD_MANAGER).force();

        info!("Ensuring {} CRD exists", C::CRD_NAME);
        crds.patch(C::CRD_NAME, &params, &Patch::Apply(&C::Resource::crd()))
            .await
            .map_err(|e| Error::from_kube(e, Identifier::Name(C::CRD_NAME.to_string())))?;
        Ok(())
    }

    async fn create(&self, kvp: KVPair) -> Result<KVPair> {
        let mut resource = self.converter.to_resource(&kvp)?;
        resource.meta_mut().resource_version = None;

        let created = self
            .api()
            .create(&PostParams::default(), &resource)
            .await
            .map_err(|e| Error::from_kube(e, &kvp.key))?;
        self.converter.from_resource(&created)
    }

    async fn update(&self, kvp: KVPair) -> Result<KVPair> {
        let name = self.converter.resource_name(&kvp.key)?;
        let resource = self.converter.to_resource(&kvp)?;

        let updated = self
            .api()
            .replace(&name, &PostParams::default(), &resource)
            .await
            .map_err(|e| Error::from_kube(e, &kvp.key))?;
        self.converter.from_resource(&updated)
    }

    async fn apply(&self, kvp: KVPair) -> Result<KVPair> {
        match self.create(kvp.clone()).await {
            Err(Error::ResourceAlreadyExists { .. }) => {
                debug!(key = %kvp.key, "Resource exists, updating at current revision");
                let current = self.get(&kvp.key).await?;
                let mut kvp = kvp;
                kvp.revision = current.revision;
                self.update(kvp).await
            }
            other => other,
        }
    }

    async fn delete(&self, kvp: KVPair) -> Result<KVPair> {
        let existing = self.get(&kvp.key).await?;
        let name = self.converter.resource_name(&kvp.key)?;

        self.api()
            .delete(&name, &DeleteParams::default())
            .await
            .map_err(|e| Error::from_kube(e, &kvp.key))?;
        Ok(existing)
    }

    async fn get(&self, key: &Key) -> Result<KVPair> {
        let name = self.converter.resource_name(key)?;
        let resource = self
            .api()
            .get(&name)
            .await
            .map_err(|e| Error::from_kube(e, key))?;
        self.converter.from_resource(&resource)
    }

    async fn list(&self, query: &ListQuery) -> Result<(Vec<KVPair>, Option<String>)> {
        if let Some(key) = self.converter.exact_key(query) {
            return match self.get(&key).await {
                Ok(kvp) => Ok((vec![kvp], None)),
                Err(e) if e.is_not_found() => Ok((Vec::new(), None)),
                Err(e) => Err(e),
            };
        }

        let list = self
            .api()
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::from_kube(e, query))?;

        let mut kvps = Vec::with_capacity(list.items.len());
        for resource in &list.items {
            let kvp = self.converter.from_resource(resource)?;
            if query.matches(&kvp.key) {
                kvps.push(kvp);
            }
        }
        Ok((kvps, list.metadata.resource_version))
    }
}
