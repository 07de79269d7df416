use std::fmt::Debug;
use std::marker::PhantomData;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::model::error::Error;
use crate::model::identity::ResourceIdentity;
use crate::model::spec::{WebDeployment, WebDeploymentStatus};

/// Typed get/create/update/delete access to one namespaced resource kind.
#[async_trait]
pub trait ResourceClient<K>: Send + Sync
    where K: Send + Sync + 'static,
{
    /// `Ok(None)` when the object does not exist.
    async fn get(&self, identity: &ResourceIdentity) -> Result<Option<K>, Error>;
    /// Fails with `Conflict` when the object already exists.
    async fn create(&self, obj: &K) -> Result<K, Error>;
    /// Replaces the object, `obj` must carry the resourceVersion it was read at.
    async fn update(&self, obj: &K) -> Result<K, Error>;
    async fn delete(&self, identity: &ResourceIdentity) -> Result<(), Error>;
}

#[async_trait]
pub trait StatusWriter: Send + Sync {
    async fn update_status(&self, identity: &ResourceIdentity, status: &WebDeploymentStatus) -> Result<(), Error>;
}

pub struct KubeResourceClient<K> {
    client: Client,
    field_manager: String,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeResourceClient<K> {
    pub fn new(client: Client, field_manager: &str) -> Self {
        Self {
            client,
            field_manager: field_manager.to_owned(),
            _kind: PhantomData,
        }
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            dry_run: false,
            field_manager: Some(self.field_manager.clone()),
        }
    }
}

impl<K> KubeResourceClient<K>
    where K: Resource<Scope = NamespaceResourceScope>,
          K::DynamicType: Default,
{
    fn api(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn identity_of(obj: &K) -> Result<ResourceIdentity, Error> {
        ResourceIdentity::of(obj)
    }
}

#[async_trait]
impl<K> ResourceClient<K> for KubeResourceClient<K>
    where K: Resource<Scope = NamespaceResourceScope> + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static,
          K::DynamicType: Default,
{
    async fn get(&self, identity: &ResourceIdentity) -> Result<Option<K>, Error> {
        self.api(&identity.namespace)
            .get_opt(&identity.name)
            .await
            .map_err(Error::from_api)
    }

    async fn create(&self, obj: &K) -> Result<K, Error> {
        let identity = Self::identity_of(obj)?;
        self.api(&identity.namespace)
            .create(&self.post_params(), obj)
            .await
            .map_err(Error::from_api)
    }

    async fn update(&self, obj: &K) -> Result<K, Error> {
        let identity = Self::identity_of(obj)?;
        self.api(&identity.namespace)
            .replace(&identity.name, &self.post_params(), obj)
            .await
            .map_err(Error::from_api)
    }

    async fn delete(&self, identity: &ResourceIdentity) -> Result<(), Error> {
        self.api(&identity.namespace)
            .delete(&identity.name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(Error::from_api)
    }
}

#[async_trait]
impl StatusWriter for KubeResourceClient<WebDeployment> {
    async fn update_status(&self, identity: &ResourceIdentity, status: &WebDeploymentStatus) -> Result<(), Error> {
        let update_status = status_patch(status);
        let params = PatchParams {
            field_manager: Some(self.field_manager.clone()),
            ..PatchParams::default()
        };

        self.api(&identity.namespace)
            .patch_status(&identity.name, &params, &Patch::Merge(&update_status))
            .await
            .map(|_| ())
            .map_err(Error::from_api)
    }
}

/// Merge patch for the status sub-resource.
///
/// Unset fields are sent as `null`, a merge patch only removes what it names.
pub fn status_patch(status: &WebDeploymentStatus) -> Value {
    json!({
        "status": {
            "observedGeneration": status.observed_generation,
            "deploymentName": status.deployment_name,
            "replicas": status.replicas,
            "readyReplicas": status.ready_replicas,
            "phase": status.phase,
            "message": status.message,
        }
    })
}
