//! [`ClusterApi`] over a real Kubernetes client.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::core::DynamicObject;
use kube::{Client, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::client::{ClusterApi, FIELD_MANAGER, ReflectedKind};
use crate::controller::error::Error;
use crate::crd::InstanceStatus;
use crate::resources::manifest::{Manifest, ObjectKind};

/// Kubernetes-backed cluster client scoped to one namespace.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
    namespace: String,
}

impl KubeCluster {
    /// Wrap an authenticated client.
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    /// Connect using the in-cluster config or local kubeconfig.
    pub async fn try_default(namespace: impl Into<String>) -> Result<Self, Error> {
        let client = Client::try_default().await?;
        Ok(Self::new(client, namespace))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn api<K>(&self) -> Api<K>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn dynamic_api(&self, kind: ReflectedKind) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), &self.namespace, &kind.api_resource())
    }
}

async fn create_typed<K>(api: Api<K>, object: &K) -> Result<(), Error>
where
    K: Resource + Clone + DeserializeOwned + Serialize + std::fmt::Debug,
{
    api.create(&PostParams::default(), object).await?;
    Ok(())
}

async fn replace_typed<K>(api: Api<K>, name: &str, object: &K) -> Result<(), Error>
where
    K: Resource + Clone + DeserializeOwned + Serialize + std::fmt::Debug,
{
    api.replace(name, &PostParams::default(), object).await?;
    Ok(())
}

async fn version_of<K>(api: Api<K>, name: &str) -> Result<Option<String>, Error>
where
    K: Resource + Clone + DeserializeOwned + std::fmt::Debug,
{
    Ok(api
        .get_opt(name)
        .await?
        .and_then(|object| object.meta().resource_version.clone()))
}

async fn delete_typed<K>(api: Api<K>, name: &str) -> Result<(), Error>
where
    K: Resource + Clone + DeserializeOwned + std::fmt::Debug,
{
    api.delete(name, &DeleteParams::background()).await?;
    Ok(())
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn create(&self, manifest: &Manifest) -> Result<(), Error> {
        debug!(kind = %manifest.kind(), name = %manifest.name(), "create");
        match manifest {
            Manifest::ConfigMap(o) => create_typed(self.api::<ConfigMap>(), o).await,
            Manifest::Service(o) => create_typed(self.api::<Service>(), o).await,
            Manifest::Deployment(o) => create_typed(self.api::<Deployment>(), o).await,
            Manifest::StatefulSet(o) => create_typed(self.api::<StatefulSet>(), o).await,
        }
    }

    async fn replace(&self, manifest: &Manifest) -> Result<(), Error> {
        debug!(kind = %manifest.kind(), name = %manifest.name(), "replace");
        let name = manifest.name();
        match manifest {
            Manifest::ConfigMap(o) => replace_typed(self.api::<ConfigMap>(), name, o).await,
            Manifest::Service(o) => replace_typed(self.api::<Service>(), name, o).await,
            Manifest::Deployment(o) => replace_typed(self.api::<Deployment>(), name, o).await,
            Manifest::StatefulSet(o) => replace_typed(self.api::<StatefulSet>(), name, o).await,
        }
    }

    async fn resource_version(
        &self,
        kind: ObjectKind,
        name: &str,
    ) -> Result<Option<String>, Error> {
        match kind {
            ObjectKind::ConfigMap => version_of(self.api::<ConfigMap>(), name).await,
            ObjectKind::Service => version_of(self.api::<Service>(), name).await,
            ObjectKind::Deployment => version_of(self.api::<Deployment>(), name).await,
            ObjectKind::StatefulSet => version_of(self.api::<StatefulSet>(), name).await,
        }
    }

    async fn delete(&self, kind: ObjectKind, name: &str) -> Result<(), Error> {
        debug!(kind = %kind, name = %name, "delete");
        match kind {
            ObjectKind::ConfigMap => delete_typed(self.api::<ConfigMap>(), name).await,
            ObjectKind::Service => delete_typed(self.api::<Service>(), name).await,
            ObjectKind::Deployment => delete_typed(self.api::<Deployment>(), name).await,
            ObjectKind::StatefulSet => delete_typed(self.api::<StatefulSet>(), name).await,
        }
    }

    async fn list_reflected(&self, kind: ReflectedKind) -> Result<Vec<DynamicObject>, Error> {
        let list = self.dynamic_api(kind).list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn get_reflected(&self, kind: ReflectedKind, name: &str) -> Result<DynamicObject, Error> {
        Ok(self.dynamic_api(kind).get(name).await?)
    }

    async fn create_reflected(
        &self,
        kind: ReflectedKind,
        object: &DynamicObject,
    ) -> Result<(), Error> {
        self.dynamic_api(kind)
            .create(&PostParams::default(), object)
            .await?;
        Ok(())
    }

    async fn replace_reflected(
        &self,
        kind: ReflectedKind,
        object: &DynamicObject,
    ) -> Result<(), Error> {
        let name = object.metadata.name.clone().unwrap_or_default();
        self.dynamic_api(kind)
            .replace(&name, &PostParams::default(), object)
            .await?;
        Ok(())
    }

    async fn patch_reflected_status(
        &self,
        kind: ReflectedKind,
        name: &str,
        status: &InstanceStatus,
    ) -> Result<(), Error> {
        let patch = serde_json::json!({ "status": status });
        self.dynamic_api(kind)
            .patch_status(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn delete_reflected(&self, kind: ReflectedKind, name: &str) -> Result<(), Error> {
        self.dynamic_api(kind)
            .delete(name, &DeleteParams::default())
            .await?;
        Ok(())
    }
}
