//! RAII namespace management for isolated tests.
//!
//! Each test creates its own namespace that is deleted, together with
//! everything the engine wrote into it, when the test completes.
//!
//! IMPORTANT: Tests using TestNamespace must use `#[tokio::test(flavor = "multi_thread")]`
//! to support synchronous cleanup via `block_in_place`.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};

use gameserver_operator::crd::{ComputeInstance, ProxyInstance};
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, DeleteParams, ObjectMeta, PostParams, PropagationPolicy};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// A test namespace that is automatically deleted when dropped.
pub struct TestNamespace {
    client: Client,
    name: String,
    /// Track if cleanup has already been initiated
    cleanup_initiated: AtomicBool,
}

impl TestNamespace {
    /// Create a new test namespace named `{prefix}-{uuid}`.
    pub async fn create(client: Client, prefix: &str) -> Self {
        let suffix = Uuid::new_v4().simple().to_string()[..8].to_string();
        let name = format!("{prefix}-{suffix}");

        let ns_api: Api<Namespace> = Api::all(client.clone());
        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some(name.clone()),
                labels: Some(
                    [(
                        "app.kubernetes.io/managed-by".to_string(),
                        "integration-test".to_string(),
                    )]
                    .into_iter()
                    .collect(),
                ),
                ..Default::default()
            },
            ..Default::default()
        };

        ns_api
            .create(&PostParams::default(), &ns)
            .await
            .unwrap_or_else(|e| panic!("Failed to create test namespace {name}: {e}"));

        tracing::info!(namespace = %name, "Created test namespace");

        Self {
            client,
            name,
            cleanup_initiated: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }

    /// Get an API client for resources in this namespace.
    pub fn api<K>(&self) -> Api<K>
    where
        K: kube::Resource<Scope = kube::core::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), &self.name)
    }

    /// Delete all resources of type `T` in the namespace.
    async fn delete_resources<T>(client: &Client, namespace: &str)
    where
        T: Resource<Scope = k8s_openapi::NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <T as Resource>::DynamicType: Default,
    {
        let kind = T::kind(&T::DynamicType::default()).to_string();
        let api: Api<T> = Api::namespaced(client.clone(), namespace);

        let list = match api.list(&Default::default()).await {
            Ok(list) => list,
            Err(e) => {
                tracing::debug!("Failed to list {} resources for deletion: {}", kind, e);
                return;
            }
        };

        for resource in list.items {
            if let Some(name) = Resource::meta(&resource).name.as_ref()
                && let Err(e) = api.delete(name, &DeleteParams::default()).await
            {
                tracing::debug!("Failed to delete {} {}: {}", kind, name, e);
            }
        }
    }
}

/// Automatic cleanup on drop.
///
/// Uses tokio::task::block_in_place, which requires the multi-threaded runtime.
impl Drop for TestNamespace {
    fn drop(&mut self) {
        if self.cleanup_initiated.swap(true, Ordering::SeqCst) {
            return;
        }

        let name = self.name.clone();
        let client = self.client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                Self::delete_resources::<ComputeInstance>(&client, &name).await;
                Self::delete_resources::<ProxyInstance>(&client, &name).await;

                let ns_api: Api<Namespace> = Api::all(client);
                let dp = DeleteParams {
                    propagation_policy: Some(PropagationPolicy::Background),
                    ..Default::default()
                };
                match ns_api.delete(&name, &dp).await {
                    Ok(_) => tracing::debug!("Drop: namespace {} deletion initiated", name),
                    Err(kube::Error::Api(e)) if e.code == 404 => {}
                    Err(e) => tracing::warn!("Drop: failed to delete namespace {}: {}", name, e),
                }
            });
        });
    }
}
