//! Object persistence seam.
//!
//! Reconcilers and scopes read and write Kubernetes objects through the
//! object-safe [`ObjectStore`] trait, which speaks JSON keyed by
//! [`ApiResource`]. [`KubeStore`] backs it with the API server; tests use an
//! in-memory store. The typed helpers at the bottom convert to and from the
//! CRD structs.

use crate::error::ControllerError;
use async_trait::async_trait;
use kube::api::{Api, ApiResource, DynamicObject, Patch, PatchParams};
use kube::{Client, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

/// Namespace and name of a namespaced object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of an existing object. Missing namespace maps to "default".
    pub fn of<K: Resource>(obj: &K) -> Self {
        let meta = obj.meta();
        Self::new(
            meta.namespace.clone().unwrap_or_else(|| "default".to_string()),
            meta.name.clone().unwrap_or_default(),
        )
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// JSON-level access to namespaced Kubernetes objects.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object; `None` when it does not exist.
    async fn get(&self, resource: &ApiResource, key: &ObjectKey) -> Result<Option<Value>, ControllerError>;

    /// Apply an RFC 7386 merge patch to the object (metadata and spec).
    ///
    /// A patch carrying `metadata.resourceVersion` must be rejected with
    /// [`ControllerError::Conflict`] when the stored version differs.
    async fn patch(&self, resource: &ApiResource, key: &ObjectKey, patch: &Value) -> Result<Value, ControllerError>;

    /// Apply an RFC 7386 merge patch to the status subresource.
    async fn patch_status(&self, resource: &ApiResource, key: &ObjectKey, patch: &Value) -> Result<Value, ControllerError>;
}

/// [`ObjectStore`] backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, resource: &ApiResource, key: &ObjectKey) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), &key.namespace, resource)
    }
}

fn map_write_error(key: &ObjectKey, err: kube::Error) -> ControllerError {
    match err {
        kube::Error::Api(ae) if ae.code == 409 => ControllerError::Conflict(key.to_string()),
        other => ControllerError::Kube(other),
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get(&self, resource: &ApiResource, key: &ObjectKey) -> Result<Option<Value>, ControllerError> {
        match self.api(resource, key).get_opt(&key.name).await? {
            Some(obj) => Ok(Some(serde_json::to_value(obj)?)),
            None => Ok(None),
        }
    }

    async fn patch(&self, resource: &ApiResource, key: &ObjectKey, patch: &Value) -> Result<Value, ControllerError> {
        let updated = self
            .api(resource, key)
            .patch(&key.name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map_err(|e| map_write_error(key, e))?;
        Ok(serde_json::to_value(updated)?)
    }

    async fn patch_status(&self, resource: &ApiResource, key: &ObjectKey, patch: &Value) -> Result<Value, ControllerError> {
        let updated = self
            .api(resource, key)
            .patch_status(&key.name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map_err(|e| map_write_error(key, e))?;
        Ok(serde_json::to_value(updated)?)
    }
}

/// Type-erased API resource descriptor for a CRD type.
pub fn api_resource<K>() -> ApiResource
where
    K: Resource<DynamicType = ()>,
{
    ApiResource::erase::<K>(&())
}

/// Fetch and deserialize a typed object.
pub async fn fetch<K>(store: &dyn ObjectStore, key: &ObjectKey) -> Result<Option<K>, ControllerError>
where
    K: Resource<DynamicType = ()> + DeserializeOwned,
{
    match store.get(&api_resource::<K>(), key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Serialize a typed object to JSON, with apiVersion and kind filled in.
pub fn to_json<K>(obj: &K) -> Result<Value, ControllerError>
where
    K: Resource<DynamicType = ()> + Serialize,
{
    let mut value = serde_json::to_value(obj)?;
    if let Value::Object(map) = &mut value {
        map.insert("apiVersion".to_string(), Value::String(K::api_version(&()).to_string()));
        map.insert("kind".to_string(), Value::String(K::kind(&()).to_string()));
    }
    Ok(value)
}
