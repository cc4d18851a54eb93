//! Deferred merge-patch writes.
//!
//! [`PatchHelper`] snapshots an object when a scope opens. On flush it diffs
//! the snapshot against the mutated object, producing an RFC 7386 merge patch,
//! and writes metadata/spec and status separately because status lives in its
//! own subresource. Both writes carry the snapshot's `resourceVersion`, so a
//! concurrent change surfaces as a conflict instead of being overwritten.

use crate::error::ControllerError;
use crate::store::{ObjectKey, ObjectStore, api_resource, to_json};
use kube::Resource;
use kube::api::ApiResource;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::debug;

/// Computes the merge patch turning `original` into `modified`.
///
/// Objects are diffed key by key, removed keys become `null`, and any other
/// change (arrays included) replaces the value wholesale. Returns `None` when
/// nothing changed.
pub fn merge_diff(original: &Value, modified: &Value) -> Option<Value> {
    match (original, modified) {
        (Value::Object(orig), Value::Object(new)) => {
            let mut patch = Map::new();
            for (key, new_value) in new {
                match orig.get(key) {
                    Some(old_value) => {
                        if let Some(diff) = merge_diff(old_value, new_value) {
                            patch.insert(key.clone(), diff);
                        }
                    }
                    None => {
                        patch.insert(key.clone(), new_value.clone());
                    }
                }
            }
            for key in orig.keys() {
                if !new.contains_key(key) {
                    patch.insert(key.clone(), Value::Null);
                }
            }
            if patch.is_empty() { None } else { Some(Value::Object(patch)) }
        }
        _ if original == modified => None,
        _ => Some(modified.clone()),
    }
}

fn resource_version(value: &Value) -> Option<&str> {
    value.pointer("/metadata/resourceVersion").and_then(Value::as_str)
}

fn with_resource_version(mut patch: Value, resource_version: Option<&str>) -> Value {
    if let (Some(rv), Value::Object(map)) = (resource_version, &mut patch) {
        let metadata = map.entry("metadata").or_insert_with(|| json!({}));
        if let Value::Object(metadata) = metadata {
            metadata.insert("resourceVersion".to_string(), Value::String(rv.to_string()));
        }
    }
    patch
}

/// Snapshot of an object plus the means to write back what changed since.
pub struct PatchHelper {
    resource: ApiResource,
    key: ObjectKey,
    base: Value,
}

impl PatchHelper {
    /// Snapshots `obj` as the baseline for later diffs.
    pub fn new<K>(obj: &K) -> Result<Self, ControllerError>
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        Ok(Self {
            resource: api_resource::<K>(),
            key: ObjectKey::of(obj),
            base: to_json(obj)?,
        })
    }

    /// Key of the patched object
    pub fn key(&self) -> &ObjectKey {
        &self.key
    }

    /// Writes the changes made to `obj` since the baseline.
    ///
    /// On success `obj` is replaced by the server's copy and becomes the new
    /// baseline. Returns whether anything was written.
    pub async fn patch<K>(&mut self, store: &dyn ObjectStore, obj: &mut K) -> Result<bool, ControllerError>
    where
        K: Resource<DynamicType = ()> + Serialize + DeserializeOwned,
    {
        let current = to_json(obj)?;
        let Some(mut diff) = merge_diff(&self.base, &current) else {
            return Ok(false);
        };

        let status = diff.as_object_mut().and_then(|m| m.remove("status"));
        let mut latest: Option<Value> = None;

        if diff.as_object().is_some_and(|m| !m.is_empty()) {
            let body = with_resource_version(diff, resource_version(&self.base));
            debug!("Patching {} {}: {}", self.resource.kind, self.key, body);
            latest = Some(store.patch(&self.resource, &self.key, &body).await?);
        }

        if let Some(status) = status {
            let rv = latest
                .as_ref()
                .and_then(resource_version)
                .or_else(|| resource_version(&self.base))
                .map(str::to_string);
            let body = with_resource_version(json!({ "status": status }), rv.as_deref());
            debug!("Patching {} {} status: {}", self.resource.kind, self.key, body);
            latest = Some(store.patch_status(&self.resource, &self.key, &body).await?);
        }

        if let Some(latest) = latest {
            *obj = serde_json::from_value(latest)?;
            self.base = to_json(obj)?;
        }
        Ok(true)
    }
}
