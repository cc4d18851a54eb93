//! Test utilities for unit testing reconcilers
//!
//! Builders for the Cluster API and Metalsoft objects, an in-memory
//! [`ObjectStore`] that behaves like the API server for merge patches, and an
//! event publisher that records what it is given.

use crate::error::ControllerError;
use crate::events::EventPublisher;
use crate::reconciler::Reconciler;
use crate::services::{AdoptionClassifier, EndpointResolver};
use crate::store::{ObjectKey, ObjectStore, api_resource, to_json};
use async_trait::async_trait;
use crds::*;
use k8s_openapi::api::core::v1::ObjectReference as CoreObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference, Time};
use kube::Resource;
use kube::api::ApiResource;
use kube::runtime::events::EventType;
use metalsoft_client::MockMetalsoftClient;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const NAMESPACE: &str = "default";

fn owner_reference(kind: &str, name: &str) -> OwnerReference {
    OwnerReference {
        api_version: format!("{}/v1beta1", CLUSTER_API_GROUP),
        kind: kind.to_string(),
        name: name.to_string(),
        uid: format!("uid-{}", name),
        controller: Some(true),
        ..Default::default()
    }
}

/// Helper to create a Cluster API Cluster pointing at a MetalsoftCluster
pub fn create_test_cluster(name: &str, infrastructure_name: &str) -> Cluster {
    Cluster {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            ..Default::default()
        },
        spec: ClusterSpec {
            paused: false,
            infrastructure_ref: Some(ObjectReference::metalsoft("MetalsoftCluster", infrastructure_name)),
        },
        status: Some(ClusterStatus::default()),
    }
}

/// Helper to create a MetalsoftCluster, optionally owned by a Cluster
pub fn create_test_metalsoft_cluster(name: &str, owner: Option<&str>, datacenter: &str) -> MetalsoftCluster {
    let mut metalsoft_cluster = MetalsoftCluster::new(
        name,
        MetalsoftClusterSpec {
            datacenter_name: datacenter.to_string(),
            ..Default::default()
        },
    );
    metalsoft_cluster.metadata.namespace = Some(NAMESPACE.to_string());
    metalsoft_cluster.metadata.owner_references = owner.map(|o| vec![owner_reference("Cluster", o)]);
    metalsoft_cluster
}

/// Helper to create a Cluster API Machine of `cluster`
pub fn create_test_machine(name: &str, cluster: &str, infrastructure_name: &str) -> Machine {
    let mut machine = Machine::new(
        name,
        MachineSpec {
            cluster_name: cluster.to_string(),
            bootstrap: Bootstrap::default(),
            infrastructure_ref: Some(ObjectReference::metalsoft("MetalsoftMachine", infrastructure_name)),
        },
    );
    machine.metadata.namespace = Some(NAMESPACE.to_string());
    machine.metadata.labels = Some(BTreeMap::from([(CLUSTER_NAME_LABEL.to_string(), cluster.to_string())]));
    machine
}

/// Helper to create a MetalsoftMachine, optionally owned by a Machine and labelled with its cluster
pub fn create_test_metalsoft_machine(name: &str, owner: Option<&str>, cluster: Option<&str>) -> MetalsoftMachine {
    let mut metalsoft_machine = MetalsoftMachine::new(
        name,
        MetalsoftMachineSpec {
            instance_label: name.to_string(),
            instance_server_type_name: "M.8.8.2".to_string(),
            os_template_label: "ubuntu-22-04".to_string(),
            ..Default::default()
        },
    );
    metalsoft_machine.metadata.namespace = Some(NAMESPACE.to_string());
    metalsoft_machine.metadata.owner_references = owner.map(|o| vec![owner_reference("Machine", o)]);
    metalsoft_machine.metadata.labels =
        cluster.map(|c| BTreeMap::from([(CLUSTER_NAME_LABEL.to_string(), c.to_string())]));
    metalsoft_machine
}

/// Marks an object as being deleted.
pub fn mark_deleting<K: Resource>(obj: &mut K) {
    let timestamp: Time = serde_json::from_value(json!("2026-01-01T00:00:00Z")).unwrap();
    obj.meta_mut().deletion_timestamp = Some(timestamp);
}

/// Adds the paused annotation.
pub fn annotate_paused<K: Resource>(obj: &mut K) {
    obj.meta_mut()
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(PAUSED_ANNOTATION.to_string(), "true".to_string());
}

type StoreKey = (String, String, String);

#[derive(Default)]
struct MemoryState {
    objects: HashMap<StoreKey, Value>,
    patches: usize,
    conflicts: usize,
}

/// In-memory [`ObjectStore`]
///
/// Applies merge patches with `json_patch::merge`, enforces
/// `metadata.resourceVersion` on writes and bumps it on every change, and
/// drops an object once it is deleting with no finalizers left.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn store_key(resource: &ApiResource, key: &ObjectKey) -> StoreKey {
        (resource.kind.clone(), key.namespace.clone(), key.name.clone())
    }

    /// Stores `obj` as it would be after a create.
    pub fn insert<K>(&self, obj: &K)
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        let mut value = to_json(obj).unwrap();
        if value.pointer("/metadata/resourceVersion").is_none() {
            value["metadata"]["resourceVersion"] = json!("1");
        }
        let key = Self::store_key(&api_resource::<K>(), &ObjectKey::of(obj));
        self.state.lock().unwrap().objects.insert(key, value);
    }

    /// Typed copy of a stored object.
    pub fn object<K>(&self, name: &str) -> Option<K>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let key = Self::store_key(&api_resource::<K>(), &ObjectKey::new(NAMESPACE, name));
        let value = self.state.lock().unwrap().objects.get(&key).cloned()?;
        Some(serde_json::from_value(value).unwrap())
    }

    /// Number of successful writes.
    pub fn patch_count(&self) -> usize {
        self.state.lock().unwrap().patches
    }

    /// Makes the next `n` writes fail as if the object had changed underneath.
    pub fn inject_conflicts(&self, n: usize) {
        self.state.lock().unwrap().conflicts = n;
    }

    fn apply(&self, resource: &ApiResource, key: &ObjectKey, patch: &Value, status_only: bool) -> Result<Value, ControllerError> {
        let mut state = self.state.lock().unwrap();
        if state.conflicts > 0 {
            state.conflicts -= 1;
            return Err(ControllerError::Conflict(key.to_string()));
        }

        let store_key = Self::store_key(resource, key);
        // A vanished object is reported like a concurrent change
        let Some(current) = state.objects.get(&store_key).cloned() else {
            return Err(ControllerError::Conflict(key.to_string()));
        };

        let current_rv = current["metadata"]["resourceVersion"].as_str().unwrap_or("0").to_string();
        if let Some(rv) = patch.pointer("/metadata/resourceVersion").and_then(Value::as_str) {
            if rv != current_rv {
                return Err(ControllerError::Conflict(key.to_string()));
            }
        }

        let mut patch = patch.clone();
        if let Some(metadata) = patch.get_mut("metadata").and_then(Value::as_object_mut) {
            metadata.remove("resourceVersion");
        }
        if status_only {
            patch = json!({ "status": patch.get("status").cloned().unwrap_or(Value::Null) });
        } else if let Some(map) = patch.as_object_mut() {
            map.remove("status");
        }

        let mut updated = current.clone();
        json_patch::merge(&mut updated, &patch);
        if updated == current {
            return Ok(updated);
        }

        let next_rv = current_rv.parse::<u64>().unwrap_or(0) + 1;
        updated["metadata"]["resourceVersion"] = json!(next_rv.to_string());
        state.patches += 1;

        let deleting = updated.pointer("/metadata/deletionTimestamp").is_some_and(|v| !v.is_null());
        let finalizers_left = updated
            .pointer("/metadata/finalizers")
            .and_then(Value::as_array)
            .is_some_and(|f| !f.is_empty());
        if deleting && !finalizers_left {
            state.objects.remove(&store_key);
        } else {
            state.objects.insert(store_key, updated.clone());
        }
        Ok(updated)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, resource: &ApiResource, key: &ObjectKey) -> Result<Option<Value>, ControllerError> {
        let store_key = Self::store_key(resource, key);
        Ok(self.state.lock().unwrap().objects.get(&store_key).cloned())
    }

    async fn patch(&self, resource: &ApiResource, key: &ObjectKey, patch: &Value) -> Result<Value, ControllerError> {
        self.apply(resource, key, patch, false)
    }

    async fn patch_status(&self, resource: &ApiResource, key: &ObjectKey, patch: &Value) -> Result<Value, ControllerError> {
        self.apply(resource, key, patch, true)
    }
}

/// A published event
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub object: String,
    pub warning: bool,
    pub reason: String,
    pub note: String,
}

/// [`EventPublisher`] that keeps everything it is given
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEventPublisher {
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn notes(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.note).collect()
    }

    pub fn warnings(&self) -> Vec<RecordedEvent> {
        self.events().into_iter().filter(|e| e.warning).collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, resource_ref: &CoreObjectReference, type_: EventType, reason: &str, note: String) {
        self.events.lock().unwrap().push(RecordedEvent {
            object: resource_ref.name.clone().unwrap_or_default(),
            warning: matches!(type_, EventType::Warning),
            reason: reason.to_string(),
            note,
        });
    }
}

/// Everything a reconciler test needs, sharing state with the reconciler
pub struct TestHarness {
    pub reconciler: Reconciler,
    pub store: Arc<MemoryStore>,
    pub provider: MockMetalsoftClient,
    pub events: Arc<RecordingEventPublisher>,
}

impl TestHarness {
    pub fn new(provider: MockMetalsoftClient) -> Self {
        Self::with_timeout(provider, Duration::from_secs(30))
    }

    pub fn with_timeout(provider: MockMetalsoftClient, reconcile_timeout: Duration) -> Self {
        let store = Arc::new(MemoryStore::new());
        let events = Arc::new(RecordingEventPublisher::default());
        let classifier = Arc::new(AdoptionClassifier::with_default_signatures().unwrap());
        let endpoint = EndpointResolver::new(Arc::new(provider.clone()), classifier);
        let reconciler = Reconciler::new(
            Arc::clone(&store) as Arc<dyn ObjectStore>,
            Arc::clone(&events) as Arc<dyn EventPublisher>,
            endpoint,
            reconcile_timeout,
        );
        Self {
            reconciler,
            store,
            provider,
            events,
        }
    }

    /// Stores a Cluster and its MetalsoftCluster in `datacenter`.
    pub fn seed_cluster(&self, name: &str, datacenter: &str) -> ObjectKey {
        self.store.insert(&create_test_cluster(name, name));
        self.store
            .insert(&create_test_metalsoft_cluster(name, Some(name), datacenter));
        ObjectKey::new(NAMESPACE, name)
    }

    pub fn metalsoft_cluster(&self, name: &str) -> Option<MetalsoftCluster> {
        self.store.object::<MetalsoftCluster>(name)
    }
}
