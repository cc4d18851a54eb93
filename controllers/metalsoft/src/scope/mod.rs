//! Per-pass persistence boundaries.
//!
//! A scope wraps one desired-state object together with the owner objects it
//! was resolved from. Setters only touch the in-memory copy; `flush()` writes
//! what changed so far and `close()` writes the rest and consumes the scope.
//! Reconcilers call `close()` on every exit path of a pass.

pub mod cluster;
pub mod machine;
pub mod patch;

pub use cluster::ClusterScope;
pub use machine::MachineScope;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Adds `finalizer` unless present. Returns whether the metadata changed.
pub(crate) fn add_finalizer(meta: &mut ObjectMeta, finalizer: &str) -> bool {
    let finalizers = meta.finalizers.get_or_insert_with(Vec::new);
    if finalizers.iter().any(|f| f == finalizer) {
        return false;
    }
    finalizers.push(finalizer.to_string());
    true
}

/// Removes `finalizer` if present. Returns whether the metadata changed.
pub(crate) fn remove_finalizer(meta: &mut ObjectMeta, finalizer: &str) -> bool {
    let Some(finalizers) = meta.finalizers.as_mut() else {
        return false;
    };
    let before = finalizers.len();
    finalizers.retain(|f| f != finalizer);
    before != finalizers.len()
}
