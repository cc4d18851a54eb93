//! Kubernetes resource watchers.
//!
//! Both kinds run through the generic `watch_resource()` helper, which drives
//! a `kube_runtime::Controller` with the configured concurrency and label
//! selector. Failed passes are requeued through the reconciler's per-object
//! backoff.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::store::ObjectKey;
use crds::{MetalsoftCluster, MetalsoftMachine};
use futures::StreamExt;
use kube::{Api, Client, Resource};
use kube_runtime::controller::{Action, Config as RuntimeConfig};
use kube_runtime::{Controller, watcher};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Quiet period after the last change before a pass starts
const DEBOUNCE: Duration = Duration::from_secs(1);

type ReconcileFuture = Pin<Box<dyn Future<Output = Result<Action, ControllerError>> + Send>>;

/// Generic watcher helper around kube_runtime::Controller.
///
/// `reconcile_fn` receives the key of the changed object; reconcilers read
/// the object themselves so every pass starts from the latest copy.
async fn watch_resource<K, F>(
    api: Api<K>,
    reconciler: Arc<Reconciler>,
    reconcile_fn: F,
    resource_name: &'static str,
    watcher_config: watcher::Config,
    concurrency: u16,
) -> Result<(), ControllerError>
where
    K: Resource<DynamicType = ()> + Clone + Debug + DeserializeOwned + Send + Sync + 'static,
    F: Fn(Arc<Reconciler>, ObjectKey) -> ReconcileFuture + Send + Sync + Clone + 'static,
{
    info!("Starting {} watcher (concurrency {})", resource_name, concurrency);

    let error_policy = move |obj: Arc<K>, error: &ControllerError, ctx: Arc<Reconciler>| {
        let key = format!("{} {}", resource_name, ObjectKey::of(&*obj));
        let delay = ctx.next_backoff(&key, error);
        error!("Reconciliation error for {}: {} (retry in {:?})", key, error, delay);
        Action::requeue(delay)
    };

    let reconcile = move |obj: Arc<K>, ctx: Arc<Reconciler>| {
        let reconcile_fn = reconcile_fn.clone();
        let key = ObjectKey::of(&*obj);
        async move {
            debug!("Reconciling {} {}", resource_name, key);
            let backoff_key = format!("{} {}", resource_name, key);
            let action = reconcile_fn(Arc::clone(&ctx), key).await?;
            ctx.reset_error(&backoff_key);
            Ok(action)
        }
    };

    let runtime_config = RuntimeConfig::default().debounce(DEBOUNCE).concurrency(concurrency);

    Controller::new(api, watcher_config)
        .with_config(runtime_config)
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            if let Err(e) = res {
                debug!("Controller error for {}: {}", resource_name, e);
            }
        })
        .await;

    Ok(())
}

/// Watches MetalsoftCluster and MetalsoftMachine resources.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    client: Client,
    config: ControllerConfig,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(reconciler: Arc<Reconciler>, client: Client, config: ControllerConfig) -> Self {
        Self {
            reconciler,
            client,
            config,
        }
    }

    fn api<K>(&self) -> Api<K>
    where
        K: Resource<DynamicType = (), Scope = kube::core::NamespaceResourceScope>,
    {
        match &self.config.namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }

    fn watcher_config(&self) -> watcher::Config {
        match self.config.label_selector() {
            Some(selector) => watcher::Config::default().labels(&selector),
            None => watcher::Config::default(),
        }
    }

    pub async fn watch_metalsoft_clusters(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.api::<MetalsoftCluster>(),
            Arc::clone(&self.reconciler),
            |reconciler, key| Box::pin(async move { reconciler.reconcile_cluster(&key).await }),
            "MetalsoftCluster",
            self.watcher_config(),
            self.config.cluster_concurrency,
        )
        .await
    }

    pub async fn watch_metalsoft_machines(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.api::<MetalsoftMachine>(),
            Arc::clone(&self.reconciler),
            |reconciler, key| Box::pin(async move { reconciler.reconcile_machine(&key).await }),
            "MetalsoftMachine",
            self.watcher_config(),
            self.config.machine_concurrency,
        )
        .await
    }
}
