//! Main controller implementation.
//!
//! Wires the Kubernetes client, the Metalsoft client and the reconciler
//! together and runs one watcher per CRD kind.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::events::KubeEventPublisher;
use crate::reconciler::Reconciler;
use crate::services::{AdoptionClassifier, EndpointResolver};
use crate::store::KubeStore;
use crate::watcher::Watcher;
use kube::Client;
use metalsoft_client::{Credentials, MetalsoftClient, MetalsoftClientTrait};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Name the controller reports events as
const CONTROLLER_NAME: &str = "metalsoft-controller";

/// Main controller for Metalsoft infrastructure resources.
pub struct Controller {
    metalsoft_cluster_watcher: JoinHandle<Result<(), ControllerError>>,
    metalsoft_machine_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its watchers.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing Metalsoft Controller");

        let kube_client = Client::try_default().await?;

        let credentials = Credentials::load().map_err(|e| {
            error!("Failed to load Metalsoft credentials: {}", e);
            error!("Set METALSOFT_CREDENTIALS_FILE_PATH or METALSOFT_USER_EMAIL, METALSOFT_API_KEY and METALSOFT_ENDPOINT");
            ControllerError::Metalsoft(e)
        })?;
        let metalsoft_client = MetalsoftClient::new(credentials)?;
        info!("Using Metalsoft endpoint {}", metalsoft_client.endpoint());

        let classifier = Arc::new(AdoptionClassifier::with_default_signatures()?);
        let endpoint = EndpointResolver::new(Arc::new(metalsoft_client), classifier);

        let reconciler = Arc::new(Reconciler::new(
            Arc::new(KubeStore::new(kube_client.clone())),
            Arc::new(KubeEventPublisher::new(kube_client.clone(), CONTROLLER_NAME)),
            endpoint,
            config.reconcile_timeout,
        ));

        let watcher_instance = Arc::new(Watcher::new(reconciler, kube_client, config));

        let metalsoft_cluster_watcher = {
            let watcher = Arc::clone(&watcher_instance);
            tokio::spawn(async move { watcher.watch_metalsoft_clusters().await })
        };

        let metalsoft_machine_watcher = {
            let watcher = Arc::clone(&watcher_instance);
            tokio::spawn(async move { watcher.watch_metalsoft_machines().await })
        };

        Ok(Self {
            metalsoft_cluster_watcher,
            metalsoft_machine_watcher,
        })
    }

    /// Runs until a watcher exits.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Metalsoft Controller running");

        // Watchers run forever; either one stopping ends the process
        tokio::select! {
            result = &mut self.metalsoft_cluster_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("MetalsoftCluster watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("MetalsoftCluster watcher error: {}", e)))?;
            }
            result = &mut self.metalsoft_machine_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("MetalsoftMachine watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("MetalsoftMachine watcher error: {}", e)))?;
            }
        }

        Ok(())
    }
}
