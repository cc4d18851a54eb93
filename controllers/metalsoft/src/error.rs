//! Controller-specific error types.
//!
//! Errors are split into retryable ones (the next pass may well succeed from
//! the last persisted checkpoint) and hard ones that need a spec or provider
//! fix before another attempt can make progress.

use crate::services::ResourceKind;
use kube::Error as KubeError;
use metalsoft_client::MetalsoftError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in the Metalsoft controllers.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Metalsoft API error that is not an "already exists" rejection
    #[error("Metalsoft error: {0}")]
    Metalsoft(#[from] MetalsoftError),

    /// A required field is missing from the desired state
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// The provider said the resource exists but the message carries no usable ID
    #[error("{kind} already exists but its ID could not be extracted from: {message}")]
    AdoptionExtraction {
        /// Resource kind whose signature matched
        kind: ResourceKind,
        /// Provider message
        message: String,
    },

    /// The infrastructure has no usable network of the requested type
    #[error("{network_type} network not found on infrastructure {infrastructure_id}")]
    NetworkNotFound {
        /// Infrastructure that was searched
        infrastructure_id: u64,
        /// Network type looked up
        network_type: String,
    },

    /// The subnet exists but has no address to use as the endpoint
    #[error("subnet {0} has no allocated address")]
    SubnetAddressMissing(u64),

    /// Scope could not be built from the fetched objects
    #[error("Scope error: {0}")]
    Scope(String),

    /// The object changed since it was fetched; the write was rejected
    #[error("Conflict writing {0}: object was modified concurrently")]
    Conflict(String),

    /// The reconcile pass ran past its deadline
    #[error("Reconcile deadline of {0:?} exceeded")]
    Timeout(Duration),

    /// (De)serialization of a Kubernetes object failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

impl ControllerError {
    /// Whether a later pass can succeed without anyone changing the spec or the provider.
    pub fn is_retryable(&self) -> bool {
        match self {
            ControllerError::Kube(_)
            | ControllerError::Conflict(_)
            | ControllerError::Timeout(_)
            | ControllerError::Watch(_) => true,
            ControllerError::Metalsoft(e) => !matches!(e, MetalsoftError::Credentials(_)),
            ControllerError::Precondition(_)
            | ControllerError::AdoptionExtraction { .. }
            | ControllerError::NetworkNotFound { .. }
            | ControllerError::SubnetAddressMissing(_)
            | ControllerError::Scope(_)
            | ControllerError::Serialization(_)
            | ControllerError::InvalidConfig(_) => false,
        }
    }
}
