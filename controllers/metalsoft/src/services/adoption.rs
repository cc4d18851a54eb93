//! Classification of "already exists" rejections.

use crate::error::ControllerError;
use metalsoft_client::{MetalsoftError, ref_codes};
use regex::Regex;
use std::fmt;

/// Where the existing object's ID sits in a duplicate rejection
const ID_PATTERN: &str = r"ID (\d+)";

/// Provider resource kinds subject to create-or-adopt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Infrastructure,
    Subnet,
    Variable,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Infrastructure => "Infrastructure",
            ResourceKind::Subnet => "Subnet",
            ResourceKind::Variable => "Variable",
        };
        f.write_str(name)
    }
}

/// Outcome of classifying a create error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Adoption {
    /// Not a duplicate rejection; surface the error as is
    NotApplicable,
    /// The resource exists with this ID
    AlreadyExists { kind: ResourceKind, id: u64 },
    /// A duplicate rejection that names no ID
    MissingId { kind: ResourceKind, message: String },
}

/// Recognises duplicate rejections by their reference code and extracts the
/// existing object's ID.
///
/// The signature table is plain data so deployments against a provider
/// version with different codes can supply their own.
#[derive(Debug, Clone)]
pub struct AdoptionClassifier {
    signatures: Vec<(ResourceKind, String)>,
    id_pattern: Regex,
}

impl AdoptionClassifier {
    /// Classifier with the reference codes of the current Metalsoft API.
    pub fn with_default_signatures() -> Result<Self, ControllerError> {
        Self::new(vec![
            (ResourceKind::Infrastructure, ref_codes::INFRASTRUCTURE_EXISTS.to_string()),
            (ResourceKind::Subnet, ref_codes::SUBNET_EXISTS.to_string()),
            (ResourceKind::Subnet, ref_codes::SUBNET_ALLOCATED.to_string()),
            (ResourceKind::Variable, ref_codes::VARIABLE_EXISTS.to_string()),
        ])
    }

    /// Classifier over a custom signature table.
    pub fn new(signatures: Vec<(ResourceKind, String)>) -> Result<Self, ControllerError> {
        let id_pattern =
            Regex::new(ID_PATTERN).map_err(|e| ControllerError::InvalidConfig(format!("ID pattern: {}", e)))?;
        Ok(Self { signatures, id_pattern })
    }

    /// Classifies the error returned when creating a `kind`.
    pub fn classify(&self, kind: ResourceKind, err: &MetalsoftError) -> Adoption {
        let MetalsoftError::Api { message, .. } = err else {
            return Adoption::NotApplicable;
        };

        let matched = self
            .signatures
            .iter()
            .any(|(k, signature)| *k == kind && message.contains(signature.as_str()));
        if !matched {
            return Adoption::NotApplicable;
        }

        match self
            .id_pattern
            .captures(message)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
        {
            Some(id) => Adoption::AlreadyExists { kind, id },
            None => Adoption::MissingId {
                kind,
                message: message.clone(),
            },
        }
    }
}

/// Turns a failed create into the ID to adopt, or the error to surface.
pub(crate) fn adoptable_id(
    classifier: &AdoptionClassifier,
    kind: ResourceKind,
    err: MetalsoftError,
) -> Result<u64, ControllerError> {
    match classifier.classify(kind, &err) {
        Adoption::AlreadyExists { id, .. } => Ok(id),
        Adoption::MissingId { kind, message } => Err(ControllerError::AdoptionExtraction { kind, message }),
        Adoption::NotApplicable => Err(err.into()),
    }
}
