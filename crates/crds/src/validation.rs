//! Admission rules for Metalsoft CRDs
//!
//! Pure validation functions mirroring what the validating webhook enforces.
//! They take the old and new objects and report every violated rule.

use crate::metalsoft_cluster::MetalsoftCluster;
use crate::templates::MetalsoftClusterTemplate;
use thiserror::Error;

/// A rejected create or update.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A field that must not change after creation was modified
    #[error("spec.{field}: field is immutable (was {old:?}, now {new:?})")]
    Immutable {
        /// Field path under spec
        field: &'static str,
        /// Previous value
        old: String,
        /// Requested value
        new: String,
    },

    /// A required field is missing
    #[error("spec.{0}: required value")]
    Required(&'static str),

    /// A template spec was modified
    #[error("{0}.spec is immutable")]
    ImmutableTemplate(&'static str),
}

/// Checks a MetalsoftCluster on creation.
pub fn validate_cluster_create(cluster: &MetalsoftCluster) -> Result<(), Vec<ValidationError>> {
    if cluster.spec.datacenter_name.is_empty() {
        return Err(vec![ValidationError::Required("datacenterName")]);
    }
    Ok(())
}

/// Checks a MetalsoftCluster update: datacenter and infrastructure label are immutable.
pub fn validate_cluster_update(
    old: &MetalsoftCluster,
    new: &MetalsoftCluster,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if old.spec.datacenter_name != new.spec.datacenter_name {
        errors.push(ValidationError::Immutable {
            field: "datacenterName",
            old: old.spec.datacenter_name.clone(),
            new: new.spec.datacenter_name.clone(),
        });
    }
    if old.spec.infrastructure_label != new.spec.infrastructure_label {
        errors.push(ValidationError::Immutable {
            field: "infrastructureLabel",
            old: old.spec.infrastructure_label.clone(),
            new: new.spec.infrastructure_label.clone(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Checks a MetalsoftClusterTemplate update: the whole spec is immutable.
pub fn validate_cluster_template_update(
    old: &MetalsoftClusterTemplate,
    new: &MetalsoftClusterTemplate,
) -> Result<(), ValidationError> {
    if old.spec != new.spec {
        return Err(ValidationError::ImmutableTemplate("MetalsoftClusterTemplate"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metalsoft_cluster::MetalsoftClusterSpec;
    use crate::templates::{MetalsoftClusterTemplateResource, MetalsoftClusterTemplateSpec};

    fn cluster(datacenter: &str, label: &str) -> MetalsoftCluster {
        MetalsoftCluster::new(
            "test",
            MetalsoftClusterSpec {
                datacenter_name: datacenter.to_string(),
                infrastructure_label: label.to_string(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_create_requires_datacenter() {
        assert_eq!(
            validate_cluster_create(&cluster("", "infra")),
            Err(vec![ValidationError::Required("datacenterName")])
        );
        assert!(validate_cluster_create(&cluster("dc1", "")).is_ok());
    }

    #[test]
    fn test_update_rejects_immutable_fields() {
        let old = cluster("dc1", "infra-a");
        let new = cluster("dc2", "infra-b");

        let errors = validate_cluster_update(&old, &new).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().contains("datacenterName"));
        assert!(errors[1].to_string().contains("infrastructureLabel"));
    }

    #[test]
    fn test_update_allows_controller_owned_fields() {
        let old = cluster("dc1", "infra-a");
        let mut new = old.clone();
        new.spec.infrastructure_id = 42;
        new.spec.network.subnet_id = 99;
        new.spec.control_plane_endpoint.host = "10.0.0.5".to_string();

        assert!(validate_cluster_update(&old, &new).is_ok());
    }

    #[test]
    fn test_template_spec_is_immutable() {
        let template = |dc: &str| {
            MetalsoftClusterTemplate::new(
                "tmpl",
                MetalsoftClusterTemplateSpec {
                    template: MetalsoftClusterTemplateResource {
                        metadata: Default::default(),
                        spec: MetalsoftClusterSpec {
                            datacenter_name: dc.to_string(),
                            ..Default::default()
                        },
                    },
                },
            )
        };

        assert!(validate_cluster_template_update(&template("dc1"), &template("dc1")).is_ok());
        assert_eq!(
            validate_cluster_template_update(&template("dc1"), &template("dc2")),
            Err(ValidationError::ImmutableTemplate("MetalsoftClusterTemplate"))
        );
    }
}
