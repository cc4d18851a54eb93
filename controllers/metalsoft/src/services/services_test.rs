//! Unit tests for the create-or-adopt services

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::error::ControllerError;
    use crds::SubnetSpec;
    use metalsoft_client::{
        CreateInfrastructureRequest, MetalsoftClientTrait, MetalsoftError, MockMetalsoftClient, MockOperation, ref_codes,
    };
    use std::sync::Arc;

    fn classifier() -> Arc<AdoptionClassifier> {
        Arc::new(AdoptionClassifier::with_default_signatures().unwrap())
    }

    fn infrastructure_request(label: &str) -> CreateInfrastructureRequest {
        CreateInfrastructureRequest {
            infrastructure_label: label.to_string(),
            datacenter_name: "dc1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_infrastructure_adopted_on_second_create() {
        let mock = MockMetalsoftClient::new().starting_infrastructure_id(42);
        let service = InfrastructureService::new(Arc::new(mock.clone()), classifier());

        let first = service.create_or_adopt(&infrastructure_request("cluster-api-a")).await.unwrap();
        let second = service.create_or_adopt(&infrastructure_request("cluster-api-a")).await.unwrap();

        assert_eq!(first.infrastructure_id, 42);
        assert_eq!(second.infrastructure_id, 42);
        assert_eq!(mock.infrastructures().len(), 1);
        assert_eq!(mock.calls(MockOperation::GetInfrastructure), 1);
    }

    #[tokio::test]
    async fn test_infrastructure_adopted_from_rejection_message() {
        let mock = MockMetalsoftClient::new();
        let existing = mock.insert_infrastructure("taken", "dc1");
        mock.fail_next(
            MockOperation::CreateInfrastructure,
            format!(
                "Infrastructure with label taken already exists (ID {}). Ref: {}",
                existing,
                ref_codes::INFRASTRUCTURE_EXISTS
            ),
        );
        let service = InfrastructureService::new(Arc::new(mock.clone()), classifier());

        let adopted = service.create_or_adopt(&infrastructure_request("taken")).await.unwrap();
        assert_eq!(adopted.infrastructure_id, existing);
    }

    #[tokio::test]
    async fn test_signature_without_id_is_hard_error() {
        let mock = MockMetalsoftClient::new();
        mock.fail_next(
            MockOperation::CreateInfrastructure,
            format!("Infrastructure already exists. Ref: {}", ref_codes::INFRASTRUCTURE_EXISTS),
        );
        let service = InfrastructureService::new(Arc::new(mock.clone()), classifier());

        let err = service.create_or_adopt(&infrastructure_request("x")).await.unwrap_err();
        assert!(matches!(
            err,
            ControllerError::AdoptionExtraction {
                kind: ResourceKind::Infrastructure,
                ..
            }
        ));
        assert!(!err.is_retryable());
        assert_eq!(mock.calls(MockOperation::GetInfrastructure), 0);
    }

    #[tokio::test]
    async fn test_unrelated_create_error_is_surfaced() {
        let mock = MockMetalsoftClient::new();
        mock.fail_next(MockOperation::CreateInfrastructure, "Datacenter dc9 does not exist");
        let service = InfrastructureService::new(Arc::new(mock.clone()), classifier());

        let err = service.create_or_adopt(&infrastructure_request("x")).await.unwrap_err();
        assert!(matches!(err, ControllerError::Metalsoft(MetalsoftError::Api { .. })));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_subnet_request_defaults_and_overrides() {
        let request = SubnetService::request(42, 7, "cluster-api-subnet-x".to_string(), None);
        assert_eq!(request.subnet_destination, "wan");
        assert_eq!(request.subnet_prefix_size, 29);
        assert_eq!(request.subnet_type, "ipv4");
        assert!(!request.subnet_automatic_allocation);

        let spec = SubnetSpec {
            label: Some("vip".to_string()),
            subnet_type: Some("ipv6".to_string()),
            prefix_size: Some(64),
            automatic_allocation: true,
        };
        let request = SubnetService::request(42, 7, "vip".to_string(), Some(&spec));
        assert_eq!(request.subnet_type, "ipv6");
        assert_eq!(request.subnet_prefix_size, 64);
        assert!(request.subnet_automatic_allocation);
        assert_eq!(request.subnet_destination, "wan");
    }

    #[tokio::test]
    async fn test_subnet_adopted_by_label() {
        let mock = MockMetalsoftClient::new().starting_subnet_id(99);
        let infrastructure = mock.insert_infrastructure("infra", "dc1");
        let service = SubnetService::new(Arc::new(mock.clone()), classifier());
        let request = SubnetService::request(infrastructure, 1, "vip".to_string(), None);

        let first = service.create_or_adopt(&request).await.unwrap();
        let second = service.create_or_adopt(&request).await.unwrap();
        assert_eq!(first.subnet_id, 99);
        assert_eq!(second.subnet_id, 99);
        assert_eq!(mock.subnets().len(), 1);
    }

    #[tokio::test]
    async fn test_subnet_allocated_code_is_adopted() {
        let mock = MockMetalsoftClient::new().starting_subnet_id(5);
        let infrastructure = mock.insert_infrastructure("infra", "dc1");
        let service = SubnetService::new(Arc::new(mock.clone()), classifier());
        let existing = service
            .create_or_adopt(&SubnetService::request(infrastructure, 1, "a".to_string(), None))
            .await
            .unwrap();

        mock.fail_next(
            MockOperation::CreateSubnet,
            format!("Subnet range overlaps subnet ID {}. Ref: {}", existing.subnet_id, ref_codes::SUBNET_ALLOCATED),
        );
        let adopted = service
            .create_or_adopt(&SubnetService::request(infrastructure, 1, "b".to_string(), None))
            .await
            .unwrap();
        assert_eq!(adopted.subnet_id, existing.subnet_id);
    }

    #[tokio::test]
    async fn test_variable_adoption_keeps_stored_value() {
        let mock = MockMetalsoftClient::new();
        let service = VariableService::new(Arc::new(mock.clone()), classifier());

        let created = service
            .create_or_adopt(&VariableService::request("kube_vip_address", "10.0.0.5"))
            .await
            .unwrap();
        assert_eq!(created.variable_json, r#"{"value":"10.0.0.5"}"#);

        let adopted = service
            .create_or_adopt(&VariableService::request("kube_vip_address", "10.9.9.9"))
            .await
            .unwrap();
        assert_eq!(adopted.variable_id, created.variable_id);
        assert_eq!(adopted.variable_json, r#"{"value":"10.0.0.5"}"#);
        assert_eq!(mock.calls(MockOperation::GetVariable), 1);
    }

    #[tokio::test]
    async fn test_get_surfaces_not_found() {
        let mock = MockMetalsoftClient::new();
        let service = VariableService::new(Arc::new(mock.clone()), classifier());
        let err = service.get(404).await.unwrap_err();
        assert!(matches!(err, ControllerError::Metalsoft(MetalsoftError::NotFound(_))));
        assert_eq!(mock.endpoint(), "https://mock.metalsoft.test/api/developer/developer");
    }
}
