//! Unit tests for the MetalsoftMachine reconciler

#[cfg(test)]
mod tests {
    use crate::error::ControllerError;
    use crate::store::ObjectKey;
    use crate::test_utils::*;
    use crds::{CLUSTER_NAME_LABEL, MACHINE_FINALIZER, MetalsoftMachine, MetalsoftMachineStatus};
    use kube_runtime::controller::Action;
    use metalsoft_client::MockMetalsoftClient;

    struct Seed {
        infrastructure_ready: bool,
        data_secret: Option<&'static str>,
        paused: bool,
    }

    impl Default for Seed {
        fn default() -> Self {
            Self {
                infrastructure_ready: true,
                data_secret: Some("m1-bootstrap"),
                paused: false,
            }
        }
    }

    /// Stores Cluster c1, MetalsoftCluster c1, Machine m1 and MetalsoftMachine m1.
    fn seed(harness: &TestHarness, seed: Seed) -> ObjectKey {
        let mut cluster = create_test_cluster("c1", "c1");
        cluster.spec.paused = seed.paused;
        if let Some(status) = cluster.status.as_mut() {
            status.infrastructure_ready = seed.infrastructure_ready;
        }
        harness.store.insert(&cluster);
        harness
            .store
            .insert(&create_test_metalsoft_cluster("c1", Some("c1"), "dc1"));

        let mut machine = create_test_machine("m1", "c1", "m1");
        machine.spec.bootstrap.data_secret_name = seed.data_secret.map(str::to_string);
        harness.store.insert(&machine);
        harness
            .store
            .insert(&create_test_metalsoft_machine("m1", Some("m1"), Some("c1")));

        ObjectKey::new(NAMESPACE, "m1")
    }

    fn metalsoft_machine(harness: &TestHarness) -> Option<MetalsoftMachine> {
        harness.store.object::<MetalsoftMachine>("m1")
    }

    fn has_finalizer(harness: &TestHarness) -> bool {
        metalsoft_machine(harness)
            .and_then(|m| m.metadata.finalizers)
            .is_some_and(|f| f.contains(&MACHINE_FINALIZER.to_string()))
    }

    #[tokio::test]
    async fn test_ready_gates_open_adds_finalizer() {
        let harness = TestHarness::new(MockMetalsoftClient::new());
        let key = seed(&harness, Seed::default());

        let action = harness.reconciler.reconcile_machine(&key).await.unwrap();
        assert_eq!(action, Action::await_change());
        assert!(has_finalizer(&harness));
        assert_eq!(harness.provider.create_calls(), 0);

        // Nothing left to write on the next pass
        let patches = harness.store.patch_count();
        harness.reconciler.reconcile_machine(&key).await.unwrap();
        assert_eq!(harness.store.patch_count(), patches);
    }

    #[tokio::test]
    async fn test_waits_for_cluster_infrastructure() {
        let harness = TestHarness::new(MockMetalsoftClient::new());
        let key = seed(
            &harness,
            Seed {
                infrastructure_ready: false,
                ..Seed::default()
            },
        );

        let action = harness.reconciler.reconcile_machine(&key).await.unwrap();
        assert_eq!(action, Action::await_change());
        assert!(has_finalizer(&harness));
        assert!(metalsoft_machine(&harness).unwrap().status.is_none());
    }

    #[tokio::test]
    async fn test_waits_for_bootstrap_data() {
        let harness = TestHarness::new(MockMetalsoftClient::new());
        let key = seed(
            &harness,
            Seed {
                data_secret: None,
                ..Seed::default()
            },
        );

        let action = harness.reconciler.reconcile_machine(&key).await.unwrap();
        assert_eq!(action, Action::await_change());
        assert!(has_finalizer(&harness));
    }

    #[tokio::test]
    async fn test_no_owner_is_noop() {
        let harness = TestHarness::new(MockMetalsoftClient::new());
        harness
            .store
            .insert(&create_test_metalsoft_machine("m1", None, Some("c1")));

        let action = harness
            .reconciler
            .reconcile_machine(&ObjectKey::new(NAMESPACE, "m1"))
            .await
            .unwrap();
        assert_eq!(action, Action::await_change());
        assert!(!has_finalizer(&harness));
        assert_eq!(harness.store.patch_count(), 0);
    }

    #[tokio::test]
    async fn test_machine_without_cluster_label_is_noop() {
        let harness = TestHarness::new(MockMetalsoftClient::new());
        let key = seed(&harness, Seed::default());
        let mut machine = create_test_machine("m1", "c1", "m1");
        if let Some(labels) = machine.metadata.labels.as_mut() {
            labels.remove(CLUSTER_NAME_LABEL);
        }
        harness.store.insert(&machine);

        harness.reconciler.reconcile_machine(&key).await.unwrap();
        assert!(!has_finalizer(&harness));
    }

    #[tokio::test]
    async fn test_paused_cluster_is_noop() {
        let harness = TestHarness::new(MockMetalsoftClient::new());
        let key = seed(
            &harness,
            Seed {
                paused: true,
                ..Seed::default()
            },
        );

        harness.reconciler.reconcile_machine(&key).await.unwrap();
        assert!(!has_finalizer(&harness));
        assert_eq!(harness.store.patch_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_metalsoft_cluster_is_error() {
        let harness = TestHarness::new(MockMetalsoftClient::new());
        harness.store.insert(&create_test_cluster("c1", "c1"));
        harness.store.insert(&create_test_machine("m1", "c1", "m1"));
        harness
            .store
            .insert(&create_test_metalsoft_machine("m1", Some("m1"), Some("c1")));

        let err = harness
            .reconciler
            .reconcile_machine(&ObjectKey::new(NAMESPACE, "m1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::Scope(_)));
        assert!(!has_finalizer(&harness));
    }

    #[tokio::test]
    async fn test_failed_machine_is_left_alone() {
        let harness = TestHarness::new(MockMetalsoftClient::new());
        let key = seed(&harness, Seed::default());
        let mut msm = metalsoft_machine(&harness).unwrap();
        msm.status = Some(MetalsoftMachineStatus {
            failure_reason: Some("CreateError".to_string()),
            failure_message: Some("server type unavailable".to_string()),
            ..Default::default()
        });
        harness.store.insert(&msm);

        let action = harness.reconciler.reconcile_machine(&key).await.unwrap();
        assert_eq!(action, Action::await_change());
        assert!(!has_finalizer(&harness));
        assert_eq!(harness.store.patch_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_machine_delete_releases_finalizer() {
        let harness = TestHarness::new(MockMetalsoftClient::new());
        let key = seed(&harness, Seed::default());
        harness.reconciler.reconcile_machine(&key).await.unwrap();
        assert!(has_finalizer(&harness));

        let mut msm = metalsoft_machine(&harness).unwrap();
        msm.status = Some(MetalsoftMachineStatus {
            failure_reason: Some("CreateError".to_string()),
            failure_message: Some("server type unavailable".to_string()),
            ..Default::default()
        });
        mark_deleting(&mut msm);
        harness.store.insert(&msm);

        let action = harness.reconciler.reconcile_machine(&key).await.unwrap();
        assert_eq!(action, Action::await_change());
        assert!(metalsoft_machine(&harness).is_none());
        assert_eq!(harness.events.events().last().unwrap().note, "Reconciled");
    }

    #[tokio::test]
    async fn test_delete_releases_finalizer() {
        let harness = TestHarness::new(MockMetalsoftClient::new());
        let key = seed(&harness, Seed::default());
        harness.reconciler.reconcile_machine(&key).await.unwrap();
        assert!(has_finalizer(&harness));

        let mut msm = metalsoft_machine(&harness).unwrap();
        mark_deleting(&mut msm);
        harness.store.insert(&msm);

        harness.reconciler.reconcile_machine(&key).await.unwrap();
        assert!(metalsoft_machine(&harness).is_none());

        let events = harness.events.events();
        let last = events.last().unwrap();
        assert_eq!(last.object, "m1");
        assert_eq!(last.reason, "MetalsoftMachineReconcile");
        assert_eq!(last.note, "Reconciled");
        assert_eq!(harness.provider.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_write_conflict_surfaces_as_warning() {
        let harness = TestHarness::new(MockMetalsoftClient::new());
        let key = seed(&harness, Seed::default());
        harness.store.inject_conflicts(1);

        let err = harness.reconciler.reconcile_machine(&key).await.unwrap_err();
        assert!(matches!(err, ControllerError::Conflict(_)));
        assert!(err.is_retryable());

        let warnings = harness.events.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].reason, "MetalsoftMachineReconcile");
    }
}
