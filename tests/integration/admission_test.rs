//! Integration tests for session admission against the in-memory store.

mod helpers;

use std::time::Duration;

use futures::future::join_all;

use freemarket_auth::{AdmissionResult, SessionLimitControl};
use freemarket_core::config::{AdmissionMode, SessionConfig, StoreConfig};
use freemarket_core::error::ErrorKind;
use freemarket_core::traits::CapacityStore;
use freemarket_store::{StoreManager, keys};

use helpers::{admission, session_config};

#[tokio::test]
async fn test_sequential_admission_cap() {
    let (_, controller) = admission(2, session_config(AdmissionMode::Atomic)).await;

    assert_eq!(controller.register("A").await.unwrap(), AdmissionResult::Admitted);
    assert_eq!(controller.register("B").await.unwrap(), AdmissionResult::Admitted);
    assert!(matches!(
        controller.register("C").await.unwrap(),
        AdmissionResult::Denied { size: 2, limit: 2 }
    ));

    assert!(controller.exists("A").await.unwrap());
    assert!(controller.exists("B").await.unwrap());
    assert!(!controller.exists("C").await.unwrap());
}

#[tokio::test]
async fn test_check_then_act_mode_matches_sequentially() {
    let (_, controller) = admission(2, session_config(AdmissionMode::CheckThenAct)).await;

    assert_eq!(controller.register("A").await.unwrap(), AdmissionResult::Admitted);
    assert_eq!(controller.register("B").await.unwrap(), AdmissionResult::Admitted);
    assert!(matches!(
        controller.register("C").await.unwrap(),
        AdmissionResult::Denied { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_ttl_expiry_precedes_sweep() {
    let (_, controller) = admission(2, session_config(AdmissionMode::Atomic)).await;
    controller.register("A").await.unwrap();

    tokio::time::advance(Duration::from_secs(30 * 60 + 1)).await;

    assert!(!controller.exists("A").await.unwrap());
    assert_eq!(controller.registered_count().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_atomic_mode_never_exceeds_limit() {
    let (_, controller) = admission(10, session_config(AdmissionMode::Atomic)).await;

    let tasks = (0..100).map(|i| {
        let controller = controller.clone();
        tokio::spawn(async move { controller.register(&format!("token-{i}")).await })
    });
    let admitted = join_all(tasks)
        .await
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(AdmissionResult::Admitted))))
        .count();

    assert_eq!(admitted, 10);
    assert_eq!(controller.registered_count().await.unwrap(), 10);
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_reclaims_lapsed_capacity() {
    let config = SessionConfig {
        ttl_minutes: 1,
        sweep_interval_seconds: 300,
        ..SessionConfig::default()
    };
    let (_, controller) = admission(1, config).await;
    let sweeper = controller.start_sweeper().unwrap();

    controller.register("A").await.unwrap();

    // Marker gone, registry entry still counted until the first sweep.
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(!controller.exists("A").await.unwrap());
    assert!(matches!(
        controller.register("B").await.unwrap(),
        AdmissionResult::Denied { size: 1, limit: 1 }
    ));

    tokio::time::sleep(Duration::from_secs(240)).await;
    assert_eq!(controller.registered_count().await.unwrap(), 0);
    assert_eq!(controller.register("B").await.unwrap(), AdmissionResult::Admitted);

    sweeper.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_no_sweeps_after_shutdown() {
    let config = SessionConfig {
        ttl_minutes: 1,
        sweep_interval_seconds: 60,
        ..SessionConfig::default()
    };
    let (_, controller) = admission(5, config).await;
    let sweeper = controller.start_sweeper().unwrap();
    sweeper.shutdown().await;

    controller.register("A").await.unwrap();
    tokio::time::sleep(Duration::from_secs(600)).await;

    assert!(!controller.exists("A").await.unwrap());
    assert_eq!(controller.registered_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_limit_changes_apply_immediately() {
    let (store, controller) = admission(1, session_config(AdmissionMode::Atomic)).await;
    let control = SessionLimitControl::new(store);

    controller.register("A").await.unwrap();
    assert!(matches!(
        controller.register("B").await.unwrap(),
        AdmissionResult::Denied { .. }
    ));

    control.set(2).await.unwrap();
    assert_eq!(controller.register("B").await.unwrap(), AdmissionResult::Admitted);
    assert_eq!(control.get().await.unwrap(), Some(2));

    let err = control.set(1001).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_denied_admission_is_distinct_error() {
    let (_, controller) = admission(1, session_config(AdmissionMode::Atomic)).await;

    controller.ensure_active("A").await.unwrap();
    let err = controller.ensure_active("B").await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::AdmissionDenied);
    assert_ne!(err.kind, ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_controllers_share_state_through_store() {
    let manager = StoreManager::new(&StoreConfig::default()).await.unwrap();
    let store: std::sync::Arc<dyn CapacityStore> = std::sync::Arc::new(manager);
    store.set(keys::session_limit(), "1", None).await.unwrap();

    let node_a = freemarket_auth::SessionAdmissionController::new(
        store.clone(),
        session_config(AdmissionMode::Atomic),
    )
    .await
    .unwrap();
    let node_b = freemarket_auth::SessionAdmissionController::new(
        store.clone(),
        session_config(AdmissionMode::Atomic),
    )
    .await
    .unwrap();

    assert_eq!(node_a.register("A").await.unwrap(), AdmissionResult::Admitted);
    assert!(node_b.exists("A").await.unwrap());
    assert!(matches!(
        node_b.register("B").await.unwrap(),
        AdmissionResult::Denied { .. }
    ));

    node_b.delete("A").await.unwrap();
    assert!(!node_a.exists("A").await.unwrap());
}
