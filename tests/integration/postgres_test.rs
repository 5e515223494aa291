//! Integration tests against real PostgreSQL and Redis instances.
//!
//! Run with `DATABASE_URL` / `REDIS_URL` set and `--ignored`.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::future::join_all;

use freemarket_auth::{AdmissionResult, SessionAdmissionController};
use freemarket_core::config::{DatabaseConfig, PurchaseConfig, RedisStoreConfig, SessionConfig};
use freemarket_core::error::ErrorKind;
use freemarket_core::traits::CapacityStore;
use freemarket_core::types::{ItemId, UserId};
use freemarket_database::DatabasePool;
use freemarket_database::PgInventoryLedger;
use freemarket_database::repositories::{PurchaseRepository, UserRepository};
use freemarket_entity::item::CreateItem;
use freemarket_service::{ItemService, PurchaseError, PurchaseOrchestrator};
use freemarket_store::keys;
use freemarket_store::redis::{RedisCapacityStore, RedisClient};

fn unique(label: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    format!("{label}-{nanos}")
}

struct PgMarket {
    db: DatabasePool,
    orchestrator: Arc<PurchaseOrchestrator>,
    items: ItemService,
    seller: UserId,
}

impl PgMarket {
    async fn new() -> Self {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let db = DatabasePool::connect(&DatabaseConfig::with_url(url))
        .await
        .expect("Failed to connect to test database");
        freemarket_database::migration::run_migrations(db.pool())
            .await
            .expect("Failed to run migrations");

        let users = UserRepository::new(db.pool().clone());
        let seller = users
            .create(&format!("{}@example.com", unique("seller")), "x")
            .await
            .expect("Failed to create seller")
            .id;

        let ledger = Arc::new(PgInventoryLedger::new(db.clone()));
        let config = PurchaseConfig::default();
        Self {
            orchestrator: Arc::new(PurchaseOrchestrator::new(ledger.clone(), &config)),
            items: ItemService::new(ledger, &config),
            db,
            seller,
        }
    }

    async fn buyer(&self) -> UserId {
        UserRepository::new(self.db.pool().clone())
            .create(&format!("{}@example.com", unique("buyer")), "x")
            .await
            .expect("Failed to create buyer")
            .id
    }

    async fn item(&self, quantity: i64) -> ItemId {
        self.items
            .create(
                self.seller,
                CreateItem {
                    name: "Kettle".to_string(),
                    price: 2500,
                    description: "Electric kettle".to_string(),
                    quantity,
                },
            )
            .await
            .expect("Failed to create item")
            .id
    }

    async fn stock(&self, item: ItemId) -> i64 {
        self.items.get(item).await.expect("item vanished").quantity
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires DATABASE_URL"]
async fn test_pg_concurrent_purchases_respect_stock() {
    let market = PgMarket::new().await;
    let buyer = market.buyer().await;
    let item = market.item(10).await;

    let tasks = (0..30).map(|_| {
        let orchestrator = market.orchestrator.clone();
        tokio::spawn(async move { orchestrator.purchase(buyer, item, 1).await })
    });
    let succeeded = join_all(tasks)
        .await
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(_))))
        .count();

    assert_eq!(succeeded, 9);
    assert_eq!(market.stock(item).await, 1);
    let recorded = PurchaseRepository::new(market.db.pool().clone())
        .count_for_item(item)
        .await
        .unwrap();
    assert_eq!(recorded, 9);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_pg_contested_stock_and_missing_item() {
    let market = PgMarket::new().await;
    let buyer = market.buyer().await;
    let item = market.item(5).await;

    let a = market.orchestrator.clone();
    let b = market.orchestrator.clone();
    let (ra, rb) = tokio::join!(a.purchase(buyer, item, 5), b.purchase(buyer, item, 5));
    assert!(matches!(ra, Err(PurchaseError::InsufficientStock { .. })));
    assert!(matches!(rb, Err(PurchaseError::InsufficientStock { .. })));
    assert_eq!(market.stock(item).await, 5);

    let err = market
        .orchestrator
        .purchase(buyer, ItemId(i64::MAX), 1)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_pg_purchase_record_round_trip() {
    let market = PgMarket::new().await;
    let buyer = market.buyer().await;
    let item = market.item(10).await;

    let record = market.orchestrator.purchase(buyer, item, 3).await.unwrap();
    assert_eq!(record.total_price, 7500);
    assert_eq!(record.item.quantity, 7);

    let history = market.orchestrator.list_purchases(buyer).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0], record);
}

async fn redis_store() -> Arc<dyn CapacityStore> {
    let url = std::env::var("REDIS_URL").expect("REDIS_URL must be set");
    let client = RedisClient::connect(&RedisStoreConfig {
        url,
        key_prefix: format!("{}:", unique("freemarket-test")),
    })
    .await
    .expect("Failed to connect to Redis");
    Arc::new(RedisCapacityStore::new(client))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires REDIS_URL"]
async fn test_redis_atomic_admission_cap() {
    let store = redis_store().await;
    store.set(keys::session_limit(), "5", None).await.unwrap();
    let controller = Arc::new(
        SessionAdmissionController::new(store, SessionConfig::default())
            .await
            .unwrap(),
    );

    let tasks = (0..50).map(|i| {
        let controller = controller.clone();
        tokio::spawn(async move { controller.register(&format!("token-{i}")).await })
    });
    let admitted = join_all(tasks)
        .await
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(AdmissionResult::Admitted))))
        .count();

    assert_eq!(admitted, 5);
    assert_eq!(controller.registered_count().await.unwrap(), 5);
}

#[tokio::test]
#[ignore = "requires REDIS_URL"]
async fn test_redis_corrupt_limit_is_configuration_error() {
    let store = redis_store().await;
    let controller = SessionAdmissionController::new(store.clone(), SessionConfig::default())
        .await
        .unwrap();
    store.set(keys::session_limit(), "many", None).await.unwrap();

    let err = controller.register("A").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
}

#[tokio::test]
#[ignore = "requires REDIS_URL"]
async fn test_redis_reap_spares_live_markers() {
    let store = redis_store().await;
    let registry = keys::session_registry();

    store.hash_set(registry, "live", "").await.unwrap();
    store
        .set(&keys::session_marker("live"), "", Some(Duration::from_secs(60)))
        .await
        .unwrap();
    store.hash_set(registry, "lapsed", "").await.unwrap();

    assert!(!store.reap(registry, "live", &keys::session_marker("live")).await.unwrap());
    assert!(store.reap(registry, "lapsed", &keys::session_marker("lapsed")).await.unwrap());

    let remaining = store.hash_keys(registry).await.unwrap();
    assert_eq!(remaining, vec!["live".to_string()]);
}
