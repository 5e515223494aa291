//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use freemarket_auth::SessionAdmissionController;
use freemarket_core::config::{AdmissionMode, PurchaseConfig, SessionConfig};
use freemarket_core::traits::CapacityStore;
use freemarket_core::types::{ItemId, UserId};
use freemarket_entity::item::CreateItem;
use freemarket_service::{ItemService, MemoryInventoryLedger, PurchaseOrchestrator};
use freemarket_store::keys;
use freemarket_store::memory::MemoryCapacityStore;

/// In-memory marketplace with one seller.
pub struct TestMarket {
    /// Ledger for direct inspection
    pub ledger: MemoryInventoryLedger,
    /// Purchase orchestrator under test
    pub orchestrator: Arc<PurchaseOrchestrator>,
    /// Item service under test
    pub items: ItemService,
    /// Seller owning every seeded item
    pub seller: UserId,
}

impl TestMarket {
    /// Create a market with the default purchase timeout
    pub fn new() -> Self {
        Self::with_config(PurchaseConfig::default())
    }

    /// Create a market with an explicit purchase configuration
    pub fn with_config(config: PurchaseConfig) -> Self {
        let ledger = MemoryInventoryLedger::new();
        let seller = ledger.seed_user("seller@example.com").id;
        let shared = Arc::new(ledger.clone());
        Self {
            orchestrator: Arc::new(PurchaseOrchestrator::new(shared.clone(), &config)),
            items: ItemService::new(shared, &config),
            ledger,
            seller,
        }
    }

    /// Add a buyer
    pub fn buyer(&self, email: &str) -> UserId {
        self.ledger.seed_user(email).id
    }

    /// List an item with the given price and stock
    pub fn item(&self, name: &str, price: i64, quantity: i64) -> ItemId {
        let data = CreateItem {
            name: name.to_string(),
            price,
            description: format!("{name} for sale"),
            quantity,
        };
        self.ledger.seed_item(self.seller, &data).id
    }

    /// Committed stock of an item
    pub fn stock(&self, item: ItemId) -> i64 {
        self.ledger.item(item).map(|i| i.quantity).unwrap_or(-1)
    }
}

/// Build an admission controller over a fresh in-memory store with the
/// limit already stored.
pub async fn admission(
    limit: u32,
    config: SessionConfig,
) -> (Arc<MemoryCapacityStore>, Arc<SessionAdmissionController>) {
    let store = Arc::new(MemoryCapacityStore::new());
    store
        .set(keys::session_limit(), &limit.to_string(), None)
        .await
        .expect("Failed to store limit");
    let controller = SessionAdmissionController::new(store.clone(), config)
        .await
        .expect("Failed to create controller");
    (store, Arc::new(controller))
}

/// Session configuration for the given mode, defaults otherwise
pub fn session_config(mode: AdmissionMode) -> SessionConfig {
    SessionConfig {
        admission_mode: mode,
        ..SessionConfig::default()
    }
}
