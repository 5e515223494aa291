//! Integration tests for the purchase unit of work against the in-memory
//! ledger.

mod helpers;

use std::time::Duration;

use futures::future::join_all;

use freemarket_core::error::ErrorKind;
use freemarket_core::types::{ItemId, UserId};
use freemarket_database::ledger::{InventoryLedger, LedgerTransaction};
use freemarket_entity::item::UpdateItem;
use freemarket_service::PurchaseError;

use helpers::TestMarket;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stock_never_goes_negative_under_concurrency() {
    let market = TestMarket::new();
    let buyer = market.buyer("buyer@example.com");
    let item = market.item("Kettle", 2500, 10);

    let tasks = (0..40).map(|_| {
        let orchestrator = market.orchestrator.clone();
        tokio::spawn(async move { orchestrator.purchase(buyer, item, 1).await })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.expect("task panicked"))
        .collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 9);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, PurchaseError::InsufficientStock { .. }))
    );
    assert_eq!(market.stock(item), 1);
    assert_eq!(market.ledger.purchase_count_for(item), 9);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stock_accounting_with_multi_unit_requests() {
    let market = TestMarket::new();
    let buyer = market.buyer("buyer@example.com");
    let item = market.item("Kettle", 2500, 10);

    let tasks = (0..10).map(|_| {
        let orchestrator = market.orchestrator.clone();
        tokio::spawn(async move { orchestrator.purchase(buyer, item, 2).await })
    });
    let succeeded = join_all(tasks)
        .await
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(_))))
        .count();

    assert_eq!(succeeded, 4);
    assert_eq!(market.stock(item), 2);

    let sold: i64 = market
        .orchestrator
        .list_purchases(buyer)
        .await
        .unwrap()
        .iter()
        .map(|r| r.quantity)
        .sum();
    assert_eq!(sold + market.stock(item), 10);
}

#[tokio::test]
async fn test_failed_commit_changes_nothing() {
    let market = TestMarket::new();
    let buyer = market.buyer("buyer@example.com");
    let item = market.item("Kettle", 2500, 10);
    market.ledger.fail_next_commits(1);

    let err = market.orchestrator.purchase(buyer, item, 3).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TransactionAborted);
    assert_eq!(market.stock(item), 10);
    assert_eq!(market.ledger.purchase_count(), 0);

    market.orchestrator.purchase(buyer, item, 3).await.unwrap();
    assert_eq!(market.stock(item), 7);
}

#[tokio::test]
async fn test_unknown_buyer_changes_nothing() {
    let market = TestMarket::new();
    let item = market.item("Kettle", 2500, 10);

    let err = market
        .orchestrator
        .purchase(UserId(4242), item, 1)
        .await
        .unwrap_err();

    assert!(matches!(err, PurchaseError::UserNotFound(_)));
    assert_eq!(market.stock(item), 10);
    assert_eq!(market.ledger.purchase_count(), 0);
}

#[tokio::test]
async fn test_buying_entire_stock_is_rejected() {
    let market = TestMarket::new();
    let buyer = market.buyer("buyer@example.com");
    let item = market.item("Kettle", 2500, 5);

    let err = market.orchestrator.purchase(buyer, item, 5).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientStock);

    market.orchestrator.purchase(buyer, item, 4).await.unwrap();
    assert_eq!(market.stock(item), 1);
}

#[tokio::test]
async fn test_price_is_snapshotted_at_purchase_time() {
    let market = TestMarket::new();
    let buyer = market.buyer("buyer@example.com");
    let item = market.item("Kettle", 2500, 10);

    let record = market.orchestrator.purchase(buyer, item, 2).await.unwrap();
    assert_eq!(record.total_price, 5000);

    market
        .items
        .update(
            item,
            market.seller,
            UpdateItem {
                price: Some(9900),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let reread = market
        .orchestrator
        .find_purchase(buyer, record.id)
        .await
        .unwrap();
    assert_eq!(reread.price, 2500);
    assert_eq!(reread.total_price, 5000);
    assert_eq!(reread.item.price, 9900);

    let second = market.orchestrator.purchase(buyer, item, 3).await.unwrap();
    assert_eq!(second.price, 9900);
    assert_eq!(second.total_price, 9900 * 3);
    assert_eq!(market.stock(item), 5);

    let history = market.orchestrator.list_purchases(buyer).await.unwrap();
    let totals: Vec<i64> = history.iter().map(|record| record.total_price).collect();
    assert_eq!(totals, vec![29700, 5000]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_contested_stock_rejects_both() {
    let market = TestMarket::new();
    let first = market.buyer("first@example.com");
    let second = market.buyer("second@example.com");
    let item = market.item("Kettle", 2500, 5);

    let a = market.orchestrator.clone();
    let b = market.orchestrator.clone();
    let (ra, rb) = tokio::join!(
        tokio::spawn(async move { a.purchase(first, item, 5).await }),
        tokio::spawn(async move { b.purchase(second, item, 5).await }),
    );

    assert!(matches!(ra.unwrap(), Err(PurchaseError::InsufficientStock { .. })));
    assert!(matches!(rb.unwrap(), Err(PurchaseError::InsufficientStock { .. })));
    assert_eq!(market.stock(item), 5);
    assert_eq!(market.ledger.purchase_count(), 0);
}

#[tokio::test]
async fn test_disjoint_items_do_not_contend() {
    let market = TestMarket::new();
    let buyer = market.buyer("buyer@example.com");
    let kettle = market.item("Kettle", 2500, 5);
    let toaster = market.item("Toaster", 4000, 5);

    // Hold the kettle row; a toaster purchase must still go through.
    let mut holder = market.ledger.begin(Duration::from_secs(60)).await.unwrap();
    holder.lock_item(kettle).await.unwrap().unwrap();

    let record = tokio::time::timeout(
        Duration::from_secs(1),
        market.orchestrator.purchase(buyer, toaster, 2),
    )
    .await
    .expect("purchase of an unlocked item must not wait")
    .unwrap();
    assert_eq!(record.item_id, toaster);

    holder.rollback().await.unwrap();
    market.orchestrator.purchase(buyer, kettle, 2).await.unwrap();
    assert_eq!(market.stock(kettle), 3);
    assert_eq!(market.stock(toaster), 3);
}

#[tokio::test]
async fn test_nonexistent_item_is_not_found() {
    let market = TestMarket::new();
    let buyer = market.buyer("buyer@example.com");

    let err = market
        .orchestrator
        .purchase(buyer, ItemId(999_999), 1)
        .await
        .unwrap_err();

    assert!(matches!(err, PurchaseError::ItemNotFound(ItemId(999_999))));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(market.ledger.purchase_count(), 0);
}

#[tokio::test]
async fn test_deleted_item_cannot_be_bought() {
    let market = TestMarket::new();
    let buyer = market.buyer("buyer@example.com");
    let item = market.item("Kettle", 2500, 5);

    market.items.delete(item, market.seller).await.unwrap();

    let err = market.orchestrator.purchase(buyer, item, 1).await.unwrap_err();
    assert!(matches!(err, PurchaseError::ItemNotFound(_)));
    assert_eq!(market.stock(item), 5);
}

#[tokio::test(start_paused = true)]
async fn test_owner_update_waits_for_row_lock() {
    let market = TestMarket::new();
    let item = market.item("Kettle", 2500, 5);

    let mut holder = market.ledger.begin(Duration::from_secs(60)).await.unwrap();
    holder.lock_item(item).await.unwrap().unwrap();

    let update = market.items.update(
        item,
        market.seller,
        UpdateItem {
            quantity: Some(8),
            ..Default::default()
        },
    );
    let waited = tokio::time::timeout(Duration::from_millis(200), update).await;
    assert!(waited.is_err());
    assert_eq!(market.stock(item), 5);

    drop(holder);
    market
        .items
        .update(
            item,
            market.seller,
            UpdateItem {
                quantity: Some(8),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(market.stock(item), 8);
}
