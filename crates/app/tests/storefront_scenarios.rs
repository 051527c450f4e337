//! End-to-end scenarios across both engines, wired the way the demo binary
//! wires them.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use storefront_app::config::StorageConfig;
use storefront_app::{Storefront, StorefrontConfig, StorefrontError};
use storefront_catalog::{InMemoryCatalog, Product};
use storefront_compare::ToggleOutcome;
use storefront_core::{CurrentIdentity, ProductId, UserId};
use storefront_rewards::{InMemoryTransport, ManualScheduler, Prize, PrizeTable, SpinRejected, WheelPhase};

fn catalog(ids: &[u64]) -> Arc<InMemoryCatalog> {
    Arc::new(InMemoryCatalog::with_products(ids.iter().map(|id| {
        Product::new(format!("Product {id}"), 10.0 * *id as f64)
            .with_id(ProductId::new(*id))
            .with_discount(*id as f64)
    })))
}

fn file_config(path: &Path) -> StorefrontConfig {
    StorefrontConfig {
        storage: StorageConfig {
            path: Some(path.to_path_buf()),
        },
        ..StorefrontConfig::default()
    }
}

fn storefront(config: StorefrontConfig, catalog: Arc<InMemoryCatalog>, transport: Arc<InMemoryTransport>) -> Storefront {
    Storefront::new(config, catalog, transport, Handle::current()).unwrap()
}

#[tokio::test]
async fn comparison_survives_restart_and_is_reconciled() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    let shopper = CurrentIdentity::with_user(UserId::new());

    {
        let front = storefront(file_config(&state), catalog(&[1, 2, 3, 4]), Arc::new(InMemoryTransport::new()));
        let session = front.comparison(&shopper).await;
        for id in [2, 3, 4] {
            assert_eq!(session.toggle_id(ProductId::new(id)), ToggleOutcome::Added);
        }
    }

    // Product 4 was withdrawn while the shopper was away.
    let front = storefront(file_config(&state), catalog(&[1, 2, 3]), Arc::new(InMemoryTransport::new()));
    let session = front.comparison(&shopper).await;

    assert_eq!(session.selected_ids(), vec![ProductId::new(2), ProductId::new(3)]);
    let view = session.view();
    assert!(view.show_comparison);
    let summary = view.summary.unwrap();
    assert_eq!(summary.cheapest.id, Some(ProductId::new(2)));
    assert_eq!(summary.best_discount.id, Some(ProductId::new(3)));
}

#[tokio::test]
async fn wheel_is_single_use_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    let user = UserId::new();
    let scheduler = ManualScheduler::new();

    {
        let front = storefront(file_config(&state), catalog(&[1]), Arc::new(InMemoryTransport::new()))
            .with_scheduler(Arc::new(scheduler.clone()));
        let wheel = front.wheel(CurrentIdentity::with_user(user));
        wheel.spin().unwrap();
        assert_eq!(scheduler.pending_delays(), vec![Duration::from_millis(3000)]);
        scheduler.fire_all();
        assert_eq!(wheel.phase(), WheelPhase::Resolved);
    }

    let front = storefront(file_config(&state), catalog(&[1]), Arc::new(InMemoryTransport::new()))
        .with_scheduler(Arc::new(scheduler.clone()));
    let wheel = front.wheel(CurrentIdentity::with_user(user));
    assert_eq!(wheel.phase(), WheelPhase::Resolved);
    assert_eq!(wheel.spin().unwrap_err(), SpinRejected::AlreadySpun);

    wheel.reset();
    drop(wheel);
    let wheel = front.wheel(CurrentIdentity::with_user(user));
    assert_eq!(wheel.phase(), WheelPhase::Idle);
}

#[tokio::test]
async fn product_prize_email_names_the_catalog_product() {
    let transport = Arc::new(InMemoryTransport::new());
    let scheduler = ManualScheduler::new();
    let front = storefront(StorefrontConfig::default(), catalog(&[1, 2]), transport.clone())
        .with_scheduler(Arc::new(scheduler.clone()));

    let wheel = front
        .wheel(CurrentIdentity::new(UserId::new(), "winner@example.com"))
        .with_table(PrizeTable::new(vec![Prize::product(ProductId::new(2), "Free Headphones")]).unwrap());

    let pending = wheel.spin().unwrap();
    scheduler.fire_all();
    let outcome = pending.outcome().await.unwrap();
    assert_eq!(outcome.prize.label(), "Free Headphones");

    assert!(transport.wait_for(1, Duration::from_secs(1)).await);
    let sent = transport.sent();
    assert_eq!(sent[0].to, "winner@example.com");
    assert!(sent[0].body.contains("You have won a free Product 2 (ID: 2)."));
}

#[tokio::test]
async fn anonymous_shoppers_use_the_unscoped_selection() {
    let front = storefront(StorefrontConfig::default(), catalog(&[1, 2]), Arc::new(InMemoryTransport::new()));
    {
        let session = front.comparison(&CurrentIdentity::anonymous()).await;
        session.toggle_id(ProductId::new(1));
    }
    assert_eq!(front.persistence().load_selection(), vec![ProductId::new(1)]);

    let signed_in = front.comparison(&CurrentIdentity::with_user(UserId::new())).await;
    assert!(signed_in.selected_ids().is_empty());
}

#[tokio::test]
async fn invalid_config_is_rejected_at_wiring() {
    let mut config = StorefrontConfig::default();
    config.wheel.reveal_delay_ms = 120_000;
    let result = Storefront::new(
        config,
        catalog(&[]),
        Arc::new(InMemoryTransport::new()),
        Handle::current(),
    );
    assert!(matches!(result, Err(StorefrontError::Config(_))));
}

#[tokio::test(start_paused = true)]
async fn configured_delay_drives_the_tokio_reveal() {
    let mut config = StorefrontConfig::default();
    config.wheel.reveal_delay_ms = 500;
    let front = storefront(config, catalog(&[]), Arc::new(InMemoryTransport::new()));
    let wheel = front
        .wheel(CurrentIdentity::with_user(UserId::new()))
        .with_table(PrizeTable::new(vec![Prize::coupon("NONE", "Nothing")]).unwrap());

    let pending = wheel.spin().unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(wheel.phase(), WheelPhase::Spinning);

    let outcome = pending.outcome().await.unwrap();
    assert!(outcome.prize.is_no_win());
    assert_eq!(wheel.phase(), WheelPhase::Resolved);
}
