use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::runtime::Handle;
use tracing::{info, warn};

use storefront_app::{Storefront, StorefrontConfig};
use storefront_catalog::{InMemoryCatalog, Product};
use storefront_compare::{Attribute, ScoreWeights};
use storefront_core::{CurrentIdentity, ProductId, UserId};
use storefront_rewards::InMemoryTransport;

fn demo_catalog() -> InMemoryCatalog {
    InMemoryCatalog::with_products(vec![
        Product::new("Cotton Tee", 19.9)
            .with_category("apparel")
            .with_brand("Acme")
            .with_discount(10.0),
        Product::new("Studio Headphones", 89.0)
            .with_category("audio")
            .with_brand("Sonique")
            .with_discount(25.0)
            .with_discount_rate(0.05),
        Product::new("Travel Headphones", 74.5)
            .with_category("audio")
            .with_brand("Acme")
            .with_discount(15.0)
            .with_discount_rate(0.1),
        Product::new("Canvas Tote", 12.0).with_category("apparel"),
    ])
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = StorefrontConfig::load().context("loading configuration")?;
    storefront_observability::init_with(&config.log);

    let catalog = Arc::new(demo_catalog());
    let transport = Arc::new(InMemoryTransport::new());
    let storefront = Storefront::new(config, catalog.clone(), transport.clone(), Handle::current())
        .context("wiring storefront")?;

    let shopper = CurrentIdentity::new(UserId::new(), "shopper@example.com");

    let session = storefront.comparison(&shopper).await;
    for id in [2, 3, 1] {
        let outcome = session.toggle_id(ProductId::new(id));
        if let Some(notice) = outcome.notice() {
            warn!(product_id = id, notice = %notice, "toggle not applied");
        }
    }
    session.toggle_attribute(Attribute::Article);
    println!("{}", serde_json::to_string_pretty(&session.view())?);

    // A price drop on the catalog side flows straight into the summary.
    catalog
        .update_product(
            ProductId::new(2),
            Product::new("Studio Headphones", 59.0)
                .with_category("audio")
                .with_brand("Sonique")
                .with_discount(30.0),
        )
        .context("updating demo product")?;
    if let Some(summary) = session.summary() {
        info!(
            cheapest = %summary.cheapest.name,
            best_discount = %summary.best_discount.name,
            "comparison summary after price change"
        );
    }
    for scored in session.weighted_scores(&ScoreWeights {
        price: Some(1.0),
        discount: Some(1.0),
        discount_rate: None,
    }) {
        println!("{:>20}  {:.3}", scored.product.name, scored.score);
    }

    let wheel = storefront.wheel(shopper.clone());
    match wheel.spin() {
        Ok(pending) => {
            info!(rotation = pending.rotation, "spinning");
            if let Some(outcome) = pending.outcome().await {
                println!("You won: {}", outcome.prize.label());
                if !outcome.prize.is_no_win() && !transport.wait_for(1, Duration::from_secs(2)).await {
                    warn!("prize notification not delivered in time");
                }
            }
        }
        Err(rejected) => warn!(reason = %rejected, "spin rejected"),
    }
    if let Err(rejected) = wheel.spin() {
        println!("Second spin: {rejected}");
    }

    for sent in transport.sent() {
        println!("--- to {} ---\n{}\n\n{}", sent.to, sent.subject, sent.body);
    }

    Ok(())
}
