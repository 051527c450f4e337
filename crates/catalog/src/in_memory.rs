//! In-memory catalog for tests/dev.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockWriteGuard};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use storefront_core::{DomainError, DomainResult, ProductId};
use storefront_events::{Feed, FeedHandler, InMemoryFeed, Subscription};

use crate::product::Product;
use crate::stream::{CatalogError, CatalogStream};

/// In-memory product catalog.
///
/// Every successful write republishes the full product list (ordered by id) to
/// subscribers. `set_unavailable` makes lookups fail, which lets callers
/// exercise their degraded paths.
#[derive(Debug)]
pub struct InMemoryCatalog {
    products: RwLock<BTreeMap<ProductId, Product>>,
    next_id: AtomicU64,
    feed: InMemoryFeed<Vec<Product>>,
    unavailable: AtomicBool,
}

impl InMemoryCatalog {
    /// Empty catalog. Nothing is published until the first write or
    /// `refresh()`.
    pub fn new() -> Self {
        Self {
            products: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            feed: InMemoryFeed::new(),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Catalog seeded with `products` and already published once.
    ///
    /// Products that carry an id keep it; the others get fresh ids.
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let catalog = Self::new();
        if let Ok(mut map) = catalog.products.write() {
            for mut p in products {
                let id = match p.id {
                    Some(id) => {
                        catalog.reserve(id);
                        id
                    }
                    None => match catalog.allocate_id() {
                        Some(id) => id,
                        None => {
                            warn!(name = %p.name, "product ids exhausted; seed product skipped");
                            continue;
                        }
                    },
                };
                p.id = Some(id);
                map.insert(id, p);
            }
        }
        catalog.refresh();
        catalog
    }

    /// Next free id, or `None` once the id space is used up.
    fn allocate_id(&self) -> Option<ProductId> {
        self.next_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_add(1))
            .ok()
            .map(ProductId::new)
    }

    /// Keep generated ids clear of an explicitly assigned one.
    fn reserve(&self, id: ProductId) {
        self.next_id.fetch_max(id.get().saturating_add(1), Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), CatalogError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CatalogError::Unavailable("catalog is offline".to_string()));
        }
        Ok(())
    }

    fn write(&self) -> DomainResult<RwLockWriteGuard<'_, BTreeMap<ProductId, Product>>> {
        self.products
            .write()
            .map_err(|_| DomainError::invariant("catalog lock poisoned"))
    }

    // Called with the write guard held, so subscribers see writes in the
    // order they were applied.
    fn stage(&self, map: &BTreeMap<ProductId, Product>) {
        let products: Vec<Product> = map.values().cloned().collect();
        debug!(count = products.len(), "publishing catalog");
        self.feed.stage(products);
    }

    /// Current products ordered by id.
    pub fn products(&self) -> DomainResult<Vec<Product>> {
        let map = self
            .products
            .read()
            .map_err(|_| DomainError::invariant("catalog lock poisoned"))?;
        Ok(map.values().cloned().collect())
    }

    /// Republish the current product list.
    ///
    /// A catalog whose lock was poisoned reports a failed refresh instead, so
    /// subscribers keep what they last saw.
    pub fn refresh(&self) {
        let staged = match self.products.read() {
            Ok(map) => {
                self.stage(&map);
                true
            }
            Err(_) => false,
        };
        if staged {
            self.feed.flush();
        } else {
            warn!("catalog lock poisoned; refresh reported as failed");
            self.feed.fail("catalog unavailable".to_string());
        }
    }

    /// Report a failed refresh to subscribers.
    pub fn fail_refresh(&self, reason: impl Into<String>) {
        self.feed.fail(reason.into());
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Persist a new product and assign its id.
    pub fn add_product(&self, mut product: Product) -> DomainResult<Product> {
        product.validate()?;
        {
            let mut map = self.write()?;
            let id = match product.id {
                Some(id) if map.contains_key(&id) => {
                    return Err(DomainError::conflict(format!("product {id} already exists")));
                }
                Some(id) => {
                    self.reserve(id);
                    id
                }
                None => self
                    .allocate_id()
                    .ok_or_else(|| DomainError::invalid_id("product ids exhausted"))?,
            };
            product.id = Some(id);
            map.insert(id, product.clone());
            self.stage(&map);
        }
        info!(product_id = ?product.id, name = %product.name, "product added");
        self.feed.flush();
        Ok(product)
    }

    /// Replace every field of product `id` with `details`.
    pub fn update_product(&self, id: ProductId, mut details: Product) -> DomainResult<Product> {
        details.validate()?;
        details.id = Some(id);
        {
            let mut map = self.write()?;
            let slot = map.get_mut(&id).ok_or_else(DomainError::not_found)?;
            *slot = details.clone();
            self.stage(&map);
        }
        info!(product_id = %id, "product updated");
        self.feed.flush();
        Ok(details)
    }

    pub fn delete_product(&self, id: ProductId) -> DomainResult<()> {
        {
            let mut map = self.write()?;
            if map.remove(&id).is_none() {
                return Err(DomainError::not_found());
            }
            self.stage(&map);
        }
        info!(product_id = %id, "product deleted");
        self.feed.flush();
        Ok(())
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogStream for InMemoryCatalog {
    fn subscribe(&self, handler: FeedHandler<Vec<Product>>) -> Subscription {
        self.feed.subscribe(handler)
    }

    async fn get_by_id(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.ensure_available()?;
        let map = self
            .products
            .read()
            .map_err(|_| CatalogError::Unavailable("catalog lock poisoned".to_string()))?;
        map.get(&id).cloned().ok_or(CatalogError::NotFound(id))
    }

    async fn compare_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, CatalogError> {
        self.ensure_available()?;
        let map = self
            .products
            .read()
            .map_err(|_| CatalogError::Unavailable("catalog lock poisoned".to_string()))?;
        Ok(ids.iter().filter_map(|id| map.get(id).cloned()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use storefront_events::FeedEvent;

    fn ids(products: &[Product]) -> Vec<u64> {
        products.iter().filter_map(|p| p.id.map(ProductId::get)).collect()
    }

    fn listen(catalog: &InMemoryCatalog) -> (Arc<Mutex<Vec<FeedEvent<Vec<Product>>>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = catalog.subscribe(Arc::new(move |ev: &FeedEvent<Vec<Product>>| {
            sink.lock().unwrap().push(ev.clone());
        }));
        (seen, sub)
    }

    #[test]
    fn add_product_assigns_sequential_ids() {
        let catalog = InMemoryCatalog::new();
        let a = catalog.add_product(Product::new("A", 1.0)).unwrap();
        let b = catalog.add_product(Product::new("B", 2.0)).unwrap();
        assert_eq!(a.id, Some(ProductId::new(1)));
        assert_eq!(b.id, Some(ProductId::new(2)));
    }

    #[test]
    fn seeded_ids_are_kept_and_new_ids_continue_after_them() {
        let catalog = InMemoryCatalog::with_products(vec![Product::new("A", 1.0).with_id(ProductId::new(10))]);
        let b = catalog.add_product(Product::new("B", 2.0)).unwrap();
        assert_eq!(b.id, Some(ProductId::new(11)));
    }

    #[test]
    fn add_product_rejects_invalid_and_duplicate_products() {
        let catalog = InMemoryCatalog::with_products(vec![Product::new("A", 1.0).with_id(ProductId::new(1))]);
        assert!(matches!(
            catalog.add_product(Product::new("", 1.0)),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            catalog.add_product(Product::new("A2", 1.0).with_id(ProductId::new(1))),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn every_write_republishes_the_catalog() {
        let catalog = InMemoryCatalog::new();
        let (seen, _sub) = listen(&catalog);

        let a = catalog.add_product(Product::new("A", 1.0)).unwrap();
        catalog.add_product(Product::new("B", 2.0)).unwrap();
        let a_id = a.id.unwrap();
        catalog.update_product(a_id, Product::new("A+", 3.0)).unwrap();
        catalog.delete_product(a_id).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        match seen.last().unwrap() {
            FeedEvent::Next(products) => assert_eq!(ids(products), vec![2]),
            other => panic!("expected Next, got {other:?}"),
        }
    }

    #[test]
    fn late_subscriber_gets_current_list_immediately() {
        let catalog = InMemoryCatalog::with_products(vec![Product::new("A", 1.0), Product::new("B", 2.0)]);
        let (seen, _sub) = listen(&catalog);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(matches!(&seen[0], FeedEvent::Next(p) if ids(p) == vec![1, 2]));
    }

    #[test]
    fn update_and_delete_of_unknown_product_are_not_found() {
        let catalog = InMemoryCatalog::new();
        assert_eq!(
            catalog.update_product(ProductId::new(9), Product::new("X", 1.0)),
            Err(DomainError::NotFound)
        );
        assert_eq!(catalog.delete_product(ProductId::new(9)), Err(DomainError::NotFound));
    }

    #[test]
    fn fail_refresh_reaches_subscribers() {
        let catalog = InMemoryCatalog::new();
        let (seen, _sub) = listen(&catalog);
        catalog.fail_refresh("502 from upstream");
        assert_eq!(
            *seen.lock().unwrap(),
            vec![FeedEvent::Error("502 from upstream".to_string())]
        );
    }

    #[test]
    fn largest_id_is_accepted_and_exhausts_generated_ids() {
        let catalog = InMemoryCatalog::new();
        let edge = catalog
            .add_product(Product::new("Edge", 1.0).with_id(ProductId::new(u64::MAX)))
            .unwrap();
        assert_eq!(edge.id, Some(ProductId::new(u64::MAX)));

        assert!(matches!(
            catalog.add_product(Product::new("Next", 1.0)),
            Err(DomainError::InvalidId(_))
        ));
        // The lock is still healthy.
        assert_eq!(ids(&catalog.products().unwrap()), vec![u64::MAX]);
    }

    #[test]
    fn seeding_the_largest_id_does_not_overflow() {
        let catalog =
            InMemoryCatalog::with_products(vec![Product::new("Edge", 1.0).with_id(ProductId::new(u64::MAX))]);
        assert_eq!(ids(&catalog.products().unwrap()), vec![u64::MAX]);
    }

    #[test]
    fn poisoned_catalog_reports_failure_instead_of_an_empty_list() {
        let catalog = Arc::new(InMemoryCatalog::with_products(vec![Product::new("A", 1.0)]));
        let (seen, _sub) = listen(&catalog);

        let poisoner = catalog.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.products.write().unwrap();
            panic!("writer died mid-update");
        })
        .join();

        catalog.refresh();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(matches!(&seen[1], FeedEvent::Error(_)));
        assert!(matches!(catalog.products(), Err(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn concurrent_writers_publish_in_write_order() {
        for _ in 0..50 {
            let catalog = Arc::new(InMemoryCatalog::new());
            let last = Arc::new(Mutex::new(Vec::new()));
            let sink = last.clone();
            let _sub = catalog.subscribe(Arc::new(move |ev: &FeedEvent<Vec<Product>>| {
                if let FeedEvent::Next(products) = ev {
                    *sink.lock().unwrap() = ids(products);
                }
            }));

            let workers: Vec<_> = (0..4)
                .map(|n| {
                    let catalog = catalog.clone();
                    std::thread::spawn(move || {
                        catalog.add_product(Product::new(format!("P{n}"), 1.0)).unwrap();
                    })
                })
                .collect();
            for worker in workers {
                worker.join().unwrap();
            }

            assert_eq!(*last.lock().unwrap(), vec![1, 2, 3, 4]);
        }
    }

    #[tokio::test]
    async fn get_by_id_finds_existing_product() {
        let catalog = InMemoryCatalog::with_products(vec![Product::new("A", 1.0)]);
        let product = catalog.get_by_id(ProductId::new(1)).await.unwrap();
        assert_eq!(product.name, "A");
        assert_eq!(
            catalog.get_by_id(ProductId::new(2)).await,
            Err(CatalogError::NotFound(ProductId::new(2)))
        );
    }

    #[tokio::test]
    async fn compare_by_ids_skips_unknown_ids_and_keeps_request_order() {
        let catalog = InMemoryCatalog::with_products(vec![
            Product::new("A", 1.0),
            Product::new("B", 2.0),
            Product::new("C", 3.0),
        ]);
        let found = catalog
            .compare_by_ids(&[ProductId::new(3), ProductId::new(7), ProductId::new(1)])
            .await
            .unwrap();
        assert_eq!(ids(&found), vec![3, 1]);
    }

    #[tokio::test]
    async fn unavailable_catalog_fails_lookups() {
        let catalog = InMemoryCatalog::with_products(vec![Product::new("A", 1.0)]);
        catalog.set_unavailable(true);
        assert!(matches!(
            catalog.get_by_id(ProductId::new(1)).await,
            Err(CatalogError::Unavailable(_))
        ));
        assert!(matches!(
            catalog.compare_by_ids(&[ProductId::new(1)]).await,
            Err(CatalogError::Unavailable(_))
        ));
    }
}
