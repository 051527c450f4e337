//! The catalog port consumed by the storefront engines.

use async_trait::async_trait;
use thiserror::Error;

use storefront_core::{DomainError, ProductId};
use storefront_events::{FeedHandler, Subscription};

use crate::product::Product;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CatalogError {
    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Live product catalog.
///
/// `subscribe` pushes the latest known product list right away and again on
/// every catalog change. Lookups are async because real catalogs sit behind a
/// network hop.
#[async_trait]
pub trait CatalogStream: Send + Sync {
    fn subscribe(&self, handler: FeedHandler<Vec<Product>>) -> Subscription;

    async fn get_by_id(&self, id: ProductId) -> Result<Product, CatalogError>;

    /// Products for `ids` that exist, in request order. Unknown ids are
    /// skipped, not reported.
    async fn compare_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, CatalogError>;
}

#[async_trait]
impl<C> CatalogStream for std::sync::Arc<C>
where
    C: CatalogStream + ?Sized,
{
    fn subscribe(&self, handler: FeedHandler<Vec<Product>>) -> Subscription {
        (**self).subscribe(handler)
    }

    async fn get_by_id(&self, id: ProductId) -> Result<Product, CatalogError> {
        (**self).get_by_id(id).await
    }

    async fn compare_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, CatalogError> {
        (**self).compare_by_ids(ids).await
    }
}
