//! A shopper's live comparison session.
//!
//! Startup order:
//! 1. restore the persisted selection ids (scoped to the shopper)
//! 2. rehydrate them into products through `compare_by_ids`
//! 3. subscribe to the catalog; every emission reconciles the selection
//!
//! The catalog subscription lives exactly as long as the session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{info, warn};

use storefront_catalog::{CatalogStream, Product, categories, filter_by_category};
use storefront_core::{CurrentIdentity, ProductId};
use storefront_events::{FeedEvent, FeedHandler, Subscription};
use storefront_infra::PersistenceAdapter;

use crate::analyzer::{Attribute, ComparisonSummary, ScoreWeights, ScoredProduct};
use crate::attributes::AttributeSelection;
use crate::manager::ComparisonSetManager;
use crate::selection::{COMPARISON_LIMIT, ToggleOutcome};

/// Snapshot handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonView {
    pub members: Vec<Product>,
    pub summary: Option<ComparisonSummary>,
    pub show_comparison: bool,
    pub limit: usize,
    pub visible_attributes: Vec<Attribute>,
    pub catalog_error: Option<String>,
}

#[derive(Debug)]
struct SessionState {
    manager: ComparisonSetManager,
    catalog: Vec<Product>,
    catalog_error: Option<String>,
    attributes: AttributeSelection,
    category: Option<String>,
}

impl SessionState {
    fn on_catalog(&mut self, event: &FeedEvent<Vec<Product>>) {
        match event {
            FeedEvent::Next(products) => {
                self.catalog = products.iter().filter(|p| p.id.is_some()).cloned().collect();
                self.catalog_error = None;
                self.manager.reconcile(&self.catalog);
            }
            FeedEvent::Error(message) => {
                warn!(error = %message, "catalog refresh failed; keeping current selection");
                self.catalog_error = Some(message.clone());
            }
        }
    }
}

pub struct ComparisonSession {
    state: Arc<Mutex<SessionState>>,
    subscription: Option<Subscription>,
}

impl ComparisonSession {
    pub async fn start<C>(catalog: &C, persistence: PersistenceAdapter, identity: &CurrentIdentity) -> Self
    where
        C: CatalogStream + ?Sized,
    {
        let mut manager = ComparisonSetManager::new(persistence.scoped_to(identity.user_id()));

        let restored = manager.restore();
        if !restored.is_empty() {
            match catalog.compare_by_ids(&restored).await {
                Ok(products) => manager.hydrate(products),
                Err(e) => warn!(error = %e, "failed to rehydrate comparison; waiting for catalog"),
            }
        }

        let state = Arc::new(Mutex::new(SessionState {
            manager,
            catalog: Vec::new(),
            catalog_error: None,
            attributes: AttributeSelection::default(),
            category: None,
        }));

        let sink = Arc::clone(&state);
        let handler: FeedHandler<Vec<Product>> = Arc::new(move |event: &FeedEvent<Vec<Product>>| {
            lock(&sink).on_catalog(event);
        });
        let subscription = catalog.subscribe(handler);

        info!(
            user = ?identity.user_id(),
            restored = restored.len(),
            "comparison session started"
        );

        Self {
            state,
            subscription: Some(subscription),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        lock(&self.state)
    }

    pub fn toggle(&self, product: &Product) -> ToggleOutcome {
        self.state().manager.toggle(product)
    }

    /// Toggle a catalog product by id; unknown ids count as not comparable.
    pub fn toggle_id(&self, id: ProductId) -> ToggleOutcome {
        let mut state = self.state();
        let product = state.catalog.iter().find(|p| p.id == Some(id)).cloned();
        match product {
            Some(p) => state.manager.toggle(&p),
            None if state.manager.contains(id) => {
                state.manager.remove(id);
                ToggleOutcome::Removed
            }
            None => ToggleOutcome::MissingIdentifier,
        }
    }

    pub fn remove(&self, id: ProductId) {
        self.state().manager.remove(id);
    }

    pub fn selected_ids(&self) -> Vec<ProductId> {
        self.state().manager.ids().to_vec()
    }

    pub fn is_selected(&self, product: &Product) -> bool {
        self.state().manager.is_selected(product)
    }

    pub fn is_best_value(&self, attribute: Attribute, product: &Product) -> bool {
        self.state().manager.is_best_value(attribute, product)
    }

    pub fn summary(&self) -> Option<ComparisonSummary> {
        self.state().manager.summary().cloned()
    }

    pub fn weighted_scores(&self, weights: &ScoreWeights) -> Vec<ScoredProduct> {
        self.state().manager.weighted_scores(weights)
    }

    pub fn toggle_attribute(&self, attribute: Attribute) -> bool {
        self.state().attributes.toggle(attribute)
    }

    /// Latest catalog, restricted to products that have an id.
    pub fn catalog(&self) -> Vec<Product> {
        self.state().catalog.clone()
    }

    pub fn categories(&self) -> Vec<String> {
        categories(&self.state().catalog)
    }

    pub fn select_category(&self, category: Option<String>) {
        self.state().category = category;
    }

    /// Catalog products in the selected category (all when none is selected).
    pub fn visible_products(&self) -> Vec<Product> {
        let state = self.state();
        filter_by_category(&state.catalog, state.category.as_deref())
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn view(&self) -> ComparisonView {
        let state = self.state();
        ComparisonView {
            members: state.manager.members(),
            summary: state.manager.summary().cloned(),
            show_comparison: state.manager.show_comparison(),
            limit: COMPARISON_LIMIT,
            visible_attributes: state.attributes.visible().to_vec(),
            catalog_error: state.catalog_error.clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    /// Detach from the catalog. Later catalog changes no longer reach this
    /// session.
    pub fn close(&mut self) {
        if let Some(sub) = self.subscription.take() {
            sub.unsubscribe();
            info!("comparison session closed");
        }
    }
}

impl Drop for ComparisonSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl core::fmt::Debug for ComparisonSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ComparisonSession")
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
