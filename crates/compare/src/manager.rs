use std::collections::HashMap;

use tracing::{debug, info, warn};

use storefront_catalog::Product;
use storefront_core::ProductId;
use storefront_infra::PersistenceAdapter;

use crate::analyzer::{Attribute, ComparisonAnalyzer, ComparisonSummary, ScoreWeights, ScoredProduct};
use crate::selection::{ComparisonSet, ToggleOutcome};

/// Owner of one shopper's comparison selection.
///
/// The set holds ids only; the manager keeps the latest known value of each
/// member so the analyzer always works on live catalog data. Every mutation
/// recomputes the summary and, when the set changed or was reconciled, writes
/// the selection through the persistence adapter.
#[derive(Debug)]
pub struct ComparisonSetManager {
    set: ComparisonSet,
    products: HashMap<ProductId, Product>,
    persistence: PersistenceAdapter,
    summary: Option<ComparisonSummary>,
}

impl ComparisonSetManager {
    pub fn new(persistence: PersistenceAdapter) -> Self {
        Self {
            set: ComparisonSet::new(),
            products: HashMap::new(),
            persistence,
            summary: None,
        }
    }

    /// Load the persisted selection ids into the set (values unknown until
    /// `hydrate` or `reconcile`). Returns the restored ids.
    pub fn restore(&mut self) -> Vec<ProductId> {
        self.set = ComparisonSet::from_ids(self.persistence.load_selection());
        self.products.clear();
        self.recompute();
        debug!(restored = self.set.len(), "restored comparison selection");
        self.set.ids().to_vec()
    }

    /// Replace the selection with rehydrated products (the catalog's answer
    /// for the restored ids).
    pub fn hydrate(&mut self, products: Vec<Product>) {
        let with_ids: Vec<(ProductId, Product)> = products
            .into_iter()
            .filter_map(|p| p.id.map(|id| (id, p)))
            .collect();
        self.set = ComparisonSet::from_ids(with_ids.iter().map(|(id, _)| *id));
        self.products = with_ids
            .into_iter()
            .filter(|(id, _)| self.set.contains(*id))
            .collect();
        self.recompute();
    }

    pub fn toggle(&mut self, product: &Product) -> ToggleOutcome {
        let Some(id) = product.id else {
            warn!(name = %product.name, "product without id cannot be compared");
            return ToggleOutcome::MissingIdentifier;
        };

        let outcome = self.set.toggle(id);
        match outcome {
            ToggleOutcome::Added => {
                self.products.insert(id, product.clone());
            }
            ToggleOutcome::Removed => {
                self.products.remove(&id);
            }
            ToggleOutcome::LimitReached => {
                info!(product_id = %id, "comparison limit reached");
            }
            ToggleOutcome::MissingIdentifier => {}
        }

        if outcome.changed() {
            self.recompute();
            self.persist();
        }
        outcome
    }

    /// Remove `id` if selected.
    pub fn remove(&mut self, id: ProductId) {
        if self.set.remove(id) {
            self.products.remove(&id);
            self.recompute();
            self.persist();
        }
    }

    /// Drop members missing from `catalog` and refresh member values from it.
    pub fn reconcile(&mut self, catalog: &[Product]) {
        let live: HashMap<ProductId, &Product> = catalog
            .iter()
            .filter_map(|p| p.id.map(|id| (id, p)))
            .collect();

        let dropped = self.set.retain(|id| live.contains_key(&id));
        if dropped > 0 {
            info!(dropped, remaining = self.set.len(), "dropped products no longer in catalog");
        }

        self.products = self
            .set
            .ids()
            .iter()
            .filter_map(|id| live.get(id).map(|p| (*id, (*p).clone())))
            .collect();

        self.recompute();
        self.persist();
    }

    pub fn ids(&self) -> &[ProductId] {
        self.set.ids()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn contains(&self, id: ProductId) -> bool {
        self.set.contains(id)
    }

    pub fn is_selected(&self, product: &Product) -> bool {
        product.id.is_some_and(|id| self.set.contains(id))
    }

    /// Members with known values, in selection order.
    pub fn members(&self) -> Vec<Product> {
        self.set
            .ids()
            .iter()
            .filter_map(|id| self.products.get(id).cloned())
            .collect()
    }

    pub fn summary(&self) -> Option<&ComparisonSummary> {
        self.summary.as_ref()
    }

    /// The comparison table is worth showing once two selected products have
    /// known values.
    pub fn show_comparison(&self) -> bool {
        self.set
            .ids()
            .iter()
            .filter(|id| self.products.contains_key(*id))
            .nth(1)
            .is_some()
    }

    pub fn is_best_value(&self, attribute: Attribute, product: &Product) -> bool {
        let members = self.members();
        ComparisonAnalyzer::new(&members).is_best_value(attribute, product)
    }

    pub fn weighted_scores(&self, weights: &ScoreWeights) -> Vec<ScoredProduct> {
        let members = self.members();
        ComparisonAnalyzer::new(&members).weighted_scores(weights)
    }

    fn recompute(&mut self) {
        let members = self.members();
        self.summary = ComparisonAnalyzer::new(&members).summary();
    }

    fn persist(&self) {
        self.persistence.save_selection(self.set.ids());
    }
}
