use serde::{Deserialize, Serialize};

use storefront_core::ProductId;

/// Maximum number of products compared side by side.
pub const COMPARISON_LIMIT: usize = 4;

/// Result of toggling a product in or out of the comparison.
///
/// `LimitReached` and `MissingIdentifier` are user-facing conditions, not
/// errors: the set is left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleOutcome {
    Added,
    Removed,
    LimitReached,
    MissingIdentifier,
}

impl ToggleOutcome {
    /// Whether the set changed.
    pub fn changed(self) -> bool {
        matches!(self, ToggleOutcome::Added | ToggleOutcome::Removed)
    }

    /// Message to show the shopper, if any.
    pub fn notice(self) -> Option<String> {
        match self {
            ToggleOutcome::LimitReached => Some(format!(
                "You can compare up to {COMPARISON_LIMIT} products at a time."
            )),
            ToggleOutcome::MissingIdentifier => {
                Some("This product cannot be compared yet.".to_string())
            }
            ToggleOutcome::Added | ToggleOutcome::Removed => None,
        }
    }
}

/// Ordered selection of product ids.
///
/// Invariants: at most [`COMPARISON_LIMIT`] entries, no duplicates, insertion
/// order preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComparisonSet {
    ids: Vec<ProductId>,
}

impl ComparisonSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from arbitrary ids: duplicates are dropped and anything
    /// beyond the limit is ignored.
    pub fn from_ids(ids: impl IntoIterator<Item = ProductId>) -> Self {
        let mut set = Self::new();
        for id in ids {
            if set.is_full() {
                break;
            }
            if !set.contains(id) {
                set.ids.push(id);
            }
        }
        set
    }

    pub fn ids(&self) -> &[ProductId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ids.len() >= COMPARISON_LIMIT
    }

    pub fn contains(&self, id: ProductId) -> bool {
        self.ids.contains(&id)
    }

    pub fn toggle(&mut self, id: ProductId) -> ToggleOutcome {
        if let Some(pos) = self.ids.iter().position(|x| *x == id) {
            self.ids.remove(pos);
            ToggleOutcome::Removed
        } else if self.is_full() {
            ToggleOutcome::LimitReached
        } else {
            self.ids.push(id);
            ToggleOutcome::Added
        }
    }

    /// Remove `id`; returns whether it was present.
    pub fn remove(&mut self, id: ProductId) -> bool {
        let before = self.ids.len();
        self.ids.retain(|x| *x != id);
        self.ids.len() != before
    }

    /// Keep only ids accepted by `keep`; returns how many were dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(ProductId) -> bool) -> usize {
        let before = self.ids.len();
        self.ids.retain(|id| keep(*id));
        before - self.ids.len()
    }
}
