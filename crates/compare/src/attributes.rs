use serde::Serialize;

use crate::analyzer::Attribute;

/// Which comparison columns the shopper wants to see. All are visible by
/// default; re-enabling a column appends it at the end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeSelection {
    visible: Vec<Attribute>,
}

impl Default for AttributeSelection {
    fn default() -> Self {
        Self {
            visible: Attribute::ALL.to_vec(),
        }
    }
}

impl AttributeSelection {
    pub fn visible(&self) -> &[Attribute] {
        &self.visible
    }

    pub fn is_visible(&self, attribute: Attribute) -> bool {
        self.visible.contains(&attribute)
    }

    /// Flip visibility of `attribute`; returns whether it is now visible.
    pub fn toggle(&mut self, attribute: Attribute) -> bool {
        if self.is_visible(attribute) {
            self.visible.retain(|a| *a != attribute);
            false
        } else {
            self.visible.push(attribute);
            true
        }
    }
}
