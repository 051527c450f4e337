use rand::Rng;
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, ProductId};

/// Coupon code of the "no win" segment.
pub const NO_WIN_CODE: &str = "NONE";

/// A wheel segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Prize {
    Discount { percent: u8, label: String },
    #[serde(rename_all = "camelCase")]
    Product { catalog_id: ProductId, label: String },
    Coupon { code: String, label: String },
}

impl Prize {
    pub fn discount(percent: u8) -> Self {
        Prize::Discount {
            percent,
            label: format!("{percent}% Off"),
        }
    }

    pub fn product(catalog_id: ProductId, label: impl Into<String>) -> Self {
        Prize::Product {
            catalog_id,
            label: label.into(),
        }
    }

    pub fn coupon(code: impl Into<String>, label: impl Into<String>) -> Self {
        Prize::Coupon {
            code: code.into(),
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Prize::Discount { label, .. } | Prize::Product { label, .. } | Prize::Coupon { label, .. } => label,
        }
    }

    /// The sentinel segment: landing on it wins nothing and sends nothing.
    pub fn is_no_win(&self) -> bool {
        matches!(self, Prize::Coupon { code, .. } if code == NO_WIN_CODE)
    }
}

/// The wheel's segments, in display order. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrizeTable {
    prizes: Vec<Prize>,
}

impl PrizeTable {
    pub fn new(prizes: Vec<Prize>) -> DomainResult<Self> {
        if prizes.is_empty() {
            return Err(DomainError::validation("prize table cannot be empty"));
        }
        Ok(Self { prizes })
    }

    pub fn len(&self) -> usize {
        self.prizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prizes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Prize> {
        self.prizes.get(index)
    }

    pub fn prizes(&self) -> &[Prize] {
        &self.prizes
    }

    /// Pick a segment uniformly at random.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> (usize, &Prize) {
        let index = rng.gen_range(0..self.prizes.len());
        (index, &self.prizes[index])
    }

    /// Angle covered by one segment, in degrees.
    pub fn segment_angle(&self) -> f64 {
        360.0 / self.prizes.len() as f64
    }

    /// Final wheel rotation that lands the pointer in the middle of segment
    /// `index` after `turns` full turns.
    pub fn rotation_for(&self, index: usize, turns: f64) -> f64 {
        let segment = self.segment_angle();
        turns * 360.0 + index as f64 * segment + segment / 2.0
    }
}

impl Default for PrizeTable {
    fn default() -> Self {
        Self {
            prizes: vec![
                Prize::discount(10),
                Prize::discount(20),
                Prize::discount(50),
                Prize::product(ProductId::new(1), "Free T-Shirt"),
                Prize::product(ProductId::new(2), "Free Headphones"),
                Prize::coupon("FREESHIP", "Free Shipping"),
                Prize::coupon("SUMMER20", "20% Off Coupon"),
                Prize::coupon(NO_WIN_CODE, "Nothing"),
            ],
        }
    }
}
