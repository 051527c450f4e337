//! "Best value" analysis over the products being compared.
//!
//! Everything here is a pure function of the member list; the manager calls it
//! again after every change.

use serde::{Deserialize, Serialize};

use storefront_catalog::Product;

/// A column of the comparison table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Attribute {
    Image,
    Price,
    Brand,
    Category,
    Discount,
    DiscountRate,
    Article,
}

impl Attribute {
    pub const ALL: [Attribute; 7] = [
        Attribute::Image,
        Attribute::Price,
        Attribute::Brand,
        Attribute::Category,
        Attribute::Discount,
        Attribute::DiscountRate,
        Attribute::Article,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Attribute::Image => "Image",
            Attribute::Price => "Price",
            Attribute::Brand => "Brand",
            Attribute::Category => "Category",
            Attribute::Discount => "Discount",
            Attribute::DiscountRate => "Discount rate",
            Attribute::Article => "Article",
        }
    }

    /// Numeric value compared for this attribute, if it is comparable at all.
    fn value(self, product: &Product) -> Option<f64> {
        match self {
            Attribute::Price => Some(product.price),
            Attribute::Discount => Some(product.discount),
            Attribute::DiscountRate => Some(product.discount_rate),
            Attribute::Image | Attribute::Brand | Attribute::Category | Attribute::Article => None,
        }
    }

    /// Lower is better for price; higher is better for discounts.
    fn lower_is_better(self) -> bool {
        self == Attribute::Price
    }
}

/// Cheapest and best-discounted members. Only defined for two or more members.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSummary {
    pub cheapest: Product,
    pub best_discount: Product,
}

/// Per-criterion weights for [`ComparisonAnalyzer::weighted_scores`]. A
/// criterion without a weight does not contribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreWeights {
    pub price: Option<f64>,
    pub discount: Option<f64>,
    pub discount_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredProduct {
    pub product: Product,
    pub score: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ComparisonAnalyzer<'a> {
    members: &'a [Product],
}

impl<'a> ComparisonAnalyzer<'a> {
    pub fn new(members: &'a [Product]) -> Self {
        Self { members }
    }

    /// The extreme value of `attribute` across members (min price, max
    /// discount). `None` for non-numeric attributes or an empty set.
    pub fn best_value(&self, attribute: Attribute) -> Option<f64> {
        let values = self.members.iter().filter_map(|p| attribute.value(p));
        if attribute.lower_is_better() {
            values.reduce(f64::min)
        } else {
            values.reduce(f64::max)
        }
    }

    /// Whether `product` holds the best value of `attribute`.
    ///
    /// Ties flag every tied member. With fewer than two members nothing is
    /// flagged.
    pub fn is_best_value(&self, attribute: Attribute, product: &Product) -> bool {
        if self.members.len() < 2 {
            return false;
        }
        match (attribute.value(product), self.best_value(attribute)) {
            (Some(value), Some(best)) => value == best,
            _ => false,
        }
    }

    /// Cheapest and best-discounted members; the earliest member wins ties.
    pub fn summary(&self) -> Option<ComparisonSummary> {
        if self.members.len() < 2 {
            return None;
        }
        let (first, rest) = self.members.split_first()?;
        let mut cheapest = first;
        let mut best_discount = first;
        for p in rest {
            if p.price < cheapest.price {
                cheapest = p;
            }
            if p.discount > best_discount.discount {
                best_discount = p;
            }
        }
        Some(ComparisonSummary {
            cheapest: cheapest.clone(),
            best_discount: best_discount.clone(),
        })
    }

    /// Score each member against the set maxima:
    /// `w_price·(1 − price/max) + w_discount·(discount/max) + w_rate·(rate/max)`.
    ///
    /// A ratio against a zero maximum counts as 0.
    pub fn weighted_scores(&self, weights: &ScoreWeights) -> Vec<ScoredProduct> {
        let max_price = self.max_of(|p| p.price);
        let max_discount = self.max_of(|p| p.discount);
        let max_rate = self.max_of(|p| p.discount_rate);

        self.members
            .iter()
            .map(|p| {
                let mut score = 0.0;
                if let Some(w) = weights.price {
                    score += w * (1.0 - ratio(p.price, max_price));
                }
                if let Some(w) = weights.discount {
                    score += w * ratio(p.discount, max_discount);
                }
                if let Some(w) = weights.discount_rate {
                    score += w * ratio(p.discount_rate, max_rate);
                }
                ScoredProduct {
                    product: p.clone(),
                    score,
                }
            })
            .collect()
    }

    fn max_of(&self, f: impl Fn(&Product) -> f64) -> f64 {
        self.members.iter().map(f).fold(0.0, f64::max)
    }
}

fn ratio(value: f64, max: f64) -> f64 {
    if max > 0.0 { value / max } else { 0.0 }
}
