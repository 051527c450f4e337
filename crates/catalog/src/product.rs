use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, ProductId};

/// Image shown when a product has no usable remote image.
pub const DEFAULT_PRODUCT_IMAGE: &str = "assets/images/default-product.jpg";

/// A catalog product as the storefront sees it.
///
/// `id` stays `None` until the catalog persists the product; such products can
/// be listed but never compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ProductId>,
    pub name: String,
    pub price: f64,
    /// Discount in percent (0..=100).
    #[serde(default)]
    pub discount: f64,
    /// Secondary discount rate offered on top of `discount`.
    #[serde(default)]
    pub discount_rate: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub article: String,
}

impl Product {
    /// Unpersisted product with only the required fields set.
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            price,
            discount: 0.0,
            discount_rate: 0.0,
            category: String::new(),
            brand: String::new(),
            image: String::new(),
            article: String::new(),
        }
    }

    pub fn with_id(mut self, id: ProductId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_discount(mut self, discount: f64) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_discount_rate(mut self, discount_rate: f64) -> Self {
        self.discount_rate = discount_rate;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = brand.into();
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_article(mut self, article: impl Into<String>) -> Self {
        self.article = article.into();
        self
    }

    /// Image reference to display; relative or empty references fall back to
    /// the bundled placeholder.
    pub fn display_image(&self) -> &str {
        if self.image.starts_with("http") {
            &self.image
        } else {
            DEFAULT_PRODUCT_IMAGE
        }
    }

    /// Field-level validation applied by the catalog on every write.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(DomainError::validation("price must be a non-negative number"));
        }
        if !self.discount.is_finite() || !(0.0..=100.0).contains(&self.discount) {
            return Err(DomainError::validation("discount must be between 0 and 100"));
        }
        if !self.discount_rate.is_finite() || self.discount_rate < 0.0 {
            return Err(DomainError::validation(
                "discount rate must be a non-negative number",
            ));
        }
        Ok(())
    }
}

/// Distinct categories in first-seen order.
pub fn categories(products: &[Product]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for p in products {
        if !out.iter().any(|c| c == &p.category) {
            out.push(p.category.clone());
        }
    }
    out
}

/// Products in `category`, or all of them when no category is selected.
pub fn filter_by_category<'a>(products: &'a [Product], category: Option<&str>) -> Vec<&'a Product> {
    match category {
        Some(c) => products.iter().filter(|p| p.category == c).collect(),
        None => products.iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shirt() -> Product {
        Product::new("T-Shirt", 19.9)
            .with_id(ProductId::new(1))
            .with_category("apparel")
            .with_brand("Acme")
    }

    #[test]
    fn validate_accepts_well_formed_product() {
        assert!(shirt().with_discount(15.0).validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_name() {
        let err = Product::new("   ", 1.0).validate().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn validate_rejects_negative_price() {
        let err = Product::new("Mug", -1.0).validate().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn validate_rejects_discount_above_hundred() {
        let err = shirt().with_discount(120.0).validate().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn validate_rejects_nan_price() {
        assert!(Product::new("Mug", f64::NAN).validate().is_err());
    }

    #[test]
    fn display_image_falls_back_for_relative_paths() {
        assert_eq!(shirt().with_image("shirt.png").display_image(), DEFAULT_PRODUCT_IMAGE);
        assert_eq!(
            shirt().with_image("https://cdn.example.com/shirt.png").display_image(),
            "https://cdn.example.com/shirt.png"
        );
    }

    #[test]
    fn categories_are_distinct_in_first_seen_order() {
        let products = vec![
            Product::new("a", 1.0).with_category("audio"),
            Product::new("b", 1.0).with_category("apparel"),
            Product::new("c", 1.0).with_category("audio"),
        ];
        assert_eq!(categories(&products), vec!["audio".to_string(), "apparel".to_string()]);
    }

    #[test]
    fn filter_by_category_without_selection_returns_everything() {
        let products = vec![
            Product::new("a", 1.0).with_category("audio"),
            Product::new("b", 1.0).with_category("apparel"),
        ];
        assert_eq!(filter_by_category(&products, None).len(), 2);
        let audio = filter_by_category(&products, Some("audio"));
        assert_eq!(audio.len(), 1);
        assert_eq!(audio[0].name, "a");
    }

    #[test]
    fn serializes_with_camel_case_fields_and_numeric_id() {
        let json = serde_json::to_value(shirt().with_discount_rate(0.1)).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["discountRate"], 0.1);
        assert!(json.get("discount_rate").is_none());
    }

    #[test]
    fn unpersisted_product_omits_id() {
        let json = serde_json::to_value(Product::new("Mug", 4.0)).unwrap();
        assert!(json.get("id").is_none());
    }
}
