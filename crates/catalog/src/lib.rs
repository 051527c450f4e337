//! Product catalog module.
//!
//! This crate holds the product model the storefront engines consume, the
//! `CatalogStream` port they consume it through, and an in-memory catalog that
//! republishes its product list after every write.

pub mod in_memory;
pub mod product;
pub mod stream;

pub use in_memory::InMemoryCatalog;
pub use product::{DEFAULT_PRODUCT_IMAGE, Product, categories, filter_by_category};
pub use stream::{CatalogError, CatalogStream};
