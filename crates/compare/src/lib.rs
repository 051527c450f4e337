//! Product comparison engine.
//!
//! - [`ComparisonSet`]: bounded (4), deduplicated, ordered selection of ids
//! - [`ComparisonAnalyzer`]: pure "best value" flags, summary and weighted scores
//! - [`ComparisonSetManager`]: owns the set, keeps product values live against
//!   the catalog, persists after every change
//! - [`ComparisonSession`]: wires a manager to a catalog stream for the
//!   lifetime of one shopper session

pub mod analyzer;
pub mod attributes;
pub mod manager;
pub mod selection;
pub mod session;

pub use analyzer::{Attribute, ComparisonAnalyzer, ComparisonSummary, ScoreWeights, ScoredProduct};
pub use attributes::AttributeSelection;
pub use manager::ComparisonSetManager;
pub use selection::{COMPARISON_LIMIT, ComparisonSet, ToggleOutcome};
pub use session::{ComparisonSession, ComparisonView};
