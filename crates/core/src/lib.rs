pub mod answer;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod index;
pub mod inspect;
pub mod intent;
pub mod resolver;
pub mod tools;

use serde_json::Value;

pub use answer::{AnswerResult, Limitation};
pub use catalog::{build_catalog, Catalog};
pub use domain::category::{Category, CategoryId};
pub use domain::discount::{CouponPresence, Discount, DiscountId, Linkage};
pub use domain::item::{ItemId, MenuItem, Price};
pub use errors::{CatalogWarning, IntentError, LoadError, OutcomeClass, WarningKind};
pub use index::MenuIndex;
pub use intent::{AnswerEngine, DeterministicAnswerEngine, IntentKind, QueryIntent};
pub use resolver::{resolve_category, resolve_discount, resolve_item, Resolution, ResolverPolicy};

/// Normalize a parsed catalog document and index it for queries.
pub fn load_index(document: &Value) -> Result<MenuIndex, LoadError> {
    build_catalog(document).map(MenuIndex::build)
}
