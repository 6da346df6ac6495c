//! Raw catalog document to canonical entities: walk, then normalize.

pub mod normalize;
pub mod nutrition;
pub mod price;
pub mod text;
pub mod walker;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::{
    domain::{category::Category, discount::Discount, item::MenuItem},
    errors::{CatalogWarning, LoadError},
};

/// Normalized entity set of one load, in catalog order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    pub items: Vec<MenuItem>,
    pub categories: Vec<Category>,
    pub discounts: Vec<Discount>,
    pub warnings: Vec<CatalogWarning>,
}

/// Walk and normalize a parsed document.
///
/// Fails only when the document is not a tree or yields no sellable items.
pub fn build_catalog(document: &Value) -> Result<Catalog, LoadError> {
    let walked = walker::walk(document)?;
    let catalog = normalize::normalize(&walked);

    if catalog.items.is_empty() {
        return Err(LoadError::EmptyCatalog { warnings: catalog.warnings.len() });
    }

    info!(
        event_name = "catalog.loaded",
        items = catalog.items.len(),
        categories = catalog.categories.len(),
        discounts = catalog.discounts.len(),
        warnings = catalog.warnings.len(),
        "catalog loaded"
    );
    Ok(catalog)
}
