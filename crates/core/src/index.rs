//! Read-only lookup structures over a normalized catalog.

use std::collections::HashMap;

use tracing::debug;

use crate::{
    catalog::{text::normalize_text, Catalog},
    domain::{
        category::{Category, CategoryId},
        discount::{Discount, DiscountId},
        item::{ItemId, MenuItem},
    },
    errors::CatalogWarning,
};

/// One matchable spelling of an entity, already normalized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Choice<Id> {
    pub id: Id,
    pub key: String,
}

#[derive(Clone, Debug)]
pub struct MenuIndex {
    catalog: Catalog,
    item_names: HashMap<String, ItemId>,
    item_aliases: HashMap<String, ItemId>,
    category_names: HashMap<String, CategoryId>,
    discount_names: HashMap<String, Vec<DiscountId>>,
    discount_sources: HashMap<i64, DiscountId>,
    discounts_by_item: HashMap<ItemId, Vec<DiscountId>>,
    item_choices: Vec<Choice<ItemId>>,
    category_choices: Vec<Choice<CategoryId>>,
    discount_choices: Vec<Choice<DiscountId>>,
}

impl MenuIndex {
    pub fn build(catalog: Catalog) -> Self {
        let mut item_names = HashMap::new();
        let mut item_choices = Vec::new();
        for item in &catalog.items {
            let key = normalize_text(&item.name);
            item_names.entry(key.clone()).or_insert(item.id);
            item_choices.push(Choice { id: item.id, key });
        }

        let mut item_aliases = HashMap::new();
        for item in &catalog.items {
            let alias = normalize_text(&item.title);
            if alias.is_empty() || item_names.contains_key(&alias) || item_aliases.contains_key(&alias) {
                continue;
            }
            item_aliases.insert(alias.clone(), item.id);
            item_choices.push(Choice { id: item.id, key: alias });
        }

        let mut category_names = HashMap::new();
        let mut category_choices = Vec::new();
        for category in &catalog.categories {
            let key = normalize_text(&category.name);
            category_names.entry(key.clone()).or_insert(category.id);
            category_choices.push(Choice { id: category.id, key });
        }

        let mut discount_names: HashMap<String, Vec<DiscountId>> = HashMap::new();
        let mut discount_sources = HashMap::new();
        let mut discount_choices = Vec::new();
        let mut discounts_by_item: HashMap<ItemId, Vec<DiscountId>> = HashMap::new();
        for discount in &catalog.discounts {
            let key = normalize_text(&discount.name);
            discount_names.entry(key.clone()).or_default().push(discount.id);
            discount_choices.push(Choice { id: discount.id, key });
            if let Some(source_id) = discount.source.source_id {
                discount_sources.entry(source_id).or_insert(discount.id);
            }
            for item in discount.triggered_items() {
                discounts_by_item.entry(item).or_default().push(discount.id);
            }
        }

        debug!(
            event_name = "index.build",
            items = catalog.items.len(),
            aliases = item_aliases.len(),
            categories = catalog.categories.len(),
            discounts = catalog.discounts.len(),
            "menu index built"
        );

        Self {
            catalog,
            item_names,
            item_aliases,
            category_names,
            discount_names,
            discount_sources,
            discounts_by_item,
            item_choices,
            category_choices,
            discount_choices,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.catalog.items
    }

    pub fn categories(&self) -> &[Category] {
        &self.catalog.categories
    }

    pub fn discounts(&self) -> &[Discount] {
        &self.catalog.discounts
    }

    pub fn warnings(&self) -> &[CatalogWarning] {
        &self.catalog.warnings
    }

    pub fn item(&self, id: ItemId) -> Option<&MenuItem> {
        self.catalog.items.get(id.0)
    }

    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.catalog.categories.get(id.0)
    }

    pub fn discount(&self, id: DiscountId) -> Option<&Discount> {
        self.catalog.discounts.get(id.0)
    }

    /// Case-insensitive exact lookup by canonical name, then by title alias.
    pub fn item_by_name(&self, name: &str) -> Option<&MenuItem> {
        let key = normalize_text(name);
        self.item_names.get(&key).or_else(|| self.item_aliases.get(&key)).and_then(|id| self.item(*id))
    }

    pub fn category_by_name(&self, name: &str) -> Option<&Category> {
        self.category_names.get(&normalize_text(name)).and_then(|id| self.category(*id))
    }

    /// Every discount whose name folds to the same key as `name`.
    pub fn discounts_by_name(&self, name: &str) -> Vec<&Discount> {
        self.discount_names
            .get(&normalize_text(name))
            .into_iter()
            .flatten()
            .filter_map(|id| self.discount(*id))
            .collect()
    }

    pub fn discount_by_source_id(&self, source_id: i64) -> Option<&Discount> {
        self.discount_sources.get(&source_id).and_then(|id| self.discount(*id))
    }

    /// Discounts whose groups expand to the item, in catalog order.
    pub fn discounts_for_item(&self, item: ItemId) -> Vec<&Discount> {
        self.discounts_by_item.get(&item).into_iter().flatten().filter_map(|id| self.discount(*id)).collect()
    }

    pub fn item_choices(&self) -> &[Choice<ItemId>] {
        &self.item_choices
    }

    pub fn category_choices(&self) -> &[Choice<CategoryId>] {
        &self.category_choices
    }

    pub fn discount_choices(&self) -> &[Choice<DiscountId>] {
        &self.discount_choices
    }

    pub fn item_name(&self, id: ItemId) -> Option<&str> {
        self.item(id).map(|item| item.name.as_str())
    }

    pub fn category_name(&self, id: CategoryId) -> Option<&str> {
        self.category(id).map(|category| category.name.as_str())
    }

    pub fn discount_name(&self, id: DiscountId) -> Option<&str> {
        self.discount(id).map(|discount| discount.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::{catalog::build_catalog, domain::item::ItemId, index::MenuIndex};

    fn index() -> MenuIndex {
        let catalog = build_catalog(&json!({"value": {
            "children": [
                {"itemType": 6, "itemMasterId": 300, "title": "Bowls", "children": [
                    {"itemType": 1, "itemMasterId": 11, "title": "Bowls - Nutty Bowl",
                     "displayAttribute": {"itemTitle": "Nutty Bowl"}, "price": 8},
                    {"itemType": 1, "itemMasterId": 12, "title": "Acai Bowl", "price": 9}
                ]}
            ],
            "discounts": {
                "7": {"checkTitle": "Bowl Deal", "itemGroupIds": [300]},
                "8": {"checkTitle": "bowl deal", "itemGroupIds": [12]}
            }
        }}))
        .expect("catalog");
        MenuIndex::build(catalog)
    }

    #[test]
    fn exact_lookups_fold_case_and_accept_title_aliases() {
        let index = index();

        assert_eq!(index.item_by_name("NUTTY BOWL").map(|item| item.id), Some(ItemId(0)));
        assert_eq!(index.item_by_name("bowls - nutty bowl").map(|item| item.id), Some(ItemId(0)));
        assert!(index.item_by_name("nutty").is_none());
        assert_eq!(index.category_by_name("bowls").map(|category| category.name.as_str()), Some("Bowls"));
    }

    #[test]
    fn aliases_never_shadow_canonical_names() {
        let index = index();
        let keys: Vec<_> = index.item_choices().iter().map(|choice| choice.key.as_str()).collect();
        assert_eq!(keys, vec!["nutty bowl", "acai bowl", "bowls nutty bowl"]);
    }

    #[test]
    fn reverse_map_inverts_discount_groups() {
        let index = index();

        let names: Vec<_> = index.discounts_for_item(ItemId(1)).iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Bowl Deal", "bowl deal"]);
        assert_eq!(index.discounts_for_item(ItemId(0)).len(), 1);
        assert_eq!(index.discounts_by_name("BOWL DEAL").len(), 2);
        assert_eq!(index.discount_by_source_id(8).map(|d| d.name.as_str()), Some("bowl deal"));
    }

    #[test]
    fn index_is_shareable_across_threads() {
        let index = Arc::new(index());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let index = Arc::clone(&index);
                std::thread::spawn(move || index.item_by_name("nutty bowl").map(|item| item.id))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().expect("thread"), Some(ItemId(0)));
        }
    }
}
