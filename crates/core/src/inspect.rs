//! Flat, deterministic views of a normalized catalog for diagnostics and
//! export. Rows hold scalar fields only so they serialize to CSV as-is.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    domain::{
        discount::{CouponPresence, Linkage},
        item::NutritionProvenance,
    },
    index::MenuIndex,
};

const PATH_SEPARATOR: &str = " > ";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    pub items: usize,
    pub categories: usize,
    pub discounts: usize,
    pub items_with_portions: usize,
    pub items_with_channel_prices: usize,
    pub calories_structured: usize,
    pub calories_extracted: usize,
    pub calories_missing: usize,
    pub discounts_complete: usize,
    pub discounts_partial: usize,
    pub discounts_unlinked: usize,
    pub warnings: BTreeMap<String, usize>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ItemRow {
    pub item_id: usize,
    pub source_id: Option<i64>,
    pub name: String,
    pub title: String,
    pub category_path: String,
    pub category_leaf: Option<String>,
    pub path_key: Option<String>,
    pub num_prices: usize,
    pub portions: String,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub default_price: Option<Decimal>,
    pub channels: String,
    pub calories: Option<u32>,
    pub calories_source: Option<NutritionProvenance>,
    pub declared_discount_ids: String,
    pub has_description: bool,
    pub pointer: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PriceRow {
    pub item_id: usize,
    pub name: String,
    pub portion: Option<String>,
    pub channel: Option<String>,
    pub price: Decimal,
    pub is_default: bool,
    pub category_path: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryRow {
    pub category_id: usize,
    pub name: String,
    pub category_path: String,
    pub member_count: usize,
    pub source_ids: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiscountRow {
    pub discount_id: usize,
    pub source_id: Option<i64>,
    pub name: String,
    pub coupon: CouponPresence,
    pub linkage: Linkage,
    pub groups: String,
    pub triggered_items: usize,
    pub unresolved: String,
}

fn joined<T: ToString>(values: impl IntoIterator<Item = T>, separator: &str) -> String {
    values.into_iter().map(|value| value.to_string()).collect::<Vec<_>>().join(separator)
}

fn folded(value: &str) -> String {
    value.to_lowercase()
}

pub fn summary(index: &MenuIndex) -> CatalogSummary {
    let mut summary = CatalogSummary {
        items: index.items().len(),
        categories: index.categories().len(),
        discounts: index.discounts().len(),
        ..CatalogSummary::default()
    };

    for item in index.items() {
        if item.has_portions() {
            summary.items_with_portions += 1;
        }
        if item.has_channel_pricing() {
            summary.items_with_channel_prices += 1;
        }
        match item.nutrition.as_ref().filter(|nutrition| nutrition.calories.is_some()) {
            Some(nutrition) if nutrition.provenance == NutritionProvenance::Structured => {
                summary.calories_structured += 1
            }
            Some(_) => summary.calories_extracted += 1,
            None => summary.calories_missing += 1,
        }
    }

    for discount in index.discounts() {
        match discount.linkage() {
            Linkage::Complete => summary.discounts_complete += 1,
            Linkage::Partial => summary.discounts_partial += 1,
            Linkage::Unlinked => summary.discounts_unlinked += 1,
        }
    }

    for warning in index.warnings() {
        *summary.warnings.entry(warning.kind.as_str().to_string()).or_default() += 1;
    }

    summary
}

/// One row per item, ordered by category path, name, then id.
pub fn item_rows(index: &MenuIndex) -> Vec<ItemRow> {
    let mut rows: Vec<ItemRow> = index
        .items()
        .iter()
        .map(|item| {
            let amounts = item.prices.iter().map(|price| price.amount);
            let mut channels: Vec<&str> = Vec::new();
            for channel in item.channel_prices.iter().filter_map(|price| price.channel.as_deref()) {
                if !channels.contains(&channel) {
                    channels.push(channel);
                }
            }
            ItemRow {
                item_id: item.id.0,
                source_id: item.source.source_id,
                name: item.name.clone(),
                title: item.title.clone(),
                category_path: item.category_path.join(PATH_SEPARATOR),
                category_leaf: item.category_path.last().cloned(),
                path_key: item.path_key.clone(),
                num_prices: item.prices.len(),
                portions: item.portion_labels().join(", "),
                min_price: amounts.clone().min(),
                max_price: amounts.max(),
                default_price: item.default_price().map(|price| price.amount),
                channels: channels.join(", "),
                calories: item.calories(),
                calories_source: item.nutrition.as_ref().map(|nutrition| nutrition.provenance),
                declared_discount_ids: joined(&item.declared_discounts, ", "),
                has_description: item.description.is_some(),
                pointer: item.source.pointer.clone(),
            }
        })
        .collect();

    rows.sort_by(|left, right| {
        folded(&left.category_path)
            .cmp(&folded(&right.category_path))
            .then_with(|| folded(&left.name).cmp(&folded(&right.name)))
            .then_with(|| left.item_id.cmp(&right.item_id))
    });
    rows
}

/// Base and channel prices, ordered by item name, channel, then portion.
pub fn price_rows(index: &MenuIndex) -> Vec<PriceRow> {
    let mut rows: Vec<PriceRow> = index
        .items()
        .iter()
        .flat_map(|item| {
            item.prices.iter().chain(item.channel_prices.iter()).map(move |price| PriceRow {
                item_id: item.id.0,
                name: item.name.clone(),
                portion: price.portion.clone(),
                channel: price.channel.clone(),
                price: price.amount,
                is_default: price.is_default,
                category_path: item.category_path.join(PATH_SEPARATOR),
            })
        })
        .collect();

    // Portion order within an item follows the catalog, so the sort is stable.
    rows.sort_by(|left, right| {
        folded(&left.name)
            .cmp(&folded(&right.name))
            .then_with(|| left.item_id.cmp(&right.item_id))
            .then_with(|| left.channel.is_some().cmp(&right.channel.is_some()))
            .then_with(|| left.channel.as_deref().map(folded).cmp(&right.channel.as_deref().map(folded)))
    });
    rows
}

pub fn category_rows(index: &MenuIndex) -> Vec<CategoryRow> {
    let mut rows: Vec<CategoryRow> = index
        .categories()
        .iter()
        .map(|category| CategoryRow {
            category_id: category.id.0,
            name: category.name.clone(),
            category_path: category.path.join(PATH_SEPARATOR),
            member_count: category.members.len(),
            source_ids: joined(&category.source_ids, ", "),
        })
        .collect();

    rows.sort_by(|left, right| {
        folded(&left.category_path)
            .cmp(&folded(&right.category_path))
            .then_with(|| left.category_id.cmp(&right.category_id))
    });
    rows
}

pub fn discount_rows(index: &MenuIndex) -> Vec<DiscountRow> {
    let mut rows: Vec<DiscountRow> = index
        .discounts()
        .iter()
        .map(|discount| DiscountRow {
            discount_id: discount.id.0,
            source_id: discount.source.source_id,
            name: discount.name.clone(),
            coupon: discount.coupon,
            linkage: discount.linkage(),
            groups: joined(discount.groups.iter().map(|group| &group.reference), ", "),
            triggered_items: discount.triggered_items().len(),
            unresolved: discount.unresolved_references().join(", "),
        })
        .collect();

    rows.sort_by(|left, right| {
        folded(&left.name)
            .cmp(&folded(&right.name))
            .then_with(|| left.source_id.cmp(&right.source_id))
            .then_with(|| left.discount_id.cmp(&right.discount_id))
    });
    rows
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;
    use crate::catalog::build_catalog;

    fn index() -> MenuIndex {
        let catalog = build_catalog(&json!({"value": {
            "children": [
                {"itemType": 6, "itemMasterId": 1, "title": "Smoothies", "children": [
                    {"itemType": 1, "itemMasterId": 10, "title": "Green Glow",
                     "prices": [{"portion": "Small", "price": 7}, {"portion": "Large", "price": 9}],
                     "nutritionInfo": {"calories": 300}},
                    {"itemType": 1, "itemMasterId": 11, "title": "Berry Blast", "price": 8,
                     "description": "Berries. 250 cal", "channelPrices": {"Delivery": 9}}
                ]},
                {"itemType": 6, "itemMasterId": 2, "title": "Bowls", "children": [
                    {"itemType": 1, "itemMasterId": 20, "title": "Nutty Bowl", "price": 8},
                    {"itemType": 1, "itemMasterId": 21, "title": "NUTTY BOWL", "price": 8}
                ]}
            ],
            "discounts": {
                "7": {"checkTitle": "BOGO Any Smoothie", "itemGroupIds": [1, 99]},
                "8": {"checkTitle": "Anniversary"}
            }
        }}))
        .expect("catalog");
        MenuIndex::build(catalog)
    }

    #[test]
    fn summary_counts_coverage_and_warnings() {
        let summary = summary(&index());

        assert_eq!(summary.items, 3);
        assert_eq!(summary.categories, 2);
        assert_eq!(summary.items_with_portions, 1);
        assert_eq!(summary.items_with_channel_prices, 1);
        assert_eq!(summary.calories_structured, 1);
        assert_eq!(summary.calories_extracted, 1);
        assert_eq!(summary.calories_missing, 1);
        assert_eq!(summary.discounts_partial, 1);
        assert_eq!(summary.discounts_unlinked, 1);
        assert_eq!(summary.warnings.get("duplicate_name"), Some(&1));
        assert_eq!(summary.warnings.get("incomplete_join"), Some(&1));
    }

    #[test]
    fn item_rows_sort_by_category_path_then_name() {
        let rows = item_rows(&index());
        let names: Vec<_> = rows.iter().map(|row| row.name.as_str()).collect();

        assert_eq!(names, vec!["Nutty Bowl", "Berry Blast", "Green Glow"]);
        assert_eq!(rows[2].portions, "Small, Large");
        assert_eq!(rows[2].min_price, Some(Decimal::new(700, 2)));
        assert_eq!(rows[2].max_price, Some(Decimal::new(900, 2)));
        assert_eq!(rows[2].default_price, None);
        assert_eq!(rows[1].channels, "Delivery");
    }

    #[test]
    fn price_rows_put_base_prices_before_channel_prices() {
        let rows = price_rows(&index());
        let berry: Vec<_> = rows.iter().filter(|row| row.name == "Berry Blast").collect();

        assert_eq!(berry.len(), 2);
        assert_eq!(berry[0].channel, None);
        assert_eq!(berry[1].channel.as_deref(), Some("Delivery"));
        assert_eq!(rows.len(), 5);
    }

    #[test]
    fn discount_rows_show_linkage_and_unresolved_groups() {
        let rows = discount_rows(&index());

        assert_eq!(rows[0].name, "Anniversary");
        assert_eq!(rows[1].groups, "group:1, group:99");
        assert_eq!(rows[1].unresolved, "group:99");
        assert_eq!(rows[1].triggered_items, 2);
    }

    #[test]
    fn category_rows_carry_joined_paths() {
        let rows = category_rows(&index());
        assert_eq!(rows[0].category_path, "Bowls");
        assert_eq!(rows[0].member_count, 1);
        assert_eq!(rows[1].source_ids, "1");
    }
}
