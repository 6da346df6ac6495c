use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{category::CategoryId, SourceRef};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub usize);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub amount: Decimal,
    pub portion: Option<String>,
    pub channel: Option<String>,
    pub is_default: bool,
}

impl Price {
    pub fn base(amount: Decimal, portion: Option<String>) -> Self {
        Self { amount, portion, channel: None, is_default: false }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NutritionProvenance {
    /// Read from a dedicated nutrition field.
    Structured,
    /// Pulled out of the item's description text.
    ExtractedFromText,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: Option<u32>,
    pub provenance: NutritionProvenance,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: ItemId,
    /// Canonical display name, unique within the catalog.
    pub name: String,
    /// Node-level title; may carry prefixes such as "Bowls - ".
    pub title: String,
    pub description: Option<String>,
    /// Nearest enclosing category.
    pub category: Option<CategoryId>,
    /// Titles of every enclosing category, outermost first.
    pub category_path: Vec<String>,
    /// Base prices; never empty.
    pub prices: Vec<Price>,
    /// Channel-labelled overrides.
    pub channel_prices: Vec<Price>,
    pub nutrition: Option<Nutrition>,
    pub path_key: Option<String>,
    /// Discount ids the source node itself declares as applicable.
    pub declared_discounts: Vec<i64>,
    pub source: SourceRef,
}

impl MenuItem {
    pub fn default_price(&self) -> Option<&Price> {
        if let [only] = self.prices.as_slice() {
            return Some(only);
        }
        self.prices.iter().find(|price| price.is_default)
    }

    pub fn portion_labels(&self) -> Vec<&str> {
        self.prices.iter().filter_map(|price| price.portion.as_deref()).collect()
    }

    pub fn has_portions(&self) -> bool {
        self.prices.iter().any(|price| price.portion.is_some())
    }

    pub fn has_channel_pricing(&self) -> bool {
        !self.channel_prices.is_empty()
    }

    pub fn calories(&self) -> Option<u32> {
        self.nutrition.as_ref().and_then(|nutrition| nutrition.calories)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::{
        item::{ItemId, MenuItem, Price},
        SourceRef,
    };

    fn item(prices: Vec<Price>) -> MenuItem {
        MenuItem {
            id: ItemId(0),
            name: "Nutty Bowl".to_string(),
            title: "Bowls - Nutty Bowl".to_string(),
            description: None,
            category: None,
            category_path: vec![],
            prices,
            channel_prices: vec![],
            nutrition: None,
            path_key: None,
            declared_discounts: vec![],
            source: SourceRef::new("/value/children/0", Some(11)),
        }
    }

    #[test]
    fn single_price_is_the_default() {
        let item = item(vec![Price::base(Decimal::new(800, 2), None)]);
        assert_eq!(item.default_price().map(|price| price.amount), Some(Decimal::new(800, 2)));
    }

    #[test]
    fn portioned_item_without_flag_has_no_default() {
        let item = item(vec![
            Price::base(Decimal::new(800, 2), Some("Small".to_string())),
            Price::base(Decimal::new(1100, 2), Some("Large".to_string())),
        ]);

        assert!(item.default_price().is_none());
        assert_eq!(item.portion_labels(), vec!["Small", "Large"]);
    }

    #[test]
    fn flagged_portion_is_the_default() {
        let mut large = Price::base(Decimal::new(1100, 2), Some("Large".to_string()));
        large.is_default = true;
        let item = item(vec![Price::base(Decimal::new(800, 2), Some("Small".to_string())), large]);

        assert_eq!(item.default_price().and_then(|price| price.portion.as_deref()), Some("Large"));
    }
}
