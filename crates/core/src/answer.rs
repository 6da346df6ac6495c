//! Structured query results. The core never renders prose; callers format
//! these records.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    domain::{
        discount::{CouponPresence, DiscountDetails, Linkage},
        item::NutritionProvenance,
    },
    errors::OutcomeClass,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Item,
    Category,
    Discount,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Category => "category",
            Self::Discount => "discount",
        }
    }
}

/// What the caller has to supply before the query can be answered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClarificationField {
    Portion,
    Item,
    Category,
    Discount,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Candidate {
    pub name: String,
    pub confidence: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiscountSummary {
    pub name: String,
    pub source_id: Option<i64>,
    pub coupon: CouponPresence,
    pub linkage: Linkage,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChannelAmount {
    pub channel: String,
    pub amount: Decimal,
}

/// Prices of one portion across the base menu and every channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PortionRow {
    pub portion: Option<String>,
    pub base: Option<Decimal>,
    pub channels: Vec<ChannelAmount>,
}

impl PortionRow {
    /// Whether every channel amount can be compared with a base amount.
    pub fn comparable(&self) -> bool {
        self.base.is_some() && !self.channels.is_empty()
    }

    pub fn all_equal(&self) -> bool {
        self.channels.iter().all(|channel| Some(channel.amount) == self.base)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelVerdict {
    Equal,
    Unequal,
    /// Every compared pair matches but some base portion has no price in
    /// some channel.
    Partial,
    /// Channel prices exist but none lines up with a base portion.
    Incomparable,
}

/// A partial answer or an explicit "not available".
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "limitation", rename_all = "snake_case")]
pub enum Limitation {
    NutritionAbsent { item: String },
    ChannelPricingAbsent { item: String, channel: Option<String>, available_channels: Vec<String> },
    PartialDiscountMapping { discount: String, resolved_items: Vec<String>, unresolved_groups: Vec<String> },
    NoLinkedGroups { discount: String },
}

impl Limitation {
    pub fn outcome_class(&self) -> OutcomeClass {
        match self {
            Self::PartialDiscountMapping { .. } => OutcomeClass::IncompleteJoin,
            Self::NutritionAbsent { .. } | Self::ChannelPricingAbsent { .. } | Self::NoLinkedGroups { .. } => {
                OutcomeClass::DataAbsent
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnswerResult {
    Price {
        item: String,
        portion: Option<String>,
        channel: Option<String>,
        amount: Decimal,
        used_default: bool,
    },
    Nutrition {
        item: String,
        calories: u32,
        provenance: NutritionProvenance,
    },
    CategoryItems {
        category: String,
        items: Vec<String>,
    },
    Discounts {
        discounts: Vec<DiscountSummary>,
    },
    DiscountTriggers {
        discount: String,
        items: Vec<String>,
    },
    DiscountDetails {
        discount: String,
        source_id: Option<i64>,
        coupon: CouponPresence,
        linkage: Linkage,
        details: DiscountDetails,
        groups: Vec<String>,
    },
    ItemDiscounts {
        item: String,
        discounts: Vec<DiscountSummary>,
        /// Ids the item declares that match no known discount.
        unknown_declared_ids: Vec<i64>,
    },
    ChannelComparison {
        item: String,
        rows: Vec<PortionRow>,
        verdict: ChannelVerdict,
    },
    Ambiguous {
        entity: EntityKind,
        query: String,
        candidates: Vec<Candidate>,
        threshold: f64,
    },
    NotFound {
        entity: EntityKind,
        query: String,
        suggestions: Vec<String>,
    },
    NeedsClarification {
        field: ClarificationField,
        item: Option<String>,
        options: Vec<String>,
    },
    EmptyCategory {
        query: String,
        known_categories: Vec<String>,
    },
    Limitation(Limitation),
}

impl AnswerResult {
    pub fn outcome_class(&self) -> OutcomeClass {
        match self {
            Self::Price { .. }
            | Self::Nutrition { .. }
            | Self::CategoryItems { .. }
            | Self::Discounts { .. }
            | Self::DiscountTriggers { .. }
            | Self::DiscountDetails { .. }
            | Self::ItemDiscounts { .. }
            | Self::ChannelComparison { .. } => OutcomeClass::Answered,
            Self::Ambiguous { .. } => OutcomeClass::AmbiguousEntity,
            Self::NotFound { .. } | Self::EmptyCategory { .. } => OutcomeClass::NotFound,
            Self::NeedsClarification { .. } => OutcomeClass::NeedsClarification,
            Self::Limitation(limitation) => limitation.outcome_class(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::{
        answer::{AnswerResult, ClarificationField, Limitation},
        errors::OutcomeClass,
    };

    #[test]
    fn results_serialize_with_an_outcome_tag() {
        let answer = AnswerResult::Price {
            item: "Nutty Bowl".to_string(),
            portion: Some("Small".to_string()),
            channel: None,
            amount: Decimal::new(800, 2),
            used_default: false,
        };
        let encoded = serde_json::to_value(&answer).expect("serialize");

        assert_eq!(encoded["outcome"], "price");
        assert_eq!(encoded["amount"], "8.00");
        assert_eq!(encoded["portion"], "Small");
    }

    #[test]
    fn limitations_flatten_into_the_outcome_record() {
        let answer = AnswerResult::Limitation(Limitation::PartialDiscountMapping {
            discount: "BOGO Any Smoothie".to_string(),
            resolved_items: vec!["Green Glow".to_string()],
            unresolved_groups: vec!["group:555".to_string()],
        });
        let encoded = serde_json::to_value(&answer).expect("serialize");

        assert_eq!(encoded["outcome"], "limitation");
        assert_eq!(encoded["limitation"], "partial_discount_mapping");
        assert_eq!(encoded["resolved_items"][0], "Green Glow");
        assert_eq!(answer.outcome_class(), OutcomeClass::IncompleteJoin);
    }

    #[test]
    fn absence_is_distinct_from_not_found() {
        let absent = AnswerResult::Limitation(Limitation::NutritionAbsent { item: "Latte".to_string() });
        let clarify = AnswerResult::NeedsClarification {
            field: ClarificationField::Portion,
            item: Some("Latte".to_string()),
            options: vec![],
        };

        assert_eq!(absent.outcome_class(), OutcomeClass::DataAbsent);
        assert_eq!(clarify.outcome_class(), OutcomeClass::NeedsClarification);
    }
}
