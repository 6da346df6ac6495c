use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{item::ItemId, SourceRef};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiscountId(pub usize);

/// Whether redeeming the discount needs a coupon code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponPresence {
    Present,
    Absent,
    Unknown,
}

/// Raw detail fields carried through untouched, for display only.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountDetails {
    pub type_id: Option<i64>,
    pub amount: Option<Decimal>,
    pub auto_apply: Option<bool>,
    pub maximum_usages: Option<i64>,
    pub max_amount: Option<Decimal>,
    pub coupon_code: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum GroupRef {
    Id(i64),
    PathKey(String),
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "group:{id}"),
            Self::PathKey(key) => write!(f, "path:{key}"),
        }
    }
}

/// Join entity between a discount and the items it triggers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemGroup {
    pub reference: GroupRef,
    pub items: Vec<ItemId>,
    /// Member references (or the group itself) that did not resolve.
    pub unresolved: Vec<String>,
    pub partial: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Linkage {
    /// Every referenced group expanded into items.
    Complete,
    /// At least one group could not be fully expanded.
    Partial,
    /// The discount references no groups at all.
    Unlinked,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub id: DiscountId,
    pub name: String,
    pub coupon: CouponPresence,
    pub details: DiscountDetails,
    pub groups: Vec<ItemGroup>,
    pub source: SourceRef,
}

impl Discount {
    pub fn linkage(&self) -> Linkage {
        if self.groups.is_empty() {
            Linkage::Unlinked
        } else if self.groups.iter().any(|group| group.partial) {
            Linkage::Partial
        } else {
            Linkage::Complete
        }
    }

    /// Union of all group members, first occurrence wins.
    pub fn triggered_items(&self) -> Vec<ItemId> {
        let mut items = Vec::new();
        for item in self.groups.iter().flat_map(|group| group.items.iter()) {
            if !items.contains(item) {
                items.push(*item);
            }
        }
        items
    }

    pub fn unresolved_references(&self) -> Vec<String> {
        self.groups.iter().flat_map(|group| group.unresolved.iter().cloned()).collect()
    }
}
