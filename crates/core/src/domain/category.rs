use serde::{Deserialize, Serialize};

use crate::domain::{item::ItemId, SourceRef};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryId(pub usize);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Enclosing category titles plus this one, outermost first.
    pub path: Vec<String>,
    /// Direct and nested member items, in catalog order.
    pub members: Vec<ItemId>,
    /// Source ids of every node merged into this category.
    pub source_ids: Vec<i64>,
    pub source: SourceRef,
}

impl Category {
    pub(crate) fn add_member(&mut self, item: ItemId) {
        if !self.members.contains(&item) {
            self.members.push(item);
        }
    }
}
