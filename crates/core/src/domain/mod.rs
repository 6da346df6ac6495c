pub mod category;
pub mod discount;
pub mod item;

use serde::{Deserialize, Serialize};

/// Where an entity came from in the source document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// JSON pointer of the source node.
    pub pointer: String,
    /// Numeric id carried by the source (`itemMasterId`, discount id, ...).
    pub source_id: Option<i64>,
}

impl SourceRef {
    pub fn new(pointer: impl Into<String>, source_id: Option<i64>) -> Self {
        Self { pointer: pointer.into(), source_id }
    }
}
