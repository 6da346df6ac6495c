use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of the whole load operation. Everything below this level is a
/// warning record or a typed answer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("catalog document must be an object or array, found {found}")]
    NotATree { found: &'static str },
    #[error("catalog document produced no sellable items ({warnings} warnings recorded)")]
    EmptyCatalog { warnings: usize },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IntentError {
    #[error(
        "unknown intent `{0}` (expected price, nutrition, category, discount_list, discount_trigger, \
         channel_compare, discount_details or item_discounts)"
    )]
    UnknownIntent(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A sub-tree could not become an entity and was skipped.
    MalformedNode,
    /// Nesting beyond the walker depth limit.
    DepthLimit,
    /// A second, different item claimed an existing canonical name.
    DuplicateName,
    /// Price entries were dropped to keep the price invariants.
    InconsistentPricing,
    /// More than one price entry was flagged as the default.
    ConflictingDefault,
    /// A discount references groups or members that do not resolve.
    IncompleteJoin,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedNode => "malformed_node",
            Self::DepthLimit => "depth_limit",
            Self::DuplicateName => "duplicate_name",
            Self::InconsistentPricing => "inconsistent_pricing",
            Self::ConflictingDefault => "conflicting_default",
            Self::IncompleteJoin => "incomplete_join",
        }
    }
}

/// Diagnostic record attached to the source position that caused it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogWarning {
    pub kind: WarningKind,
    pub pointer: String,
    pub detail: String,
}

impl CatalogWarning {
    pub fn new(kind: WarningKind, pointer: impl Into<String>, detail: impl Into<String>) -> Self {
        Self { kind, pointer: pointer.into(), detail: detail.into() }
    }
}

/// Outcome classes of a query, used by callers to pick a status and exit code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeClass {
    Answered,
    AmbiguousEntity,
    NotFound,
    NeedsClarification,
    IncompleteJoin,
    DataAbsent,
}

impl OutcomeClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Answered => "answered",
            Self::AmbiguousEntity => "ambiguous_entity",
            Self::NotFound => "not_found",
            Self::NeedsClarification => "needs_clarification",
            Self::IncompleteJoin => "incomplete_join",
            Self::DataAbsent => "data_absent",
        }
    }

    /// Partial answers still carry data the caller can present.
    pub fn carries_data(&self) -> bool {
        matches!(self, Self::Answered | Self::IncompleteJoin)
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{CatalogWarning, LoadError, OutcomeClass, WarningKind};

    #[test]
    fn load_error_names_the_offending_shape() {
        let error = LoadError::NotATree { found: "string" };
        assert_eq!(error.to_string(), "catalog document must be an object or array, found string");
    }

    #[test]
    fn warning_kind_serializes_as_snake_case() {
        let warning = CatalogWarning::new(WarningKind::MalformedNode, "/value/children/0", "no name");
        let encoded = serde_json::to_value(&warning).expect("serialize warning");

        assert_eq!(encoded["kind"], "malformed_node");
        assert_eq!(encoded["kind"], WarningKind::MalformedNode.as_str());
    }

    #[test]
    fn only_answers_and_partial_joins_carry_data() {
        assert!(OutcomeClass::Answered.carries_data());
        assert!(OutcomeClass::IncompleteJoin.carries_data());
        assert!(!OutcomeClass::DataAbsent.carries_data());
        assert!(!OutcomeClass::AmbiguousEntity.carries_data());
    }
}
