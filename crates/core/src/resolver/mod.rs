//! Maps user-supplied references onto catalog entities.

pub mod policy;
pub mod portion;
pub mod scoring;

use tracing::debug;

use crate::{
    catalog::text::{normalize_text, strip_discount_suffix},
    domain::{category::CategoryId, discount::DiscountId, item::ItemId},
    index::{Choice, MenuIndex},
};

pub use self::{
    policy::{Resolution, ResolverPolicy},
    portion::{resolve_portion, PortionResolution},
    scoring::Scored,
};

fn resolve<Id>(
    kind: &'static str,
    query: &str,
    key: &str,
    choices: &[Choice<Id>],
    policy: &ResolverPolicy,
) -> Resolution<Id>
where
    Id: Copy + Ord,
{
    if key.is_empty() {
        debug!(event_name = "resolver.empty_query", entity = kind, query = %query);
        return Resolution::NotFound { suggestions: Vec::new() };
    }

    let ranked = scoring::rank(key, choices);
    let resolution = policy.decide(&ranked);
    debug!(
        event_name = "resolver.decided",
        entity = kind,
        query = %query,
        outcome = outcome_name(&resolution),
        top_score = ranked.first().map(|scored| scored.score).unwrap_or(0.0),
        "entity reference resolved"
    );
    resolution
}

fn outcome_name<Id>(resolution: &Resolution<Id>) -> &'static str {
    match resolution {
        Resolution::Matched { .. } => "matched",
        Resolution::Ambiguous { .. } => "ambiguous",
        Resolution::NotFound { .. } => "not_found",
    }
}

pub fn resolve_item(query: &str, index: &MenuIndex, policy: &ResolverPolicy) -> Resolution<ItemId> {
    resolve("item", query, &normalize_text(query), index.item_choices(), policy)
}

pub fn resolve_category(query: &str, index: &MenuIndex, policy: &ResolverPolicy) -> Resolution<CategoryId> {
    resolve("category", query, &normalize_text(query), index.category_choices(), policy)
}

/// Discounts resolve by source id when the query is all digits, otherwise by
/// name with generic trailing words ("deal", "promo", ...) ignored on both
/// sides.
pub fn resolve_discount(query: &str, index: &MenuIndex, policy: &ResolverPolicy) -> Resolution<DiscountId> {
    let trimmed = query.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        if let Some(discount) = trimmed.parse().ok().and_then(|id| index.discount_by_source_id(id)) {
            debug!(event_name = "resolver.discount_by_id", query = %query, "discount resolved by source id");
            return Resolution::Matched { id: discount.id, confidence: scoring::EXACT };
        }
    }

    let choices: Vec<Choice<DiscountId>> = index
        .discount_choices()
        .iter()
        .flat_map(|choice| {
            let stripped = strip_discount_suffix(&choice.key);
            let mut spellings = vec![choice.clone()];
            if stripped != choice.key {
                spellings.push(Choice { id: choice.id, key: stripped });
            }
            spellings
        })
        .collect();
    resolve("discount", query, &strip_discount_suffix(query), &choices, policy)
}
