//! Pure similarity scoring between a normalized query and normalized choices.

use std::{cmp::Ordering, collections::HashSet};

use serde::Serialize;
use strsim::jaro_winkler;

use crate::index::Choice;

pub const EXACT: f64 = 1.0;
pub const CANDIDATE_EXTENDS_QUERY: f64 = 0.92;
pub const QUERY_EXTENDS_CANDIDATE: f64 = 0.88;
pub const TOKEN_CONTAINMENT: f64 = 0.85;
pub const FUZZY_WEIGHT: f64 = 0.8;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Scored<Id> {
    pub id: Id,
    pub score: f64,
}

fn extends_at_boundary(longer: &str, shorter: &str) -> bool {
    longer.len() > shorter.len()
        && longer.starts_with(shorter)
        && longer.as_bytes().get(shorter.len()) == Some(&b' ')
}

fn contains_tokens(haystack: &str, needle: &str) -> bool {
    format!(" {haystack} ").contains(&format!(" {needle} "))
}

/// Dice coefficient over the two token sets.
pub fn token_dice(a: &str, b: &str) -> f64 {
    let left: HashSet<&str> = a.split_whitespace().collect();
    let right: HashSet<&str> = b.split_whitespace().collect();
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(&right).count();
    (2 * shared) as f64 / (left.len() + right.len()) as f64
}

/// Similarity of two normalized strings in `[0, 1]`.
pub fn score(query: &str, candidate: &str) -> f64 {
    if query.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    if query == candidate {
        return EXACT;
    }
    if extends_at_boundary(candidate, query) {
        return CANDIDATE_EXTENDS_QUERY;
    }
    if extends_at_boundary(query, candidate) {
        return QUERY_EXTENDS_CANDIDATE;
    }
    if contains_tokens(candidate, query) || contains_tokens(query, candidate) {
        return TOKEN_CONTAINMENT;
    }
    FUZZY_WEIGHT * jaro_winkler(query, candidate).max(token_dice(query, candidate))
}

/// Score every choice, keep the best score per entity, and order by score
/// descending then by id.
pub fn rank<Id>(query: &str, choices: &[Choice<Id>]) -> Vec<Scored<Id>>
where
    Id: Copy + Ord,
{
    let mut best: Vec<Scored<Id>> = Vec::new();
    for choice in choices {
        let score = score(query, &choice.key);
        match best.iter_mut().find(|scored| scored.id == choice.id) {
            Some(existing) if existing.score >= score => {}
            Some(existing) => existing.score = score,
            None => best.push(Scored { id: choice.id, score }),
        }
    }

    best.sort_by(|left, right| match right.score.total_cmp(&left.score) {
        Ordering::Equal => left.id.cmp(&right.id),
        other => other,
    });
    best
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::domain::item::ItemId;

    fn choices(keys: &[&str]) -> Vec<Choice<ItemId>> {
        keys.iter().enumerate().map(|(id, key)| Choice { id: ItemId(id), key: key.to_string() }).collect()
    }

    #[test]
    fn tiers_follow_boundary_rules() {
        assert_eq!(score("nutty bowl", "nutty bowl"), EXACT);
        assert_eq!(score("acai elixir", "acai elixir mini"), CANDIDATE_EXTENDS_QUERY);
        assert_eq!(score("acai elixir mini", "acai elixir"), QUERY_EXTENDS_CANDIDATE);
        assert_eq!(score("elixir", "acai elixir mini"), TOKEN_CONTAINMENT);
        assert!(score("acai", "acaiberry") < TOKEN_CONTAINMENT);
    }

    #[test]
    fn fuzzy_scores_stay_below_the_containment_tier() {
        let typo = score("nuty bowl", "nutty bowl");
        assert!(typo > 0.7 && typo < TOKEN_CONTAINMENT, "typo scored {typo}");
        assert!(score("latte", "kombucha") < 0.6);
    }

    #[test]
    fn empty_inputs_score_zero() {
        assert_eq!(score("", "latte"), 0.0);
        assert_eq!(score("latte", ""), 0.0);
    }

    #[test]
    fn rank_keeps_best_score_per_entity_and_breaks_ties_by_id() {
        let mut choices = choices(&["green glow", "berry blast", "green glow"]);
        choices.push(Choice { id: ItemId(1), key: "green glow".to_string() });

        let ranked = rank("green glow", &choices);
        assert_eq!(ranked.iter().map(|s| s.id).collect::<Vec<_>>(), vec![ItemId(0), ItemId(1), ItemId(2)]);
        assert_eq!(ranked[1].score, EXACT);
    }

    #[test]
    fn token_dice_counts_shared_tokens() {
        assert_eq!(token_dice("green glow", "glow green"), 1.0);
        assert_eq!(token_dice("green glow", "green tea"), 0.5);
        assert_eq!(token_dice("", "tea"), 0.0);
    }

    proptest! {
        #[test]
        fn scores_are_bounded_and_reflexive(query in "[a-z]{1,8}( [a-z]{1,8}){0,2}", other in "[a-z ]{0,20}") {
            let value = score(&query, &other);
            prop_assert!((0.0..=1.0).contains(&value));
            prop_assert_eq!(score(&query, &query), EXACT);
        }

        #[test]
        fn ranking_is_deterministic(query in "[a-z]{1,6}", keys in proptest::collection::vec("[a-z]{1,6}( [a-z]{1,6})?", 1..12)) {
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            let choices = choices(&keys);
            prop_assert_eq!(rank(&query, &choices), rank(&query, &choices));
        }
    }
}
