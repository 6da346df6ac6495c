use serde::{Deserialize, Serialize};

use crate::resolver::scoring::Scored;

/// Slack for float comparisons at the floor and margin boundaries.
const EPSILON: f64 = 1e-9;

/// Thresholds that turn a ranked candidate list into a decision.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolverPolicy {
    pub accept_floor: f64,
    pub ambiguity_margin: f64,
    pub max_suggestions: usize,
    pub max_candidates: usize,
}

impl Default for ResolverPolicy {
    fn default() -> Self {
        Self { accept_floor: 0.75, ambiguity_margin: 0.10, max_suggestions: 3, max_candidates: 10 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "resolution", rename_all = "snake_case")]
pub enum Resolution<Id> {
    Matched { id: Id, confidence: f64 },
    /// Every candidate within the margin of the top score, best first.
    Ambiguous { candidates: Vec<Scored<Id>>, threshold: f64 },
    NotFound { suggestions: Vec<Scored<Id>> },
}

impl ResolverPolicy {
    /// Decide on a list already ordered by [`rank`](crate::resolver::scoring::rank).
    pub fn decide<Id: Copy>(&self, ranked: &[Scored<Id>]) -> Resolution<Id> {
        let Some(top) = ranked.first() else {
            return Resolution::NotFound { suggestions: Vec::new() };
        };

        if top.score + EPSILON < self.accept_floor {
            let suggestions =
                ranked.iter().filter(|scored| scored.score > 0.0).take(self.max_suggestions).copied().collect();
            return Resolution::NotFound { suggestions };
        }

        let threshold = (top.score - self.ambiguity_margin).max(0.0);
        let contenders: Vec<Scored<Id>> = ranked
            .iter()
            .take_while(|scored| scored.score + EPSILON >= threshold)
            .copied()
            .collect();

        if contenders.len() > 1 {
            let candidates = contenders.into_iter().take(self.max_candidates.max(2)).collect();
            return Resolution::Ambiguous { candidates, threshold };
        }

        Resolution::Matched { id: top.id, confidence: top.score }
    }
}
