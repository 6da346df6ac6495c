//! Router-produced intents and their dispatch onto resolver and tools.

use std::{str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    answer::{AnswerResult, Candidate, ClarificationField, EntityKind},
    domain::{category::Category, discount::Discount, item::MenuItem},
    errors::IntentError,
    index::MenuIndex,
    resolver::{resolve_category, resolve_discount, resolve_item, Resolution, ResolverPolicy, Scored},
    tools,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum IntentKind {
    Price,
    Nutrition,
    Category,
    DiscountList,
    DiscountTrigger,
    ChannelCompare,
    DiscountDetails,
    ItemDiscounts,
}

impl IntentKind {
    pub const ALL: [IntentKind; 8] = [
        Self::Price,
        Self::Nutrition,
        Self::Category,
        Self::DiscountList,
        Self::DiscountTrigger,
        Self::ChannelCompare,
        Self::DiscountDetails,
        Self::ItemDiscounts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Nutrition => "nutrition",
            Self::Category => "category",
            Self::DiscountList => "discount_list",
            Self::DiscountTrigger => "discount_trigger",
            Self::ChannelCompare => "channel_compare",
            Self::DiscountDetails => "discount_details",
            Self::ItemDiscounts => "item_discounts",
        }
    }
}

impl FromStr for IntentKind {
    type Err = IntentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| IntentError::UnknownIntent(value.to_string()))
    }
}

impl TryFrom<String> for IntentKind {
    type Error = IntentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// An already-extracted question: what is asked plus free-form entity hints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryIntent {
    pub intent: IntentKind,
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub portion: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub discount: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}

impl QueryIntent {
    pub fn new(intent: IntentKind) -> Self {
        Self { intent, item: None, portion: None, category: None, discount: None, channel: None }
    }

    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }

    pub fn with_portion(mut self, portion: impl Into<String>) -> Self {
        self.portion = Some(portion.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_discount(mut self, discount: impl Into<String>) -> Self {
        self.discount = Some(discount.into());
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }
}

fn hint(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

pub trait AnswerEngine: Send + Sync {
    fn answer(&self, intent: &QueryIntent) -> AnswerResult;
}

/// Answers intents against one shared, immutable index.
#[derive(Clone, Debug)]
pub struct DeterministicAnswerEngine {
    index: Arc<MenuIndex>,
    policy: ResolverPolicy,
}

impl DeterministicAnswerEngine {
    pub fn new(index: Arc<MenuIndex>, policy: ResolverPolicy) -> Self {
        Self { index, policy }
    }

    pub fn index(&self) -> &MenuIndex {
        &self.index
    }

    pub fn policy(&self) -> &ResolverPolicy {
        &self.policy
    }

    fn missing(field: ClarificationField) -> AnswerResult {
        AnswerResult::NeedsClarification { field, item: None, options: Vec::new() }
    }

    fn ambiguous<Id: Copy>(
        entity: EntityKind,
        query: &str,
        candidates: &[Scored<Id>],
        threshold: f64,
        name: impl Fn(Id) -> Option<String>,
    ) -> AnswerResult {
        AnswerResult::Ambiguous {
            entity,
            query: query.to_string(),
            candidates: candidates
                .iter()
                .filter_map(|scored| name(scored.id).map(|name| Candidate { name, confidence: scored.score }))
                .collect(),
            threshold,
        }
    }

    fn not_found<Id: Copy>(
        entity: EntityKind,
        query: &str,
        suggestions: &[Scored<Id>],
        name: impl Fn(Id) -> Option<String>,
    ) -> AnswerResult {
        AnswerResult::NotFound {
            entity,
            query: query.to_string(),
            suggestions: suggestions.iter().filter_map(|scored| name(scored.id)).collect(),
        }
    }

    fn with_item(&self, intent: &QueryIntent, answer: impl FnOnce(&MenuItem) -> AnswerResult) -> AnswerResult {
        let Some(query) = hint(&intent.item) else {
            return Self::missing(ClarificationField::Item);
        };
        let name = |id| self.index.item_name(id).map(str::to_string);
        match resolve_item(query, &self.index, &self.policy) {
            Resolution::Matched { id, .. } => match self.index.item(id) {
                Some(item) => answer(item),
                None => Self::not_found(EntityKind::Item, query, &[], name),
            },
            Resolution::Ambiguous { candidates, threshold } => {
                Self::ambiguous(EntityKind::Item, query, &candidates, threshold, name)
            }
            Resolution::NotFound { suggestions } => Self::not_found(EntityKind::Item, query, &suggestions, name),
        }
    }

    fn with_category(&self, intent: &QueryIntent, answer: impl FnOnce(&Category) -> AnswerResult) -> AnswerResult {
        let Some(query) = hint(&intent.category) else {
            return Self::missing(ClarificationField::Category);
        };
        let name = |id| self.index.category_name(id).map(str::to_string);
        match resolve_category(query, &self.index, &self.policy) {
            Resolution::Matched { id, .. } => match self.index.category(id) {
                Some(category) => answer(category),
                None => tools::empty_category(&self.index, query),
            },
            Resolution::Ambiguous { candidates, threshold } => {
                Self::ambiguous(EntityKind::Category, query, &candidates, threshold, name)
            }
            Resolution::NotFound { .. } => tools::empty_category(&self.index, query),
        }
    }

    fn with_discount(&self, intent: &QueryIntent, answer: impl FnOnce(&Discount) -> AnswerResult) -> AnswerResult {
        let Some(query) = hint(&intent.discount) else {
            return Self::missing(ClarificationField::Discount);
        };
        let name = |id| self.index.discount_name(id).map(str::to_string);
        match resolve_discount(query, &self.index, &self.policy) {
            Resolution::Matched { id, .. } => match self.index.discount(id) {
                Some(discount) => answer(discount),
                None => Self::not_found(EntityKind::Discount, query, &[], name),
            },
            Resolution::Ambiguous { candidates, threshold } => {
                Self::ambiguous(EntityKind::Discount, query, &candidates, threshold, name)
            }
            Resolution::NotFound { suggestions } => {
                Self::not_found(EntityKind::Discount, query, &suggestions, name)
            }
        }
    }
}

impl AnswerEngine for DeterministicAnswerEngine {
    fn answer(&self, intent: &QueryIntent) -> AnswerResult {
        let index = &self.index;
        let result = match intent.intent {
            IntentKind::Price => self.with_item(intent, |item| {
                tools::price_lookup(item, hint(&intent.portion), hint(&intent.channel))
            }),
            IntentKind::Nutrition => self.with_item(intent, tools::nutrition_lookup),
            IntentKind::ChannelCompare => self.with_item(intent, tools::channel_price_comparison),
            IntentKind::ItemDiscounts => self.with_item(intent, |item| tools::item_discounts(index, item)),
            IntentKind::Category => self.with_category(intent, |category| tools::category_listing(index, category)),
            IntentKind::DiscountList => tools::discount_listing(index),
            IntentKind::DiscountTrigger => {
                self.with_discount(intent, |discount| tools::discount_trigger_query(index, discount))
            }
            IntentKind::DiscountDetails => self.with_discount(intent, tools::discount_details),
        };

        info!(
            event_name = "answer.dispatched",
            intent = intent.intent.as_str(),
            outcome = result.outcome_class().as_str(),
            "intent answered"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::{
        answer::{AnswerResult, ClarificationField, EntityKind},
        catalog::build_catalog,
        errors::{IntentError, OutcomeClass},
        index::MenuIndex,
        intent::{AnswerEngine, DeterministicAnswerEngine, IntentKind, QueryIntent},
        resolver::ResolverPolicy,
    };

    fn engine() -> DeterministicAnswerEngine {
        let catalog = build_catalog(&json!({"value": {
            "children": [
                {"itemType": 6, "itemMasterId": 1, "title": "Smoothies", "children": [
                    {"itemType": 1, "itemMasterId": 10, "title": "Acai Elixir", "price": 9},
                    {"itemType": 1, "itemMasterId": 11, "title": "Acai Elixir Mini", "price": 6}
                ]}
            ],
            "discounts": {"7": {"checkTitle": "BOGO Any Smoothie", "itemGroupIds": [1]}}
        }}))
        .expect("catalog");
        DeterministicAnswerEngine::new(Arc::new(MenuIndex::build(catalog)), ResolverPolicy::default())
    }

    #[test]
    fn intent_names_parse_leniently() {
        assert_eq!("discount-trigger".parse::<IntentKind>(), Ok(IntentKind::DiscountTrigger));
        assert_eq!(" PRICE ".parse::<IntentKind>(), Ok(IntentKind::Price));
        assert_eq!("weather".parse::<IntentKind>(), Err(IntentError::UnknownIntent("weather".to_string())));
    }

    #[test]
    fn intents_deserialize_with_optional_hints() {
        let intent: QueryIntent =
            serde_json::from_value(json!({"intent": "price", "item": "Acai Elixir Mini"})).expect("intent");
        assert_eq!(intent, QueryIntent::new(IntentKind::Price).with_item("Acai Elixir Mini"));
    }

    #[test]
    fn deserialized_intent_names_are_as_lenient_as_parsed_ones() {
        let intent: QueryIntent = serde_json::from_value(json!({"intent": "Discount-List"})).expect("intent");
        assert_eq!(intent.intent, IntentKind::DiscountList);
        assert_eq!(serde_json::to_value(IntentKind::DiscountList).expect("serialize"), json!("discount_list"));

        let unknown = serde_json::from_value::<QueryIntent>(json!({"intent": "weather"})).expect_err("unknown");
        assert!(unknown.to_string().contains("weather"), "{unknown}");
    }

    #[test]
    fn missing_hint_asks_for_it() {
        let answer = engine().answer(&QueryIntent::new(IntentKind::Nutrition));
        assert_eq!(
            answer,
            AnswerResult::NeedsClarification { field: ClarificationField::Item, item: None, options: vec![] }
        );
    }

    #[test]
    fn ambiguous_reference_lists_candidates_by_name() {
        let answer = engine().answer(&QueryIntent::new(IntentKind::Price).with_item("acai elixir"));
        match answer {
            AnswerResult::Ambiguous { entity, candidates, .. } => {
                assert_eq!(entity, EntityKind::Item);
                let names: Vec<_> = candidates.iter().map(|c| c.name.as_str()).collect();
                assert_eq!(names, vec!["Acai Elixir", "Acai Elixir Mini"]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn dispatch_reaches_every_tool() {
        let engine = engine();
        let cases = [
            (QueryIntent::new(IntentKind::Price).with_item("acai elixir mini"), OutcomeClass::Answered),
            (QueryIntent::new(IntentKind::Nutrition).with_item("acai elixir mini"), OutcomeClass::DataAbsent),
            (QueryIntent::new(IntentKind::Category).with_category("smoothies"), OutcomeClass::Answered),
            (QueryIntent::new(IntentKind::Category).with_category("pizza"), OutcomeClass::NotFound),
            (QueryIntent::new(IntentKind::DiscountList), OutcomeClass::Answered),
            (QueryIntent::new(IntentKind::DiscountTrigger).with_discount("bogo deal"), OutcomeClass::Answered),
            (QueryIntent::new(IntentKind::DiscountDetails).with_discount("7"), OutcomeClass::Answered),
            (QueryIntent::new(IntentKind::ItemDiscounts).with_item("acai elixir mini"), OutcomeClass::Answered),
            (QueryIntent::new(IntentKind::ChannelCompare).with_item("acai elixir mini"), OutcomeClass::DataAbsent),
            (QueryIntent::new(IntentKind::Price).with_item("lasagna"), OutcomeClass::NotFound),
        ];

        for (intent, expected) in cases {
            let answer = engine.answer(&intent);
            assert_eq!(answer.outcome_class(), expected, "{intent:?} -> {answer:?}");
        }
    }

    #[test]
    fn engine_is_usable_as_a_shared_trait_object() {
        let engine: Arc<dyn AnswerEngine> = Arc::new(engine());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    engine.answer(&QueryIntent::new(IntentKind::Price).with_item("ACAI ELIXIR MINI")).outcome_class()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().expect("thread"), OutcomeClass::Answered);
        }
    }
}
