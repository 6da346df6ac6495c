//! Price unification: scalar prices, portion lists and channel overrides all
//! become one ordered `Price` sequence with `Decimal` amounts.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::{
    catalog::text::{canonical_portion_label, normalize_text, portion_key},
    domain::item::Price,
    errors::WarningKind,
};

const SCALAR_PRICE_KEYS: &[&str] = &["price", "basePrice", "unitPrice"];
const ENTRY_AMOUNT_KEYS: &[&str] = &["price", "amount", "value"];
const PORTION_KEYS: &[&str] = &["portionTypeId", "portion", "label", "portionName", "size"];
const DEFAULT_FLAG_KEYS: &[&str] = &["isDefault", "default"];
const CHANNEL_KEYS: &[&str] = &["channel", "channelName"];
const CHANNEL_CONTAINER_KEYS: &[&str] = &["channelPrices", "priceOverrides"];

/// Prices extracted from one node, with the reasons any entry was dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PriceExtraction {
    pub prices: Vec<Price>,
    pub issues: Vec<(WarningKind, String)>,
}

impl PriceExtraction {
    fn issue(&mut self, kind: WarningKind, detail: impl Into<String>) {
        self.issues.push((kind, detail.into()));
    }
}

/// Parse a monetary amount from a JSON number or a numeric string with an
/// optional leading `$`. Amounts keep at least two decimal places.
pub fn parse_amount(value: &Value) -> Option<Decimal> {
    let parsed = match value {
        Value::Number(number) => decimal_from_text(&number.to_string()),
        Value::String(text) => {
            let text = text.trim();
            let text = text.strip_prefix('$').unwrap_or(text).trim();
            decimal_from_text(text)
        }
        _ => None,
    }?;

    if parsed.is_sign_negative() {
        return None;
    }
    let mut amount = parsed;
    if amount.scale() < 2 {
        amount.rescale(2);
    }
    Some(amount)
}

fn decimal_from_text(text: &str) -> Option<Decimal> {
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text).ok().or_else(|| Decimal::from_scientific(text).ok())
}

fn portion_label(entry: &Map<String, Value>) -> Option<String> {
    PORTION_KEYS.iter().find_map(|key| match entry.get(*key) {
        Some(Value::String(label)) => canonical_portion_label(label),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

fn default_flag(entry: &Map<String, Value>) -> bool {
    DEFAULT_FLAG_KEYS.iter().any(|key| entry.get(*key).and_then(Value::as_bool).unwrap_or(false))
}

fn entry_amount(entry: &Map<String, Value>) -> Option<Decimal> {
    ENTRY_AMOUNT_KEYS.iter().find_map(|key| entry.get(*key).and_then(parse_amount))
}

fn portion_list(fields: &Map<String, Value>) -> Option<&Vec<Value>> {
    fields
        .get("priceAttribute")
        .and_then(|attribute| attribute.get("prices"))
        .and_then(Value::as_array)
        .filter(|prices| !prices.is_empty())
        .or_else(|| fields.get("prices").and_then(Value::as_array).filter(|prices| !prices.is_empty()))
}

/// Base prices of a node. An empty result means the node has no usable price.
pub fn extract_base_prices(fields: &Map<String, Value>) -> PriceExtraction {
    let mut extraction = PriceExtraction::default();

    if let Some(entries) = portion_list(fields) {
        let mut parsed = Vec::new();
        for (index, entry) in entries.iter().enumerate() {
            let Some(entry) = entry.as_object() else {
                extraction.issue(WarningKind::InconsistentPricing, format!("price entry {index} is not an object"));
                continue;
            };
            let Some(amount) = entry_amount(entry) else {
                extraction.issue(WarningKind::InconsistentPricing, format!("price entry {index} has no usable amount"));
                continue;
            };
            let mut price = Price::base(amount, portion_label(entry));
            price.is_default = default_flag(entry);
            parsed.push(price);
        }
        let unified = unify_portions(parsed, &mut extraction);
        extraction.prices = unified;
    }

    if extraction.prices.is_empty() {
        if let Some(amount) = SCALAR_PRICE_KEYS.iter().find_map(|key| fields.get(*key).and_then(parse_amount)) {
            extraction.prices.push(Price::base(amount, None));
        }
    }

    settle_default(&mut extraction);
    extraction
}

fn unify_portions(parsed: Vec<Price>, extraction: &mut PriceExtraction) -> Vec<Price> {
    if parsed.len() <= 1 {
        return parsed;
    }

    let unlabeled = parsed.iter().filter(|price| price.portion.is_none()).count();
    let mut prices: Vec<Price> = if unlabeled == parsed.len() {
        extraction.issue(
            WarningKind::InconsistentPricing,
            format!("{} unlabeled prices; keeping the first", parsed.len()),
        );
        parsed.into_iter().take(1).collect()
    } else {
        if unlabeled > 0 {
            extraction.issue(
                WarningKind::InconsistentPricing,
                format!("dropped {unlabeled} unlabeled entries from a portioned price list"),
            );
        }
        parsed.into_iter().filter(|price| price.portion.is_some()).collect()
    };

    let mut seen = Vec::new();
    prices.retain(|price| {
        let key = price.portion.as_deref().and_then(portion_key);
        if seen.contains(&key) {
            extraction.issue(
                WarningKind::InconsistentPricing,
                format!("duplicate portion {:?}; keeping the first", price.portion.as_deref().unwrap_or("")),
            );
            false
        } else {
            seen.push(key);
            true
        }
    });
    prices
}

fn settle_default(extraction: &mut PriceExtraction) {
    match extraction.prices.len() {
        0 => {}
        1 => extraction.prices[0].is_default = true,
        _ => {
            let flagged = extraction.prices.iter().filter(|price| price.is_default).count();
            if flagged > 1 {
                extraction.issue(
                    WarningKind::ConflictingDefault,
                    format!("{flagged} portions flagged as default; no default kept"),
                );
                for price in &mut extraction.prices {
                    price.is_default = false;
                }
            }
        }
    }
}

/// Channel-labelled overrides from `channelPrices` / `priceOverrides`.
pub fn extract_channel_prices(fields: &Map<String, Value>) -> PriceExtraction {
    let mut extraction = PriceExtraction::default();

    for container_key in CHANNEL_CONTAINER_KEYS {
        match fields.get(*container_key) {
            Some(Value::Array(entries)) => {
                for (index, entry) in entries.iter().enumerate() {
                    let channel = entry.as_object().and_then(|entry| {
                        CHANNEL_KEYS
                            .iter()
                            .find_map(|key| entry.get(*key).and_then(Value::as_str))
                            .map(str::trim)
                            .filter(|channel| !channel.is_empty())
                    });
                    match (entry.as_object(), channel) {
                        (Some(entry), Some(channel)) => push_channel_price(&mut extraction, channel, entry, index),
                        _ => extraction.issue(
                            WarningKind::InconsistentPricing,
                            format!("{container_key} entry {index} has no channel"),
                        ),
                    }
                }
            }
            Some(Value::Object(by_channel)) => {
                for (index, (channel, value)) in by_channel.iter().enumerate() {
                    let channel = channel.trim();
                    match value {
                        Value::Object(entry) => push_channel_price(&mut extraction, channel, entry, index),
                        scalar => match parse_amount(scalar) {
                            Some(amount) => push_unique(
                                &mut extraction,
                                Price { amount, portion: None, channel: Some(channel.to_string()), is_default: false },
                            ),
                            None => extraction.issue(
                                WarningKind::InconsistentPricing,
                                format!("channel {channel:?} has no usable amount"),
                            ),
                        },
                    }
                }
            }
            _ => {}
        }
    }

    extraction
}

fn push_channel_price(extraction: &mut PriceExtraction, channel: &str, entry: &Map<String, Value>, index: usize) {
    match entry_amount(entry) {
        Some(amount) => push_unique(
            extraction,
            Price { amount, portion: portion_label(entry), channel: Some(channel.to_string()), is_default: false },
        ),
        None => extraction.issue(
            WarningKind::InconsistentPricing,
            format!("channel price entry {index} has no usable amount"),
        ),
    }
}

fn push_unique(extraction: &mut PriceExtraction, price: Price) {
    let key = |price: &Price| {
        (
            price.portion.as_deref().and_then(portion_key),
            price.channel.as_deref().map(normalize_text),
        )
    };
    let candidate = key(&price);
    if extraction.prices.iter().any(|existing| key(existing) == candidate) {
        extraction.issue(
            WarningKind::InconsistentPricing,
            format!("duplicate channel price for {:?}; keeping the first", price.channel.as_deref().unwrap_or("")),
        );
        return;
    }
    extraction.prices.push(price);
}
