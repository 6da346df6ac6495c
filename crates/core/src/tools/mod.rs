//! Deterministic query tools over the index and already-resolved entities.

use crate::{
    answer::{
        AnswerResult, ChannelAmount, ChannelVerdict, ClarificationField, DiscountSummary, Limitation, PortionRow,
    },
    catalog::text::{normalize_text, portion_key},
    domain::{
        category::Category,
        discount::{Discount, Linkage},
        item::{ItemId, MenuItem, Price},
    },
    index::MenuIndex,
    resolver::portion::{find_portion, resolve_portion, PortionResolution},
};

fn summary(discount: &Discount) -> DiscountSummary {
    DiscountSummary {
        name: discount.name.clone(),
        source_id: discount.source.source_id,
        coupon: discount.coupon,
        linkage: discount.linkage(),
    }
}

fn item_names(index: &MenuIndex, items: &[ItemId]) -> Vec<String> {
    items.iter().filter_map(|id| index.item_name(*id)).map(str::to_string).collect()
}

fn sorted_case_insensitive(mut names: Vec<String>) -> Vec<String> {
    names.sort_by(|left, right| left.to_lowercase().cmp(&right.to_lowercase()).then_with(|| left.cmp(right)));
    names
}

fn channel_names(item: &MenuItem) -> Vec<String> {
    let mut channels: Vec<String> = Vec::new();
    for channel in item.channel_prices.iter().filter_map(|price| price.channel.as_deref()) {
        if !channels.iter().any(|known| normalize_text(known) == normalize_text(channel)) {
            channels.push(channel.to_string());
        }
    }
    channels
}

fn price_answer(item: &MenuItem, price: &Price, channel: Option<&str>, used_default: bool) -> AnswerResult {
    AnswerResult::Price {
        item: item.name.clone(),
        portion: price.portion.clone(),
        channel: channel.map(str::to_string),
        amount: price.amount,
        used_default,
    }
}

/// Price of an item, optionally for a portion and a sales channel.
pub fn price_lookup(item: &MenuItem, portion: Option<&str>, channel: Option<&str>) -> AnswerResult {
    let channel = channel.map(str::trim).filter(|channel| !channel.is_empty());

    let base = match resolve_portion(item, portion) {
        PortionResolution::Matched(price) => (price, false),
        PortionResolution::UsesDefault(price) => (price, true),
        PortionResolution::NeedsClarification(options) => {
            return AnswerResult::NeedsClarification {
                field: ClarificationField::Portion,
                item: Some(item.name.clone()),
                options,
            };
        }
    };

    let Some(channel) = channel else {
        return price_answer(item, base.0, None, base.1);
    };

    let wanted = normalize_text(channel);
    let in_channel: Vec<&Price> = item
        .channel_prices
        .iter()
        .filter(|price| price.channel.as_deref().map(normalize_text).as_deref() == Some(wanted.as_str()))
        .collect();

    // An unlabeled channel price belongs to the default base price only.
    let key = base.0.portion.as_deref().or(portion).and_then(portion_key);
    let on_default = item.default_price().is_some_and(|default| std::ptr::eq(default, base.0));
    let chosen = in_channel
        .iter()
        .copied()
        .find(|price| price.portion.is_some() && price.portion.as_deref().and_then(portion_key) == key)
        .or_else(|| in_channel.iter().copied().find(|price| price.portion.is_none() && on_default));

    match chosen {
        Some(price) => AnswerResult::Price {
            item: item.name.clone(),
            portion: price.portion.clone().or_else(|| base.0.portion.clone()),
            channel: price.channel.clone(),
            amount: price.amount,
            used_default: base.1,
        },
        None => AnswerResult::Limitation(Limitation::ChannelPricingAbsent {
            item: item.name.clone(),
            channel: Some(channel.to_string()),
            available_channels: channel_names(item),
        }),
    }
}

pub fn nutrition_lookup(item: &MenuItem) -> AnswerResult {
    match item.nutrition.as_ref().and_then(|nutrition| nutrition.calories.map(|c| (c, nutrition.provenance))) {
        Some((calories, provenance)) => AnswerResult::Nutrition { item: item.name.clone(), calories, provenance },
        None => AnswerResult::Limitation(Limitation::NutritionAbsent { item: item.name.clone() }),
    }
}

/// Member item names sorted case-insensitively.
pub fn category_listing(index: &MenuIndex, category: &Category) -> AnswerResult {
    AnswerResult::CategoryItems {
        category: category.name.clone(),
        items: sorted_case_insensitive(item_names(index, &category.members)),
    }
}

/// Outcome for a category reference that resolved to nothing.
pub fn empty_category(index: &MenuIndex, query: &str) -> AnswerResult {
    AnswerResult::EmptyCategory {
        query: query.to_string(),
        known_categories: sorted_case_insensitive(
            index.categories().iter().map(|category| category.name.clone()).collect(),
        ),
    }
}

/// Every discount ordered by name, then source id.
pub fn discount_listing(index: &MenuIndex) -> AnswerResult {
    let mut discounts: Vec<&Discount> = index.discounts().iter().collect();
    discounts.sort_by(|left, right| {
        left.name
            .to_lowercase()
            .cmp(&right.name.to_lowercase())
            .then_with(|| left.name.cmp(&right.name))
            .then_with(|| left.source.source_id.cmp(&right.source.source_id))
            .then_with(|| left.id.cmp(&right.id))
    });
    AnswerResult::Discounts { discounts: discounts.into_iter().map(summary).collect() }
}

/// Items that trigger a discount. Partial linkage still reports the items
/// that did resolve.
pub fn discount_trigger_query(index: &MenuIndex, discount: &Discount) -> AnswerResult {
    let items = item_names(index, &discount.triggered_items());
    match discount.linkage() {
        Linkage::Complete => AnswerResult::DiscountTriggers { discount: discount.name.clone(), items },
        Linkage::Partial => AnswerResult::Limitation(Limitation::PartialDiscountMapping {
            discount: discount.name.clone(),
            resolved_items: items,
            unresolved_groups: discount.unresolved_references(),
        }),
        Linkage::Unlinked => AnswerResult::Limitation(Limitation::NoLinkedGroups { discount: discount.name.clone() }),
    }
}

pub fn discount_details(discount: &Discount) -> AnswerResult {
    AnswerResult::DiscountDetails {
        discount: discount.name.clone(),
        source_id: discount.source.source_id,
        coupon: discount.coupon,
        linkage: discount.linkage(),
        details: discount.details.clone(),
        groups: discount.groups.iter().map(|group| group.reference.to_string()).collect(),
    }
}

/// Discounts linked to an item through groups, plus those the item itself
/// declares by id.
pub fn item_discounts(index: &MenuIndex, item: &MenuItem) -> AnswerResult {
    let mut linked: Vec<&Discount> = index.discounts_for_item(item.id);
    let mut unknown_declared_ids = Vec::new();
    for declared in &item.declared_discounts {
        match index.discount_by_source_id(*declared) {
            Some(discount) if !linked.iter().any(|known| known.id == discount.id) => linked.push(discount),
            Some(_) => {}
            None => unknown_declared_ids.push(*declared),
        }
    }
    linked.sort_by_key(|discount| discount.id);

    AnswerResult::ItemDiscounts {
        item: item.name.clone(),
        discounts: linked.into_iter().map(summary).collect(),
        unknown_declared_ids,
    }
}

/// Base and channel prices per portion with a verdict. `Equal` needs every
/// base portion priced in every channel.
pub fn channel_price_comparison(item: &MenuItem) -> AnswerResult {
    if !item.has_channel_pricing() {
        return AnswerResult::Limitation(Limitation::ChannelPricingAbsent {
            item: item.name.clone(),
            channel: None,
            available_channels: Vec::new(),
        });
    }

    let mut rows: Vec<PortionRow> = item
        .prices
        .iter()
        .map(|price| PortionRow { portion: price.portion.clone(), base: Some(price.amount), channels: Vec::new() })
        .collect();

    for channel_price in &item.channel_prices {
        let base = match channel_price.portion.as_deref() {
            Some(label) => find_portion(&item.prices, label),
            None => item.default_price(),
        };
        let amount = ChannelAmount {
            channel: channel_price.channel.clone().unwrap_or_default(),
            amount: channel_price.amount,
        };
        let row = base.and_then(|base| rows.iter_mut().find(|row| row.portion == base.portion));
        match row {
            Some(row) => row.channels.push(amount),
            None => {
                let portion = channel_price.portion.clone();
                match rows.iter_mut().find(|row| row.base.is_none() && row.portion == portion) {
                    Some(row) => row.channels.push(amount),
                    None => rows.push(PortionRow { portion, base: None, channels: vec![amount] }),
                }
            }
        }
    }

    let channels: Vec<String> = channel_names(item).iter().map(|channel| normalize_text(channel)).collect();
    let covers_every_channel = |row: &PortionRow| {
        channels
            .iter()
            .all(|wanted| row.channels.iter().any(|priced| normalize_text(&priced.channel) == *wanted))
    };

    let comparable: Vec<&PortionRow> = rows.iter().filter(|row| row.comparable()).collect();
    let verdict = if comparable.is_empty() {
        ChannelVerdict::Incomparable
    } else if comparable.iter().any(|row| !row.all_equal()) {
        ChannelVerdict::Unequal
    } else if rows.iter().filter(|row| row.base.is_some()).all(covers_every_channel) {
        ChannelVerdict::Equal
    } else {
        ChannelVerdict::Partial
    };

    AnswerResult::ChannelComparison { item: item.name.clone(), rows, verdict }
}
