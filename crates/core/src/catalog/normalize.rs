//! Walker records to canonical entities.
//!
//! Items and categories come from the menu tree in one pre-order pass.
//! Discounts and item groups are joined afterwards, once every item and
//! category a group can expand into is known.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{
    catalog::{
        nutrition::{description, extract_nutrition},
        price::{extract_base_prices, extract_channel_prices, parse_amount},
        text::normalize_text,
        walker::{NodeKind, RawNode, WalkOutput},
        Catalog,
    },
    domain::{
        category::{Category, CategoryId},
        discount::{CouponPresence, Discount, DiscountDetails, DiscountId, GroupRef, ItemGroup},
        item::{ItemId, MenuItem},
        SourceRef,
    },
    errors::{CatalogWarning, WarningKind},
};

const DISPLAY_TITLE_KEYS: &[&str] = &["screenTitle", "checkTitle", "kitchenTitle"];
const DISCOUNT_NAME_KEYS: &[&str] = &["checkTitle", "title", "name", "displayName", "screenTitle"];
const DISCOUNT_ID_KEYS: &[&str] = &["id", "discountId"];
const GROUP_ID_KEYS: &[&str] = &["id", "itemGroupId", "groupId"];
const GROUP_MEMBER_KEYS: &[&str] = &["items", "itemIds", "itemMasterIds", "members"];
const COUPON_FLAG_KEYS: &[&str] = &["couponRequired", "requiresCoupon"];

/// Integer read leniently: JSON integers and digit strings.
pub(crate) fn source_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn non_empty(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).map(str::trim).filter(|text| !text.is_empty())
}

fn display_attribute(fields: &Map<String, Value>) -> Option<&Map<String, Value>> {
    fields.get("displayAttribute").and_then(Value::as_object)
}

/// Display name: `displayAttribute.itemTitle`, the node title, the other
/// display titles, then `name`.
pub fn display_name(fields: &Map<String, Value>) -> Option<String> {
    let display = display_attribute(fields);
    display
        .and_then(|attribute| non_empty(attribute.get("itemTitle")))
        .or_else(|| non_empty(fields.get("title")))
        .or_else(|| {
            display.and_then(|attribute| {
                DISPLAY_TITLE_KEYS.iter().find_map(|key| non_empty(attribute.get(*key)))
            })
        })
        .or_else(|| DISPLAY_TITLE_KEYS.iter().find_map(|key| non_empty(fields.get(*key))))
        .or_else(|| non_empty(fields.get("name")))
        .map(str::to_string)
}

fn node_source_id(fields: &Map<String, Value>) -> Option<i64> {
    fields.get("itemMasterId").and_then(source_int).or_else(|| fields.get("id").and_then(source_int))
}

struct CategoryNode {
    id: CategoryId,
    title: String,
}

#[derive(Default)]
struct Normalizer {
    items: Vec<MenuItem>,
    categories: Vec<Category>,
    discounts: Vec<Discount>,
    warnings: Vec<CatalogWarning>,
    category_nodes: HashMap<usize, CategoryNode>,
    category_by_name: HashMap<String, CategoryId>,
    item_by_name: HashMap<String, ItemId>,
    item_by_source: HashMap<i64, ItemId>,
    item_by_path_key: HashMap<String, ItemId>,
    category_by_source: HashMap<i64, CategoryId>,
    explicit_groups: HashMap<i64, Vec<Value>>,
}

/// Build the entity set from walker output. Never fails; skipped nodes are
/// recorded as warnings on the returned catalog.
pub fn normalize(walked: &WalkOutput<'_>) -> Catalog {
    let mut normalizer = Normalizer { warnings: walked.warnings.clone(), ..Normalizer::default() };

    for node in &walked.nodes {
        match node.kind {
            NodeKind::Category => normalizer.category(node),
            NodeKind::Item => normalizer.item(node),
            NodeKind::ItemGroup => normalizer.item_group(node),
            NodeKind::Discount
            | NodeKind::ModifierGroup
            | NodeKind::ModifierOption
            | NodeKind::Root
            | NodeKind::Unknown => {}
        }
    }

    for node in walked.nodes.iter().filter(|node| node.kind == NodeKind::Discount) {
        normalizer.discount(node);
    }

    debug!(
        event_name = "catalog.normalize.completed",
        items = normalizer.items.len(),
        categories = normalizer.categories.len(),
        discounts = normalizer.discounts.len(),
        warnings = normalizer.warnings.len(),
        "catalog normalized"
    );

    Catalog {
        items: normalizer.items,
        categories: normalizer.categories,
        discounts: normalizer.discounts,
        warnings: normalizer.warnings,
    }
}

impl Normalizer {
    fn warn(&mut self, kind: WarningKind, pointer: &str, detail: impl Into<String>) {
        let detail = detail.into();
        warn!(
            event_name = "catalog.normalize.warning",
            kind = kind.as_str(),
            pointer = %pointer,
            detail = %detail,
            "normalization warning"
        );
        self.warnings.push(CatalogWarning::new(kind, pointer, detail));
    }

    /// Materialized categories enclosing a node, outermost first.
    fn enclosing_categories(&self, node: &RawNode<'_>) -> Vec<&CategoryNode> {
        node.ancestors.iter().filter_map(|ordinal| self.category_nodes.get(ordinal)).collect()
    }

    fn category(&mut self, node: &RawNode<'_>) {
        let Some(title) = display_name(node.fields) else {
            self.warn(WarningKind::MalformedNode, &node.pointer, "category has no name");
            return;
        };
        let source_id = node_source_id(node.fields);
        let key = normalize_text(&title);
        if key.is_empty() {
            self.warn(WarningKind::MalformedNode, &node.pointer, "category name folds to nothing");
            return;
        }

        let id = match self.category_by_name.get(&key) {
            Some(existing) => {
                debug!(event_name = "catalog.normalize.category_merged", name = %title, pointer = %node.pointer);
                *existing
            }
            None => {
                let id = CategoryId(self.categories.len());
                let mut path: Vec<String> =
                    self.enclosing_categories(node).iter().map(|category| category.title.clone()).collect();
                path.push(title.clone());
                self.categories.push(Category {
                    id,
                    name: title.clone(),
                    path,
                    members: Vec::new(),
                    source_ids: Vec::new(),
                    source: SourceRef::new(node.pointer.clone(), source_id),
                });
                self.category_by_name.insert(key, id);
                id
            }
        };

        if let Some(source_id) = source_id {
            let category = &mut self.categories[id.0];
            if !category.source_ids.contains(&source_id) {
                category.source_ids.push(source_id);
            }
            self.category_by_source.entry(source_id).or_insert(id);
        }
        self.category_nodes.insert(node.ordinal, CategoryNode { id, title });
    }

    fn item(&mut self, node: &RawNode<'_>) {
        let fields = node.fields;
        let Some(name) = display_name(fields) else {
            self.warn(WarningKind::MalformedNode, &node.pointer, "item has no name");
            return;
        };
        let key = normalize_text(&name);
        if key.is_empty() {
            self.warn(WarningKind::MalformedNode, &node.pointer, "item name folds to nothing");
            return;
        }

        let enclosing: Vec<CategoryId> = self.enclosing_categories(node).iter().map(|category| category.id).collect();
        let source_id = node_source_id(fields);

        if let Some(existing) = source_id.and_then(|id| self.item_by_source.get(&id).copied()) {
            debug!(
                event_name = "catalog.normalize.item_merged",
                name = %name,
                pointer = %node.pointer,
                "item repeated under another category"
            );
            for category in enclosing {
                self.categories[category.0].add_member(existing);
            }
            return;
        }
        if self.item_by_name.contains_key(&key) {
            self.warn(
                WarningKind::DuplicateName,
                &node.pointer,
                format!("another item is already named {name:?}"),
            );
            return;
        }

        let base = extract_base_prices(fields);
        for (kind, detail) in base.issues {
            self.warn(kind, &node.pointer, detail);
        }
        if base.prices.is_empty() {
            self.warn(WarningKind::MalformedNode, &node.pointer, format!("item {name:?} has no usable price"));
            return;
        }
        let channels = extract_channel_prices(fields);
        for (kind, detail) in channels.issues {
            self.warn(kind, &node.pointer, detail);
        }

        let description = description(fields);
        let nutrition = extract_nutrition(fields, description.as_deref());
        let id = ItemId(self.items.len());
        let path_key = non_empty(fields.get("itemPathKey")).map(str::to_string);

        let item = MenuItem {
            id,
            title: non_empty(fields.get("title")).map_or_else(|| name.clone(), str::to_string),
            name,
            description,
            category: enclosing.last().copied(),
            category_path: self.enclosing_categories(node).iter().map(|category| category.title.clone()).collect(),
            prices: base.prices,
            channel_prices: channels.prices,
            nutrition,
            path_key: path_key.clone(),
            declared_discounts: declared_discounts(fields),
            source: SourceRef::new(node.pointer.clone(), source_id),
        };

        for category in enclosing {
            self.categories[category.0].add_member(id);
        }
        self.item_by_name.insert(key, id);
        if let Some(source_id) = source_id {
            self.item_by_source.insert(source_id, id);
        }
        if let Some(path_key) = path_key {
            self.item_by_path_key.entry(path_key).or_insert(id);
        }
        self.items.push(item);
    }

    fn item_group(&mut self, node: &RawNode<'_>) {
        let id = GROUP_ID_KEYS
            .iter()
            .find_map(|key| node.fields.get(*key).and_then(source_int))
            .or_else(|| node.container_key.as_deref().and_then(|key| key.trim().parse().ok()));
        let Some(id) = id else {
            self.warn(WarningKind::MalformedNode, &node.pointer, "item group has no id");
            return;
        };

        let members: Vec<Value> = GROUP_MEMBER_KEYS
            .iter()
            .filter_map(|key| node.fields.get(*key).and_then(Value::as_array))
            .flatten()
            .cloned()
            .chain(
                node.fields
                    .get("menuItemPathKeys")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                    .filter_map(|key| key.as_str().map(|key| Value::Object(path_key_member(key)))),
            )
            .collect();
        self.explicit_groups.entry(id).or_default().extend(members);
    }

    fn discount(&mut self, node: &RawNode<'_>) {
        let fields = node.fields;
        let Some(name) = DISCOUNT_NAME_KEYS
            .iter()
            .find_map(|key| non_empty(fields.get(*key)))
            .or_else(|| display_attribute(fields).and_then(|attribute| non_empty(attribute.get("checkTitle"))))
            .map(str::to_string)
        else {
            self.warn(WarningKind::MalformedNode, &node.pointer, "discount has no name");
            return;
        };

        let source_id = node
            .container_key
            .as_deref()
            .and_then(|key| key.trim().parse().ok())
            .or_else(|| DISCOUNT_ID_KEYS.iter().find_map(|key| fields.get(*key).and_then(source_int)));
        if let Some(source_id) = source_id {
            if self.discounts.iter().any(|discount| discount.source.source_id == Some(source_id)) {
                self.warn(
                    WarningKind::DuplicateName,
                    &node.pointer,
                    format!("discount id {source_id} already defined"),
                );
                return;
            }
        }

        let groups: Vec<ItemGroup> =
            group_references(fields).into_iter().map(|reference| self.expand_group(reference)).collect();
        for group in groups.iter().filter(|group| group.partial) {
            self.warn(
                WarningKind::IncompleteJoin,
                &node.pointer,
                format!("{name:?} references {} which does not fully resolve", group.reference),
            );
        }

        self.discounts.push(Discount {
            id: DiscountId(self.discounts.len()),
            name,
            coupon: coupon_presence(fields),
            details: discount_details(fields),
            groups,
            source: SourceRef::new(node.pointer.clone(), source_id),
        });
    }

    fn expand_group(&self, reference: GroupRef) -> ItemGroup {
        let mut items = Vec::new();
        let mut unresolved = Vec::new();

        match &reference {
            GroupRef::Id(id) => {
                if let Some(members) = self.explicit_groups.get(id) {
                    for member in members {
                        match self.resolve_member(member) {
                            Some(resolved) => extend_unique(&mut items, resolved),
                            None => unresolved.push(member_label(member)),
                        }
                    }
                } else if let Some(category) = self.category_by_source.get(id) {
                    extend_unique(&mut items, self.categories[category.0].members.iter().copied());
                } else if let Some(item) = self.item_by_source.get(id) {
                    items.push(*item);
                }
            }
            GroupRef::PathKey(key) => {
                if let Some(item) = self.item_by_path_key.get(key) {
                    items.push(*item);
                }
            }
        }

        if items.is_empty() && unresolved.is_empty() {
            unresolved.push(reference.to_string());
        }
        let partial = !unresolved.is_empty();
        ItemGroup { reference, items, unresolved, partial }
    }

    /// Members are item source ids, category source ids or path keys.
    fn resolve_member(&self, member: &Value) -> Option<Vec<ItemId>> {
        if let Some(key) = member.get("menuItemPathKey").and_then(Value::as_str) {
            return self.item_by_path_key.get(key).map(|item| vec![*item]);
        }
        let id = source_int(member).or_else(|| {
            member
                .get("itemMasterId")
                .or_else(|| member.get("id"))
                .and_then(source_int)
        })?;
        if let Some(item) = self.item_by_source.get(&id) {
            return Some(vec![*item]);
        }
        self.category_by_source.get(&id).map(|category| self.categories[category.0].members.clone())
    }
}

fn path_key_member(key: &str) -> Map<String, Value> {
    let mut member = Map::new();
    member.insert("menuItemPathKey".to_string(), Value::String(key.to_string()));
    member
}

fn member_label(member: &Value) -> String {
    match member {
        Value::Object(fields) => match fields.get("menuItemPathKey").and_then(Value::as_str) {
            Some(key) => GroupRef::PathKey(key.to_string()).to_string(),
            None => fields
                .get("itemMasterId")
                .or_else(|| fields.get("id"))
                .and_then(source_int)
                .map_or_else(|| "member:?".to_string(), |id| format!("item:{id}")),
        },
        other => source_int(other).map_or_else(|| format!("member:{other}"), |id| format!("item:{id}")),
    }
}

fn extend_unique(items: &mut Vec<ItemId>, more: impl IntoIterator<Item = ItemId>) {
    for item in more {
        if !items.contains(&item) {
            items.push(item);
        }
    }
}

/// Group references of a discount in source order, without repeats.
pub fn group_references(fields: &Map<String, Value>) -> Vec<GroupRef> {
    let mut references = Vec::new();
    let mut push = |reference: GroupRef| {
        if !references.contains(&reference) {
            references.push(reference);
        }
    };

    for target in fields.get("targetItems").and_then(Value::as_array).into_iter().flatten() {
        let nested = target
            .get("discountDetails")
            .and_then(|details| details.get("itemGroupId"))
            .and_then(source_int);
        let direct = target.get("itemGroupId").and_then(source_int);
        for id in nested.into_iter().chain(direct) {
            push(GroupRef::Id(id));
        }
        if let Some(key) = non_empty(target.get("menuItemPathKey")) {
            push(GroupRef::PathKey(key.to_string()));
        }
    }
    for id in fields.get("itemGroupIds").and_then(Value::as_array).into_iter().flatten().filter_map(source_int) {
        push(GroupRef::Id(id));
    }

    references
}

pub fn coupon_presence(fields: &Map<String, Value>) -> CouponPresence {
    if let Some(required) = COUPON_FLAG_KEYS.iter().find_map(|key| fields.get(*key).and_then(Value::as_bool)) {
        return if required { CouponPresence::Present } else { CouponPresence::Absent };
    }
    match fields.get("couponCode") {
        Some(Value::String(code)) if !code.trim().is_empty() => CouponPresence::Present,
        Some(Value::String(_)) => CouponPresence::Absent,
        _ => CouponPresence::Unknown,
    }
}

fn discount_details(fields: &Map<String, Value>) -> DiscountDetails {
    DiscountDetails {
        type_id: fields.get("typeId").and_then(source_int),
        amount: fields.get("amount").and_then(parse_amount),
        auto_apply: fields.get("autoApply").and_then(Value::as_bool),
        maximum_usages: fields.get("maximumUsages").and_then(source_int),
        max_amount: fields.get("discountMaxAmount").or_else(|| fields.get("maxAmount")).and_then(parse_amount),
        coupon_code: non_empty(fields.get("couponCode")).map(str::to_string),
    }
}

fn declared_discounts(fields: &Map<String, Value>) -> Vec<i64> {
    let mut ids = Vec::new();
    for entry in fields.get("applicableDiscounts").and_then(Value::as_array).into_iter().flatten() {
        let id = match entry {
            Value::Object(entry) => entry.get("discountId").or_else(|| entry.get("id")).and_then(source_int),
            other => source_int(other),
        };
        if let Some(id) = id.filter(|id| !ids.contains(id)) {
            ids.push(id);
        }
    }
    ids
}
