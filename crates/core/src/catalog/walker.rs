//! Schema-agnostic traversal of the raw catalog document.
//!
//! The walker turns an arbitrary JSON tree into an ordered list of node
//! records. Each record carries a best-effort [`NodeKind`], the ordinals of
//! its ancestor records and the JSON pointer of the node. It never fails on a
//! malformed sub-tree: the sub-tree is skipped and a warning recorded.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::errors::{CatalogWarning, LoadError, WarningKind};

/// JSON nesting deeper than this is skipped.
pub const MAX_DEPTH: usize = 128;

const ITEM_TYPE_ITEM: i64 = 1;
const ITEM_TYPE_MODIFIER_GROUP: i64 = 4;
const ITEM_TYPE_CATEGORY: i64 = 6;
const ITEM_TYPE_ROOT: i64 = 10;

const NODE_MARKER_KEYS: &[&str] = &[
    "itemType",
    "itemMasterId",
    "children",
    "title",
    "displayAttribute",
    "priceAttribute",
    "price",
    "basePrice",
    "unitPrice",
];
const PRICE_KEYS: &[&str] = &["price", "basePrice", "unitPrice"];
const MODIFIER_MARKER_KEYS: &[&str] = &["isModifierGroup", "modifiers", "minSelections", "maxSelections"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Item,
    Category,
    ModifierGroup,
    ModifierOption,
    Discount,
    ItemGroup,
    Root,
    Unknown,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Category => "category",
            Self::ModifierGroup => "modifier_group",
            Self::ModifierOption => "modifier_option",
            Self::Discount => "discount",
            Self::ItemGroup => "item_group",
            Self::Root => "root",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Container {
    #[default]
    None,
    Discounts,
    ItemGroups,
}

impl Container {
    fn for_key(key: &str) -> Self {
        match key {
            "discounts" => Self::Discounts,
            "itemGroups" | "item_groups" => Self::ItemGroups,
            _ => Self::None,
        }
    }
}

/// Structural context a node is found in; the only input to kind inference
/// besides the node's own fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WalkContext {
    pub container: Container,
    pub within_modifier_group: bool,
    pub within_item: bool,
}

#[derive(Clone, Debug)]
pub struct RawNode<'a> {
    pub ordinal: usize,
    pub kind: NodeKind,
    pub pointer: String,
    /// Ordinals of enclosing node records, outermost first.
    pub ancestors: Vec<usize>,
    /// Object key the node was stored under inside a keyed container.
    pub container_key: Option<String>,
    pub fields: &'a Map<String, Value>,
}

impl<'a> RawNode<'a> {
    pub fn parent(&self) -> Option<usize> {
        self.ancestors.last().copied()
    }

    pub fn str_field(&self, key: &str) -> Option<&'a str> {
        self.fields.get(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Clone, Debug, Default)]
pub struct WalkOutput<'a> {
    pub nodes: Vec<RawNode<'a>>,
    pub warnings: Vec<CatalogWarning>,
}

impl<'a> WalkOutput<'a> {
    pub fn count(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|node| node.kind == kind).count()
    }

    pub fn node(&self, ordinal: usize) -> Option<&RawNode<'a>> {
        self.nodes.get(ordinal)
    }
}

enum Frame<'a> {
    Value {
        value: &'a Value,
        pointer: String,
        depth: usize,
        ancestors: Vec<usize>,
        context: WalkContext,
    },
    Container {
        value: &'a Value,
        pointer: String,
        depth: usize,
        ancestors: Vec<usize>,
        container: Container,
    },
    Entry {
        fields: &'a Map<String, Value>,
        pointer: String,
        ancestors: Vec<usize>,
        container: Container,
        key: Option<String>,
    },
}

/// Walk a parsed document. Fails only when the document is not a tree.
pub fn walk(document: &Value) -> Result<WalkOutput<'_>, LoadError> {
    match document {
        Value::Object(_) | Value::Array(_) => {}
        other => return Err(LoadError::NotATree { found: value_type_name(other) }),
    }

    let mut output = WalkOutput::default();
    let mut stack = vec![Frame::Value {
        value: document,
        pointer: String::new(),
        depth: 0,
        ancestors: Vec::new(),
        context: WalkContext::default(),
    }];

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Value { value, pointer, depth, ancestors, context } => {
                if depth > MAX_DEPTH {
                    skip_deep(&mut output, &pointer);
                    continue;
                }
                match value {
                    Value::Object(fields) if is_node_like(fields) => {
                        visit_node(&mut output, &mut stack, fields, pointer, depth, ancestors, context);
                    }
                    Value::Object(fields) => {
                        let mut frames = Vec::new();
                        for (key, member) in fields {
                            let member_pointer = child_pointer(&pointer, key);
                            frames.push(container_or_value(
                                key,
                                member,
                                member_pointer,
                                depth + 1,
                                ancestors.clone(),
                                context,
                            ));
                        }
                        push_in_source_order(&mut stack, frames);
                    }
                    Value::Array(values) => {
                        let frames = values
                            .iter()
                            .enumerate()
                            .map(|(index, member)| Frame::Value {
                                value: member,
                                pointer: child_pointer(&pointer, &index.to_string()),
                                depth: depth + 1,
                                ancestors: ancestors.clone(),
                                context,
                            })
                            .collect();
                        push_in_source_order(&mut stack, frames);
                    }
                    _ => {}
                }
            }
            Frame::Container { value, pointer, depth, ancestors, container } => {
                if depth > MAX_DEPTH {
                    skip_deep(&mut output, &pointer);
                    continue;
                }
                let entries: Vec<(Option<String>, String, &Value)> = match value {
                    Value::Object(fields) => fields
                        .iter()
                        .map(|(key, member)| (Some(key.clone()), child_pointer(&pointer, key), member))
                        .collect(),
                    Value::Array(values) => values
                        .iter()
                        .enumerate()
                        .map(|(index, member)| (None, child_pointer(&pointer, &index.to_string()), member))
                        .collect(),
                    other => {
                        malformed(
                            &mut output,
                            &pointer,
                            format!("container holds {} instead of entries", value_type_name(other)),
                        );
                        continue;
                    }
                };

                let mut frames = Vec::new();
                for (key, entry_pointer, member) in entries {
                    match member {
                        Value::Object(fields) => frames.push(Frame::Entry {
                            fields,
                            pointer: entry_pointer,
                            ancestors: ancestors.clone(),
                            container,
                            key,
                        }),
                        other => malformed(
                            &mut output,
                            &entry_pointer,
                            format!("container entry is {}, expected object", value_type_name(other)),
                        ),
                    }
                }
                push_in_source_order(&mut stack, frames);
            }
            Frame::Entry { fields, pointer, ancestors, container, key } => {
                let context = WalkContext { container, ..WalkContext::default() };
                let kind = infer_kind(fields, context);
                record(&mut output, kind, pointer, ancestors, key, fields);
            }
        }
    }

    debug!(
        event_name = "catalog.walk.completed",
        nodes = output.nodes.len(),
        items = output.count(NodeKind::Item),
        categories = output.count(NodeKind::Category),
        discounts = output.count(NodeKind::Discount),
        unknown = output.count(NodeKind::Unknown),
        warnings = output.warnings.len(),
        "catalog walk completed"
    );

    Ok(output)
}

fn visit_node<'a>(
    output: &mut WalkOutput<'a>,
    stack: &mut Vec<Frame<'a>>,
    fields: &'a Map<String, Value>,
    pointer: String,
    depth: usize,
    ancestors: Vec<usize>,
    context: WalkContext,
) {
    let kind = infer_kind(fields, context);
    let ordinal = record(output, kind, pointer.clone(), ancestors.clone(), None, fields);

    let mut child_ancestors = ancestors;
    child_ancestors.push(ordinal);
    let child_context = WalkContext {
        container: Container::None,
        within_modifier_group: context.within_modifier_group || kind == NodeKind::ModifierGroup,
        within_item: context.within_item || matches!(kind, NodeKind::Item | NodeKind::ModifierOption),
    };

    let mut frames = Vec::new();
    for (key, member) in fields {
        let member_pointer = child_pointer(&pointer, key);
        if key == "children" {
            let Value::Array(children) = member else {
                malformed(
                    output,
                    &member_pointer,
                    format!("children is {}, expected array", value_type_name(member)),
                );
                continue;
            };
            for (index, child) in children.iter().enumerate() {
                let pointer = child_pointer(&member_pointer, &index.to_string());
                match child {
                    Value::Object(_) => frames.push(Frame::Value {
                        value: child,
                        pointer,
                        depth: depth + 2,
                        ancestors: child_ancestors.clone(),
                        context: child_context,
                    }),
                    other => malformed(
                        output,
                        &pointer,
                        format!("child is {}, expected object", value_type_name(other)),
                    ),
                }
            }
        } else if kind != NodeKind::Item && Container::for_key(key) != Container::None {
            frames.push(Frame::Container {
                value: member,
                pointer: member_pointer,
                depth: depth + 1,
                ancestors: child_ancestors.clone(),
                container: Container::for_key(key),
            });
        }
    }
    push_in_source_order(stack, frames);
}

fn container_or_value<'a>(
    key: &str,
    member: &'a Value,
    pointer: String,
    depth: usize,
    ancestors: Vec<usize>,
    context: WalkContext,
) -> Frame<'a> {
    match Container::for_key(key) {
        Container::None => Frame::Value { value: member, pointer, depth, ancestors, context },
        container => Frame::Container { value: member, pointer, depth, ancestors, container },
    }
}

/// Best-effort kind of a node from its fields and structural context.
pub fn infer_kind(fields: &Map<String, Value>, context: WalkContext) -> NodeKind {
    match fields.get("itemType").and_then(as_code) {
        Some(ITEM_TYPE_ITEM) if context.within_modifier_group => return NodeKind::ModifierOption,
        Some(ITEM_TYPE_ITEM) => return NodeKind::Item,
        Some(ITEM_TYPE_MODIFIER_GROUP) => return NodeKind::ModifierGroup,
        Some(ITEM_TYPE_CATEGORY) => return NodeKind::Category,
        Some(ITEM_TYPE_ROOT) => return NodeKind::Root,
        _ => {}
    }

    match context.container {
        Container::Discounts => return NodeKind::Discount,
        Container::ItemGroups => return NodeKind::ItemGroup,
        Container::None => {}
    }

    if is_modifier_marked(fields) {
        return NodeKind::ModifierGroup;
    }
    if context.within_modifier_group || context.within_item {
        return NodeKind::ModifierOption;
    }
    if has_price_fields(fields) {
        return NodeKind::Item;
    }

    let has_children = matches!(fields.get("children"), Some(Value::Array(_)));
    let has_title = ["title", "name"]
        .iter()
        .any(|key| fields.get(*key).and_then(Value::as_str).is_some_and(|s| !s.trim().is_empty()))
        || fields.get("displayAttribute").is_some_and(Value::is_object);
    match (has_children, has_title) {
        (true, true) => NodeKind::Category,
        (true, false) => NodeKind::Root,
        _ => NodeKind::Unknown,
    }
}

pub fn is_node_like(fields: &Map<String, Value>) -> bool {
    NODE_MARKER_KEYS.iter().any(|key| fields.contains_key(*key))
}

fn has_price_fields(fields: &Map<String, Value>) -> bool {
    PRICE_KEYS.iter().any(|key| fields.get(*key).is_some_and(|v| v.is_number() || v.is_string()))
        || fields
            .get("priceAttribute")
            .and_then(|attribute| attribute.get("prices"))
            .is_some_and(Value::is_array)
}

fn is_modifier_marked(fields: &Map<String, Value>) -> bool {
    MODIFIER_MARKER_KEYS.iter().any(|key| match fields.get(*key) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Null) | None => false,
        Some(_) => true,
    })
}

fn as_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn record<'a>(
    output: &mut WalkOutput<'a>,
    kind: NodeKind,
    pointer: String,
    ancestors: Vec<usize>,
    container_key: Option<String>,
    fields: &'a Map<String, Value>,
) -> usize {
    let ordinal = output.nodes.len();
    if kind == NodeKind::Unknown {
        debug!(event_name = "catalog.walk.unknown_node", pointer = %pointer, "node kind not inferred");
    }
    output.nodes.push(RawNode { ordinal, kind, pointer, ancestors, container_key, fields });
    ordinal
}

fn malformed(output: &mut WalkOutput<'_>, pointer: &str, detail: String) {
    warn!(event_name = "catalog.walk.malformed", pointer = %pointer, detail = %detail, "skipping sub-tree");
    output.warnings.push(CatalogWarning::new(WarningKind::MalformedNode, pointer, detail));
}

fn skip_deep(output: &mut WalkOutput<'_>, pointer: &str) {
    warn!(event_name = "catalog.walk.depth_limit", pointer = %pointer, "skipping sub-tree beyond depth limit");
    output.warnings.push(CatalogWarning::new(
        WarningKind::DepthLimit,
        pointer,
        format!("nesting exceeds {MAX_DEPTH} levels"),
    ));
}

fn push_in_source_order<'a>(stack: &mut Vec<Frame<'a>>, frames: Vec<Frame<'a>>) {
    stack.extend(frames.into_iter().rev());
}

fn child_pointer(parent: &str, segment: &str) -> String {
    format!("{parent}/{}", segment.replace('~', "~0").replace('/', "~1"))
}

pub(crate) fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
