use menudex_core::catalog::text::normalize_text;
use menudex_core::{build_catalog, load_index, resolve_item, Resolution, ResolverPolicy};
use proptest::prelude::*;
use serde_json::{json, Value};

fn document(entries: &[(String, u32)]) -> Value {
    let items: Vec<Value> = entries
        .iter()
        .enumerate()
        .map(|(position, (title, cents))| {
            json!({
                "itemType": 1,
                "itemMasterId": 100 + position,
                "title": title,
                "price": format!("{}.{:02}", cents / 100, cents % 100),
            })
        })
        .collect();
    json!({"value": {"children": [
        {"itemType": 6, "itemMasterId": 1, "title": "Everything", "children": items}
    ]}})
}

fn entries() -> impl Strategy<Value = Vec<(String, u32)>> {
    prop::collection::vec(("[a-z]{3,8}( [a-z]{3,8})?", 1u32..5000), 1..8)
}

proptest! {
    #[test]
    fn normalization_is_idempotent(entries in entries()) {
        let document = document(&entries);
        let first = build_catalog(&document);
        let second = build_catalog(&document);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn every_item_resolves_to_itself_or_a_tie_it_leads(entries in entries()) {
        let index = load_index(&document(&entries)).map_err(|error| TestCaseError::fail(error.to_string()))?;
        let policy = ResolverPolicy::default();

        for item in index.items() {
            match resolve_item(&item.name, &index, &policy) {
                Resolution::Matched { id, confidence } => {
                    prop_assert_eq!(id, item.id);
                    prop_assert!((confidence - 1.0).abs() < f64::EPSILON);
                }
                Resolution::Ambiguous { candidates, .. } => {
                    prop_assert_eq!(candidates.first().map(|scored| scored.id), Some(item.id));
                }
                Resolution::NotFound { .. } => prop_assert!(false, "{} did not resolve", item.name),
            }
        }
    }

    #[test]
    fn resolution_is_deterministic(entries in entries(), query in "[a-z ]{1,16}") {
        let index = load_index(&document(&entries)).map_err(|error| TestCaseError::fail(error.to_string()))?;
        let policy = ResolverPolicy::default();
        prop_assert_eq!(resolve_item(&query, &index, &policy), resolve_item(&query, &index, &policy));
    }

    #[test]
    fn duplicate_spellings_keep_the_first_item(entries in entries()) {
        let index = load_index(&document(&entries)).map_err(|error| TestCaseError::fail(error.to_string()))?;
        let mut seen: Vec<String> = Vec::new();
        for (title, _) in &entries {
            let key = normalize_text(title);
            if !seen.contains(&key) {
                seen.push(key);
            }
        }
        prop_assert_eq!(index.items().len(), seen.len());
    }
}
