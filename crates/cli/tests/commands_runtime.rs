use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use menudex_cli::commands::{ask, ask::AskArgs, config, doctor, export, query, summary, GlobalOptions};
use serde_json::Value;
use tempfile::TempDir;

const DATASET: &str = r#"{"value": {
    "children": [
        {"itemType": 6, "itemMasterId": 1, "title": "Smoothies", "children": [
            {"itemType": 1, "itemMasterId": 10, "title": "Green Glow", "price": 8,
             "nutritionInfo": {"calories": 290}}
        ]},
        {"itemType": 6, "itemMasterId": 2, "title": "Bowls", "children": [
            {"itemType": 1, "itemMasterId": 20, "title": "Nutty Bowl",
             "prices": [
                 {"portion": "Small", "price": 8},
                 {"portion": "Medium", "price": "9.50"},
                 {"portion": "Large", "price": 11}
             ]}
        ]}
    ],
    "discounts": {
        "7": {"checkTitle": "BOGO Any Smoothie", "itemGroupIds": [1, 555]}
    }
}}"#;

fn dataset_in(dir: &Path) -> PathBuf {
    let path = dir.join("menu.json");
    fs::write(&path, DATASET).expect("dataset should be writable");
    path
}

fn options_for(dataset: &Path) -> GlobalOptions {
    GlobalOptions { config: None, dataset: Some(dataset.to_path_buf()) }
}

#[test]
fn summary_reports_counts_and_warnings() {
    with_env(&[], || {
        let dir = TempDir::new().expect("tempdir");
        let result = summary::run(&options_for(&dataset_in(dir.path())));
        assert_eq!(result.exit_code, 0, "expected successful summary: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "summary");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"]["items"], 2);
        assert_eq!(payload["data"]["discounts_partial"], 1);
        assert_eq!(payload["data"]["warnings"]["incomplete_join"], 1);
    });
}

#[test]
fn summary_fails_without_a_dataset() {
    with_env(&[], || {
        let result = summary::run(&GlobalOptions::default());
        assert_eq!(result.exit_code, 3, "expected dataset failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "dataset_missing");
    });
}

#[test]
fn unreadable_dataset_is_classified() {
    with_env(&[], || {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("broken.json");
        fs::write(&path, "{not json").expect("write");

        let result = summary::run(&options_for(&path));
        assert_eq!(result.exit_code, 4);
        assert_eq!(parse_payload(&result.output)["error_class"], "dataset_unreadable");
    });
}

#[test]
fn dataset_path_can_come_from_env() {
    let dir = TempDir::new().expect("tempdir");
    let dataset = dataset_in(dir.path());
    let dataset = dataset.to_string_lossy().into_owned();

    with_env(&[("MENUDEX_DATASET_PATH", dataset.as_str())], || {
        let result = summary::run(&GlobalOptions::default());
        assert_eq!(result.exit_code, 0, "expected env dataset to load: {}", result.output);
    });
}

#[test]
fn ask_returns_portion_clarification_then_price() {
    with_env(&[], || {
        let dir = TempDir::new().expect("tempdir");
        let options = options_for(&dataset_in(dir.path()));

        let args = AskArgs { intent: "price".to_string(), item: Some("nutty bowl".to_string()), ..AskArgs::default() };
        let payload = parse_payload(&ask::run(&options, &args).output);
        assert_eq!(payload["message"], "needs_clarification");
        assert_eq!(payload["data"]["outcome"], "needs_clarification");
        assert_eq!(payload["data"]["options"], serde_json::json!(["Small", "Medium", "Large"]));

        let args = AskArgs { portion: Some("small".to_string()), ..args };
        let payload = parse_payload(&ask::run(&options, &args).output);
        assert_eq!(payload["data"]["outcome"], "price");
        assert_eq!(payload["data"]["amount"], "8.00");
    });
}

#[test]
fn ask_rejects_unknown_intents() {
    with_env(&[], || {
        let dir = TempDir::new().expect("tempdir");
        let args = AskArgs { intent: "calories".to_string(), ..AskArgs::default() };
        let result = ask::run(&options_for(&dataset_in(dir.path())), &args);

        assert_eq!(result.exit_code, 6);
        assert_eq!(parse_payload(&result.output)["error_class"], "invalid_intent");
    });
}

#[test]
fn query_accepts_intent_json() {
    with_env(&[], || {
        let dir = TempDir::new().expect("tempdir");
        let options = options_for(&dataset_in(dir.path()));

        let result = query::run(&options, Some(r#"{"intent": "discount_trigger", "discount": "bogo any smoothie"}"#));
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "query");
        assert_eq!(payload["message"], "incomplete_join");
        assert_eq!(payload["data"]["limitation"], "partial_discount_mapping");
        assert_eq!(payload["data"]["resolved_items"], serde_json::json!(["Green Glow"]));

        let dashed = query::run(&options, Some(r#"{"intent": "discount-list"}"#));
        assert_eq!(dashed.exit_code, 0, "dashed intent names should parse: {}", dashed.output);
        assert_eq!(parse_payload(&dashed.output)["data"]["outcome"], "discounts");

        let malformed = query::run(&options, Some("{\"intent\": 3}"));
        assert_eq!(malformed.exit_code, 6);
    });
}

#[test]
fn export_writes_csv_jsonl_and_summary() {
    with_env(&[], || {
        let dir = TempDir::new().expect("tempdir");
        let out = dir.path().join("export");
        let result = export::run(&options_for(&dataset_in(dir.path())), &out);
        assert_eq!(result.exit_code, 0, "expected export success: {}", result.output);

        for name in [
            "items.csv",
            "items.jsonl",
            "prices.csv",
            "prices.jsonl",
            "categories.csv",
            "categories.jsonl",
            "discounts.csv",
            "discounts.jsonl",
            "summary.json",
        ] {
            assert!(out.join(name).exists(), "{name} should be written");
        }

        let items_csv = fs::read_to_string(out.join("items.csv")).expect("items.csv");
        assert!(items_csv.starts_with("item_id,source_id,name,"));
        assert_eq!(items_csv.lines().count(), 3);

        let prices = fs::read_to_string(out.join("prices.jsonl")).expect("prices.jsonl");
        assert_eq!(prices.lines().count(), 4);

        let summary: Value =
            serde_json::from_str(&fs::read_to_string(out.join("summary.json")).expect("summary")).expect("json");
        assert_eq!(summary["items"], 2);
    });
}

#[test]
fn config_reports_sources() {
    let dir = TempDir::new().expect("tempdir");
    let config_path = dir.path().join("menudex.toml");
    fs::write(&config_path, "[resolver]\naccept_floor = 0.8\n").expect("write config");

    with_env(&[("MENUDEX_LOG_LEVEL", "debug")], || {
        let options = GlobalOptions { config: Some(config_path.clone()), dataset: None };
        let output = config::run(&options);

        assert!(output.contains("- resolver.accept_floor = 0.8 (source: file ("), "{output}");
        assert!(output.contains("- logging.level = debug (source: env (MENUDEX_LOG_LEVEL))"), "{output}");
        assert!(output.contains("- dataset.path = <unset> (source: default)"), "{output}");
    });
}

#[test]
fn doctor_reports_warnings_for_partial_joins() {
    with_env(&[], || {
        let dir = TempDir::new().expect("tempdir");
        let output = doctor::run(&options_for(&dataset_in(dir.path())), true);
        let report: Value = serde_json::from_str(&output).expect("doctor json");

        assert_eq!(report["overall_status"], "warn");
        assert_eq!(report["checks"][0]["name"], "config_validation");
        assert_eq!(report["checks"][1]["status"], "pass");
        assert_eq!(report["checks"][2]["status"], "warn");
    });
}

#[test]
fn doctor_fails_and_skips_without_a_dataset() {
    with_env(&[], || {
        let output = doctor::run(&GlobalOptions::default(), false);
        assert!(output.starts_with("doctor: one or more readiness checks failed"));
        assert!(output.contains("- [fail] dataset_readable"));
        assert!(output.contains("- [skip] catalog_normalization"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid json")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "MENUDEX_DATASET_PATH",
        "MENUDEX_RESOLVER_ACCEPT_FLOOR",
        "MENUDEX_RESOLVER_AMBIGUITY_MARGIN",
        "MENUDEX_RESOLVER_MAX_SUGGESTIONS",
        "MENUDEX_RESOLVER_MAX_CANDIDATES",
        "MENUDEX_LOGGING_LEVEL",
        "MENUDEX_LOGGING_FORMAT",
        "MENUDEX_LOG_LEVEL",
        "MENUDEX_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> = keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
