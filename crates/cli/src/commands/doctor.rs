use menudex_core::config::AppConfig;
use menudex_core::errors::WarningKind;
use menudex_core::{load_index, MenuIndex};
use serde::Serialize;
use serde_json::Value;

use crate::commands::{read_document, GlobalOptions};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: &GlobalOptions, json_output: bool) -> String {
    let report = build_report(options);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn skipped(name: &'static str, reason: &str) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
}

fn build_report(options: &GlobalOptions) -> DoctorReport {
    let mut checks = Vec::new();
    run_checks(options, &mut checks);

    let failed = checks.iter().any(|check| matches!(check.status, CheckStatus::Fail | CheckStatus::Skipped));
    let warned = checks.iter().any(|check| check.status == CheckStatus::Warn);
    let (overall_status, summary) = if failed {
        (CheckStatus::Fail, "doctor: one or more readiness checks failed")
    } else if warned {
        (CheckStatus::Warn, "doctor: catalog loads with warnings")
    } else {
        (CheckStatus::Pass, "doctor: all readiness checks passed")
    };

    DoctorReport { overall_status, summary: summary.to_string(), checks }
}

fn run_checks(options: &GlobalOptions, checks: &mut Vec<DoctorCheck>) {
    let config = match AppConfig::load(options.load_options()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            config
        }
        Err(error) => {
            checks.push(DoctorCheck { name: "config_validation", status: CheckStatus::Fail, details: error.to_string() });
            checks.push(skipped("dataset_readable", "configuration did not load"));
            checks.push(skipped("catalog_normalization", "configuration did not load"));
            return;
        }
    };

    let Some(path) = config.dataset.path else {
        checks.push(DoctorCheck {
            name: "dataset_readable",
            status: CheckStatus::Fail,
            details: "no dataset configured (set dataset.path, MENUDEX_DATASET_PATH or --dataset)".to_string(),
        });
        checks.push(skipped("catalog_normalization", "no dataset is configured"));
        return;
    };

    let document: Value = match read_document(&path) {
        Ok(document) => {
            checks.push(DoctorCheck {
                name: "dataset_readable",
                status: CheckStatus::Pass,
                details: format!("parsed `{}`", path.display()),
            });
            document
        }
        Err(error) => {
            checks.push(DoctorCheck { name: "dataset_readable", status: CheckStatus::Fail, details: format!("{error:#}") });
            checks.push(skipped("catalog_normalization", "the dataset could not be read"));
            return;
        }
    };

    match load_index(&document) {
        Ok(index) => checks.push(normalization_check(&index)),
        Err(error) => {
            checks.push(DoctorCheck { name: "catalog_normalization", status: CheckStatus::Fail, details: error.to_string() })
        }
    }
}

fn normalization_check(index: &MenuIndex) -> DoctorCheck {
    let counts = format!(
        "{} items, {} categories, {} discounts",
        index.items().len(),
        index.categories().len(),
        index.discounts().len()
    );
    let warnings = index.warnings();
    if warnings.is_empty() {
        return DoctorCheck { name: "catalog_normalization", status: CheckStatus::Pass, details: counts };
    }

    let incomplete = warnings.iter().filter(|warning| warning.kind == WarningKind::IncompleteJoin).count();
    DoctorCheck {
        name: "catalog_normalization",
        status: CheckStatus::Warn,
        details: format!("{counts}; {} warnings ({incomplete} incomplete discount joins)", warnings.len()),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
