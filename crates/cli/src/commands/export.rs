use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use menudex_core::inspect;
use serde::Serialize;
use tracing::info;

use crate::commands::{load_runtime, CommandResult, GlobalOptions};

#[derive(Debug, Serialize)]
struct ExportManifest {
    out_dir: String,
    files: Vec<String>,
    items: usize,
    prices: usize,
    categories: usize,
    discounts: usize,
}

/// Write items, prices, categories and discounts as CSV and JSONL plus a
/// `summary.json` into `out_dir`.
pub fn run(options: &GlobalOptions, out_dir: &Path) -> CommandResult {
    let runtime = match load_runtime("export", options) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    match write_all(&runtime.index, out_dir) {
        Ok(manifest) => {
            info!(
                event_name = "cli.export.completed",
                out_dir = %out_dir.display(),
                files = manifest.files.len(),
                "export written"
            );
            let message = format!("wrote {} files to {}", manifest.files.len(), out_dir.display());
            CommandResult::success_with_data("export", message, &manifest)
        }
        Err(error) => CommandResult::failure("export", "export_io", format!("{error:#}"), 7),
    }
}

fn write_all(index: &menudex_core::MenuIndex, out_dir: &Path) -> anyhow::Result<ExportManifest> {
    fs::create_dir_all(out_dir).with_context(|| format!("could not create `{}`", out_dir.display()))?;

    let items = inspect::item_rows(index);
    let prices = inspect::price_rows(index);
    let categories = inspect::category_rows(index);
    let discounts = inspect::discount_rows(index);

    let mut files = Vec::new();
    files.extend(write_table(out_dir, "items", &items)?);
    files.extend(write_table(out_dir, "prices", &prices)?);
    files.extend(write_table(out_dir, "categories", &categories)?);
    files.extend(write_table(out_dir, "discounts", &discounts)?);

    let summary_path = out_dir.join("summary.json");
    let summary = serde_json::to_string_pretty(&inspect::summary(index))?;
    fs::write(&summary_path, summary).with_context(|| format!("could not write `{}`", summary_path.display()))?;
    files.push(file_name(&summary_path));

    Ok(ExportManifest {
        out_dir: out_dir.display().to_string(),
        files,
        items: items.len(),
        prices: prices.len(),
        categories: categories.len(),
        discounts: discounts.len(),
    })
}

/// One table as `<stem>.csv` and `<stem>.jsonl`. An empty table yields empty
/// files with no CSV header.
fn write_table<T: Serialize>(out_dir: &Path, stem: &str, rows: &[T]) -> anyhow::Result<Vec<String>> {
    let csv_path = out_dir.join(format!("{stem}.csv"));
    let mut writer =
        csv::Writer::from_path(&csv_path).with_context(|| format!("could not create `{}`", csv_path.display()))?;
    for row in rows {
        writer.serialize(row).with_context(|| format!("could not write a row to `{}`", csv_path.display()))?;
    }
    writer.flush()?;

    let jsonl_path = out_dir.join(format!("{stem}.jsonl"));
    let file = File::create(&jsonl_path).with_context(|| format!("could not create `{}`", jsonl_path.display()))?;
    let mut writer = BufWriter::new(file);
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    Ok(vec![file_name(&csv_path), file_name(&jsonl_path)])
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default()
}
