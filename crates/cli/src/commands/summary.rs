use menudex_core::inspect;

use crate::commands::{load_runtime, CommandResult, GlobalOptions};

pub fn run(options: &GlobalOptions) -> CommandResult {
    let runtime = match load_runtime("summary", options) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let summary = inspect::summary(&runtime.index);
    let message = format!(
        "{} items, {} categories, {} discounts, {} warnings",
        summary.items,
        summary.categories,
        summary.discounts,
        runtime.index.warnings().len()
    );
    CommandResult::success_with_data("summary", message, &summary)
}
