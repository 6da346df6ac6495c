use std::sync::Arc;

use clap::Args;
use menudex_core::{AnswerEngine, DeterministicAnswerEngine, IntentKind, QueryIntent};

use crate::commands::{load_runtime, CommandResult, GlobalOptions};

#[derive(Args, Clone, Debug, Default)]
pub struct AskArgs {
    #[arg(long, help = "price, nutrition, category, discount_list, discount_trigger, channel_compare, ...")]
    pub intent: String,
    #[arg(long)]
    pub item: Option<String>,
    #[arg(long)]
    pub portion: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub discount: Option<String>,
    #[arg(long)]
    pub channel: Option<String>,
}

impl AskArgs {
    fn to_intent(&self) -> Result<QueryIntent, menudex_core::IntentError> {
        let kind: IntentKind = self.intent.parse()?;
        Ok(QueryIntent {
            intent: kind,
            item: self.item.clone(),
            portion: self.portion.clone(),
            category: self.category.clone(),
            discount: self.discount.clone(),
            channel: self.channel.clone(),
        })
    }
}

pub fn run(options: &GlobalOptions, args: &AskArgs) -> CommandResult {
    let intent = match args.to_intent() {
        Ok(intent) => intent,
        Err(error) => return CommandResult::failure("ask", "invalid_intent", error.to_string(), 6),
    };
    answer("ask", options, &intent)
}

/// Shared by `ask` and `query`: load the dataset and answer one intent.
pub(crate) fn answer(command: &str, options: &GlobalOptions, intent: &QueryIntent) -> CommandResult {
    let runtime = match load_runtime(command, options) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let engine = DeterministicAnswerEngine::new(Arc::new(runtime.index), runtime.config.resolver);
    let result = engine.answer(intent);
    CommandResult::success_with_data(command, result.outcome_class().as_str(), &result)
}
