use std::io::{self, Read};

use menudex_core::QueryIntent;

use crate::commands::{ask, CommandResult, GlobalOptions};

/// Answer an intent given as JSON, e.g. `{"intent": "price", "item": "latte"}`.
/// Reads stdin when no argument is given.
pub fn run(options: &GlobalOptions, raw: Option<&str>) -> CommandResult {
    let raw = match raw {
        Some(raw) => raw.to_string(),
        None => {
            let mut buffer = String::new();
            if let Err(error) = io::stdin().read_to_string(&mut buffer) {
                return CommandResult::failure("query", "invalid_intent", format!("could not read stdin: {error}"), 6);
            }
            buffer
        }
    };

    match parse_intent(&raw) {
        Ok(intent) => ask::answer("query", options, &intent),
        Err(message) => CommandResult::failure("query", "invalid_intent", message, 6),
    }
}

pub fn parse_intent(raw: &str) -> Result<QueryIntent, String> {
    serde_json::from_str(raw.trim()).map_err(|error| format!("intent JSON did not parse: {error}"))
}
