use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::domain::item::{Nutrition, NutritionProvenance};

const DESCRIPTION_KEYS: &[&str] = &["description", "desc"];

fn calorie_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"(?i)\b(?:(\d{1,3}(?:,\d{3})+|\d{1,4})\s*(?:-|\x{2013}|to)\s*)?(\d{1,3}(?:,\d{3})+|\d{1,4})\s*(?:kcal|calories|calorie|cals|cal)\b",
            )
            .ok()
        })
        .as_ref()
}

/// Description text of a node, display attribute first.
pub fn description(fields: &Map<String, Value>) -> Option<String> {
    let display = fields
        .get("displayAttribute")
        .and_then(|attribute| attribute.get("description"))
        .and_then(Value::as_str);
    display
        .into_iter()
        .chain(DESCRIPTION_KEYS.iter().filter_map(|key| fields.get(*key).and_then(Value::as_str)))
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

fn structured_calories(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .and_then(|calories| u32::try_from(calories).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

// True when the match starts inside a larger number such as `1.5` or `12,50`.
fn continues_number(text: &str, start: usize) -> bool {
    let mut before = text[..start].chars().rev();
    matches!((before.next(), before.next()), (Some('.' | ','), Some(digit)) if digit.is_ascii_digit())
}

/// Calories from a single unambiguous `<number> <unit>` mention. Ranges,
/// fractional amounts and multiple mentions yield nothing.
pub fn calories_from_text(text: &str) -> Option<u32> {
    let pattern = calorie_pattern()?;
    let mut mentions = pattern.captures_iter(text);
    let only = mentions.next()?;
    if mentions.next().is_some() || only.get(1).is_some() {
        return None;
    }
    let whole = only.get(0)?;
    if continues_number(text, whole.start()) {
        return None;
    }
    only.get(2)?.as_str().replace(',', "").parse().ok()
}

/// Nutrition facts of a node. `None` when neither a structured field nor the
/// description carries calories.
pub fn extract_nutrition(fields: &Map<String, Value>, description: Option<&str>) -> Option<Nutrition> {
    let structured = fields
        .get("nutritionInfo")
        .and_then(|info| info.get("calories"))
        .and_then(structured_calories)
        .or_else(|| fields.get("calories").and_then(structured_calories));
    if let Some(calories) = structured {
        return Some(Nutrition { calories: Some(calories), provenance: NutritionProvenance::Structured });
    }

    description
        .and_then(calories_from_text)
        .map(|calories| Nutrition { calories: Some(calories), provenance: NutritionProvenance::ExtractedFromText })
}
