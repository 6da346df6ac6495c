//! Text folding shared by the normalizer, the index and the resolver.

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Trailing tokens that name the kind of thing rather than the discount.
const DISCOUNT_SUFFIX_TOKENS: &[&str] = &["discount", "deal", "offer", "promo", "promotion"];

/// Fold text for matching.
///
/// - Unicode NFKD decomposition with combining marks dropped
/// - Lowercase
/// - Every non-alphanumeric character becomes a space
/// - Whitespace collapsed and trimmed
pub fn normalize_text(s: &str) -> String {
    let folded: String = s
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn tokenize(s: &str) -> Vec<String> {
    normalize_text(s).split_whitespace().map(str::to_string).collect()
}

/// Matching key for a portion label: aliases collapse onto one spelling.
pub fn portion_key(label: &str) -> Option<String> {
    let normalized = normalize_text(label);
    if normalized.is_empty() {
        return None;
    }

    let key = match normalized.as_str() {
        "sm" | "small" => "small",
        "md" | "med" | "medium" => "medium",
        "lg" | "large" => "large",
        "kid" | "kids" => "kid",
        "reg" | "regular" => "regular",
        other => other,
    };
    Some(key.to_string())
}

/// Display form of a source portion label.
pub fn canonical_portion_label(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let label = match trimmed.to_lowercase().as_str() {
        "sm" | "small" => "Small".to_string(),
        "md" | "med" | "medium" => "Medium".to_string(),
        "lg" | "large" => "Large".to_string(),
        _ if trimmed.chars().all(|c| !c.is_uppercase()) => {
            let mut chars = trimmed.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
        _ => trimmed.to_string(),
    };
    Some(label)
}

/// Normalize a discount reference and drop trailing generic tokens, so that
/// "BOGO smoothie deal" matches "BOGO Smoothie".
pub fn strip_discount_suffix(query: &str) -> String {
    let normalized = normalize_text(query);
    let mut tokens: Vec<&str> = normalized.split_whitespace().collect();
    while tokens.len() > 1 && tokens.last().is_some_and(|t| DISCOUNT_SUFFIX_TOKENS.contains(t)) {
        tokens.pop();
    }
    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_case_punctuation_and_accents() {
        assert_eq!(normalize_text("  Açaí   Elixir (Mini)! "), "acai elixir mini");
        assert_eq!(normalize_text("PB&J-Smoothie"), "pb j smoothie");
        assert_eq!(normalize_text("NUTTY BOWL"), normalize_text("nutty bowl"));
    }

    #[test]
    fn normalize_of_only_punctuation_is_empty() {
        assert_eq!(normalize_text("--- !!"), "");
    }

    #[test]
    fn portion_aliases_share_a_key() {
        assert_eq!(portion_key("SM"), Some("small".to_string()));
        assert_eq!(portion_key("Med"), Some("medium".to_string()));
        assert_eq!(portion_key("large"), Some("large".to_string()));
        assert_eq!(portion_key("Kids"), Some("kid".to_string()));
        assert_eq!(portion_key("20 oz"), Some("20 oz".to_string()));
        assert_eq!(portion_key("  "), None);
    }

    #[test]
    fn canonical_labels_are_title_cased_only_when_lowercase() {
        assert_eq!(canonical_portion_label("lg"), Some("Large".to_string()));
        assert_eq!(canonical_portion_label("regular"), Some("Regular".to_string()));
        assert_eq!(canonical_portion_label("20oz Cup"), Some("20oz Cup".to_string()));
        assert_eq!(canonical_portion_label(""), None);
    }

    #[test]
    fn discount_suffix_tokens_are_stripped_but_never_to_empty() {
        assert_eq!(strip_discount_suffix("BOGO Any Smoothie deal"), "bogo any smoothie");
        assert_eq!(strip_discount_suffix("Happy Hour promo offer"), "happy hour");
        assert_eq!(strip_discount_suffix("discount"), "discount");
    }
}
