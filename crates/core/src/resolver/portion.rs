use crate::{
    catalog::text::portion_key,
    domain::item::{MenuItem, Price},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PortionResolution<'a> {
    /// The requested portion exists.
    Matched(&'a Price),
    /// No usable request; the item's default price applies.
    UsesDefault(&'a Price),
    /// The caller has to pick one of these labels.
    NeedsClarification(Vec<String>),
}

pub fn find_portion<'a>(prices: &'a [Price], requested: &str) -> Option<&'a Price> {
    let wanted = portion_key(requested)?;
    prices.iter().find(|price| price.portion.as_deref().and_then(portion_key).as_deref() == Some(wanted.as_str()))
}

/// Pick the base price for an optional portion request.
///
/// A single unlabeled price answers any request. A labeled request that
/// matches no portion is never guessed, even when only one portion exists.
pub fn resolve_portion<'a>(item: &'a MenuItem, requested: Option<&str>) -> PortionResolution<'a> {
    let requested = requested.map(str::trim).filter(|label| !label.is_empty());

    if let [only] = item.prices.as_slice() {
        return match requested {
            None => PortionResolution::UsesDefault(only),
            Some(label) => match find_portion(&item.prices, label) {
                Some(price) => PortionResolution::Matched(price),
                None if only.portion.is_none() => PortionResolution::UsesDefault(only),
                None => PortionResolution::NeedsClarification(labels(item)),
            },
        };
    }

    if let Some(label) = requested {
        return match find_portion(&item.prices, label) {
            Some(price) => PortionResolution::Matched(price),
            None => PortionResolution::NeedsClarification(labels(item)),
        };
    }

    match item.default_price() {
        Some(price) => PortionResolution::UsesDefault(price),
        None => PortionResolution::NeedsClarification(labels(item)),
    }
}

fn labels(item: &MenuItem) -> Vec<String> {
    item.portion_labels().into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::{
        domain::{
            item::{ItemId, MenuItem, Price},
            SourceRef,
        },
        resolver::portion::{resolve_portion, PortionResolution},
    };

    fn item(prices: Vec<Price>) -> MenuItem {
        MenuItem {
            id: ItemId(0),
            name: "Nutty Bowl".to_string(),
            title: "Nutty Bowl".to_string(),
            description: None,
            category: None,
            category_path: vec![],
            prices,
            channel_prices: vec![],
            nutrition: None,
            path_key: None,
            declared_discounts: vec![],
            source: SourceRef::new("/children/0", None),
        }
    }

    fn portioned(default: Option<usize>) -> MenuItem {
        let mut prices: Vec<Price> = [("Small", 800), ("Medium", 950), ("Large", 1100)]
            .iter()
            .map(|(label, cents)| Price::base(Decimal::new(*cents, 2), Some(label.to_string())))
            .collect();
        if let Some(index) = default {
            prices[index].is_default = true;
        }
        item(prices)
    }

    #[test]
    fn portioned_item_without_default_needs_clarification_with_every_label() {
        let item = portioned(None);
        assert_eq!(
            resolve_portion(&item, None),
            PortionResolution::NeedsClarification(vec![
                "Small".to_string(),
                "Medium".to_string(),
                "Large".to_string()
            ])
        );
    }

    #[test]
    fn requested_portion_matches_through_aliases() {
        let item = portioned(None);

        assert_eq!(resolve_portion(&item, Some("Small")), PortionResolution::Matched(&item.prices[0]));
        assert_eq!(resolve_portion(&item, Some("lg")), PortionResolution::Matched(&item.prices[2]));
        assert_eq!(resolve_portion(&item, Some(" MED ")), PortionResolution::Matched(&item.prices[1]));
    }

    #[test]
    fn flagged_default_is_used_without_a_request() {
        let item = portioned(Some(1));
        assert_eq!(resolve_portion(&item, None), PortionResolution::UsesDefault(&item.prices[1]));
    }

    #[test]
    fn unknown_label_on_portioned_item_is_not_guessed() {
        let item = portioned(Some(1));
        assert!(matches!(resolve_portion(&item, Some("Jumbo")), PortionResolution::NeedsClarification(labels) if labels.len() == 3));
    }

    #[test]
    fn single_unlabeled_price_is_used_for_any_request() {
        let mut only = Price::base(Decimal::new(450, 2), None);
        only.is_default = true;
        let item = item(vec![only]);

        assert_eq!(resolve_portion(&item, None), PortionResolution::UsesDefault(&item.prices[0]));
        assert_eq!(resolve_portion(&item, Some("Large")), PortionResolution::UsesDefault(&item.prices[0]));
        assert_eq!(resolve_portion(&item, Some("")), PortionResolution::UsesDefault(&item.prices[0]));
    }

    #[test]
    fn single_labeled_price_is_not_substituted_for_another_portion() {
        let item = item(vec![Price::base(Decimal::new(700, 2), Some("Large".to_string()))]);

        assert_eq!(resolve_portion(&item, None), PortionResolution::UsesDefault(&item.prices[0]));
        assert_eq!(resolve_portion(&item, Some("lg")), PortionResolution::Matched(&item.prices[0]));
        assert_eq!(
            resolve_portion(&item, Some("Small")),
            PortionResolution::NeedsClarification(vec!["Large".to_string()])
        );
    }
}
