//! Opportunity ranking over one-time and continuous tips

use autopay_types::{QueryTag, Suggestion, TipMap};

/// Element-wise sum of both maps; tags totalling zero are dropped
pub fn merge_tips(one_time: &TipMap, continuous: &TipMap) -> TipMap {
    let mut merged = one_time.clone();
    for (tag, amount) in continuous {
        let total = merged.entry(tag.clone()).or_insert(0);
        *total = total.saturating_add(*amount);
    }
    merged.retain(|_, amount| *amount > 0);
    merged
}

/// Largest positive amount in `tips`.
///
/// Ties go to the tag listed first in `order`; tags missing from `order`
/// rank after it in lexical order.
pub fn select_best<'a>(order: impl IntoIterator<Item = &'a QueryTag>, tips: &TipMap) -> Option<Suggestion> {
    let ordered = order.into_iter().filter_map(|tag| tips.get_key_value(tag));

    let mut best: Option<(&QueryTag, u128)> = None;
    for (tag, &amount) in ordered.chain(tips.iter()) {
        if amount > best.map_or(0, |(_, top)| top) {
            best = Some((tag, amount));
        }
    }

    best.map(|(tag, amount)| Suggestion {
        query_tag: tag.clone(),
        amount,
    })
}
