//! Tip suggestion resolution.
//!
//! Turns reconstructed feed state into the reward a report submitted right
//! now would earn per tag. Price-threshold feeds only pay when the live
//! price moved more than the threshold (in basis points) since the last
//! report.

use alloy::primitives::Address;

use autopay_types::{
    AutopayResult, CurrentValue, FundedFeed, QueryTag, TipMap, MAX_PRICE_CHANGE, PRICE_CHANGE_SCALE,
};

use crate::aggregator::TagState;
use crate::batch::{AutopayRead, BatchExecutor, Call, ResultKey};
use crate::catalog::FeedCatalog;
use crate::projector::project_feeds;
use crate::window::is_first_in_feed_window;

/// Price change in basis points-like units: `10000 × |now − before| / before`.
///
/// A zero previous price always counts as the maximum change.
pub fn price_change_bps(now: f64, before: f64) -> f64 {
    if before == 0.0 {
        return MAX_PRICE_CHANGE;
    }
    PRICE_CHANGE_SCALE * (now - before).abs() / before
}

pub struct TipResolver<'a> {
    catalog: &'a FeedCatalog,
}

impl<'a> TipResolver<'a> {
    pub fn new(catalog: &'a FeedCatalog) -> Self {
        Self { catalog }
    }

    /// Reward available per tag for a report at `now`
    pub async fn continuous_suggestions(&self, states: &[TagState], now: u64) -> AutopayResult<TipMap> {
        let mut tips = TipMap::new();

        for state in states {
            let Some(current_value) = &state.current_value else {
                log::warn!("Skipping {}: no current value", state.tag);
                continue;
            };

            let mut live_price = LivePrice::NotFetched;
            for feed in project_feeds(state) {
                let reward = self.resolve_feed(&state.tag, &feed, current_value, now, &mut live_price).await?;
                if reward > 0 {
                    let total = tips.entry(state.tag.clone()).or_insert(0);
                    *total = total.saturating_add(reward);
                }
            }
        }

        Ok(tips)
    }

    async fn resolve_feed(
        &self,
        tag: &QueryTag,
        feed: &FundedFeed,
        current_value: &CurrentValue,
        now: u64,
        live_price: &mut LivePrice,
    ) -> AutopayResult<u128> {
        let details = &feed.details;
        if details.balance == 0 {
            log::debug!("Feed {} of {} has no projected balance", feed.feed_id, tag);
            return Ok(0);
        }

        if !is_first_in_feed_window(current_value.last_report_timestamp(), now, details)? {
            log::debug!("Feed {} of {} not eligible now", feed.feed_id, tag);
            return Ok(0);
        }

        if details.price_threshold == 0 {
            log::info!("Feed {} of {} eligible for {}", feed.feed_id, tag, details.reward);
            return Ok(details.reward);
        }

        let Some(before) = current_value.baseline_price() else {
            log::warn!("Feed {} of {}: last value is not a price", feed.feed_id, tag);
            return Ok(0);
        };

        let Some(price) = self.live_price(tag, live_price).await else {
            log::warn!("Feed {} of {}: no live price available", feed.feed_id, tag);
            return Ok(0);
        };

        let change = price_change_bps(price, before);
        if change > details.price_threshold as f64 {
            log::info!(
                "Feed {} of {} eligible for {} (price change {:.2} > {})",
                feed.feed_id,
                tag,
                details.reward,
                change,
                details.price_threshold
            );
            Ok(details.reward)
        } else {
            log::debug!(
                "Feed {} of {}: price change {:.2} within threshold {}",
                feed.feed_id,
                tag,
                change,
                details.price_threshold
            );
            Ok(0)
        }
    }

    /// Fetch the tag's price at most once per resolution
    async fn live_price(&self, tag: &QueryTag, cached: &mut LivePrice) -> Option<f64> {
        if let LivePrice::Fetched(price) = cached {
            return *price;
        }

        let price = match self.catalog.by_tag(tag.as_str()).and_then(|e| e.price_source.as_ref()) {
            Some(source) => source.fetch_latest_price().await,
            None => {
                log::warn!("No price source configured for {}", tag);
                None
            }
        };
        *cached = LivePrice::Fetched(price);
        price
    }
}

enum LivePrice {
    NotFetched,
    Fetched(Option<f64>),
}

/// One-time tips for every catalog entry, read in one non-strict batch.
///
/// Entries whose call fails, does not decode, or reads zero are omitted.
pub async fn one_time_tips(
    executor: &dyn BatchExecutor,
    autopay: Address,
    catalog: &FeedCatalog,
) -> AutopayResult<TipMap> {
    let calls: Vec<Call> = catalog
        .entries()
        .map(|entry| {
            Call::new(
                autopay,
                AutopayRead::CurrentTip { query_id: entry.query_id },
                ResultKey::Tip(entry.tag.clone()),
            )
        })
        .collect();
    if calls.is_empty() {
        return Ok(TipMap::new());
    }

    let result = executor.execute(calls, false).await?;

    let tips: TipMap = catalog
        .tags()
        .filter_map(|tag| {
            let amount = result.tip(&ResultKey::Tip(tag.clone()))?;
            (amount > 0).then(|| (tag.clone(), amount))
        })
        .collect();

    log::debug!("{} of {} queries carry one-time tips", tips.len(), catalog.len());
    Ok(tips)
}
