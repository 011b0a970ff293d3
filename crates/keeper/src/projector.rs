//! Balance projection.
//!
//! A feed's on-chain balance still includes rewards for reports that were
//! first in their window but never claimed. Those rewards will be paid out
//! eventually, so the spendable balance is the on-chain balance minus one
//! reward per unclaimed report.

use autopay_types::{AutopayResult, ClaimCheck, FeedDetails, FundedFeed};

use crate::aggregator::TagState;
use crate::window::is_first_in_feed_window;

/// Plan one claim check per (feed, first-in-window report) of a tag.
///
/// The tag's timestamps are re-walked in ascending order for every feed. The
/// cursor is always the tag's previous report, whichever feed's window it
/// fell in, and starts out empty.
pub fn plan_claim_checks(state: &TagState) -> AutopayResult<Vec<ClaimCheck>> {
    let mut checks = Vec::new();

    for feed in &state.feeds {
        let mut previous = None;
        for &timestamp in &state.timestamps {
            if is_first_in_feed_window(previous, timestamp, &feed.details)? {
                checks.push(ClaimCheck::pending(feed.feed_id, timestamp));
            }
            previous = Some(timestamp);
        }
    }

    Ok(checks)
}

/// Balance left after paying every known-unclaimed reward; never below zero
pub fn project_balance<'a>(details: &FeedDetails, claims: impl IntoIterator<Item = &'a ClaimCheck>) -> u128 {
    claims
        .into_iter()
        .filter(|check| check.is_unclaimed())
        .fold(details.balance, |balance, _| balance.saturating_sub(details.reward))
}

/// The tag's feeds with projected balances
pub fn project_feeds(state: &TagState) -> Vec<FundedFeed> {
    state
        .feeds
        .iter()
        .map(|feed| {
            let claims = state.claims.iter().filter(|check| check.feed_id == feed.feed_id);
            let balance = project_balance(&feed.details, claims);
            if balance != feed.details.balance {
                log::debug!(
                    "Feed {} of {}: balance {} projected to {}",
                    feed.feed_id,
                    state.tag,
                    feed.details.balance,
                    balance
                );
            }

            FundedFeed {
                feed_id: feed.feed_id,
                details: feed.details.with_balance(balance),
            }
        })
        .collect()
}
