//! Feed schedule types returned by the autopay contract

use serde::{Deserialize, Serialize};

use crate::errors::{AutopayError, AutopayResult};
use crate::query::FeedId;

/// Parameters of one funded feed, as stored on chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedDetails {
    /// Amount paid per eligible report (smallest token unit)
    pub reward: u128,
    /// Remaining escrow
    pub balance: u128,
    /// Schedule anchor (unix seconds)
    pub start_time: u64,
    /// Seconds between reward windows
    pub interval: u64,
    /// Width of the submission window at the start of each interval
    pub window: u64,
    /// Minimum price change required to earn the reward; 0 disables the check
    pub price_threshold: u64,
    /// Bookkeeping index on the contract side
    pub feeds_with_funding_index: u64,
}

impl FeedDetails {
    /// Check the schedule invariants the window math relies on
    pub fn validate(&self) -> AutopayResult<()> {
        if self.interval == 0 {
            return Err(AutopayError::invalid_parameter("interval", "0", "greater than 0"));
        }

        if self.window > self.interval {
            return Err(AutopayError::invalid_parameter(
                "window",
                &self.window.to_string(),
                &format!("at most interval ({})", self.interval),
            ));
        }

        Ok(())
    }

    /// Copy of these details with a different balance
    pub fn with_balance(&self, balance: u128) -> Self {
        Self { balance, ..*self }
    }
}

/// A feed id together with its details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundedFeed {
    pub feed_id: FeedId,
    pub details: FeedDetails,
}

/// A first-in-window report whose reward may still be claimable under a feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimCheck {
    pub feed_id: FeedId,
    pub timestamp: u64,
    /// Claim status once fetched; `None` when unknown
    pub claimed: Option<bool>,
}

impl ClaimCheck {
    pub fn pending(feed_id: FeedId, timestamp: u64) -> Self {
        Self {
            feed_id,
            timestamp,
            claimed: None,
        }
    }

    /// Reward is still owed for this report
    pub fn is_unclaimed(&self) -> bool {
        self.claimed == Some(false)
    }
}
