//! Batched read boundary.
//!
//! Callers describe every read as a typed [`Call`]; a [`BatchExecutor`] sends
//! them in one round-trip and hands back a [`BatchResult`] keyed by
//! [`ResultKey`], with values already decoded into the shape declared by the
//! read.

use std::collections::HashMap;

use alloy::primitives::Address;
use async_trait::async_trait;

use autopay_types::{AutopayResult, CurrentValue, FeedDetails, FeedId, QueryId, QueryTag};

/// A read-only autopay contract function together with its arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AutopayRead {
    CurrentFeeds { query_id: QueryId },
    IndexForDataBefore { query_id: QueryId, timestamp: u64 },
    TimestampByIndex { query_id: QueryId, index: u64 },
    DataFeed { feed_id: FeedId },
    CurrentValue { query_id: QueryId },
    RewardClaimedStatus { feed_id: FeedId, query_id: QueryId, timestamp: u64 },
    CurrentTip { query_id: QueryId },
}

impl AutopayRead {
    /// Solidity signature including the declared return shape
    pub fn signature(&self) -> &'static str {
        match self {
            Self::CurrentFeeds { .. } => "getCurrentFeeds(bytes32)(bytes32[])",
            Self::IndexForDataBefore { .. } => "getIndexForDataBefore(bytes32,uint256)(bool,uint256)",
            Self::TimestampByIndex { .. } => "getTimestampbyQueryIdandIndex(bytes32,uint256)(uint256)",
            Self::DataFeed { .. } => {
                "getDataFeed(bytes32)((uint256,uint256,uint256,uint256,uint256,uint256,uint256))"
            }
            Self::CurrentValue { .. } => "getCurrentValue(bytes32)(bool,bytes,uint256)",
            Self::RewardClaimedStatus { .. } => {
                "getRewardClaimedStatus(bytes32,bytes32,uint256)(bool)"
            }
            Self::CurrentTip { .. } => "getCurrentTip(bytes32)(uint256)",
        }
    }
}

/// Decoded return value, tagged by the read's declared result shape
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    FeedIds(Vec<FeedId>),
    Index { found: bool, index: u64 },
    Timestamp(u64),
    FeedDetails(FeedDetails),
    CurrentValue(CurrentValue),
    Claimed(bool),
    Tip(u128),
}

/// Where a decoded value lands in the batch result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResultKey {
    Feeds(QueryTag),
    IndexNow(QueryTag),
    IndexThreeMonthsAgo(QueryTag),
    FeedDetails(QueryTag, FeedId),
    CurrentValue(QueryTag),
    Timestamp(QueryTag, u64),
    ClaimStatus(QueryTag, FeedId, u64),
    Tip(QueryTag),
}

/// One call descriptor: target contract, read, and result key
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub target: Address,
    pub read: AutopayRead,
    pub key: ResultKey,
}

impl Call {
    pub fn new(target: Address, read: AutopayRead, key: ResultKey) -> Self {
        Self { target, read, key }
    }
}

/// Decoded values keyed by [`ResultKey`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    values: HashMap<ResultKey, Decoded>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: ResultKey, value: Decoded) {
        self.values.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, key: &ResultKey) -> Option<&Decoded> {
        self.values.get(key)
    }

    pub fn feed_ids(&self, key: &ResultKey) -> Option<&[FeedId]> {
        match self.values.get(key)? {
            Decoded::FeedIds(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn index(&self, key: &ResultKey) -> Option<u64> {
        match self.values.get(key)? {
            Decoded::Index { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn timestamp(&self, key: &ResultKey) -> Option<u64> {
        match self.values.get(key)? {
            Decoded::Timestamp(timestamp) => Some(*timestamp),
            _ => None,
        }
    }

    pub fn feed_details(&self, key: &ResultKey) -> Option<FeedDetails> {
        match self.values.get(key)? {
            Decoded::FeedDetails(details) => Some(*details),
            _ => None,
        }
    }

    pub fn current_value(&self, key: &ResultKey) -> Option<&CurrentValue> {
        match self.values.get(key)? {
            Decoded::CurrentValue(value) => Some(value),
            _ => None,
        }
    }

    pub fn claimed(&self, key: &ResultKey) -> Option<bool> {
        match self.values.get(key)? {
            Decoded::Claimed(claimed) => Some(*claimed),
            _ => None,
        }
    }

    pub fn tip(&self, key: &ResultKey) -> Option<u128> {
        match self.values.get(key)? {
            Decoded::Tip(amount) => Some(*amount),
            _ => None,
        }
    }
}

impl FromIterator<(ResultKey, Decoded)> for BatchResult {
    fn from_iter<I: IntoIterator<Item = (ResultKey, Decoded)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Executes a set of reads in a single remote round-trip.
///
/// With `require_success` any failed sub-call fails the whole batch. Without
/// it, failed or undecodable entries are simply absent from the result.
#[async_trait]
pub trait BatchExecutor: Send + Sync {
    async fn execute(&self, calls: Vec<Call>, require_success: bool) -> AutopayResult<BatchResult>;
}
