//! Feed state aggregation.
//!
//! Rebuilds the per-tag funding picture in three sequential batched rounds:
//!
//! 1. feed ids plus report indices for `now` and three months back
//! 2. feed details, the current value, and every report timestamp in range
//! 3. claim status of each first-in-window report (planned by the projector)
//!
//! Every round is a single strict batch. A failed batch aborts the whole
//! aggregation; a single entry that does not decode only drops the feed or
//! tag it belongs to.

use alloy::primitives::Address;

use autopay_types::{
    AutopayError, AutopayResult, ClaimCheck, CurrentValue, FeedId, FundedFeed, QueryId, QueryTag,
    THREE_MONTHS_SECS,
};

use crate::batch::{AutopayRead, BatchExecutor, BatchResult, Call, ResultKey};
use crate::catalog::FeedCatalog;
use crate::projector;

/// Round 1 output for one tag
#[derive(Debug, Clone, PartialEq)]
pub struct FeedIndex {
    pub tag: QueryTag,
    pub query_id: QueryId,
    pub feed_ids: Vec<FeedId>,
    pub index_now: u64,
    pub index_three_months_ago: u64,
}

impl FeedIndex {
    /// Report indices covered by the three month horizon
    pub fn report_range(&self) -> std::ops::Range<u64> {
        self.index_three_months_ago..self.index_now.max(self.index_three_months_ago)
    }
}

/// Reconstructed state of one tag after all rounds
#[derive(Debug, Clone, PartialEq)]
pub struct TagState {
    pub tag: QueryTag,
    pub query_id: QueryId,
    pub feeds: Vec<FundedFeed>,
    /// Report timestamps, ascending
    pub timestamps: Vec<u64>,
    /// `None` when the current value failed to decode
    pub current_value: Option<CurrentValue>,
    pub claims: Vec<ClaimCheck>,
}

pub struct FeedStateAggregator<'a> {
    executor: &'a dyn BatchExecutor,
    autopay: Address,
    catalog: &'a FeedCatalog,
}

impl<'a> FeedStateAggregator<'a> {
    pub fn new(executor: &'a dyn BatchExecutor, autopay: Address, catalog: &'a FeedCatalog) -> Self {
        Self {
            executor,
            autopay,
            catalog,
        }
    }

    /// Run all three rounds at time `now`
    pub async fn reconstruct(&self, now: u64) -> AutopayResult<Vec<TagState>> {
        let indices = self.fetch_current_feeds(now).await?;
        if indices.is_empty() {
            log::debug!("No funded feeds found for any catalog query");
            return Ok(Vec::new());
        }

        let mut states = self.fetch_feed_details(&indices).await?;
        self.fetch_claim_statuses(&mut states).await?;

        Ok(states)
    }

    /// Round 1: current feed ids and report indices per candidate tag
    pub async fn fetch_current_feeds(&self, now: u64) -> AutopayResult<Vec<FeedIndex>> {
        let horizon = now.saturating_sub(THREE_MONTHS_SECS);

        let mut calls = Vec::new();
        for entry in self.catalog.feed_candidates() {
            let query_id = entry.query_id;
            calls.push(self.call(
                AutopayRead::CurrentFeeds { query_id },
                ResultKey::Feeds(entry.tag.clone()),
            ));
            calls.push(self.call(
                AutopayRead::IndexForDataBefore { query_id, timestamp: now },
                ResultKey::IndexNow(entry.tag.clone()),
            ));
            calls.push(self.call(
                AutopayRead::IndexForDataBefore { query_id, timestamp: horizon },
                ResultKey::IndexThreeMonthsAgo(entry.tag.clone()),
            ));
        }

        let result = self.run_round(1, calls).await?;

        let mut indices = Vec::new();
        for entry in self.catalog.feed_candidates() {
            let Some(feed_ids) = result.feed_ids(&ResultKey::Feeds(entry.tag.clone())) else {
                log::warn!("Skipping {}: current feeds unavailable", entry.tag);
                continue;
            };
            if feed_ids.is_empty() {
                continue;
            }

            let index_now = result.index(&ResultKey::IndexNow(entry.tag.clone()));
            let index_three_months_ago = result.index(&ResultKey::IndexThreeMonthsAgo(entry.tag.clone()));
            let (Some(index_now), Some(index_three_months_ago)) = (index_now, index_three_months_ago) else {
                log::warn!("Skipping {}: report indices unavailable", entry.tag);
                continue;
            };

            indices.push(FeedIndex {
                tag: entry.tag.clone(),
                query_id: entry.query_id,
                feed_ids: feed_ids.to_vec(),
                index_now,
                index_three_months_ago,
            });
        }

        log::debug!("Round 1: {} of {} tags have funded feeds", indices.len(), self.catalog.len());
        Ok(indices)
    }

    /// Round 2: feed details, current values and report timestamps
    pub async fn fetch_feed_details(&self, indices: &[FeedIndex]) -> AutopayResult<Vec<TagState>> {
        let mut calls = Vec::new();
        for index in indices {
            for feed_id in &index.feed_ids {
                calls.push(self.call(
                    AutopayRead::DataFeed { feed_id: *feed_id },
                    ResultKey::FeedDetails(index.tag.clone(), *feed_id),
                ));
            }
            calls.push(self.call(
                AutopayRead::CurrentValue { query_id: index.query_id },
                ResultKey::CurrentValue(index.tag.clone()),
            ));
            for i in index.report_range() {
                calls.push(self.call(
                    AutopayRead::TimestampByIndex { query_id: index.query_id, index: i },
                    ResultKey::Timestamp(index.tag.clone(), i),
                ));
            }
        }

        let result = self.run_round(2, calls).await?;

        let states = indices
            .iter()
            .map(|index| Self::tag_state(index, &result))
            .collect::<Vec<_>>();

        log::debug!(
            "Round 2: {} feeds, {} timestamps",
            states.iter().map(|s| s.feeds.len()).sum::<usize>(),
            states.iter().map(|s| s.timestamps.len()).sum::<usize>()
        );
        Ok(states)
    }

    fn tag_state(index: &FeedIndex, result: &BatchResult) -> TagState {
        let mut feeds = Vec::with_capacity(index.feed_ids.len());
        for feed_id in &index.feed_ids {
            let Some(details) = result.feed_details(&ResultKey::FeedDetails(index.tag.clone(), *feed_id)) else {
                log::warn!("Skipping feed {} of {}: details unavailable", feed_id, index.tag);
                continue;
            };
            if let Err(e) = details.validate() {
                log::warn!("Skipping feed {} of {}: {}", feed_id, index.tag, e);
                continue;
            }
            feeds.push(FundedFeed {
                feed_id: *feed_id,
                details,
            });
        }

        let mut timestamps = Vec::new();
        for i in index.report_range() {
            match result.timestamp(&ResultKey::Timestamp(index.tag.clone(), i)) {
                Some(timestamp) => timestamps.push(timestamp),
                None => log::warn!("Missing timestamp {} for {}", i, index.tag),
            }
        }
        timestamps.sort_unstable();

        let current_value = result.current_value(&ResultKey::CurrentValue(index.tag.clone())).cloned();
        if current_value.is_none() {
            log::warn!("Current value unavailable for {}", index.tag);
        }

        TagState {
            tag: index.tag.clone(),
            query_id: index.query_id,
            feeds,
            timestamps,
            current_value,
            claims: Vec::new(),
        }
    }

    /// Round 3: claim status of every planned check
    pub async fn fetch_claim_statuses(&self, states: &mut [TagState]) -> AutopayResult<()> {
        let mut calls = Vec::new();
        for state in states.iter_mut() {
            state.claims = projector::plan_claim_checks(state)?;
            for check in &state.claims {
                calls.push(self.call(
                    AutopayRead::RewardClaimedStatus {
                        feed_id: check.feed_id,
                        query_id: state.query_id,
                        timestamp: check.timestamp,
                    },
                    ResultKey::ClaimStatus(state.tag.clone(), check.feed_id, check.timestamp),
                ));
            }
        }

        let result = self.run_round(3, calls).await?;

        for state in states.iter_mut() {
            for check in state.claims.iter_mut() {
                check.claimed = result.claimed(&ResultKey::ClaimStatus(state.tag.clone(), check.feed_id, check.timestamp));
            }
        }

        log::debug!(
            "Round 3: {} claim checks",
            states.iter().map(|s| s.claims.len()).sum::<usize>()
        );
        Ok(())
    }

    fn call(&self, read: AutopayRead, key: ResultKey) -> Call {
        Call::new(self.autopay, read, key)
    }

    async fn run_round(&self, round: u8, calls: Vec<Call>) -> AutopayResult<BatchResult> {
        if calls.is_empty() {
            return Ok(BatchResult::new());
        }

        self.executor
            .execute(calls, true)
            .await
            .map_err(|e| AutopayError::aggregation_failed(&format!("round {}", round), &e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::Decoded;
    use crate::catalog::CatalogEntry;
    use async_trait::async_trait;
    use autopay_types::{FeedDetails, ReportedValue};
    use std::sync::Mutex;

    /// Answers every call from a fixed table, recording batch sizes
    struct TableExecutor {
        answers: Vec<(AutopayRead, Decoded)>,
        fail_round: Option<usize>,
        batches: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl BatchExecutor for TableExecutor {
        async fn execute(&self, calls: Vec<Call>, _require_success: bool) -> AutopayResult<BatchResult> {
            let mut batches = self.batches.lock().unwrap();
            batches.push(calls.len());
            if self.fail_round == Some(batches.len()) {
                return Err(AutopayError::collaborator_unavailable("multicall", "execution reverted"));
            }

            Ok(calls
                .into_iter()
                .filter_map(|call| {
                    self.answers
                        .iter()
                        .find(|(read, _)| read == &call.read)
                        .map(|(_, value)| (call.key, value.clone()))
                })
                .collect())
        }
    }

    const NOW: u64 = 10_000_000;

    fn query() -> QueryId {
        QueryId::from_legacy_id(1)
    }

    fn feed() -> FeedId {
        FeedId([7u8; 32])
    }

    fn details() -> FeedDetails {
        FeedDetails {
            reward: 100,
            balance: 250,
            start_time: 0,
            interval: 100,
            window: 10,
            price_threshold: 0,
            feeds_with_funding_index: 1,
        }
    }

    fn answers(feed_details: FeedDetails) -> Vec<(AutopayRead, Decoded)> {
        let query_id = query();
        let mut answers = vec![
            (AutopayRead::CurrentFeeds { query_id }, Decoded::FeedIds(vec![feed()])),
            (
                AutopayRead::IndexForDataBefore { query_id, timestamp: NOW },
                Decoded::Index { found: true, index: 3 },
            ),
            (
                AutopayRead::IndexForDataBefore { query_id, timestamp: NOW - THREE_MONTHS_SECS },
                Decoded::Index { found: true, index: 0 },
            ),
            (AutopayRead::DataFeed { feed_id: feed() }, Decoded::FeedDetails(feed_details)),
            (
                AutopayRead::CurrentValue { query_id },
                Decoded::CurrentValue(CurrentValue {
                    retrieved: true,
                    value: ReportedValue::Price(1.0),
                    timestamp: 9_999_000,
                }),
            ),
        ];
        for (i, ts) in [9_999_805u64, 9_999_900, 9_999_905].into_iter().enumerate() {
            answers.push((
                AutopayRead::TimestampByIndex { query_id, index: i as u64 },
                Decoded::Timestamp(ts),
            ));
        }
        for ts in [9_999_805u64, 9_999_900] {
            answers.push((
                AutopayRead::RewardClaimedStatus { feed_id: feed(), query_id, timestamp: ts },
                Decoded::Claimed(false),
            ));
        }
        answers
    }

    fn catalog() -> FeedCatalog {
        FeedCatalog::new(vec![
            CatalogEntry::new("eth-usd-legacy", query()),
            CatalogEntry::new("btc-usd-legacy", QueryId::from_legacy_id(2)),
            CatalogEntry::new("snapshot-vote", QueryId([3u8; 32])),
        ])
        .unwrap()
    }

    fn executor(feed_details: FeedDetails, fail_round: Option<usize>) -> TableExecutor {
        TableExecutor {
            answers: answers(feed_details),
            fail_round,
            batches: Mutex::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn test_reconstruct_three_rounds() {
        let catalog = catalog();
        let executor = executor(details(), None);
        let aggregator = FeedStateAggregator::new(&executor, Address::ZERO, &catalog);

        let states = aggregator.reconstruct(NOW).await.unwrap();
        assert_eq!(states.len(), 1);

        let state = &states[0];
        assert_eq!(state.tag.as_str(), "eth-usd-legacy");
        assert_eq!(state.feeds.len(), 1);
        assert_eq!(state.timestamps, vec![9_999_805, 9_999_900, 9_999_905]);
        assert_eq!(
            state.claims,
            vec![
                ClaimCheck { feed_id: feed(), timestamp: 9_999_805, claimed: Some(false) },
                ClaimCheck { feed_id: feed(), timestamp: 9_999_900, claimed: Some(false) },
            ]
        );

        // Two legacy candidates, three reads each; the vote query is not a candidate
        let batches = executor.batches.lock().unwrap();
        assert_eq!(batches.as_slice(), &[6, 5, 2]);
    }

    #[tokio::test]
    async fn test_failed_round_aborts() {
        let catalog = catalog();
        let executor = executor(details(), Some(2));
        let aggregator = FeedStateAggregator::new(&executor, Address::ZERO, &catalog);

        let err = aggregator.reconstruct(NOW).await.unwrap_err();
        assert!(matches!(
            err,
            AutopayError::AggregationFailed { ref round, .. } if round == "round 2"
        ));
    }

    #[tokio::test]
    async fn test_invalid_feed_details_dropped() {
        let catalog = catalog();
        let executor = executor(FeedDetails { interval: 0, ..details() }, None);
        let aggregator = FeedStateAggregator::new(&executor, Address::ZERO, &catalog);

        let states = aggregator.reconstruct(NOW).await.unwrap();
        assert_eq!(states.len(), 1);
        assert!(states[0].feeds.is_empty());
        assert!(states[0].claims.is_empty());
    }

    #[test]
    fn test_report_range_never_inverted() {
        let index = FeedIndex {
            tag: QueryTag::from("eth-usd-legacy"),
            query_id: query(),
            feed_ids: vec![feed()],
            index_now: 2,
            index_three_months_ago: 5,
        };
        assert_eq!(index.report_range().count(), 0);
    }
}
