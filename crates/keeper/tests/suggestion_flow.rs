//! End-to-end suggestion flow against an in-memory autopay contract

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;

use autopay_keeper::{
    AutopayRead, BatchExecutor, BatchResult, CatalogEntry, Call, Decoded, FeedCatalog, FixedClock,
    PriceSource, TipKeeper,
};
use autopay_types::{
    AutopayError, AutopayResult, CurrentValue, FeedDetails, FeedId, QueryId, ReportedValue,
    DEFAULT_SUPPORTED_CHAINS,
};

const HOUR: u64 = 3_600;
const NOW: u64 = 1_700_000_000;
const START: u64 = NOW - 10 * HOUR - 60;

/// Reports 60 seconds into three consecutive hourly windows before `NOW`
fn report_times() -> Vec<u64> {
    (7..10).map(|i| START + i * HOUR + 60).collect()
}

fn schedule(reward: u128, balance: u128, price_threshold: u64) -> FeedDetails {
    FeedDetails {
        reward,
        balance,
        start_time: START,
        interval: HOUR,
        window: 600,
        price_threshold,
        feeds_with_funding_index: 1,
    }
}

/// Autopay contract state answering reads like the deployed contract
#[derive(Default)]
struct FakeAutopay {
    feeds: HashMap<QueryId, Vec<FeedId>>,
    details: HashMap<FeedId, FeedDetails>,
    reports: HashMap<QueryId, Vec<u64>>,
    values: HashMap<QueryId, ReportedValue>,
    claimed: HashSet<(FeedId, u64)>,
    tips: HashMap<QueryId, u128>,
    revert_feed_details: bool,
    unreachable: bool,
    batches: AtomicUsize,
}

impl FakeAutopay {
    fn answer(&self, read: &AutopayRead) -> Option<Decoded> {
        match read {
            AutopayRead::CurrentFeeds { query_id } => {
                Some(Decoded::FeedIds(self.feeds.get(query_id).cloned().unwrap_or_default()))
            }
            AutopayRead::IndexForDataBefore { query_id, timestamp } => {
                let before = self
                    .reports
                    .get(query_id)
                    .map_or(0, |reports| reports.iter().filter(|t| *t < timestamp).count());
                Some(match before {
                    0 => Decoded::Index { found: false, index: 0 },
                    n => Decoded::Index { found: true, index: n as u64 - 1 },
                })
            }
            AutopayRead::TimestampByIndex { query_id, index } => self
                .reports
                .get(query_id)?
                .get(*index as usize)
                .map(|t| Decoded::Timestamp(*t)),
            AutopayRead::DataFeed { feed_id } => {
                if self.revert_feed_details {
                    return None;
                }
                self.details.get(feed_id).map(|d| Decoded::FeedDetails(*d))
            }
            AutopayRead::CurrentValue { query_id } => {
                let value = match (self.reports.get(query_id).and_then(|r| r.last()), self.values.get(query_id)) {
                    (Some(timestamp), Some(value)) => CurrentValue {
                        retrieved: true,
                        value: value.clone(),
                        timestamp: *timestamp,
                    },
                    _ => CurrentValue {
                        retrieved: false,
                        value: ReportedValue::Raw(Vec::new()),
                        timestamp: 0,
                    },
                };
                Some(Decoded::CurrentValue(value))
            }
            AutopayRead::RewardClaimedStatus { feed_id, timestamp, .. } => {
                Some(Decoded::Claimed(self.claimed.contains(&(*feed_id, *timestamp))))
            }
            // The contract reverts on a zero tip
            AutopayRead::CurrentTip { query_id } => self
                .tips
                .get(query_id)
                .filter(|amount| **amount > 0)
                .map(|amount| Decoded::Tip(*amount)),
        }
    }
}

#[async_trait]
impl BatchExecutor for FakeAutopay {
    async fn execute(&self, calls: Vec<Call>, require_success: bool) -> AutopayResult<BatchResult> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(AutopayError::collaborator_unavailable("multicall", "connection refused"));
        }

        let mut result = BatchResult::new();
        for call in calls {
            match self.answer(&call.read) {
                Some(value) => result.insert(call.key, value),
                None if require_success => {
                    return Err(AutopayError::collaborator_unavailable(
                        "multicall",
                        &format!("{} reverted", call.read.signature()),
                    ))
                }
                None => {}
            }
        }
        Ok(result)
    }
}

#[derive(Debug)]
struct FixedPrice(f64);

#[async_trait]
impl PriceSource for FixedPrice {
    async fn fetch_latest_price(&self) -> Option<f64> {
        Some(self.0)
    }
}

fn eth() -> QueryId {
    QueryId::from_legacy_id(1)
}

fn btc() -> QueryId {
    QueryId::from_legacy_id(2)
}

fn trb() -> QueryId {
    QueryId::from_legacy_id(50)
}

/// eth: healthy feed paying 100, one of two past rewards unclaimed
/// btc: feed drained by two unclaimed rewards, one-time tip of 40
/// trb: price-threshold feed paying 70 after a 10% move, one-time tip of 30
fn contract() -> FakeAutopay {
    let (eth_feed, btc_feed, trb_feed) = (FeedId([1u8; 32]), FeedId([2u8; 32]), FeedId([3u8; 32]));
    let reports = report_times();

    let mut fake = FakeAutopay::default();
    fake.feeds.insert(eth(), vec![eth_feed]);
    fake.feeds.insert(btc(), vec![btc_feed]);
    fake.feeds.insert(trb(), vec![trb_feed]);

    fake.details.insert(eth_feed, schedule(100, 1_000, 0));
    fake.details.insert(btc_feed, schedule(100, 150, 0));
    fake.details.insert(trb_feed, schedule(70, 1_000, 500));

    fake.reports.insert(eth(), reports.clone());
    fake.reports.insert(btc(), reports.clone());
    fake.reports.insert(trb(), vec![reports[2]]);

    fake.values.insert(eth(), ReportedValue::Price(1_800.0));
    fake.values.insert(btc(), ReportedValue::Price(30_000.0));
    fake.values.insert(trb(), ReportedValue::Price(10.0));

    fake.claimed.insert((eth_feed, reports[0]));

    fake.tips.insert(eth(), 0);
    fake.tips.insert(btc(), 40);
    fake.tips.insert(trb(), 30);
    fake
}

fn catalog() -> FeedCatalog {
    FeedCatalog::new(vec![
        CatalogEntry::new("eth-usd-legacy", eth()),
        CatalogEntry::new("btc-usd-legacy", btc()),
        CatalogEntry::new("trb-usd-legacy", trb()).with_price_source(Arc::new(FixedPrice(11.0))),
    ])
    .unwrap()
}

fn keeper(fake: FakeAutopay) -> (TipKeeper, Arc<FakeAutopay>) {
    let fake = Arc::new(fake);
    let keeper = TipKeeper::new(fake.clone(), catalog(), Address::repeat_byte(0xaa), DEFAULT_SUPPORTED_CHAINS)
        .with_clock(Arc::new(FixedClock(NOW)));
    (keeper, fake)
}

#[tokio::test]
async fn test_one_time_tips() {
    let (keeper, _) = keeper(contract());

    let tips = keeper.list_one_time_tips().await.unwrap();
    assert_eq!(tips.len(), 2);
    assert_eq!(tips.get("btc-usd-legacy"), Some(&40));
    assert_eq!(tips.get("trb-usd-legacy"), Some(&30));
}

#[tokio::test]
async fn test_continuous_tips() {
    let (keeper, fake) = keeper(contract());

    let tips = keeper.list_continuous_tip_suggestions().await.unwrap();
    assert_eq!(tips.len(), 2);
    assert_eq!(tips.get("eth-usd-legacy"), Some(&100));
    assert_eq!(tips.get("trb-usd-legacy"), Some(&70));
    assert_eq!(tips.get("btc-usd-legacy"), None);

    // Three sequential rounds
    assert_eq!(fake.batches.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_best_opportunity_tie_goes_to_catalog_order() {
    let (keeper, _) = keeper(contract());

    // eth 100 from its feed, trb 70 + 30; eth is listed first
    let best = keeper.suggest_best_opportunity(137).await.unwrap().unwrap();
    assert_eq!(best.query_tag.as_str(), "eth-usd-legacy");
    assert_eq!(best.amount, 100);
}

#[tokio::test]
async fn test_best_opportunity_prefers_larger_sum() {
    let mut fake = contract();
    fake.tips.insert(trb(), 31);
    let (keeper, _) = keeper(fake);

    let best = keeper.suggest_best_opportunity(80001).await.unwrap().unwrap();
    assert_eq!(best.query_tag.as_str(), "trb-usd-legacy");
    assert_eq!(best.amount, 101);
}

#[tokio::test]
async fn test_unsupported_chain_yields_nothing() {
    let (keeper, fake) = keeper(contract());

    assert_eq!(keeper.suggest_best_opportunity(1).await.unwrap(), None);
    assert_eq!(fake.batches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_strict_round_failure() {
    let mut fake = contract();
    fake.revert_feed_details = true;
    let (keeper, _) = keeper(fake);

    let err = keeper.list_continuous_tip_suggestions().await.unwrap_err();
    assert!(matches!(err, AutopayError::AggregationFailed { ref round, .. } if round == "round 2"));

    // One-time tips alone are still ranked
    let best = keeper.suggest_best_opportunity(137).await.unwrap().unwrap();
    assert_eq!(best.query_tag.as_str(), "btc-usd-legacy");
    assert_eq!(best.amount, 40);
}

#[tokio::test]
async fn test_tip_for_single_query() {
    let (keeper, _) = keeper(contract());

    assert_eq!(keeper.suggest_tip_for_query(&trb()).await.unwrap(), Some(70));
    assert_eq!(keeper.suggest_tip_for_query(&btc()).await.unwrap(), None);

    let err = keeper.suggest_tip_for_query(&QueryId::from_legacy_id(99)).await.unwrap_err();
    assert!(matches!(err, AutopayError::UnknownQuery { .. }));
}

#[tokio::test]
async fn test_nothing_on_offer() {
    let (keeper, _) = keeper(FakeAutopay::default());

    assert!(keeper.list_continuous_tip_suggestions().await.unwrap().is_empty());
    assert_eq!(keeper.suggest_best_opportunity(137).await.unwrap(), None);
}

#[tokio::test]
async fn test_both_sources_failing_reports_feed_error() {
    let mut fake = contract();
    fake.unreachable = true;
    let (keeper, _) = keeper(fake);

    let err = keeper.list_one_time_tips().await.unwrap_err();
    assert!(matches!(err, AutopayError::CollaboratorUnavailable { .. }));

    let err = keeper.suggest_best_opportunity(137).await.unwrap_err();
    assert!(matches!(err, AutopayError::AggregationFailed { ref round, .. } if round == "round 1"));
}
