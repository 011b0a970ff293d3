//! ABI codec for the autopay reads.
//!
//! Each [`AutopayRead`] has exactly one decoder, selected by the read itself,
//! so return data is always interpreted with the shape that was requested.

use alloy::primitives::{B256, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use autopay_types::{AutopayError, AutopayResult, CurrentValue, FeedDetails, FeedId, ReportedValue};

use crate::batch::{AutopayRead, Decoded};

sol! {
    interface IAutopay {
        struct FeedDetails {
            uint256 reward;
            uint256 balance;
            uint256 startTime;
            uint256 interval;
            uint256 window;
            uint256 priceThreshold;
            uint256 feedsWithFundingIndex;
        }

        function getCurrentFeeds(bytes32 _queryId) external view returns (bytes32[] memory);
        function getIndexForDataBefore(bytes32 _queryId, uint256 _timestamp) external view returns (bool _found, uint256 _index);
        function getTimestampbyQueryIdandIndex(bytes32 _queryId, uint256 _index) external view returns (uint256);
        function getDataFeed(bytes32 _feedId) external view returns (FeedDetails memory);
        function getCurrentValue(bytes32 _queryId) external view returns (bool _ifRetrieve, bytes memory _value, uint256 _timestampRetrieved);
        function getRewardClaimedStatus(bytes32 _feedId, bytes32 _queryId, uint256 _timestamp) external view returns (bool);
        function getCurrentTip(bytes32 _queryId) external view returns (uint256);
    }
}

/// Calldata for a read
pub fn encode(read: &AutopayRead) -> Vec<u8> {
    match read {
        AutopayRead::CurrentFeeds { query_id } => IAutopay::getCurrentFeedsCall {
            _queryId: B256::from(query_id.0),
        }
        .abi_encode(),
        AutopayRead::IndexForDataBefore { query_id, timestamp } => {
            IAutopay::getIndexForDataBeforeCall {
                _queryId: B256::from(query_id.0),
                _timestamp: U256::from(*timestamp),
            }
            .abi_encode()
        }
        AutopayRead::TimestampByIndex { query_id, index } => {
            IAutopay::getTimestampbyQueryIdandIndexCall {
                _queryId: B256::from(query_id.0),
                _index: U256::from(*index),
            }
            .abi_encode()
        }
        AutopayRead::DataFeed { feed_id } => IAutopay::getDataFeedCall {
            _feedId: B256::from(feed_id.0),
        }
        .abi_encode(),
        AutopayRead::CurrentValue { query_id } => IAutopay::getCurrentValueCall {
            _queryId: B256::from(query_id.0),
        }
        .abi_encode(),
        AutopayRead::RewardClaimedStatus { feed_id, query_id, timestamp } => {
            IAutopay::getRewardClaimedStatusCall {
                _feedId: B256::from(feed_id.0),
                _queryId: B256::from(query_id.0),
                _timestamp: U256::from(*timestamp),
            }
            .abi_encode()
        }
        AutopayRead::CurrentTip { query_id } => IAutopay::getCurrentTipCall {
            _queryId: B256::from(query_id.0),
        }
        .abi_encode(),
    }
}

/// Decode return data with the decoder registered for `read`
pub fn decode(read: &AutopayRead, data: &[u8]) -> AutopayResult<Decoded> {
    let what = read.signature();
    let abi_err = |e: alloy::sol_types::Error| AutopayError::decode_failure(what, &e.to_string());

    match read {
        AutopayRead::CurrentFeeds { .. } => {
            let ids = IAutopay::getCurrentFeedsCall::abi_decode_returns(data).map_err(abi_err)?;
            Ok(Decoded::FeedIds(ids.into_iter().map(|id| FeedId(id.0)).collect()))
        }
        AutopayRead::IndexForDataBefore { .. } => {
            let ret = IAutopay::getIndexForDataBeforeCall::abi_decode_returns(data).map_err(abi_err)?;
            Ok(Decoded::Index {
                found: ret._found,
                index: to_u64(ret._index, what)?,
            })
        }
        AutopayRead::TimestampByIndex { .. } => {
            let timestamp =
                IAutopay::getTimestampbyQueryIdandIndexCall::abi_decode_returns(data).map_err(abi_err)?;
            Ok(Decoded::Timestamp(to_u64(timestamp, what)?))
        }
        AutopayRead::DataFeed { .. } => {
            let feed = IAutopay::getDataFeedCall::abi_decode_returns(data).map_err(abi_err)?;
            Ok(Decoded::FeedDetails(FeedDetails {
                reward: to_u128(feed.reward, what)?,
                balance: to_u128(feed.balance, what)?,
                start_time: to_u64(feed.startTime, what)?,
                interval: to_u64(feed.interval, what)?,
                window: to_u64(feed.window, what)?,
                price_threshold: to_u64(feed.priceThreshold, what)?,
                feeds_with_funding_index: to_u64(feed.feedsWithFundingIndex, what)?,
            }))
        }
        AutopayRead::CurrentValue { .. } => {
            let ret = IAutopay::getCurrentValueCall::abi_decode_returns(data).map_err(abi_err)?;
            Ok(Decoded::CurrentValue(CurrentValue {
                retrieved: ret._ifRetrieve,
                value: ReportedValue::from_oracle_bytes(&ret._value),
                timestamp: to_u64(ret._timestampRetrieved, what)?,
            }))
        }
        AutopayRead::RewardClaimedStatus { .. } => {
            let claimed = IAutopay::getRewardClaimedStatusCall::abi_decode_returns(data).map_err(abi_err)?;
            Ok(Decoded::Claimed(claimed))
        }
        AutopayRead::CurrentTip { .. } => {
            let tip = IAutopay::getCurrentTipCall::abi_decode_returns(data).map_err(abi_err)?;
            Ok(Decoded::Tip(to_u128(tip, what)?))
        }
    }
}

fn to_u64(value: U256, what: &str) -> AutopayResult<u64> {
    u64::try_from(value)
        .map_err(|_| AutopayError::decode_failure(what, &format!("{} does not fit in 64 bits", value)))
}

fn to_u128(value: U256, what: &str) -> AutopayResult<u128> {
    u128::try_from(value)
        .map_err(|_| AutopayError::decode_failure(what, &format!("{} does not fit in 128 bits", value)))
}
