//! [`BatchExecutor`] backed by a multicall contract.
//!
//! All calls of a batch go out as a single `tryAggregate` eth_call. The
//! multicall address comes from the [`NetworkConfig`] handed in at
//! construction; nothing is looked up from global tables.

use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::sol;
use async_trait::async_trait;

use autopay_types::{AutopayError, AutopayResult};

use crate::abi;
use crate::batch::{BatchExecutor, BatchResult, Call};
use crate::config::NetworkConfig;

sol! {
    #[sol(rpc)]
    interface IMulticall2 {
        struct Call {
            address target;
            bytes callData;
        }

        struct Result {
            bool success;
            bytes returnData;
        }

        function tryAggregate(bool requireSuccess, Call[] memory calls) external returns (Result[] memory returnData);
    }
}

/// Batch executor sending every batch through one multicall round-trip
#[derive(Clone)]
pub struct MulticallExecutor {
    provider: DynProvider,
    multicall: Address,
    network_name: String,
}

impl MulticallExecutor {
    /// Create an executor over an existing provider
    pub fn new(provider: DynProvider, network: &NetworkConfig) -> Self {
        Self {
            provider,
            multicall: network.multicall_address,
            network_name: network.name.clone(),
        }
    }

    /// Connect an HTTP provider to `rpc_url`
    pub fn connect_http(rpc_url: &str, network: &NetworkConfig) -> AutopayResult<Self> {
        let url = rpc_url
            .parse()
            .map_err(|e| AutopayError::invalid_configuration("rpc_url", &format!("{}: {}", rpc_url, e)))?;
        let provider = ProviderBuilder::new().connect_http(url).erased();

        Ok(Self::new(provider, network))
    }

    pub fn multicall_address(&self) -> Address {
        self.multicall
    }
}

#[async_trait]
impl BatchExecutor for MulticallExecutor {
    async fn execute(&self, calls: Vec<Call>, require_success: bool) -> AutopayResult<BatchResult> {
        let mut result = BatchResult::new();
        if calls.is_empty() {
            return Ok(result);
        }

        let encoded: Vec<IMulticall2::Call> = calls
            .iter()
            .map(|call| IMulticall2::Call {
                target: call.target,
                callData: abi::encode(&call.read).into(),
            })
            .collect();

        log::debug!(
            "Sending batch of {} calls to multicall {} on {} (require_success={})",
            calls.len(),
            self.multicall,
            self.network_name,
            require_success
        );

        let multicall = IMulticall2::new(self.multicall, self.provider.clone());
        let responses = multicall
            .tryAggregate(require_success, encoded)
            .call()
            .await
            .map_err(|e| AutopayError::collaborator_unavailable("multicall", &e.to_string()))?;

        if responses.len() != calls.len() {
            return Err(AutopayError::decode_failure(
                "multicall response",
                &format!("expected {} results, got {}", calls.len(), responses.len()),
            ));
        }

        for (call, response) in calls.into_iter().zip(responses) {
            if !response.success {
                log::debug!("Sub-call {} failed for {:?}", call.read.signature(), call.key);
                continue;
            }

            match abi::decode(&call.read, &response.returnData) {
                Ok(value) => result.insert(call.key, value),
                Err(e) => log::warn!("Skipping {:?}: {}", call.key, e),
            }
        }

        Ok(result)
    }
}
