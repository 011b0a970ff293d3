use std::collections::BTreeSet;
use std::sync::Arc;

use alloy::primitives::Address;

use autopay_types::{AutopayError, AutopayResult, QueryId, Suggestion, TipMap};

use crate::aggregator::FeedStateAggregator;
use crate::batch::BatchExecutor;
use crate::catalog::FeedCatalog;
use crate::clock::{Clock, SystemClock};
use crate::config::KeeperConfig;
use crate::multicall::MulticallExecutor;
use crate::ranker::{merge_tips, select_best};
use crate::resolver::{one_time_tips, TipResolver};

/// Suggests which query a reporter should submit next.
///
/// Every call rebuilds its view of the autopay contract from scratch; no
/// state is kept between calls.
pub struct TipKeeper {
    /// Batched read transport; absent on chains without a multicall deployment
    executor: Option<Arc<dyn BatchExecutor>>,

    /// Queries the reporter can serve
    catalog: FeedCatalog,

    /// Autopay contract address
    autopay: Address,

    /// Chains on which suggestions are produced
    supported_chains: BTreeSet<u64>,

    clock: Arc<dyn Clock>,
}

impl TipKeeper {
    /// Create a keeper over an existing executor, using the system clock
    pub fn new(
        executor: Arc<dyn BatchExecutor>,
        catalog: FeedCatalog,
        autopay: Address,
        supported_chains: impl IntoIterator<Item = u64>,
    ) -> Self {
        Self {
            executor: Some(executor),
            catalog,
            autopay,
            supported_chains: supported_chains.into_iter().collect(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build a keeper reading through the multicall contract of the configured chain.
    ///
    /// An unsupported chain without a multicall deployment still yields a
    /// keeper; it suggests nothing and refuses remote reads.
    pub fn from_config(config: &KeeperConfig) -> AutopayResult<Self> {
        let catalog = FeedCatalog::from_config(&config.feeds)?;
        let supported = config.supported_chains.contains(&config.chain_id);

        let executor: Option<Arc<dyn BatchExecutor>> = match config.network(config.chain_id) {
            Some(network) => {
                let executor = MulticallExecutor::connect_http(&config.rpc_url, network)?;
                log::info!(
                    "Keeper on {} (chain {}) with {} catalog queries, multicall {}",
                    network.name,
                    config.chain_id,
                    catalog.len(),
                    executor.multicall_address()
                );
                Some(Arc::new(executor))
            }
            None if !supported => {
                log::warn!("Chain {} is not supported; no suggestions will be made", config.chain_id);
                None
            }
            None => {
                return Err(AutopayError::missing_configuration(
                    "networks",
                    &format!("no multicall address for chain {}", config.chain_id),
                ))
            }
        };

        Ok(Self {
            executor,
            catalog,
            autopay: config.autopay_address,
            supported_chains: config.supported_chains.iter().copied().collect(),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn catalog(&self) -> &FeedCatalog {
        &self.catalog
    }

    pub fn is_supported_chain(&self, chain_id: u64) -> bool {
        self.supported_chains.contains(&chain_id)
    }

    /// One-time tips per tag; zero and failed lookups are omitted
    pub async fn list_one_time_tips(&self) -> AutopayResult<TipMap> {
        one_time_tips(self.executor()?, self.autopay, &self.catalog).await
    }

    /// Reward a report submitted now would earn from funded feeds, per tag
    pub async fn list_continuous_tip_suggestions(&self) -> AutopayResult<TipMap> {
        Self::continuous_tips(self.executor()?, self.autopay, &self.catalog, self.clock.now()).await
    }

    /// Continuous-feed reward for a single catalog query, `None` when nothing is on offer
    pub async fn suggest_tip_for_query(&self, query_id: &QueryId) -> AutopayResult<Option<u128>> {
        let single = self.catalog.only(query_id)?;
        let tips = Self::continuous_tips(self.executor()?, self.autopay, &single, self.clock.now()).await?;

        Ok(tips.values().next().copied().filter(|amount| *amount > 0))
    }

    /// The single most rewarding query to report on `chain_id` right now.
    ///
    /// Returns `Ok(None)` for unsupported chains and when no query carries a
    /// reward. When only one of the two tip sources fails the other one is
    /// still ranked.
    pub async fn suggest_best_opportunity(&self, chain_id: u64) -> AutopayResult<Option<Suggestion>> {
        if !self.is_supported_chain(chain_id) {
            log::info!("Chain {} is not supported for autopay suggestions", chain_id);
            return Ok(None);
        }

        let (one_time, continuous) = tokio::join!(self.list_one_time_tips(), self.list_continuous_tip_suggestions());

        let (one_time, continuous) = match (one_time, continuous) {
            (Ok(one_time), Ok(continuous)) => (one_time, continuous),
            (Err(e), Ok(continuous)) => {
                log::warn!("One-time tips unavailable, ranking feeds only: {}", e);
                (TipMap::new(), continuous)
            }
            (Ok(one_time), Err(e)) => {
                log::warn!("Feed tips unavailable, ranking one-time tips only: {}", e);
                (one_time, TipMap::new())
            }
            (Err(one_time_err), Err(continuous_err)) => {
                log::error!("One-time tips unavailable: {}", one_time_err);
                return Err(continuous_err);
            }
        };

        let merged = merge_tips(&one_time, &continuous);
        let best = select_best(self.catalog.tags(), &merged);

        match &best {
            Some(suggestion) => log::info!("Best opportunity: {}", suggestion),
            None => log::info!("No tips on offer"),
        }

        Ok(best)
    }

    fn executor(&self) -> AutopayResult<&dyn BatchExecutor> {
        self.executor.as_deref().ok_or_else(|| {
            AutopayError::missing_configuration("networks", "no multicall deployment for the configured chain")
        })
    }

    async fn continuous_tips(
        executor: &dyn BatchExecutor,
        autopay: Address,
        catalog: &FeedCatalog,
        now: u64,
    ) -> AutopayResult<TipMap> {
        let states = FeedStateAggregator::new(executor, autopay, catalog).reconstruct(now).await?;
        TipResolver::new(catalog).continuous_suggestions(&states, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chain_id: u64) -> KeeperConfig {
        KeeperConfig {
            chain_id,
            autopay_address: Address::repeat_byte(0x11),
            ..KeeperConfig::default()
        }
    }

    #[tokio::test]
    async fn test_unsupported_chain_from_config_suggests_nothing() {
        let config = config(1);
        assert!(config.validate().is_ok());

        let keeper = TipKeeper::from_config(&config).unwrap();
        assert!(!keeper.is_supported_chain(1));
        assert_eq!(keeper.suggest_best_opportunity(1).await.unwrap(), None);

        // Remote reads need a multicall deployment
        let err = keeper.list_one_time_tips().await.unwrap_err();
        assert!(matches!(err, AutopayError::MissingConfiguration { .. }));
    }

    #[test]
    fn test_supported_chain_without_network_rejected() {
        let mut config = config(137);
        config.networks.retain(|n| n.chain_id != 137);
        assert!(TipKeeper::from_config(&config).is_err());
    }
}
