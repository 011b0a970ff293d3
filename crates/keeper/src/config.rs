use std::collections::HashSet;
use std::fs;
use std::str::FromStr;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use autopay_types::{
    AutopayError, AutopayResult, QueryCategory, DEFAULT_SUPPORTED_CHAINS,
    L2_TESTNET_MULTICALL_ADDRESS, MULTICALL3_ADDRESS, MUMBAI_MULTICALL_ADDRESS,
};

/// Environment variable prefix overriding file values, e.g. `AUTOPAY_KEEPER_RPC_URL`
pub const ENV_PREFIX: &str = "AUTOPAY_KEEPER";

/// Keeper configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeeperConfig {
    /// JSON-RPC endpoint of the chain to read from
    pub rpc_url: String,

    /// Chain the endpoint serves
    pub chain_id: u64,

    /// Autopay contract address
    #[serde(with = "address_serde")]
    pub autopay_address: Address,

    /// Chains on which suggestions are produced
    #[serde(default = "default_supported_chains")]
    pub supported_chains: Vec<u64>,

    /// Multicall deployments per chain
    #[serde(default = "default_networks")]
    pub networks: Vec<NetworkConfig>,

    /// Catalog of queries the keeper knows how to report
    #[serde(default)]
    pub feeds: Vec<FeedEntryConfig>,
}

/// Multicall deployment for one chain
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NetworkConfig {
    pub chain_id: u64,

    /// Network name for logging
    pub name: String,

    #[serde(with = "address_serde")]
    pub multicall_address: Address,
}

/// One catalog entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedEntryConfig {
    /// Query tag, e.g. `eth-usd-legacy`
    pub tag: String,

    /// Query id as hex; takes precedence over `query_data`
    #[serde(default)]
    pub query_id: Option<String>,

    /// Canonical query data as hex; the id is its keccak256
    #[serde(default)]
    pub query_data: Option<String>,

    /// Category; inferred from the tag when omitted
    #[serde(default)]
    pub category: Option<QueryCategory>,

    /// Live price lookup used for price-threshold feeds
    #[serde(default)]
    pub price_source: Option<PriceSourceConfig>,
}

/// HTTP JSON price lookup
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PriceSourceConfig {
    pub url: String,

    /// JSON pointer to the price inside the response body, e.g. `/ethereum/usd`
    pub pointer: String,

    /// Request timeout in seconds
    #[serde(default = "default_price_timeout")]
    pub timeout_secs: u64,
}

fn default_supported_chains() -> Vec<u64> {
    DEFAULT_SUPPORTED_CHAINS.to_vec()
}

fn default_price_timeout() -> u64 {
    10
}

fn default_networks() -> Vec<NetworkConfig> {
    let network = |chain_id: u64, name: &str, address: &str| NetworkConfig {
        chain_id,
        name: name.to_string(),
        multicall_address: Address::from_str(address).unwrap_or(Address::ZERO),
    };

    vec![
        network(137, "polygon", MULTICALL3_ADDRESS),
        network(80001, "mumbai", MUMBAI_MULTICALL_ADDRESS),
        network(69, "optimism-kovan", L2_TESTNET_MULTICALL_ADDRESS),
        network(421_611, "arbitrum-rinkeby", L2_TESTNET_MULTICALL_ADDRESS),
        network(1_666_600_000, "harmony", MULTICALL3_ADDRESS),
        network(1_666_700_000, "harmony-testnet", MULTICALL3_ADDRESS),
    ]
}

impl KeeperConfig {
    /// Load configuration from a TOML file, applying `AUTOPAY_KEEPER_*` overrides
    pub fn load(path: &str) -> AutopayResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::new(path, config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .try_parsing(true)
                    .separator("__"),
            )
            .build()
            .map_err(|e| AutopayError::generic_with_context(&format!("Failed to read config file {}", path), &e.to_string()))?;

        let config: KeeperConfig = settings
            .try_deserialize()
            .map_err(|e| AutopayError::invalid_configuration(path, &e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: &str) -> AutopayResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| AutopayError::generic(&format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content)
            .map_err(|e| AutopayError::generic(&format!("Failed to write config file {}: {}", path, e)))?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> AutopayResult<()> {
        if self.rpc_url.is_empty() {
            return Err(AutopayError::invalid_parameter("rpc_url", "empty", "non-empty URL"));
        }

        if self.autopay_address == Address::ZERO {
            return Err(AutopayError::invalid_parameter(
                "autopay_address",
                &self.autopay_address.to_string(),
                "deployed autopay contract address",
            ));
        }

        if self.supported_chains.contains(&self.chain_id) && self.network(self.chain_id).is_none() {
            return Err(AutopayError::missing_configuration(
                "networks",
                &format!("no multicall address for chain {}", self.chain_id),
            ));
        }

        let mut tags = HashSet::new();
        for feed in &self.feeds {
            feed.validate()?;
            if !tags.insert(feed.tag.as_str()) {
                return Err(AutopayError::invalid_configuration(
                    "feeds",
                    &format!("duplicate tag '{}'", feed.tag),
                ));
            }
        }

        Ok(())
    }

    /// Multicall deployment for a chain
    pub fn network(&self, chain_id: u64) -> Option<&NetworkConfig> {
        self.networks.iter().find(|n| n.chain_id == chain_id)
    }

    /// Multicall deployment for the configured chain
    pub fn active_network(&self) -> AutopayResult<&NetworkConfig> {
        self.network(self.chain_id).ok_or_else(|| {
            AutopayError::missing_configuration(
                "networks",
                &format!("no multicall address for chain {}", self.chain_id),
            )
        })
    }
}

impl FeedEntryConfig {
    /// Validate catalog entry
    fn validate(&self) -> AutopayResult<()> {
        if self.tag.is_empty() {
            return Err(AutopayError::invalid_parameter("tag", "empty", "non-empty string"));
        }

        if self.query_id.is_none() && self.query_data.is_none() {
            return Err(AutopayError::missing_configuration(
                &self.tag,
                "either query_id or query_data is required",
            ));
        }

        if let Some(source) = &self.price_source {
            if source.url.is_empty() {
                return Err(AutopayError::invalid_parameter("price_source.url", "empty", "non-empty URL"));
            }
            if !source.pointer.is_empty() && !source.pointer.starts_with('/') {
                return Err(AutopayError::invalid_parameter(
                    "price_source.pointer",
                    &source.pointer,
                    "JSON pointer starting with '/'",
                ));
            }
        }

        Ok(())
    }
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://polygon-rpc.com".to_string(),
            chain_id: 137,
            autopay_address: Address::ZERO,
            supported_chains: default_supported_chains(),
            networks: default_networks(),
            feeds: vec![],
        }
    }
}

/// Create example configuration file
pub fn create_example_config(path: &str) -> AutopayResult<()> {
    let legacy = |tag: &str, id: u8, coin: &str| FeedEntryConfig {
        tag: tag.to_string(),
        query_id: Some(format!("0x{:064x}", id)),
        query_data: None,
        category: Some(QueryCategory::Legacy),
        price_source: Some(PriceSourceConfig {
            url: format!("https://api.coingecko.com/api/v3/simple/price?ids={}&vs_currencies=usd", coin),
            pointer: format!("/{}/usd", coin),
            timeout_secs: default_price_timeout(),
        }),
    };

    let example_config = KeeperConfig {
        feeds: vec![
            legacy("eth-usd-legacy", 1, "ethereum"),
            legacy("btc-usd-legacy", 2, "bitcoin"),
            legacy("trb-usd-legacy", 50, "tellor"),
        ],
        ..KeeperConfig::default()
    };

    example_config.save(path)?;
    Ok(())
}

// Custom serde module for EVM addresses
mod address_serde {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(address: &Address, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&address.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Address, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Address::from_str(&s).map_err(serde::de::Error::custom)
    }
}
