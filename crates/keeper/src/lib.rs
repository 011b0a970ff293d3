pub mod abi;
pub mod aggregator;
pub mod batch;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod keeper;
pub mod multicall;
pub mod price;
pub mod projector;
pub mod ranker;
pub mod resolver;
pub mod window;

pub use aggregator::{FeedIndex, FeedStateAggregator, TagState};
pub use batch::{AutopayRead, BatchExecutor, BatchResult, Call, Decoded, ResultKey};
pub use catalog::{CatalogEntry, FeedCatalog};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{create_example_config, FeedEntryConfig, KeeperConfig, NetworkConfig, PriceSourceConfig};
pub use keeper::TipKeeper;
pub use multicall::MulticallExecutor;
pub use price::{HttpPriceSource, PriceSource};
pub use resolver::TipResolver;
