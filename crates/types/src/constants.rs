/// Protocol constants shared by the keeper components

// ============================================================================
// Time Constants
// ============================================================================

/// Trailing report horizon scanned for unclaimed rewards (three calendar months).
/// Autopay refuses claims older than this, so older reports cannot drain a feed.
pub const THREE_MONTHS_SECS: u64 = 7_889_238;

// ============================================================================
// Price Constants
// ============================================================================

/// Price change reported when the previous value is zero; exceeds any threshold
pub const MAX_PRICE_CHANGE: f64 = 10_000.0;

/// Multiplier applied to the relative price change before comparing it to a
/// feed's `priceThreshold`
pub const PRICE_CHANGE_SCALE: f64 = 10_000.0;

/// Oracle values are unsigned integers with 18 decimals
pub const ORACLE_VALUE_SCALE: f64 = 1e18;

/// Width of an ABI word in bytes
pub const WORD_BYTES: usize = 32;

// ============================================================================
// Network Constants
// ============================================================================

/// Chains on which autopay tips are suggested when no override is configured:
/// Polygon, Mumbai, Optimism Kovan, Harmony mainnet, Harmony testnet, Arbitrum Rinkeby
pub const DEFAULT_SUPPORTED_CHAINS: [u64; 6] = [137, 80001, 69, 1_666_600_000, 1_666_700_000, 421_611];

/// Canonical Multicall3 deployment (also serves the Multicall2 `tryAggregate` ABI)
pub const MULTICALL3_ADDRESS: &str = "0xcA11bde05977b3631167028862bE2a173976CA11";

/// Multicall deployment on Polygon Mumbai
pub const MUMBAI_MULTICALL_ADDRESS: &str = "0x35583BDef43126cdE71FD273F5ebeffd3a92742A";

/// Multicall deployment shared by Arbitrum Rinkeby and Optimism Kovan
pub const L2_TESTNET_MULTICALL_ADDRESS: &str = "0xf609687230a65E8bd14caceDEfCF2dea9c15b242";
