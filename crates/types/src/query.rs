//! Query and feed identifiers

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use crate::errors::{AutopayError, AutopayResult};

// ============================================================================
// Query Tag
// ============================================================================

/// Human-readable name of a logical data query, e.g. `eth-usd-legacy`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryTag(String);

impl QueryTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QueryTag {
    fn from(tag: &str) -> Self {
        Self(tag.to_string())
    }
}

impl Borrow<str> for QueryTag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// 32-byte Identifiers
// ============================================================================

fn parse_word(kind: &str, s: &str) -> AutopayResult<[u8; 32]> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(trimmed)
        .map_err(|e| AutopayError::invalid_parameter(kind, s, &format!("hex string ({})", e)))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| AutopayError::invalid_parameter(kind, s, &format!("32 bytes, got {}", b.len())))
}

macro_rules! word_id {
    ($(#[$doc:meta])* $name:ident, $kind:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Lowercase hex without `0x` prefix
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = AutopayError;

            fn from_str(s: &str) -> AutopayResult<Self> {
                parse_word($kind, s).map(Self)
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

word_id!(
    /// Identifier of a query, the keccak256 of its canonical query data
    QueryId,
    "query_id"
);

word_id!(
    /// Identifier of one funding schedule for a query
    FeedId,
    "feed_id"
);

impl QueryId {
    /// Legacy queries are identified by their numeric request id
    pub fn from_legacy_id(id: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&id.to_be_bytes());
        Self(bytes)
    }
}

// ============================================================================
// Query Category
// ============================================================================

/// Catalog classification of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryCategory {
    Legacy,
    Spot,
    Other,
}

impl QueryCategory {
    /// Infer the category from tag naming (`*-legacy`, `*-spot`)
    pub fn from_tag(tag: &str) -> Self {
        if tag.contains("legacy") {
            Self::Legacy
        } else if tag.contains("spot") {
            Self::Spot
        } else {
            Self::Other
        }
    }

    /// Whether feeds for this category are scanned for continuous tips
    pub fn has_funded_feeds(&self) -> bool {
        matches!(self, Self::Legacy | Self::Spot)
    }
}
