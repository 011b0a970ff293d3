//! Latest on-chain value of a query

use serde::{Deserialize, Serialize};

use crate::constants::{ORACLE_VALUE_SCALE, WORD_BYTES};

/// A reported value, decoded as a price when possible
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReportedValue {
    /// 18-decimal fixed point value converted to a float
    Price(f64),
    /// Bytes that do not decode as a single unsigned word
    Raw(Vec<u8>),
}

impl ReportedValue {
    /// Decode submitted value bytes: a big-endian unsigned integer with 18 decimals.
    /// Empty payloads and payloads wider than one word stay raw.
    pub fn from_oracle_bytes(bytes: &[u8]) -> Self {
        if bytes.is_empty() || bytes.len() > WORD_BYTES {
            return Self::Raw(bytes.to_vec());
        }

        let scaled = bytes
            .iter()
            .fold(0f64, |acc, byte| acc * 256.0 + f64::from(*byte));
        Self::Price(scaled / ORACLE_VALUE_SCALE)
    }

    pub fn price(&self) -> Option<f64> {
        match self {
            Self::Price(price) => Some(*price),
            Self::Raw(_) => None,
        }
    }
}

/// Result of `getCurrentValue` for a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentValue {
    /// Whether any value was ever reported
    pub retrieved: bool,
    pub value: ReportedValue,
    /// Timestamp of the reported value (unix seconds)
    pub timestamp: u64,
}

impl CurrentValue {
    /// Timestamp of the last report, if there is one
    pub fn last_report_timestamp(&self) -> Option<u64> {
        self.retrieved.then_some(self.timestamp)
    }

    /// Price baseline used for threshold checks: zero when nothing was reported,
    /// `None` when the reported value cannot be read as a price
    pub fn baseline_price(&self) -> Option<f64> {
        if !self.retrieved {
            return Some(0.0);
        }
        self.value.price()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(value: u128) -> Vec<u8> {
        let mut bytes = vec![0u8; 16];
        bytes.extend_from_slice(&value.to_be_bytes());
        bytes
    }

    #[test]
    fn test_decode_price_word() {
        let value = ReportedValue::from_oracle_bytes(&word(1_500_000_000_000_000_000));
        assert_eq!(value, ReportedValue::Price(1.5));
    }

    #[test]
    fn test_decode_undecodable_bytes() {
        assert_eq!(ReportedValue::from_oracle_bytes(&[]), ReportedValue::Raw(vec![]));

        let wide = vec![1u8; 64];
        assert_eq!(ReportedValue::from_oracle_bytes(&wide).price(), None);
    }

    #[test]
    fn test_baseline_price() {
        let never_reported = CurrentValue {
            retrieved: false,
            value: ReportedValue::Raw(vec![]),
            timestamp: 0,
        };
        assert_eq!(never_reported.baseline_price(), Some(0.0));
        assert_eq!(never_reported.last_report_timestamp(), None);

        let reported = CurrentValue {
            retrieved: true,
            value: ReportedValue::Price(2.0),
            timestamp: 1_655_137_179,
        };
        assert_eq!(reported.baseline_price(), Some(2.0));
        assert_eq!(reported.last_report_timestamp(), Some(1_655_137_179));

        let garbled = CurrentValue {
            retrieved: true,
            value: ReportedValue::Raw(vec![]),
            timestamp: 10,
        };
        assert_eq!(garbled.baseline_price(), None);
    }
}
