//! Suggestion results handed to the reporting loop

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::query::QueryTag;

/// Tip amounts keyed by query tag
pub type TipMap = BTreeMap<QueryTag, u128>;

/// The query worth reporting now and the total reward it unlocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub query_tag: QueryTag,
    pub amount: u128,
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.query_tag, self.amount)
    }
}
