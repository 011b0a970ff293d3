//! Feed catalog: which queries the keeper knows, how they are identified,
//! and where their live prices come from.

use std::sync::Arc;

use alloy::primitives::keccak256;

use autopay_types::{AutopayError, AutopayResult, QueryCategory, QueryId, QueryTag};

use crate::config::FeedEntryConfig;
use crate::price::{HttpPriceSource, PriceSource};

/// One reportable query
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub tag: QueryTag,
    pub query_id: QueryId,
    pub category: QueryCategory,
    pub price_source: Option<Arc<dyn PriceSource>>,
}

impl CatalogEntry {
    pub fn new(tag: impl Into<String>, query_id: QueryId) -> Self {
        let tag = QueryTag::new(tag);
        let category = QueryCategory::from_tag(tag.as_str());
        Self {
            tag,
            query_id,
            category,
            price_source: None,
        }
    }

    pub fn with_category(mut self, category: QueryCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_price_source(mut self, source: Arc<dyn PriceSource>) -> Self {
        self.price_source = Some(source);
        self
    }

    /// Build an entry from configuration, deriving the id from query data if needed
    pub fn from_config(config: &FeedEntryConfig) -> AutopayResult<Self> {
        let query_id = match (&config.query_id, &config.query_data) {
            (Some(id), _) => id.parse()?,
            (None, Some(data)) => query_id_from_data(data)?,
            (None, None) => {
                return Err(AutopayError::missing_configuration(
                    &config.tag,
                    "either query_id or query_data is required",
                ))
            }
        };

        let mut entry = Self::new(config.tag.as_str(), query_id);
        if let Some(category) = config.category {
            entry.category = category;
        }
        if let Some(source) = &config.price_source {
            entry.price_source = Some(Arc::new(HttpPriceSource::new(source)?));
        }

        Ok(entry)
    }
}

/// Query id of hex-encoded query data: its keccak256
pub fn query_id_from_data(query_data: &str) -> AutopayResult<QueryId> {
    let trimmed = query_data.strip_prefix("0x").unwrap_or(query_data);
    let bytes = hex::decode(trimmed)
        .map_err(|e| AutopayError::invalid_parameter("query_data", query_data, &format!("hex string ({})", e)))?;
    Ok(QueryId(keccak256(bytes).0))
}

/// Ordered, read-only set of catalog entries.
///
/// Iteration order is configuration order; ranking ties resolve to the
/// earliest entry.
#[derive(Debug, Clone, Default)]
pub struct FeedCatalog {
    entries: Vec<CatalogEntry>,
}

impl FeedCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> AutopayResult<Self> {
        for (i, entry) in entries.iter().enumerate() {
            let duplicate = entries[..i]
                .iter()
                .any(|other| other.tag == entry.tag || other.query_id == entry.query_id);
            if duplicate {
                return Err(AutopayError::invalid_configuration(
                    "catalog",
                    &format!("duplicate entry for {} ({})", entry.tag, entry.query_id),
                ));
            }
        }

        Ok(Self { entries })
    }

    pub fn from_config(feeds: &[FeedEntryConfig]) -> AutopayResult<Self> {
        let entries = feeds
            .iter()
            .map(CatalogEntry::from_config)
            .collect::<AutopayResult<Vec<_>>>()?;
        Self::new(entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    /// Entries whose category carries funded feeds (legacy and spot)
    pub fn feed_candidates(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter().filter(|e| e.category.has_funded_feeds())
    }

    pub fn tags(&self) -> impl Iterator<Item = &QueryTag> {
        self.entries.iter().map(|e| &e.tag)
    }

    pub fn by_id(&self, query_id: &QueryId) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| &e.query_id == query_id)
    }

    pub fn by_tag(&self, tag: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.tag.as_str() == tag)
    }

    /// Catalog restricted to a single query
    pub fn only(&self, query_id: &QueryId) -> AutopayResult<Self> {
        let entry = self
            .by_id(query_id)
            .ok_or_else(|| AutopayError::unknown_query(&query_id.to_string()))?;
        Ok(Self {
            entries: vec![entry.clone()],
        })
    }
}
