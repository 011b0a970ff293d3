//! Live price lookups for price-threshold feeds.
//!
//! ## HTTP JSON sources
//!
//! [`HttpPriceSource`] performs a GET request and reads the price at a JSON
//! pointer, e.g. for
//! `https://api.coingecko.com/api/v3/simple/price?ids=ethereum&vs_currencies=usd`
//! the pointer is `/ethereum/usd`. Prices given as strings are parsed.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use autopay_types::{AutopayError, AutopayResult};

use crate::config::PriceSourceConfig;

/// Capability returning the latest market price of a query's asset
#[async_trait]
pub trait PriceSource: Send + Sync + fmt::Debug {
    /// Latest price, or `None` when the source cannot provide one
    async fn fetch_latest_price(&self) -> Option<f64>;
}

/// Price read from an HTTP JSON endpoint
#[derive(Debug, Clone)]
pub struct HttpPriceSource {
    client: reqwest::Client,
    url: String,
    pointer: String,
}

impl HttpPriceSource {
    pub fn new(config: &PriceSourceConfig) -> AutopayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AutopayError::invalid_configuration("price_source", &e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            pointer: config.pointer.clone(),
        })
    }

    async fn fetch(&self) -> AutopayResult<f64> {
        let unavailable = |e: reqwest::Error| AutopayError::collaborator_unavailable(&self.url, &e.to_string());

        let response = self.client.get(&self.url).send().await.map_err(unavailable)?;
        if !response.status().is_success() {
            return Err(AutopayError::collaborator_unavailable(
                &self.url,
                &format!("HTTP {}", response.status()),
            ));
        }

        let body: Value = response.json().await.map_err(unavailable)?;
        extract_price(&body, &self.pointer).ok_or_else(|| {
            AutopayError::decode_failure("price", &format!("no positive number at '{}'", self.pointer))
        })
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn fetch_latest_price(&self) -> Option<f64> {
        match self.fetch().await {
            Ok(price) => Some(price),
            Err(e) => {
                log::warn!("Price lookup failed: {}", e);
                None
            }
        }
    }
}

/// Read a price at `pointer`; numbers and numeric strings are accepted
pub fn extract_price(body: &Value, pointer: &str) -> Option<f64> {
    let price = match body.pointer(pointer)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };

    (price.is_finite() && price > 0.0).then_some(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_price() {
        let body = json!({ "ethereum": { "usd": 1834.27 } });
        assert_eq!(extract_price(&body, "/ethereum/usd"), Some(1834.27));
        assert_eq!(extract_price(&body, "/bitcoin/usd"), None);

        let body = json!([{ "priceUsd": "0.0367" }]);
        assert_eq!(extract_price(&body, "/0/priceUsd"), Some(0.0367));
    }

    #[test]
    fn test_extract_price_rejects_non_positive() {
        let body = json!({ "price": 0, "label": "n/a", "neg": -1.0 });
        assert_eq!(extract_price(&body, "/price"), None);
        assert_eq!(extract_price(&body, "/label"), None);
        assert_eq!(extract_price(&body, "/neg"), None);
    }

    #[test]
    fn test_unreachable_source_yields_none() {
        let source = HttpPriceSource::new(&PriceSourceConfig {
            url: "http://127.0.0.1:9/price".to_string(),
            pointer: "/price".to_string(),
            timeout_secs: 1,
        })
        .unwrap();

        assert_eq!(tokio_test::block_on(source.fetch_latest_price()), None);
    }
}
