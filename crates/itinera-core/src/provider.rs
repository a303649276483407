// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use crate::config::AppConfig;
use crate::request::RequestBatch;
use log::{debug, info};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid provider URL: {0}")]
    Url(String),
    #[error("Batch {batch} failed: {message}")]
    Batch { batch: usize, message: String },
}

/// Answers one request batch with a raw provider response.
///
/// Batches of a single search are issued from several threads at once.
pub trait FlightSearchProvider: Send + Sync {
    fn search(&self, batch: &RequestBatch) -> Result<Value, ProviderError>;
}

pub struct HttpSearchProvider {
    client: reqwest::blocking::Client,
    url: reqwest::Url,
    api_key: Option<String>,
}

impl HttpSearchProvider {
    pub fn new(url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let url = reqwest::Url::parse(url).map_err(|e| ProviderError::Url(e.to_string()))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url,
            api_key,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        Self::new(
            &config.provider_url,
            config.provider_api_key.clone(),
            config.request_timeout(),
        )
    }
}

impl FlightSearchProvider for HttpSearchProvider {
    fn search(&self, batch: &RequestBatch) -> Result<Value, ProviderError> {
        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair("curr", &batch.currency);

        info!(
            "Searching batch {} ({} leg(s)) at {}",
            batch.index,
            batch.requests.len(),
            self.url
        );
        let mut request = self.client.post(url).json(batch);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }
        let body: Value = request.send()?.error_for_status()?.json()?;
        debug!(
            "Batch {} answered with {} element(s)",
            batch.index,
            body.as_array().map(Vec::len).unwrap_or(0)
        );
        Ok(body)
    }
}

/// Replays recorded responses: batch `i` gets response `i`, or the last one
/// when fewer were recorded.
pub struct RecordedProvider {
    responses: Vec<Value>,
}

impl RecordedProvider {
    pub fn new(responses: Vec<Value>) -> Self {
        Self { responses }
    }
}

impl FlightSearchProvider for RecordedProvider {
    fn search(&self, batch: &RequestBatch) -> Result<Value, ProviderError> {
        self.responses
            .get(batch.index)
            .or_else(|| self.responses.last())
            .cloned()
            .ok_or_else(|| ProviderError::Batch {
                batch: batch.index,
                message: "no recorded response".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn batch(index: usize) -> RequestBatch {
        RequestBatch {
            index,
            currency: "EUR".to_string(),
            requests: Vec::new(),
        }
    }

    #[test]
    fn test_recorded_by_index_then_last() {
        let p = RecordedProvider::new(vec![json!([1]), json!([2])]);
        assert_eq!(p.search(&batch(0)).unwrap(), json!([1]));
        assert_eq!(p.search(&batch(1)).unwrap(), json!([2]));
        assert_eq!(p.search(&batch(7)).unwrap(), json!([2]));
    }

    #[test]
    fn test_recorded_empty_fails() {
        let p = RecordedProvider::new(Vec::new());
        assert!(matches!(
            p.search(&batch(0)),
            Err(ProviderError::Batch { batch: 0, .. })
        ));
    }

    #[test]
    fn test_bad_url_rejected() {
        assert!(matches!(
            HttpSearchProvider::new("not a url", None, Duration::from_secs(1)),
            Err(ProviderError::Url(_))
        ));
    }
}
