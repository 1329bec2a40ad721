use std::time::Duration;

use anyhow::{Context, Error, Result};
use async_trait::async_trait;
use serde_json::Value;

use super::public::RagQuery;
use crate::core::AppConfig;

/// Anything that can answer a question. The chat session only talks
/// to the backend through this trait so tests can swap in a fake.
#[async_trait]
pub trait RagClient {
    /// Returns the raw response body. Interpretation of the fields
    /// happens in `rag::interpret`.
    async fn query(&self, query: &RagQuery) -> Result<Value, Error>;
}

pub type BoxedRagClient = Box<dyn RagClient + Send + Sync + 'static>;

pub struct HttpRagClient {
    client: reqwest::Client,
    api_base_url: String,
    timeout: Duration,
}

impl HttpRagClient {
    pub fn new(api_base_url: &str, timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), api_base_url, timeout)
    }

    pub fn with_client(client: reqwest::Client, api_base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.rag_api_url, config.request_timeout())
    }
}

#[async_trait]
impl RagClient for HttpRagClient {
    async fn query(&self, query: &RagQuery) -> Result<Value, Error> {
        let url = format!("{}/rag/query", self.api_base_url);
        tracing::debug!("Sending query to {}", url);

        let resp: Value = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .with_context(|| "Attempted to parse rag response from json")?;

        Ok(resp)
    }
}
