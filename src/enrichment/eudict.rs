use std::sync::Arc;

use async_trait::async_trait;

use super::{EnrichmentParser, QueryApi};
use crate::config::QueryApiConfig;
use crate::error::Result;
use crate::http::ResilientHttpClient;
use crate::types::EnrichmentResult;

/// Eudict detail pages
pub struct EudictQueryApi {
    dict_url: String,
    parser: EnrichmentParser,
    client: Arc<ResilientHttpClient>,
}

impl EudictQueryApi {
    /// Create the query service on top of a shared client
    pub fn new(config: &QueryApiConfig, client: Arc<ResilientHttpClient>) -> Self {
        Self {
            dict_url: config.dict_url.clone(),
            parser: EnrichmentParser::new(config.speech_url.clone()),
            client,
        }
    }

    fn detail_url(&self, term: &str) -> String {
        format!("{}{}", self.dict_url, urlencoding::encode(term))
    }

    async fn fetch_and_parse(&self, term: &str) -> Result<EnrichmentResult> {
        let response = self.client.get(&self.detail_url(term), &[]).await?;
        self.parser.parse(term, &response.text())
    }
}

#[async_trait]
impl QueryApi for EudictQueryApi {
    fn name(&self) -> &str {
        "eudict"
    }

    async fn query(&self, term: &str) -> Option<EnrichmentResult> {
        match self.fetch_and_parse(term).await {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::warn!(term = %term, error = %e, "query failed");
                None
            }
        }
    }
}
