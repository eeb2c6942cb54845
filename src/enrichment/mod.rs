//! Word detail enrichment
//!
//! [`QueryApi`] is the seam the query stage runs against: one term in, an
//! optional [`EnrichmentResult`] out. [`EudictQueryApi`] fetches the detail page
//! over the shared HTTP client and hands it to [`EnrichmentParser`].

mod eudict;
mod parser;

pub use eudict::EudictQueryApi;
pub use parser::EnrichmentParser;

use async_trait::async_trait;

use crate::types::EnrichmentResult;

/// A service answering word detail queries
///
/// `None` covers both a failed request and a term without content; the two are
/// not distinguished.
#[async_trait]
pub trait QueryApi: Send + Sync {
    /// Service name for logs
    fn name(&self) -> &str;

    /// Look up one term
    async fn query(&self, term: &str) -> Option<EnrichmentResult>;
}
