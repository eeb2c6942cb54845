//! Remote word-list services
//!
//! A [`Wordbook`] knows how to validate a session against its service, read the
//! group catalog out of the authenticated landing document and page through the
//! words of one group. [`WordFetcher`] drives any implementation through a whole
//! group selection.
//!
//! - [`eudict`] - HTML study lists with a DataTables JSON word source
//! - [`youdao`] - JSON word books
//! - [`fetcher`] - paginated fetching with progress and cancellation

mod eudict;
mod fetcher;
mod youdao;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use eudict::Eudict;
pub use fetcher::WordFetcher;
pub use youdao::Youdao;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, DictionaryKind};
use crate::error::Result;
use crate::http::ResilientHttpClient;
use crate::types::{Group, LandingDocument, SessionStatus, SessionToken};

/// A remote service holding the user's vocabulary groups
#[async_trait]
pub trait Wordbook: Send + Sync {
    /// Human-readable service name
    fn name(&self) -> &str;

    /// Page handed to the login collaborator when the session is rejected
    fn login_url(&self) -> &str;

    /// Whether the cookies captured by a login flow prove a successful login
    fn login_succeeded(&self, cookies: &SessionToken, page: &str) -> bool;

    /// Check a candidate session with one request to an authenticated-only endpoint
    ///
    /// A rejected session is `Ok(SessionStatus::Invalid)`; `Err` is reserved for
    /// transport failures.
    async fn validate(&self, token: &SessionToken) -> Result<SessionStatus>;

    /// Send `token` with every later request of this run
    fn use_session(&self, token: &SessionToken);

    /// Groups listed in the landing document, in service order
    fn list_groups(&self, landing: &LandingDocument) -> Vec<Group>;

    /// Words per page
    fn page_size(&self) -> u32;

    /// Number of pages in a group, from one metadata request
    async fn total_pages(&self, group: &Group) -> Result<u32>;

    /// Words on one page (0-based)
    async fn fetch_page(&self, group: &Group, page: u32) -> Result<Vec<String>>;
}

/// Build the configured word-list service on top of a shared client
pub fn from_config(config: &Config, client: Arc<ResilientHttpClient>) -> Arc<dyn Wordbook> {
    match config.dictionary {
        DictionaryKind::Eudict => Arc::new(Eudict::new(config.eudict.clone(), client)),
        DictionaryKind::Youdao => Arc::new(Youdao::new(config.youdao.clone(), client)),
    }
}

/// Groups whose names were selected on a previous run, in service order
///
/// Names that no longer exist remotely are dropped silently.
pub fn preselected(groups: &[Group], previous_names: &[String]) -> Vec<Group> {
    groups
        .iter()
        .filter(|group| previous_names.iter().any(|name| name == &group.name))
        .cloned()
        .collect()
}

/// `ceil(records / page_size)`
pub(crate) fn page_count(records: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    u32::try_from(records.div_ceil(u64::from(page_size))).unwrap_or(u32::MAX)
}
