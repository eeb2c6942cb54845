use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::Wordbook;
use crate::progress::ProgressCounter;
use crate::types::{Event, Group, Stage};

/// Pages through the words of selected groups
///
/// Pages of one group are fetched in order. A failed page is logged and
/// contributes nothing; the rest of the group and the other groups are still
/// fetched.
pub struct WordFetcher {
    wordbook: Arc<dyn Wordbook>,
    event_tx: tokio::sync::broadcast::Sender<Event>,
}

impl WordFetcher {
    /// Create a fetcher emitting events on `event_tx`
    pub fn new(wordbook: Arc<dyn Wordbook>, event_tx: tokio::sync::broadcast::Sender<Event>) -> Self {
        Self { wordbook, event_tx }
    }

    /// Page count of a group; 0 when the metadata request fails
    pub async fn total_pages(&self, group: &Group) -> u32 {
        match self.wordbook.total_pages(group).await {
            Ok(pages) => pages,
            Err(e) => {
                tracing::warn!(group = %group.name, error = %e, "could not read group size, skipping group");
                0
            }
        }
    }

    /// Distinct words of one group
    ///
    /// The cancellation token is checked before every page request; pages
    /// already fetched are kept.
    pub async fn fetch_group(&self, group: &Group, cancel: &CancellationToken) -> HashSet<String> {
        let mut words = HashSet::new();
        if cancel.is_cancelled() {
            return words;
        }

        let pages = self.total_pages(group).await;
        tracing::debug!(group = %group.name, pages, page_size = self.wordbook.page_size(), "paging group");
        for page in 0..pages {
            if cancel.is_cancelled() {
                tracing::info!(group = %group.name, page, "fetch cancelled");
                break;
            }
            match self.wordbook.fetch_page(group, page).await {
                Ok(page_words) => {
                    let page_words: HashSet<String> = page_words.into_iter().collect();
                    tracing::debug!(group = %group.name, page = page + 1, count = page_words.len(), "page fetched");
                    words.extend(page_words);
                }
                Err(e) => {
                    tracing::warn!(group = %group.name, page = page + 1, error = %e, "page fetch failed, skipping");
                }
            }
        }
        words
    }

    /// Union of the words of all groups
    ///
    /// Emits one progress tick and one [`Event::GroupFetched`] per finished group;
    /// the stage total is the number of groups.
    pub async fn fetch_all(&self, groups: &[Group], cancel: &CancellationToken) -> HashSet<String> {
        let progress = ProgressCounter::new(Stage::Fetching, groups.len() as u64, self.event_tx.clone());
        let mut remote = HashSet::new();

        for group in groups {
            if cancel.is_cancelled() {
                break;
            }
            let words = self.fetch_group(group, cancel).await;
            tracing::info!(group = %group.name, words = words.len(), "group fetched");
            self.event_tx
                .send(Event::GroupFetched {
                    group: group.name.clone(),
                    words: words.len(),
                })
                .ok();
            remote.extend(words);
            progress.tick();
        }

        let fetched = progress.snapshot();
        tracing::info!(
            service = self.wordbook.name(),
            groups = fetched.completed,
            selected = fetched.total,
            words = remote.len(),
            "remote words fetched"
        );
        remote
    }
}
