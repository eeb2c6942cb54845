//! Fetching the selected groups and diffing against the deck.

use super::{Row, SyncPipeline};
use crate::diff::diff;
use crate::error::{Error, Result};
use crate::types::{Event, Group, PipelineState, WordDiff};
use crate::wordbook::WordFetcher;

impl SyncPipeline {
    /// Fetch the groups named in `names` and compare them with the deck
    ///
    /// An empty difference emits [`Event::NothingToSync`] and ends the run.
    /// Otherwise the new words become the rows to query and the pipeline waits
    /// in `AwaitingConfirmation`.
    pub async fn select_groups(&mut self, names: &[String]) -> Result<WordDiff> {
        self.ensure_state("select groups", &[PipelineState::SelectingGroups])?;

        let selected: Vec<Group> = self
            .groups
            .iter()
            .filter(|group| names.contains(&group.name))
            .cloned()
            .collect();
        if selected.is_empty() {
            return Err(Error::config("no group selected", "sync.selected_groups"));
        }
        self.selected = selected.iter().map(|group| group.name.clone()).collect();

        self.set_state(PipelineState::Fetching);
        let fetcher = WordFetcher::new(self.wordbook.clone(), self.event_tx.clone());
        let remote = fetcher.fetch_all(&selected, &self.cancel).await;
        if self.cancel.is_cancelled() {
            return self.abort(Error::Cancelled);
        }

        self.set_state(PipelineState::Diffing);
        let local = match self.store.words_in_deck(&self.config.sync.deck).await {
            Ok(words) => words,
            Err(e) => return self.abort(e),
        };
        let word_diff = diff(&remote, &local);
        tracing::info!(
            remote = remote.len(),
            local = local.len(),
            new = word_diff.new_words.len(),
            stale = word_diff.stale_words.len(),
            "word sets compared"
        );

        if word_diff.is_empty() {
            self.event_tx.send(Event::NothingToSync).ok();
            self.set_state(PipelineState::Idle);
            return Ok(word_diff);
        }

        self.rows = word_diff
            .new_words
            .iter()
            .map(|term| Row {
                term: term.clone(),
                result: None,
            })
            .collect();
        self.diff = word_diff.clone();
        self.set_state(PipelineState::AwaitingConfirmation);
        Ok(word_diff)
    }
}
