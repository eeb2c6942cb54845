//! Writing notes, deleting stale words and downloading audio.

use super::SyncPipeline;
use crate::audio::AudioFetcher;
use crate::error::{Error, Result};
use crate::notes::{audio_tasks, note_fields};
use crate::types::{Event, PipelineState, SyncReport};

impl SyncPipeline {
    /// Write the queried words as notes and download their audio
    ///
    /// Rows without a result are skipped and reported; confirming that is the
    /// caller's job. A note the store refuses is reported in `failed` and the
    /// remaining rows are still written. Stale words are deleted only when
    /// `delete_stale` is set. A run without new words may sync straight from
    /// `AwaitingConfirmation` to delete its stale words.
    ///
    /// A run cancelled before this call returns [`Error::Cancelled`] without
    /// touching the store. Cancelling while notes are written stops after the
    /// current note; the rest are reported as skipped and nothing is deleted.
    pub async fn sync(&mut self, delete_stale: bool) -> Result<SyncReport> {
        if self.rows.is_empty() {
            self.ensure_state(
                "sync",
                &[PipelineState::AwaitingConfirmation, PipelineState::AwaitingSync],
            )?;
        } else {
            self.ensure_state("sync", &[PipelineState::AwaitingSync])?;
        }
        if self.cancel.is_cancelled() {
            return self.abort(Error::Cancelled);
        }

        self.set_state(PipelineState::Syncing);
        let deck = self.config.sync.deck.clone();
        let media_dir = self.config.sync.media_dir.clone();
        let fields = self.config.sync.fields.clone();
        let pronunciation = self.config.sync.pronunciation;

        let mut report = SyncReport::default();
        let mut tasks = Vec::new();
        for row in &self.rows {
            if self.cancel.is_cancelled() {
                report.skipped.push(row.term.clone());
                continue;
            }
            let Some(result) = &row.result else {
                report.skipped.push(row.term.clone());
                continue;
            };
            let note = note_fields(result, &fields, pronunciation);
            match self.store.create_note(&deck, note).await {
                Ok(()) => {
                    tracing::debug!(term = %row.term, deck = %deck, "note created");
                    report.added += 1;
                    tasks.extend(audio_tasks(result, &media_dir, pronunciation));
                }
                Err(e) => {
                    tracing::warn!(term = %row.term, deck = %deck, error = %e, "note creation failed");
                    report.failed.push(row.term.clone());
                }
            }
        }
        if !report.skipped.is_empty() {
            tracing::warn!(skipped = report.skipped.len(), "words were not added");
        }

        if delete_stale && !self.diff.stale_words.is_empty() {
            if self.cancel.is_cancelled() {
                tracing::info!(stale = self.diff.stale_words.len(), "run cancelled, stale words kept");
                report.not_deleted = self.diff.stale_words.iter().cloned().collect();
            } else {
                let stale: Vec<String> = self.diff.stale_words.iter().cloned().collect();
                match self.store.delete_notes(&stale, &deck).await {
                    Ok(deleted) => {
                        report.deleted = deleted;
                        tracing::info!(deleted, deck = %deck, "stale words deleted");
                    }
                    Err(e) => {
                        tracing::warn!(stale = stale.len(), deck = %deck, error = %e, "stale word deletion failed");
                        report.not_deleted = stale;
                    }
                }
            }
        }

        self.set_state(PipelineState::Downloading);
        let fetcher = AudioFetcher::new(
            self.audio_client.clone(),
            self.config.concurrency.download_workers,
            self.event_tx.clone(),
        );
        report.audio = fetcher.download_all(tasks, &self.cancel).await;

        tracing::info!(
            added = report.added,
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            deleted = report.deleted,
            not_deleted = report.not_deleted.len(),
            audio = report.audio.succeeded,
            audio_failed = report.audio.failed.len(),
            "sync finished"
        );
        self.event_tx
            .send(Event::SyncFinished {
                report: report.clone(),
            })
            .ok();
        self.set_state(PipelineState::Idle);
        Ok(report)
    }
}
