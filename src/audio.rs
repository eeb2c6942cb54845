//! Pronunciation audio downloads.

use std::path::Path;
use std::sync::Arc;

use futures::{StreamExt, future, stream};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::http::ResilientHttpClient;
use crate::progress::ProgressCounter;
use crate::types::{AudioReport, AudioTask, Event, Stage};

/// Downloads audio files on a fixed-size worker pool
///
/// A failed download is logged and reported; it never aborts the batch. Failed
/// tasks are not retried.
pub struct AudioFetcher {
    client: Arc<ResilientHttpClient>,
    workers: usize,
    event_tx: tokio::sync::broadcast::Sender<Event>,
}

impl AudioFetcher {
    /// Create a fetcher with `workers` concurrent downloads
    pub fn new(
        client: Arc<ResilientHttpClient>,
        workers: usize,
        event_tx: tokio::sync::broadcast::Sender<Event>,
    ) -> Self {
        Self {
            client,
            workers: workers.max(1),
            event_tx,
        }
    }

    /// Download every task; one progress tick per finished task
    pub async fn download_all(&self, tasks: Vec<AudioTask>, cancel: &CancellationToken) -> AudioReport {
        let progress = ProgressCounter::new(Stage::Downloading, tasks.len() as u64, self.event_tx.clone());
        tracing::info!(tasks = tasks.len(), workers = self.workers, "downloading audio");

        let submit_cancel = cancel.clone();
        let mut pending = tasks.clone();
        let mut completions = stream::iter(tasks)
            .take_while(move |_| future::ready(!submit_cancel.is_cancelled()))
            .map(|task| async move {
                let outcome = self.download(&task).await;
                (task, outcome)
            })
            .buffer_unordered(self.workers);

        let mut report = AudioReport::default();
        while let Some((task, outcome)) = completions.next().await {
            let success = match outcome {
                Ok(()) => {
                    report.succeeded += 1;
                    true
                }
                Err(e) => {
                    tracing::warn!(
                        url = %task.source_url,
                        path = %task.destination.display(),
                        error = %e,
                        "audio download failed"
                    );
                    report.failed.push(task.clone());
                    false
                }
            };
            pending.retain(|t| t != &task);
            self.event_tx
                .send(Event::AudioDownloaded {
                    path: task.destination,
                    success,
                })
                .ok();
            progress.tick();
        }

        if !pending.is_empty() {
            tracing::info!(skipped = pending.len(), "audio downloads cancelled");
            report.failed.extend(pending);
        }
        tracing::info!(succeeded = report.succeeded, failed = report.failed.len(), "audio downloads finished");
        report
    }

    async fn download(&self, task: &AudioTask) -> Result<()> {
        let body = self.client.get(&task.source_url, &[]).await?.into_bytes();
        write_file(&task.destination, &body).await?;
        tracing::debug!(path = %task.destination.display(), bytes = body.len(), "audio saved");
        Ok(())
    }
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    Ok(())
}
