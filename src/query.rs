//! Bounded concurrent word queries.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::{StreamExt, future, stream};
use tokio_util::sync::CancellationToken;

use crate::enrichment::QueryApi;
use crate::progress::ProgressCounter;
use crate::types::{Event, QueryOutcome, Stage};

/// Outcomes of one query run
#[derive(Clone, Debug, Default)]
pub struct QueryRun {
    /// One outcome per submitted row, in completion order
    pub outcomes: Vec<QueryOutcome>,
    /// Rows without a result (failed, empty or never submitted), ascending
    pub absent_rows: Vec<usize>,
}

/// Runs term queries on a fixed-size worker pool
pub struct QueryOrchestrator {
    api: Arc<dyn QueryApi>,
    workers: usize,
    event_tx: tokio::sync::broadcast::Sender<Event>,
}

impl QueryOrchestrator {
    /// Create an orchestrator with `workers` concurrent queries
    pub fn new(
        api: Arc<dyn QueryApi>,
        workers: usize,
        event_tx: tokio::sync::broadcast::Sender<Event>,
    ) -> Self {
        Self {
            api,
            workers: workers.max(1),
            event_tx,
        }
    }

    /// Query every term; row `i` is `terms[i]`
    pub async fn run_all(&self, terms: &[String], cancel: &CancellationToken) -> QueryRun {
        let rows = terms.iter().cloned().enumerate().collect();
        self.run_rows(rows, cancel).await
    }

    /// Query the given `(row, term)` pairs
    ///
    /// Each completion emits [`Event::RowQueried`] and a progress tick. After
    /// cancellation no further term is submitted; queries already running finish
    /// and their outcomes are kept.
    pub async fn run_rows(&self, rows: Vec<(usize, String)>, cancel: &CancellationToken) -> QueryRun {
        let all_rows: BTreeSet<usize> = rows.iter().map(|(row, _)| *row).collect();
        let progress = ProgressCounter::new(Stage::Querying, rows.len() as u64, self.event_tx.clone());
        tracing::info!(api = self.api.name(), terms = rows.len(), workers = self.workers, "querying terms");

        let submit_cancel = cancel.clone();
        let mut completions = stream::iter(rows)
            .take_while(move |_| future::ready(!submit_cancel.is_cancelled()))
            .map(|(row, term)| {
                let api = Arc::clone(&self.api);
                async move {
                    let result = api.query(&term).await;
                    QueryOutcome { row, term, result }
                }
            })
            .buffer_unordered(self.workers);

        let mut outcomes = Vec::with_capacity(all_rows.len());
        while let Some(outcome) = completions.next().await {
            if !outcome.is_success() {
                tracing::warn!(row = outcome.row, term = %outcome.term, "no result for term");
            }
            self.event_tx
                .send(Event::RowQueried {
                    outcome: outcome.clone(),
                })
                .ok();
            progress.tick();
            outcomes.push(outcome);
        }

        let succeeded: BTreeSet<usize> = outcomes
            .iter()
            .filter(|outcome| outcome.is_success())
            .map(|outcome| outcome.row)
            .collect();
        let absent_rows: Vec<usize> = all_rows.difference(&succeeded).copied().collect();

        if cancel.is_cancelled() {
            tracing::info!(completed = outcomes.len(), absent = absent_rows.len(), "query run cancelled");
        } else {
            tracing::info!(succeeded = succeeded.len(), absent = absent_rows.len(), "query run finished");
        }
        QueryRun {
            outcomes,
            absent_rows,
        }
    }
}
