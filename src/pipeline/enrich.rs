//! Querying word details for the new words.

use super::SyncPipeline;
use crate::error::{Error, Result};
use crate::query::QueryOrchestrator;
use crate::types::{PipelineState, QuerySummary};

impl SyncPipeline {
    /// Query the new words
    ///
    /// `None` queries every row still without a result; `Some(rows)` only those
    /// rows. Rows that already hold a result are never resubmitted and unknown
    /// row indexes are ignored.
    pub async fn query(&mut self, rows: Option<&[usize]>) -> Result<QuerySummary> {
        self.ensure_state(
            "query",
            &[PipelineState::AwaitingConfirmation, PipelineState::AwaitingSync],
        )?;

        let pending: Vec<(usize, String)> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(index, row)| {
                row.result.is_none() && rows.is_none_or(|wanted| wanted.contains(index))
            })
            .map(|(index, row)| (index, row.term.clone()))
            .collect();
        if let Some(wanted) = rows {
            let unknown: Vec<usize> = wanted.iter().copied().filter(|row| *row >= self.rows.len()).collect();
            if !unknown.is_empty() {
                tracing::warn!(?unknown, "ignoring unknown rows");
            }
        }

        self.set_state(PipelineState::Querying);
        let orchestrator = QueryOrchestrator::new(
            self.query_api.clone(),
            self.config.concurrency.query_workers,
            self.event_tx.clone(),
        );
        let run = orchestrator.run_rows(pending, &self.cancel).await;
        for outcome in run.outcomes {
            if let Some(row) = self.rows.get_mut(outcome.row) {
                row.result = outcome.result;
            }
        }

        if self.cancel.is_cancelled() {
            return self.abort(Error::Cancelled);
        }

        let summary = self.query_summary();
        tracing::info!(succeeded = summary.succeeded, absent = summary.absent_rows.len(), "query finished");
        self.set_state(PipelineState::AwaitingSync);
        Ok(summary)
    }

    /// Re-query every row still without a result
    pub async fn retry_failed(&mut self) -> Result<QuerySummary> {
        self.ensure_state("retry failed rows", &[PipelineState::AwaitingSync])?;
        let absent = self.query_summary().absent_rows;
        tracing::info!(rows = absent.len(), "retrying failed rows");
        self.query(Some(&absent)).await
    }

    /// Counts over all rows of this run
    pub fn query_summary(&self) -> QuerySummary {
        let absent_rows: Vec<usize> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.result.is_none())
            .map(|(index, _)| index)
            .collect();
        QuerySummary {
            succeeded: self.rows.len() - absent_rows.len(),
            absent_rows,
        }
    }
}
