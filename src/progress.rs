//! Atomic progress counter shared by the workers of one stage.

use crate::types::{Event, Progress, Stage};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Stage-local progress counter
///
/// `total` is fixed when the stage starts; `completed` only grows. Cloning is
/// cheap and every clone ticks the same counter.
#[derive(Clone)]
pub struct ProgressCounter {
    stage: Stage,
    total: u64,
    completed: Arc<AtomicU64>,
    event_tx: tokio::sync::broadcast::Sender<Event>,
}

impl ProgressCounter {
    /// Start a stage with `total` work items
    pub fn new(stage: Stage, total: u64, event_tx: tokio::sync::broadcast::Sender<Event>) -> Self {
        Self {
            stage,
            total,
            completed: Arc::new(AtomicU64::new(0)),
            event_tx,
        }
    }

    /// Record one finished item and emit a progress event
    pub fn tick(&self) -> Progress {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        let progress = Progress {
            completed,
            total: self.total,
        };
        self.event_tx
            .send(Event::Progress {
                stage: self.stage,
                progress,
            })
            .ok();
        progress
    }

    /// Current counters
    pub fn snapshot(&self) -> Progress {
        Progress {
            completed: self.completed.load(Ordering::SeqCst),
            total: self.total,
        }
    }
}
