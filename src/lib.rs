//! # vocab-sync
//!
//! Synchronizes vocabulary from a remote word-list service into a local note
//! collection, enriching every new word with definitions, examples, phrases,
//! an illustration and pronunciation audio.
//!
//! ## Design Philosophy
//!
//! vocab-sync is designed to be:
//! - **Library-first** - No CLI or UI; the embedding application supplies the
//!   note store and the login flow through traits
//! - **Event-driven** - Consumers subscribe to events, no polling required
//! - **Tolerant** - A failed page, query or download is reported, never fatal
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use vocab_sync::{Config, NoteStore, SessionToken, SyncPipeline};
//!
//! # async fn run(store: Arc<dyn NoteStore>) -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = Config::default();
//! config.sync.deck = "English".to_string();
//!
//! let mut pipeline = SyncPipeline::new(config, store)?;
//!
//! let mut events = pipeline.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         println!("Event: {:?}", event);
//!     }
//! });
//!
//! let token = SessionToken::from_json(r#"{"EudicWebSession": "..."}"#)?;
//! let groups = pipeline.start(&token).await?;
//! let names: Vec<String> = groups.iter().map(|g| g.name.clone()).collect();
//! pipeline.select_groups(&names).await?;
//! pipeline.query(None).await?;
//! let report = pipeline.sync(true).await?;
//! println!("added {} notes", report.added);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Pronunciation audio downloads
pub mod audio;
/// Configuration types
pub mod config;
/// Remote vs local word set difference
pub mod diff;
/// Word detail enrichment
pub mod enrichment;
/// Error types
pub mod error;
/// Shared HTTP transport
pub mod http;
/// Note field rendering and audio task planning
pub mod notes;
/// Sync pipeline coordinator
pub mod pipeline;
/// Stage progress counters
pub mod progress;
/// Bounded concurrent word queries
pub mod query;
/// Retry logic with exponential backoff
pub mod retry;
/// Note store and login collaborators
pub mod store;
/// Core types and events
pub mod types;
/// Remote word-list services
pub mod wordbook;

// Re-export commonly used types
pub use config::{Config, DictionaryKind, NoteFieldOptions, PronunciationChoice};
pub use enrichment::{EnrichmentParser, EudictQueryApi, QueryApi};
pub use error::{Error, Result};
pub use http::ResilientHttpClient;
pub use pipeline::{Row, SyncPipeline};
pub use store::{LoginPredicate, LoginProvider, NoteStore};
pub use types::{
    Accent, AudioReport, AudioTask, EnrichmentResult, Event, Gloss, Group, PipelineState,
    Progress, Pronunciation, QueryOutcome, QuerySummary, SessionToken, Stage, SyncReport, WordDiff,
};
pub use wordbook::{Eudict, WordFetcher, Wordbook, Youdao};

/// Cancel a pipeline run when the process receives a termination signal.
///
/// Waits for the signal and then cancels `token`; the running stage finishes
/// its current requests and returns [`Error::Cancelled`].
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use vocab_sync::{cancel_on_signal, SyncPipeline};
///
/// # async fn run(pipeline: &mut SyncPipeline) -> vocab_sync::Result<()> {
/// tokio::spawn(cancel_on_signal(pipeline.cancellation_token()));
/// pipeline.query(None).await?;
/// # Ok(())
/// # }
/// ```
pub async fn cancel_on_signal(token: tokio_util::sync::CancellationToken) {
    tokio::select! {
        _ = wait_for_signal() => {
            tracing::info!("cancelling pipeline run");
            token.cancel();
        }
        _ = token.cancelled() => {}
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
