//! Sync pipeline coordinator split into focused submodules.
//!
//! [`SyncPipeline`] owns the run state machine:
//!
//! `Idle → ValidatingSession → SelectingGroups → Fetching → Diffing →
//! AwaitingConfirmation → Querying → AwaitingSync → Syncing → Downloading → Idle`
//!
//! The states `SelectingGroups`, `AwaitingConfirmation` and `AwaitingSync` wait
//! for the caller, who resumes the run with the next method call:
//! - [`session`] - session validation, login and group discovery
//! - [`fetch`] - fetching the selected groups and diffing against the deck
//! - [`enrich`] - querying word details, selectively and on retry
//! - [`sync`] - writing notes, deleting stale words and downloading audio

mod enrich;
mod fetch;
mod session;
mod sync;


use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::enrichment::{EudictQueryApi, QueryApi};
use crate::error::{Error, Result};
use crate::http::ResilientHttpClient;
use crate::store::NoteStore;
use crate::types::{EnrichmentResult, Event, Group, PipelineState, WordDiff};
use crate::wordbook::{self, Wordbook};

/// Capacity of the event channel; slow subscribers miss the oldest events
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// One new word and its query result, if any
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    /// The new word
    pub term: String,
    /// Enrichment data once queried successfully
    pub result: Option<EnrichmentResult>,
}

/// Coordinates one synchronization run at a time
///
/// Methods take `&mut self`; a run is driven by a single caller. To cancel a
/// running stage from elsewhere, take [`cancellation_token`](Self::cancellation_token)
/// before calling into the stage.
pub struct SyncPipeline {
    /// Configuration
    pub(crate) config: Arc<Config>,
    /// Remote word-list service
    pub(crate) wordbook: Arc<dyn Wordbook>,
    /// Word detail service
    pub(crate) query_api: Arc<dyn QueryApi>,
    /// Client for audio downloads
    pub(crate) audio_client: Arc<ResilientHttpClient>,
    /// Local note store
    pub(crate) store: Arc<dyn NoteStore>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Current state
    pub(crate) state: PipelineState,
    /// Cancellation token of the current run
    pub(crate) cancel: CancellationToken,
    /// Groups discovered on the landing document
    pub(crate) groups: Vec<Group>,
    /// Names of the groups fetched in this run
    pub(crate) selected: Vec<String>,
    /// Remote vs local difference of this run
    pub(crate) diff: WordDiff,
    /// New words in row order
    pub(crate) rows: Vec<Row>,
}

impl SyncPipeline {
    /// Build a pipeline talking to the configured services
    pub fn new(config: Config, store: Arc<dyn NoteStore>) -> Result<Self> {
        config.validate()?;
        let wordbook_client = Arc::new(ResilientHttpClient::new(&config.http, &config.retry)?);
        let query_client = Arc::new(ResilientHttpClient::new(&config.http, &config.retry)?);

        let wordbook = wordbook::from_config(&config, wordbook_client);
        let query_api: Arc<dyn QueryApi> =
            Arc::new(EudictQueryApi::new(&config.query, Arc::clone(&query_client)));

        Self::assemble(config, wordbook, query_api, query_client, store)
    }

    /// Build a pipeline from explicit service implementations
    pub fn with_components(
        config: Config,
        wordbook: Arc<dyn Wordbook>,
        query_api: Arc<dyn QueryApi>,
        store: Arc<dyn NoteStore>,
    ) -> Result<Self> {
        config.validate()?;
        let audio_client = Arc::new(ResilientHttpClient::new(&config.http, &config.retry)?);
        Self::assemble(config, wordbook, query_api, audio_client, store)
    }

    fn assemble(
        config: Config,
        wordbook: Arc<dyn Wordbook>,
        query_api: Arc<dyn QueryApi>,
        audio_client: Arc<ResilientHttpClient>,
        store: Arc<dyn NoteStore>,
    ) -> Result<Self> {
        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);
        tracing::debug!(service = wordbook.name(), deck = %config.sync.deck, "pipeline created");

        Ok(Self {
            config: Arc::new(config),
            wordbook,
            query_api,
            audio_client,
            store,
            event_tx,
            state: PipelineState::Idle,
            cancel: CancellationToken::new(),
            groups: vec![],
            selected: vec![],
            diff: WordDiff::default(),
            rows: vec![],
        })
    }

    /// Subscribe to pipeline events
    ///
    /// Multiple subscribers are supported. Events sent while nobody listens are dropped.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Current state
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Configuration the pipeline was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token cancelling the current run
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request a cooperative stop of the current run
    ///
    /// Work already started finishes; no new request is issued.
    pub fn cancel(&self) {
        tracing::info!(state = %self.state, "cancellation requested");
        self.cancel.cancel();
    }

    /// Groups discovered by the last successful [`start`](Self::start)
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Names of the groups fetched in this run, to persist as the next preselection
    pub fn selected_groups(&self) -> &[String] {
        &self.selected
    }

    /// Remote vs local difference of this run
    pub fn diff(&self) -> &WordDiff {
        &self.diff
    }

    /// New words in row order with their query results
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Deck names of the note store
    pub async fn decks(&self) -> Result<Vec<String>> {
        self.store.list_decks().await
    }

    pub(crate) fn set_state(&mut self, state: PipelineState) {
        if self.state != state {
            tracing::info!(from = %self.state, to = %state, "pipeline state changed");
        }
        self.state = state;
        self.event_tx.send(Event::StateChanged { state }).ok();
    }

    pub(crate) fn ensure_state(&self, operation: &str, allowed: &[PipelineState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::InvalidState {
                operation: operation.to_string(),
                state: self.state.to_string(),
            })
        }
    }

    /// Return to `Idle` after a stage failed or was cancelled
    pub(crate) fn abort<T>(&mut self, error: Error) -> Result<T> {
        if error.halts_pipeline() {
            tracing::error!(error = %error, code = error.error_code(), state = %self.state, "pipeline halted");
        } else {
            tracing::warn!(error = %error, state = %self.state, "pipeline stopped");
        }
        self.set_state(PipelineState::Idle);
        Err(error)
    }

    pub(crate) fn reset_run(&mut self) {
        self.cancel = CancellationToken::new();
        self.groups.clear();
        self.selected.clear();
        self.diff = WordDiff::default();
        self.rows.clear();
    }
}
