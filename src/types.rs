//! Core types for vocab-sync

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::error::Result;

/// Authenticated session state for a remote word-list service (a cookie jar)
///
/// Owned by the caller. The pipeline reads it to authenticate requests and
/// only replaces it after a fresh login.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(BTreeMap<String, String>);

impl SessionToken {
    /// Create an empty token
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the `{"name": "value"}` object a user pastes or a login dialog stores
    ///
    /// Blank input yields an empty token, which no service accepts.
    pub fn from_json(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let cookies: BTreeMap<String, serde_json::Value> = serde_json::from_str(raw)?;
        Ok(Self(
            cookies
                .into_iter()
                .map(|(name, value)| {
                    let value = match value {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (name, value)
                })
                .collect(),
        ))
    }

    /// Add or replace a cookie
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Whether a cookie with this name is present
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Whether the token holds no cookies
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as a `Cookie` request header value
    pub fn cookie_header(&self) -> Option<String> {
        if self.0.is_empty() {
            return None;
        }
        Some(
            self.0
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SessionToken {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// Cookie values are credentials; only names are printed.
impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.0.keys().map(|name| (name, "***")))
            .finish()
    }
}

/// A remote word group ("word list" / "word book")
///
/// Identity is `id`, which is passed back verbatim on fetch calls.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Group {
    /// Display name
    pub name: String,
    /// Service-specific opaque identifier
    pub id: String,
}

impl Group {
    /// Create a group
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

/// Authenticated page returned by session validation, reused for group discovery
#[derive(Clone, Debug)]
pub enum LandingDocument {
    /// HTML landing page
    Html(String),
    /// JSON listing
    Json(serde_json::Value),
}

/// Outcome of validating a session token
#[derive(Clone, Debug)]
pub enum SessionStatus {
    /// Session accepted; carries the landing document for group discovery
    Valid(LandingDocument),
    /// Session rejected; fresh credentials are needed
    Invalid,
}

impl SessionStatus {
    /// Whether the session was accepted
    pub fn is_valid(&self) -> bool {
        matches!(self, SessionStatus::Valid(_))
    }
}

/// Remote vs local difference, computed once per sync cycle
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordDiff {
    /// Terms present remotely but not locally
    pub new_words: BTreeSet<String>,
    /// Terms present locally but no longer remotely
    pub stale_words: BTreeSet<String>,
}

impl WordDiff {
    /// Nothing to add and nothing to delete
    pub fn is_empty(&self) -> bool {
        self.new_words.is_empty() && self.stale_words.is_empty()
    }
}

/// Pronunciation accent
///
/// The detail page lists phonetic/audio pairs without labels; the first pair
/// is British and the second American.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accent {
    /// First pair on the page
    British,
    /// Second pair on the page
    American,
}

impl Accent {
    /// Both accents in page order
    pub const ALL: [Accent; 2] = [Accent::British, Accent::American];

    /// Position of this accent's pair in the page markup
    pub fn position(&self) -> usize {
        match self {
            Accent::British => 0,
            Accent::American => 1,
        }
    }

    /// Note field name prefix ("BrE" / "AmE")
    pub fn field_prefix(&self) -> &'static str {
        match self {
            Accent::British => "BrE",
            Accent::American => "AmE",
        }
    }
}

/// Phonetic transcription and audio reference for one accent
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pronunciation {
    /// Phonetic transcription
    pub phonetic: Option<String>,
    /// Absolute audio URL
    pub audio_url: Option<String>,
}

/// A text with its translation or explanation (example sentence, phrase)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gloss {
    /// Source text (sentences keep their inline markup)
    pub text: String,
    /// Translation or explanation
    pub gloss: String,
}

impl Gloss {
    /// Create a gloss pair
    pub fn new(text: impl Into<String>, gloss: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            gloss: gloss.into(),
        }
    }
}

/// Structured lexical data for one term
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    /// The queried term
    pub term: String,
    /// Definition senses
    pub definitions: Vec<String>,
    /// Example sentences with translations
    pub sentences: Vec<Gloss>,
    /// Phrases with explanations
    pub phrases: Vec<Gloss>,
    /// Illustration URL
    pub image: Option<String>,
    /// First phonetic/audio pair on the page
    pub british: Pronunciation,
    /// Second phonetic/audio pair on the page
    pub american: Pronunciation,
}

impl EnrichmentResult {
    /// Empty result for a term
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            ..Default::default()
        }
    }

    /// Pronunciation for an accent
    pub fn pronunciation(&self, accent: Accent) -> &Pronunciation {
        match accent {
            Accent::British => &self.british,
            Accent::American => &self.american,
        }
    }

    /// Mutable pronunciation for an accent
    pub fn pronunciation_mut(&mut self, accent: Accent) -> &mut Pronunciation {
        match accent {
            Accent::British => &mut self.british,
            Accent::American => &mut self.american,
        }
    }
}

/// One completed query, correlated to its row because completions arrive out of order
///
/// `result == None` means the query failed or the term has no content; the two
/// cases are not distinguished.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOutcome {
    /// Position of the term in the new-word list
    pub row: usize,
    /// The queried term
    pub term: String,
    /// Enrichment data, absent on failure
    pub result: Option<EnrichmentResult>,
}

impl QueryOutcome {
    /// Whether the query produced a result
    pub fn is_success(&self) -> bool {
        self.result.is_some()
    }
}

/// One pronunciation file to fetch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTask {
    /// Where the file is written
    pub destination: PathBuf,
    /// Where the file is fetched from
    pub source_url: String,
}

/// Stage-local progress; `completed` only grows within a stage
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Finished work items
    pub completed: u64,
    /// Work items in the stage
    pub total: u64,
}

/// Concurrent stage reporting progress
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Paging through remote groups
    Fetching,
    /// Querying word details
    Querying,
    /// Downloading pronunciation audio
    Downloading,
}

/// Coordinator state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// No run in progress
    #[default]
    Idle,
    /// Checking the session token
    ValidatingSession,
    /// Waiting for the caller to pick groups
    SelectingGroups,
    /// Paging through the selected groups
    Fetching,
    /// Comparing remote and local words
    Diffing,
    /// Waiting for the caller to start querying
    AwaitingConfirmation,
    /// Querying word details
    Querying,
    /// Waiting for the caller to sync (or retry failed rows)
    AwaitingSync,
    /// Writing notes and deleting stale words
    Syncing,
    /// Downloading pronunciation audio
    Downloading,
}

impl PipelineState {
    /// Lowercase name used in logs and errors
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::ValidatingSession => "validating_session",
            PipelineState::SelectingGroups => "selecting_groups",
            PipelineState::Fetching => "fetching",
            PipelineState::Diffing => "diffing",
            PipelineState::AwaitingConfirmation => "awaiting_confirmation",
            PipelineState::Querying => "querying",
            PipelineState::AwaitingSync => "awaiting_sync",
            PipelineState::Syncing => "syncing",
            PipelineState::Downloading => "downloading",
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a query run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySummary {
    /// Rows that now hold a result
    pub succeeded: usize,
    /// Rows still without a result (failed, empty, or never submitted)
    pub absent_rows: Vec<usize>,
}

/// Result of the audio stage
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioReport {
    /// Files written
    pub succeeded: usize,
    /// Tasks that failed or were never started
    pub failed: Vec<AudioTask>,
}

/// Result of the sync step
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Notes created
    pub added: usize,
    /// New words skipped because their query is absent or the run was cancelled
    pub skipped: Vec<String>,
    /// New words whose note the store refused
    pub failed: Vec<String>,
    /// Stale words deleted
    pub deleted: usize,
    /// Stale words kept because the store refused the deletion
    pub not_deleted: Vec<String>,
    /// Audio download results
    pub audio: AudioReport,
}

/// Event emitted while a pipeline runs
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Coordinator entered a new state
    StateChanged {
        /// New state
        state: PipelineState,
    },

    /// A work item of a concurrent stage finished
    Progress {
        /// Stage reporting
        stage: Stage,
        /// Counters after this item
        progress: Progress,
    },

    /// All pages of one group were fetched
    GroupFetched {
        /// Group name
        group: String,
        /// Distinct words in the group
        words: usize,
    },

    /// One term query completed (in completion order)
    RowQueried {
        /// Row-tagged outcome
        outcome: QueryOutcome,
    },

    /// One audio task finished
    AudioDownloaded {
        /// Destination file
        path: PathBuf,
        /// Whether the file was written
        success: bool,
    },

    /// Remote and local word sets already match
    NothingToSync,

    /// Sync step completed
    SyncFinished {
        /// What was written, deleted and downloaded
        report: SyncReport,
    },
}
