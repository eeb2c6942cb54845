//! Configuration types for vocab-sync

use crate::error::{Error, Result};
use crate::types::Accent;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Main configuration for a [`SyncPipeline`](crate::SyncPipeline)
///
/// Every field has a default, so `Config::default()` talks to the public
/// services with conservative limits. Only [`SyncConfig::deck`] must be set
/// before a run can start.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Which remote word-list service to synchronize from
    #[serde(default)]
    pub dictionary: DictionaryKind,

    /// Endpoints of the Eudict word-list service
    #[serde(default)]
    pub eudict: EudictEndpoints,

    /// Endpoints of the Youdao word-list service
    #[serde(default)]
    pub youdao: YoudaoEndpoints,

    /// Enrichment (word detail) service
    #[serde(default)]
    pub query: QueryApiConfig,

    /// Shared HTTP transport settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Retry configuration for transient failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Worker pool sizes for the concurrent stages
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    /// Target deck, media directory and note field selection
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Config {
    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.sync.deck.trim().is_empty() {
            return Err(Error::config("no deck selected", "sync.deck"));
        }
        if self.concurrency.query_workers == 0 {
            return Err(Error::config(
                "query worker pool must not be empty",
                "concurrency.query_workers",
            ));
        }
        if self.concurrency.download_workers == 0 {
            return Err(Error::config(
                "download worker pool must not be empty",
                "concurrency.download_workers",
            ));
        }
        if self.http.pool_size == 0 {
            return Err(Error::config(
                "connection pool must not be empty",
                "http.pool_size",
            ));
        }
        if self.eudict.page_size == 0 || self.youdao.page_size == 0 {
            return Err(Error::config("page size must be positive", "page_size"));
        }
        Ok(())
    }
}

/// Remote word-list service
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DictionaryKind {
    /// Eudict study lists (default)
    #[default]
    Eudict,
    /// Youdao word books
    Youdao,
}

/// Eudict word-list endpoints
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EudictEndpoints {
    /// Authenticated landing page listing the study-list categories
    #[serde(default = "default_eudict_study_list_url")]
    pub study_list_url: String,

    /// DataTables-style JSON source for the words of a category
    #[serde(default = "default_eudict_words_url")]
    pub words_data_url: String,

    /// Login page; being redirected here means the session is invalid
    #[serde(default = "default_eudict_login_url")]
    pub login_url: String,

    /// Records per page (default: 100)
    #[serde(default = "default_eudict_page_size")]
    pub page_size: u32,
}

impl Default for EudictEndpoints {
    fn default() -> Self {
        Self {
            study_list_url: default_eudict_study_list_url(),
            words_data_url: default_eudict_words_url(),
            login_url: default_eudict_login_url(),
            page_size: default_eudict_page_size(),
        }
    }
}

/// Youdao word-book endpoints
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct YoudaoEndpoints {
    /// Account info endpoint answering `{"code": 0}` for a live session
    #[serde(default = "default_youdao_account_url")]
    pub account_info_url: String,

    /// Word-book listing
    #[serde(default = "default_youdao_books_url")]
    pub books_url: String,

    /// Paged words of one book
    #[serde(default = "default_youdao_words_url")]
    pub words_url: String,

    /// Login page handed to the login collaborator
    #[serde(default = "default_youdao_login_url")]
    pub login_url: String,

    /// Words per page (default: 15, the web UI page size)
    #[serde(default = "default_youdao_page_size")]
    pub page_size: u32,
}

impl Default for YoudaoEndpoints {
    fn default() -> Self {
        Self {
            account_info_url: default_youdao_account_url(),
            books_url: default_youdao_books_url(),
            words_url: default_youdao_words_url(),
            login_url: default_youdao_login_url(),
            page_size: default_youdao_page_size(),
        }
    }
}

/// Enrichment service configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryApiConfig {
    /// Detail page prefix; the URL-encoded term is appended
    #[serde(default = "default_dict_url")]
    pub dict_url: String,

    /// Prefix for relative pronunciation references found in detail pages
    #[serde(default = "default_speech_url")]
    pub speech_url: String,
}

impl Default for QueryApiConfig {
    fn default() -> Self {
        Self {
            dict_url: default_dict_url(),
            speech_url: default_speech_url(),
        }
    }
}

/// HTTP transport configuration shared by every stage
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout (default: 10 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Accept-Language header (default: "zh-TW")
    #[serde(default = "default_accept_language")]
    pub accept_language: Option<String>,

    /// Idle connections kept per host (default: 8)
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Status codes treated as transient and retried
    #[serde(default = "default_transient_statuses")]
    pub transient_statuses: Vec<u16>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            pool_size: default_pool_size(),
            transient_statuses: default_transient_statuses(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Worker pool sizes
///
/// Both pools are fixed-size and independent of input size so the number of
/// outbound connections stays capped.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Concurrent word detail queries (default: 8)
    #[serde(default = "default_workers")]
    pub query_workers: usize,

    /// Concurrent audio downloads (default: 8)
    #[serde(default = "default_workers")]
    pub download_workers: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            query_workers: default_workers(),
            download_workers: default_workers(),
        }
    }
}

/// Local side of the synchronization
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Deck receiving the notes (required)
    #[serde(default)]
    pub deck: String,

    /// Directory audio files are written to (the store's media folder)
    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,

    /// Group names selected on the previous run
    #[serde(default)]
    pub selected_groups: Vec<String>,

    /// Which enrichment fields are written into notes
    #[serde(default)]
    pub fields: NoteFieldOptions,

    /// Which pronunciations are attached and downloaded
    #[serde(default)]
    pub pronunciation: PronunciationChoice,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            deck: String::new(),
            media_dir: default_media_dir(),
            selected_groups: vec![],
            fields: NoteFieldOptions::default(),
            pronunciation: PronunciationChoice::default(),
        }
    }
}

/// Per-field switches for note content
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NoteFieldOptions {
    /// Definition senses (default: true)
    #[serde(default = "default_true")]
    pub definition: bool,
    /// Example sentences with translations (default: true)
    #[serde(default = "default_true")]
    pub sentence: bool,
    /// Phrases with explanations (default: true)
    #[serde(default = "default_true")]
    pub phrase: bool,
    /// Illustration (default: true)
    #[serde(default = "default_true")]
    pub image: bool,
    /// British phonetic transcription (default: true)
    #[serde(default = "default_true")]
    pub br_phonetic: bool,
    /// American phonetic transcription (default: true)
    #[serde(default = "default_true")]
    pub am_phonetic: bool,
}

impl Default for NoteFieldOptions {
    fn default() -> Self {
        Self {
            definition: true,
            sentence: true,
            phrase: true,
            image: true,
            br_phonetic: true,
            am_phonetic: true,
        }
    }
}

/// Pronunciation selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PronunciationChoice {
    /// British audio only
    British,
    /// American audio only
    American,
    /// Both accents (default)
    #[default]
    Both,
    /// No audio
    None,
}

impl PronunciationChoice {
    /// Whether audio for `accent` is attached under this choice
    pub fn includes(&self, accent: Accent) -> bool {
        match self {
            PronunciationChoice::British => accent == Accent::British,
            PronunciationChoice::American => accent == Accent::American,
            PronunciationChoice::Both => true,
            PronunciationChoice::None => false,
        }
    }
}

fn default_eudict_study_list_url() -> String {
    "https://my.eudic.net/studylist".to_string()
}

fn default_eudict_words_url() -> String {
    "https://my.eudic.net/StudyList/WordsDataSource".to_string()
}

fn default_eudict_login_url() -> String {
    "https://dict.eudic.net/account/login".to_string()
}

fn default_eudict_page_size() -> u32 {
    100
}

fn default_youdao_account_url() -> String {
    "http://dict.youdao.com/login/acc/query/accountinfo".to_string()
}

fn default_youdao_books_url() -> String {
    "http://dict.youdao.com/wordbook/webapi/books".to_string()
}

fn default_youdao_words_url() -> String {
    "http://dict.youdao.com/wordbook/webapi/words".to_string()
}

fn default_youdao_login_url() -> String {
    "http://account.youdao.com/login?service=dict&back_url=http://dict.youdao.com/wordbook/wordlist%3Fkeyfrom%3Dnull".to_string()
}

fn default_youdao_page_size() -> u32 {
    15
}

fn default_dict_url() -> String {
    "https://dict.eudic.net/dicts/en/".to_string()
}

fn default_speech_url() -> String {
    "https://api.frdic.com/api/v2/speech/speakweb?".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_13_6) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/69.0.3497.100 Safari/537.36".to_string()
}

fn default_accept_language() -> Option<String> {
    Some("zh-TW".to_string())
}

fn default_pool_size() -> usize {
    8
}

fn default_transient_statuses() -> Vec<u16> {
    vec![500, 502, 503, 504]
}

fn default_workers() -> usize {
    8
}

fn default_media_dir() -> PathBuf {
    PathBuf::from("./media")
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
