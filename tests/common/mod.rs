//! Common test utilities for vocab-sync integration tests

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use vocab_sync::config::{EudictEndpoints, QueryApiConfig, RetryConfig, SyncConfig};
use vocab_sync::{Config, Error, NoteStore, Result};
use wiremock::MockServer;

/// Deck every integration test syncs into
pub const DECK: &str = "English";

/// Note store keeping decks in memory
#[derive(Default)]
pub struct MemoryStore {
    words: Mutex<HashSet<String>>,
    notes: Mutex<Vec<BTreeMap<String, String>>>,
    deleted: Mutex<Vec<String>>,
}

impl MemoryStore {
    /// Store whose deck already holds `words`
    pub fn with_words(words: &[&str]) -> Self {
        let store = Self::default();
        store
            .words
            .lock()
            .unwrap()
            .extend(words.iter().map(|w| w.to_string()));
        store
    }

    /// Field maps of the notes created so far
    pub fn notes(&self) -> Vec<BTreeMap<String, String>> {
        self.notes.lock().unwrap().clone()
    }

    /// Terms removed through `delete_notes`
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    /// Terms currently in the deck
    pub fn words(&self) -> HashSet<String> {
        self.words.lock().unwrap().clone()
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn words_in_deck(&self, deck: &str) -> Result<HashSet<String>> {
        if deck != DECK {
            return Err(Error::Store(format!("no deck named {deck}")));
        }
        Ok(self.words())
    }

    async fn create_note(&self, _deck: &str, fields: BTreeMap<String, String>) -> Result<()> {
        if let Some(term) = fields.get("term") {
            self.words.lock().unwrap().insert(term.clone());
        }
        self.notes.lock().unwrap().push(fields);
        Ok(())
    }

    async fn delete_notes(&self, terms: &[String], _deck: &str) -> Result<usize> {
        let mut words = self.words.lock().unwrap();
        let removed = terms.iter().filter(|term| words.remove(*term)).count();
        self.deleted.lock().unwrap().extend(terms.iter().cloned());
        Ok(removed)
    }

    async fn list_decks(&self) -> Result<Vec<String>> {
        Ok(vec![DECK.to_string()])
    }
}

/// Configuration pointing every service at `server`, writing audio into `media_dir`
pub fn config_for(server: &MockServer, media_dir: &Path) -> Config {
    let base = server.uri();
    Config {
        eudict: EudictEndpoints {
            study_list_url: format!("{base}/studylist"),
            words_data_url: format!("{base}/StudyList/WordsDataSource"),
            login_url: format!("{base}/account/login"),
            page_size: 100,
        },
        query: QueryApiConfig {
            dict_url: format!("{base}/dicts/en/"),
            speech_url: format!("{base}/speech?"),
        },
        retry: RetryConfig {
            max_attempts: 1,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: false,
        },
        sync: SyncConfig {
            deck: DECK.to_string(),
            media_dir: media_dir.to_path_buf(),
            ..SyncConfig::default()
        },
        ..Config::default()
    }
}
