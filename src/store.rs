//! Collaborators supplied by the embedding application.
//!
//! The pipeline never touches a note database or a browser itself. It talks to
//! them through these traits, and only from the coordinator, never from inside
//! a concurrent stage.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;

use crate::error::Result;
use crate::types::SessionToken;

/// Local note storage (a flashcard collection)
///
/// Implementations report failures as [`Error::Store`](crate::Error::Store).
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Terms already present in `deck`
    async fn words_in_deck(&self, deck: &str) -> Result<HashSet<String>>;

    /// Create one note in `deck` from a field map
    async fn create_note(&self, deck: &str, fields: BTreeMap<String, String>) -> Result<()>;

    /// Delete the notes of `terms` from `deck`; returns how many were removed
    async fn delete_notes(&self, terms: &[String], deck: &str) -> Result<usize>;

    /// Available deck names
    async fn list_decks(&self) -> Result<Vec<String>>;
}

/// Checks the cookies and page content captured during a login flow
pub type LoginPredicate = dyn Fn(&SessionToken, &str) -> bool + Send + Sync;

/// Interactive login (a browser window, a stored credential helper)
#[async_trait]
pub trait LoginProvider: Send + Sync {
    /// Run a login at `service_url` until `succeeded` accepts the captured state
    async fn login(&self, service_url: &str, succeeded: &LoginPredicate) -> Result<SessionToken>;
}
