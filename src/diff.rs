//! Remote vs local word set difference.

use std::collections::HashSet;

use crate::types::WordDiff;

/// `new_words = remote − local`, `stale_words = local − remote`
///
/// Pure; the two outputs are disjoint by construction. Both empty means the
/// deck is already in sync.
pub fn diff(remote: &HashSet<String>, local: &HashSet<String>) -> WordDiff {
    WordDiff {
        new_words: remote.difference(local).cloned().collect(),
        stale_words: local.difference(remote).cloned().collect(),
    }
}
