//! Read-only retrieval: text search, relationship traversal, tag lookup.

use crate::store::Store;
use crate::types::Entry;
use eyre::Result;

/// Extension trait adding retrieval methods to Store.
///
/// None of these mutate the store.
pub trait StoreQueryExt {
    /// Entries whose title or content contains `term`, newest first.
    ///
    /// Matching is case-insensitive for ASCII letters; an empty term matches
    /// every entry.
    fn search(&self, term: &str) -> Result<Vec<Entry>>;

    /// Entries one outgoing edge away from `entry_id`, with the edge type,
    /// in the order the edges were created.
    fn related_entries(&self, entry_id: &str) -> Result<Vec<(Entry, String)>>;

    /// Entries carrying `tag`, newest first.
    fn tagged(&self, tag: &str) -> Result<Vec<Entry>>;
}

impl StoreQueryExt for Store {
    fn search(&self, term: &str) -> Result<Vec<Entry>> {
        self.storage().search_entries(term)
    }

    fn related_entries(&self, entry_id: &str) -> Result<Vec<(Entry, String)>> {
        self.storage().related_entries(entry_id)
    }

    fn tagged(&self, tag: &str) -> Result<Vec<Entry>> {
        self.storage().entries_tagged(tag)
    }
}
