//! Full-text search over artist names, album titles and track titles.

mod fts5_search;

pub use fts5_search::Fts5SearchVault;

use crate::library::EntityKind;
use serde::Serialize;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub kind: EntityKind,
    pub entity_id: String,
    pub matched_text: String,
}

pub trait SearchVault: Send + Sync {
    /// Returns `None` when the query cannot be parsed by the backend, as
    /// distinct from `Some(vec![])` for a valid query with no matches.
    fn search(
        &self,
        query: &str,
        max_results: usize,
        filter: Option<EntityKind>,
    ) -> Option<Vec<SearchResult>>;

    /// Rebuilds the whole index from the library feed.
    fn rebuild_index(&self, entries: &[crate::library::SearchEntry]) -> anyhow::Result<()>;
}

/// A no-op search vault that returns empty results.
/// Used for fast startup when search is not needed.
pub struct NoopSearchVault;

impl SearchVault for NoopSearchVault {
    fn search(
        &self,
        _query: &str,
        _max_results: usize,
        _filter: Option<EntityKind>,
    ) -> Option<Vec<SearchResult>> {
        Some(Vec::new())
    }

    fn rebuild_index(&self, _entries: &[crate::library::SearchEntry]) -> anyhow::Result<()> {
        Ok(())
    }
}

pub const PARTIAL_SEARCH_MAX_RESULTS: usize = 25;
const MIN_PARTIAL_QUERY_GRAPHEMES: usize = 3;

/// Autocomplete search for one entity kind. Queries shorter than three
/// graphemes return nothing; unless the query ends in whitespace a wildcard
/// suffix is appended so the last term matches as a prefix.
pub fn partial_entity_search(
    vault: &dyn SearchVault,
    query: &str,
    kind: EntityKind,
) -> Vec<SearchResult> {
    if query.is_empty() || query.graphemes(true).count() < MIN_PARTIAL_QUERY_GRAPHEMES {
        return Vec::new();
    }
    let effective_query = if query.ends_with(char::is_whitespace) {
        query.trim_end().to_string()
    } else {
        format!("{}*", query)
    };
    vault
        .search(&effective_query, PARTIAL_SEARCH_MAX_RESULTS, Some(kind))
        .unwrap_or_default()
}

/// Landing-page search across all kinds. Terms shorter than two characters
/// are dropped; when nothing usable survives the query is invalid and `None`
/// is returned, distinct from `Some(vec![])` for no matches.
pub fn music_search(
    vault: &dyn SearchVault,
    query: &str,
    max_results: usize,
) -> Option<Vec<SearchResult>> {
    let terms: Vec<&str> = query
        .split_whitespace()
        .filter(|term| term.trim_matches('*').len() >= 2)
        .collect();
    if terms.is_empty() {
        return None;
    }
    vault.search(&terms.join(" "), max_results, None)
}
