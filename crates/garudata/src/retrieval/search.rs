//! Keyword search across every stored collection

use rayon::prelude::*;
use std::sync::Arc;

use crate::config::SearchConfig;
use crate::storage::CollectionStore;
use crate::types::{Collection, Record, SearchHit, Value};

/// Result of a keyword search
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// At least one record matched, in collection-then-record order
    Matches(Vec<SearchHit>),
    /// Nothing matched
    NoResults,
}

impl SearchOutcome {
    fn from_hits(hits: Vec<SearchHit>) -> Self {
        if hits.is_empty() {
            SearchOutcome::NoResults
        } else {
            SearchOutcome::Matches(hits)
        }
    }

    pub fn hits(&self) -> &[SearchHit] {
        match self {
            SearchOutcome::Matches(hits) => hits,
            SearchOutcome::NoResults => &[],
        }
    }

    pub fn into_hits(self) -> Vec<SearchHit> {
        match self {
            SearchOutcome::Matches(hits) => hits,
            SearchOutcome::NoResults => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.hits().len()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, SearchOutcome::NoResults)
    }
}

/// Case-insensitive substring search over record values
pub struct SearchEngine {
    store: Arc<CollectionStore>,
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(store: Arc<CollectionStore>, config: SearchConfig) -> Self {
        Self { store, config }
    }

    /// Every record with a field containing `keyword`
    ///
    /// An empty or whitespace-only keyword matches every record.
    pub fn search(&self, keyword: &str) -> SearchOutcome {
        self.search_limited(keyword, self.config.max_results)
    }

    /// Same as `search`, keeping at most `limit` hits
    pub fn search_limited(&self, keyword: &str, limit: Option<usize>) -> SearchOutcome {
        let snapshot = self.store.snapshot();
        let needle = keyword.to_lowercase();
        let match_all = needle.trim().is_empty();

        // Collections scan in parallel; collect keeps snapshot order
        let per_collection: Vec<Vec<SearchHit>> = snapshot
            .par_iter()
            .map(|collection| self.scan(collection, &needle, match_all))
            .collect();

        let mut hits: Vec<SearchHit> = per_collection.into_iter().flatten().collect();
        if let Some(limit) = limit {
            hits.truncate(limit);
        }

        tracing::debug!(
            "Search '{}' over {} collections: {} hits",
            keyword,
            snapshot.len(),
            hits.len()
        );

        SearchOutcome::from_hits(hits)
    }

    fn scan(&self, collection: &Collection, needle: &str, match_all: bool) -> Vec<SearchHit> {
        collection
            .records()
            .iter()
            .filter(|record| match_all || self.record_matches(record, needle))
            .map(|record| SearchHit {
                collection: collection.name().to_string(),
                record: record.clone(),
            })
            .collect()
    }

    /// Stops at the first matching field
    fn record_matches(&self, record: &Record, needle: &str) -> bool {
        record.values().any(|value| self.value_matches(value, needle))
    }

    fn value_matches(&self, value: &Value, needle: &str) -> bool {
        match value {
            Value::Null if !self.config.match_null => false,
            Value::String(s) => s.to_lowercase().contains(needle),
            other => other.to_text().to_lowercase().contains(needle),
        }
    }
}
