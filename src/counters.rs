//! Best-effort popularity counters for search terms.
//!
//! Nothing here returns an error to the caller: counting is a side effect and a
//! failing store must not break search.

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::appwrite::{CounterDocument, DocumentStore, NewCounter, Query};
use crate::tmdb::Movie;

pub const DEFAULT_TOP_LIMIT: usize = 5;
const SEARCH_TERM_ATTR: &str = "searchTerm";
const COUNT_ATTR: &str = "count";
const UPDATED_AT_ATTR: &str = "$updatedAt";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchCounter {
    pub search_term: String,
    pub count: i64,
    pub movie_id: Option<i64>,
    pub poster_url: Option<String>,
}

impl From<CounterDocument> for SearchCounter {
    fn from(doc: CounterDocument) -> Self {
        Self {
            search_term: doc.search_term,
            count: doc.count,
            movie_id: doc.movie_id,
            poster_url: doc.poster_url,
        }
    }
}

#[derive(Clone)]
pub struct SearchCounters {
    store: Option<Arc<dyn DocumentStore>>,
}

impl SearchCounters {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store: Some(store) }
    }

    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Increments the counter for `term`, or creates it from `movie` on first use.
    ///
    /// The lookup and the write are separate calls, so two identical searches at
    /// the same moment can both read the same count and one increment is lost.
    pub async fn record_search(&self, term: &str, movie: &Movie) {
        let Some(store) = &self.store else {
            debug!("Search counting disabled, skipping '{}'", term);
            return;
        };
        if let Err(e) = upsert(store.as_ref(), term, movie).await {
            warn!("Failed to record search '{}': {:#}", term, e);
        }
    }

    /// Up to `limit` counters, highest count first. Equal counts go to the most
    /// recently searched term. Empty on any failure.
    pub async fn top_searches(&self, limit: usize) -> Vec<SearchCounter> {
        let Some(store) = &self.store else {
            debug!("Search counting disabled, no top searches");
            return Vec::new();
        };
        let queries = [
            Query::Limit(limit),
            Query::OrderDesc(COUNT_ATTR.to_string()),
            Query::OrderDesc(UPDATED_AT_ATTR.to_string()),
        ];
        match store.list_documents(&queries).await {
            Ok(mut docs) => {
                docs.sort_by(|a, b| {
                    b.count
                        .cmp(&a.count)
                        .then_with(|| b.updated_at.cmp(&a.updated_at))
                });
                docs.into_iter()
                    .take(limit)
                    .map(SearchCounter::from)
                    .collect()
            }
            Err(e) => {
                warn!("Failed to load top searches: {:#}", e);
                Vec::new()
            }
        }
    }
}

async fn upsert(store: &dyn DocumentStore, term: &str, movie: &Movie) -> Result<()> {
    let existing = store
        .list_documents(&[Query::equal(SEARCH_TERM_ATTR, term)])
        .await?;

    match existing.into_iter().next() {
        Some(doc) => {
            let count = doc.count + 1;
            store.update_count(&doc.id, count).await?;
            debug!("Search '{}' now counted {} times", term, count);
        }
        None => {
            let data = NewCounter {
                search_term: term.to_string(),
                count: 1,
                movie_id: movie.id,
                poster_url: movie.poster_url(),
            };
            store.create_document(&data).await?;
            info!("Started counting search '{}'", term);
        }
    }
    Ok(())
}
