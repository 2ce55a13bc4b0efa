//! Result store keyed by analysis identifier.

use std::{any::Any, sync::Arc};

use crossbeam_skiplist::SkipMap;

use crate::{Error, Result};

type StoredResult = Arc<dyn Any + Send + Sync>;

/// Concurrent map from analysis identifier to its published result.
///
/// Results are type-erased on insertion and downcast on lookup; asking for an identifier
/// with the wrong type is an error rather than a silent miss.
#[derive(Default)]
pub struct ResultStore {
    results: SkipMap<String, StoredResult>,
}

impl ResultStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `value` under `id`, replacing any previous result.
    pub fn insert<T: Any + Send + Sync>(&self, id: impl Into<String>, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.insert_arc(id, Arc::clone(&value));
        value
    }

    /// Publishes an already shared value under `id`.
    pub fn insert_arc<T: Any + Send + Sync>(&self, id: impl Into<String>, value: Arc<T>) {
        self.results.insert(id.into(), value as StoredResult);
    }

    /// The result published under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResultType`] if a result exists but is not a `T`.
    pub fn get<T: Any + Send + Sync>(&self, id: &str) -> Result<Option<Arc<T>>> {
        let Some(entry) = self.results.get(id) else {
            return Ok(None);
        };
        Arc::clone(entry.value())
            .downcast::<T>()
            .map(Some)
            .map_err(|_| Error::ResultType(id.to_string()))
    }

    /// Returns `true` if a result is published under `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.results.contains_key(id)
    }

    /// Drops the result published under `id`. Returns `true` if there was one.
    pub fn remove(&self, id: &str) -> bool {
        self.results.remove(id).is_some()
    }

    /// Published identifiers in lexicographic order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.results.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of published results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns `true` if nothing has been published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl std::fmt::Debug for ResultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultStore")
            .field("ids", &self.ids())
            .finish()
    }
}
