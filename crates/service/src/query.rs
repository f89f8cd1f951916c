//! Keyed, cached, deduplicated reads.
//!
//! A [`QueryCache`] holds one entry per [`QueryKey`]. Concurrent callers for
//! the same key share a single in-flight fetch. A successful result is reused
//! until the entry is older than the configured TTL; the default TTL is zero,
//! so every request that arrives after a fetch settles reads fresh data.
//! Failures are handed to every waiter and then evicted so the next caller
//! fetches again.

use meishi_database::DatastoreError;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

use crate::error::QueryError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    op: &'static str,
    id: Option<String>,
}

impl QueryKey {
    pub fn new(op: &'static str) -> Self {
        Self { op, id: None }
    }

    pub fn with_id(op: &'static str, id: impl Into<String>) -> Self {
        Self {
            op,
            id: Some(id.into()),
        }
    }
}

/// What a caller observes for a key.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    /// The query is disabled, or nothing has been requested yet.
    Idle,
    Loading,
    Ready(T),
    Failed(QueryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Extra attempts after the first failure. Not-found is never retried.
    pub retry: u32,
    /// How long a settled result is served to later callers.
    pub cache_ttl: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            retry: 1,
            cache_ttl: Duration::ZERO,
        }
    }
}

struct Entry<T> {
    cell: OnceCell<Result<T, QueryError>>,
    created: Instant,
}

pub struct QueryCache<T> {
    entries: Mutex<HashMap<QueryKey, Arc<Entry<T>>>>,
    options: QueryOptions,
}

impl<T: Clone> QueryCache<T> {
    pub fn new(options: QueryOptions) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            options,
        }
    }

    /// Fetches through the cache. `fetcher` may be called up to `retry + 1` times.
    pub async fn fetch<F, Fut>(&self, key: QueryKey, fetcher: F) -> QueryState<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, DatastoreError>>,
    {
        let entry = self.entry(&key);
        let result = entry
            .cell
            .get_or_init(|| self.run(&key, &fetcher))
            .await
            .clone();

        match result {
            Ok(value) => QueryState::Ready(value),
            Err(error) => {
                self.evict(&key, &entry);
                QueryState::Failed(error)
            }
        }
    }

    /// Like [`fetch`](Self::fetch), but disabled (returns [`QueryState::Idle`]
    /// without fetching) unless `id` is present and non-blank.
    pub async fn fetch_by_id<F, Fut>(
        &self,
        op: &'static str,
        id: Option<&str>,
        fetcher: F,
    ) -> QueryState<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, DatastoreError>>,
    {
        let id = match id.map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return QueryState::Idle,
        };

        let key = QueryKey::with_id(op, id.clone());
        self.fetch(key, || fetcher(id.clone())).await
    }

    /// Current state for `key` without triggering a fetch.
    pub fn peek(&self, key: &QueryKey) -> QueryState<T> {
        let entries = self.lock();
        match entries.get(key) {
            None => QueryState::Idle,
            Some(entry) => match entry.cell.get() {
                None => QueryState::Loading,
                Some(Ok(value)) => QueryState::Ready(value.clone()),
                Some(Err(error)) => QueryState::Failed(error.clone()),
            },
        }
    }

    pub fn invalidate(&self, key: &QueryKey) {
        self.lock().remove(key);
    }

    /// Drops any cached value for `key` and fetches it again.
    pub async fn refresh<F, Fut>(&self, key: QueryKey, fetcher: F) -> QueryState<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, DatastoreError>>,
    {
        self.invalidate(&key);
        self.fetch(key, fetcher).await
    }

    async fn run<F, Fut>(&self, key: &QueryKey, fetcher: &F) -> Result<T, QueryError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, DatastoreError>>,
    {
        let mut attempt = 0;
        loop {
            match fetcher().await {
                Ok(value) => return Ok(value),
                Err(DatastoreError::NotFound(id)) => return Err(QueryError::NotFound(id)),
                Err(error) if attempt < self.options.retry => {
                    attempt += 1;
                    tracing::warn!(op = key.op, id = ?key.id, attempt, error = %error, "Query failed, retrying");
                }
                Err(error) => {
                    tracing::error!(op = key.op, id = ?key.id, error = %error, "Query failed");
                    return Err(error.into());
                }
            }
        }
    }

    fn entry(&self, key: &QueryKey) -> Arc<Entry<T>> {
        let ttl = self.options.cache_ttl;
        let mut entries = self.lock();
        // settled entries past their TTL are dropped; in-flight ones stay
        entries.retain(|_, entry| !entry.cell.initialized() || entry.created.elapsed() < ttl);

        if let Some(entry) = entries.get(key) {
            return Arc::clone(entry);
        }

        let entry = Arc::new(Entry {
            cell: OnceCell::new(),
            created: Instant::now(),
        });
        entries.insert(key.clone(), Arc::clone(&entry));
        entry
    }

    fn evict(&self, key: &QueryKey, entry: &Arc<Entry<T>>) {
        let mut entries = self.lock();
        if entries
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, entry))
        {
            entries.remove(key);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Arc<Entry<T>>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
