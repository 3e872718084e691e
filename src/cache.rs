use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use log::{debug, warn};
use tokio::sync::Mutex as FetchLock;

use crate::{
    api::{ApiError, PostsApi},
    model::PostWithAuthor,
};

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum QueryKey {
    PostsGetAll,
}

impl QueryKey {
    pub const fn path(&self) -> &'static str {
        match self {
            QueryKey::PostsGetAll => "posts.getAll",
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// What a reader of a query sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryState {
    /// Nothing loaded yet.
    Loading,
    /// The fetch settled without data.
    Failed(String),
    Ready(Arc<Vec<PostWithAuthor>>),
}

#[derive(Debug, Default)]
struct Entry {
    data: Option<Arc<Vec<PostWithAuthor>>>,
    error: Option<String>,
    stale: bool,
    fetching: bool,
    generation: u64,
    lock: Arc<FetchLock<()>>,
}

impl Entry {
    fn needs_fetch(&self) -> bool {
        self.stale || (self.data.is_none() && self.error.is_none())
    }

    fn state(&self) -> QueryState {
        match (&self.data, &self.error) {
            (Some(data), _) => QueryState::Ready(data.clone()),
            (None, Some(error)) if !self.fetching => QueryState::Failed(error.clone()),
            _ => QueryState::Loading,
        }
    }

    /// Store a fetch result. Returns true when the entry was invalidated
    /// while the fetch was in flight.
    fn settle(
        &mut self,
        key: QueryKey,
        generation: u64,
        result: Result<Vec<PostWithAuthor>, ApiError>,
    ) -> bool {
        self.fetching = false;
        match result {
            Ok(data) => {
                debug!("{} loaded {} items", key, data.len());
                self.data = Some(Arc::new(data));
                self.error = None;
            }
            Err(e) => {
                warn!("{} failed: {}", key, e);
                self.error = Some(e.to_string());
            }
        }
        self.stale = self.generation != generation;
        self.stale
    }
}

/// Query cache shared by the page's components. Components never write to it
/// directly; they read, and invalidate after a confirmed write.
pub struct QueryCache<A: PostsApi> {
    api: Arc<A>,
    entries: Mutex<HashMap<QueryKey, Entry>>,
}

impl<A: PostsApi> QueryCache<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn with_entry<T>(&self, key: QueryKey, f: impl FnOnce(&mut Entry) -> T) -> T {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        f(entries.entry(key).or_default())
    }

    /// Snapshot for rendering, never fetches.
    pub fn state(&self, key: QueryKey) -> QueryState {
        self.with_entry(key, |entry| entry.state())
    }

    /// Mark the cached value stale so the next read goes to the server.
    pub fn invalidate(&self, key: QueryKey) {
        self.with_entry(key, |entry| {
            entry.generation += 1;
            entry.stale = true;
        });
        debug!("{} invalidated", key);
    }

    /// Return the cached value when fresh, fetching it otherwise. Concurrent
    /// readers of one key share a single fetch.
    pub async fn read(&self, key: QueryKey) -> QueryState {
        let lock = self.with_entry(key, |entry| entry.lock.clone());
        let _guard = lock.lock().await;

        loop {
            let generation = self.with_entry(key, |entry| {
                if !entry.needs_fetch() {
                    return None;
                }
                entry.fetching = true;
                Some(entry.generation)
            });
            let Some(generation) = generation else {
                break;
            };

            debug!("Fetching {}", key);
            let result = self.fetch(key).await;
            let superseded = self.with_entry(key, |entry| entry.settle(key, generation, result));
            if !superseded {
                break;
            }
            debug!("{} invalidated while fetching, fetching again", key);
        }

        self.state(key)
    }

    async fn fetch(&self, key: QueryKey) -> Result<Vec<PostWithAuthor>, ApiError> {
        match key {
            QueryKey::PostsGetAll => self.api.get_all().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{fixtures::post_with_author, FakeApi};

    fn cache_with(api: FakeApi) -> (Arc<FakeApi>, QueryCache<FakeApi>) {
        let api = Arc::new(api);
        (api.clone(), QueryCache::new(api))
    }

    #[tokio::test]
    async fn read_fetches_once_until_invalidated() {
        let (api, cache) = cache_with(FakeApi::with_posts(vec![post_with_author("a", "ferris", "hi")]));
        assert_eq!(cache.state(QueryKey::PostsGetAll), QueryState::Loading);

        let first = cache.read(QueryKey::PostsGetAll).await;
        let second = cache.read(QueryKey::PostsGetAll).await;
        assert_eq!(first, second);
        assert_eq!(api.get_calls(), 1);

        cache.invalidate(QueryKey::PostsGetAll);
        cache.read(QueryKey::PostsGetAll).await;
        assert_eq!(api.get_calls(), 2);
    }

    #[tokio::test]
    async fn concurrent_reads_share_fetch() {
        let (api, cache) = cache_with(FakeApi::default().gated());
        let cache = Arc::new(cache);

        let a = tokio::spawn({
            let cache = cache.clone();
            async move { cache.read(QueryKey::PostsGetAll).await }
        });
        let b = tokio::spawn({
            let cache = cache.clone();
            async move { cache.read(QueryKey::PostsGetAll).await }
        });
        tokio::task::yield_now().await;
        api.release(1);

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert_eq!(a, b);
        assert_eq!(api.get_calls(), 1);
    }

    #[tokio::test]
    async fn failure_is_not_retried_until_invalidated() {
        let (api, cache) = cache_with(FakeApi::default());
        api.fail_reads(true);

        let state = cache.read(QueryKey::PostsGetAll).await;
        assert!(matches!(state, QueryState::Failed(_)));
        cache.read(QueryKey::PostsGetAll).await;
        assert_eq!(api.get_calls(), 1);

        api.fail_reads(false);
        cache.invalidate(QueryKey::PostsGetAll);
        let state = cache.read(QueryKey::PostsGetAll).await;
        assert_eq!(state, QueryState::Ready(Arc::new(vec![])));
    }

    #[tokio::test]
    async fn failed_refetch_keeps_loaded_data() {
        let (api, cache) = cache_with(FakeApi::with_posts(vec![post_with_author("a", "ferris", "hi")]));
        cache.read(QueryKey::PostsGetAll).await;

        api.fail_reads(true);
        cache.invalidate(QueryKey::PostsGetAll);
        let state = cache.read(QueryKey::PostsGetAll).await;
        let QueryState::Ready(posts) = state else {
            panic!("expected data, got {:?}", state);
        };
        assert_eq!(posts.len(), 1);
    }

    #[tokio::test]
    async fn invalidation_during_fetch_refetches() {
        let (api, cache) = cache_with(FakeApi::default().gated());
        let cache = Arc::new(cache);

        let reader = tokio::spawn({
            let cache = cache.clone();
            async move { cache.read(QueryKey::PostsGetAll).await }
        });
        tokio::task::yield_now().await;
        assert_eq!(cache.state(QueryKey::PostsGetAll), QueryState::Loading);
        assert_eq!(api.get_calls(), 1);

        api.push(post_with_author("late", "ferris", "arrived mid-flight"));
        cache.invalidate(QueryKey::PostsGetAll);
        api.release(2);

        let QueryState::Ready(posts) = reader.await.unwrap() else {
            panic!("expected data");
        };
        assert_eq!(api.get_calls(), 2);
        assert_eq!(posts[0].id(), "late");
    }
}
