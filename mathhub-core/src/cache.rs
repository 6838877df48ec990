//! Single-flight dataset cache.
//!
//! The cache memoizes the one-time asynchronous dataset load. The first
//! caller of [`DatasetCache::ensure_loaded`] starts the load; every
//! caller arriving while that load is in flight awaits the same shared
//! future, so the loader runs at most once per attempt. A failed
//! attempt delivers its error to all of that attempt's waiters, but
//! does not poison the cache: the next call starts a fresh attempt.
//!
//! State is held per instance, never in module-level globals, so
//! independent engines (and tests) never share load state.

use crate::dataset::DataSet;
use crate::error::LoadError;
use crate::loader::DatasetLoader;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::sync::Arc;
use tokio::sync::Mutex;

type SharedLoad = Shared<BoxFuture<'static, Result<Arc<DataSet>, LoadError>>>;

/// Load lifecycle of the cached dataset.
enum LoadState {
    /// No load attempted yet.
    Unloaded,
    /// A load is in flight; all waiters share this future.
    Loading(SharedLoad),
    /// The dataset is available; all callers receive this snapshot.
    Loaded(Arc<DataSet>),
    /// The last attempt failed. Kept for inspection; the next call
    /// starts a new attempt.
    Failed(LoadError),
}

/// Memoizes the one-time dataset load with single-flight semantics.
pub struct DatasetCache {
    loader: DatasetLoader,
    state: Mutex<LoadState>,
}

impl DatasetCache {
    /// Create an unloaded cache around the given loader.
    pub fn new(loader: DatasetLoader) -> Self {
        Self {
            loader,
            state: Mutex::new(LoadState::Unloaded),
        }
    }

    /// Return the dataset snapshot, loading it if necessary.
    ///
    /// Concurrent callers during an in-flight load share that load.
    /// After a failed attempt this retries.
    pub async fn ensure_loaded(&self) -> Result<Arc<DataSet>, LoadError> {
        let load = {
            let mut state = self.state.lock().await;
            match &*state {
                LoadState::Loaded(ds) => return Ok(Arc::clone(ds)),
                LoadState::Loading(load) => load.clone(),
                LoadState::Unloaded | LoadState::Failed(_) => {
                    let fut = (self.loader)();
                    let load: SharedLoad =
                        async move { fut.await.map(Arc::new) }.boxed().shared();
                    *state = LoadState::Loading(load.clone());
                    load
                }
            }
        };

        let result = load.clone().await;

        // Record the outcome, unless a newer attempt has already
        // replaced this one.
        let mut state = self.state.lock().await;
        if let LoadState::Loading(current) = &*state {
            if current.ptr_eq(&load) {
                *state = match &result {
                    Ok(ds) => LoadState::Loaded(Arc::clone(ds)),
                    Err(err) => LoadState::Failed(err.clone()),
                };
            }
        }

        result
    }

    /// The error of the last failed attempt, if the cache is currently
    /// in the failed state.
    pub async fn last_error(&self) -> Option<LoadError> {
        match &*self.state.lock().await {
            LoadState::Failed(err) => Some(err.clone()),
            _ => None,
        }
    }

    /// True once a snapshot is available.
    pub async fn is_loaded(&self) -> bool {
        matches!(&*self.state.lock().await, LoadState::Loaded(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::GroupRecord;
    use crate::loader::loader_fn;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counted_loader(
        result: Result<DataSet, LoadError>,
    ) -> (DatasetLoader, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_loader = Arc::clone(&calls);
        let loader = loader_fn(move || {
            calls_in_loader.fetch_add(1, Ordering::SeqCst);
            let result = result.clone();
            async move { result }
        });
        (loader, calls)
    }

    fn one_group_dataset() -> DataSet {
        let mut ds = DataSet::default();
        ds.groups.push(GroupRecord {
            id: "g1".to_string(),
            name: "algebra".to_string(),
            ..Default::default()
        });
        ds
    }

    #[tokio::test]
    async fn loads_once_and_shares_snapshot() {
        let (loader, calls) = counted_loader(Ok(one_group_dataset()));
        let cache = DatasetCache::new(loader);

        let first = cache.ensure_loaded().await.expect("first load");
        let second = cache.ensure_loaded().await.expect("second load");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_loaded().await);
    }

    #[tokio::test]
    async fn concurrent_callers_trigger_one_load() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_loader = Arc::clone(&calls);
        let loader = loader_fn(move || {
            calls_in_loader.fetch_add(1, Ordering::SeqCst);
            async move {
                // Hold the load open long enough for every waiter to
                // queue up behind it.
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                Ok(DataSet::default())
            }
        });

        let cache = Arc::new(DatasetCache::new(loader));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move { cache.ensure_loaded().await }));
        }

        for handle in handles {
            handle.await.expect("join").expect("load");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_reaches_all_waiters_of_the_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_loader = Arc::clone(&calls);
        let loader = loader_fn(move || {
            calls_in_loader.fetch_add(1, Ordering::SeqCst);
            async move {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                Err(LoadError::new("backend down"))
            }
        });

        let cache = Arc::new(DatasetCache::new(loader));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move { cache.ensure_loaded().await }));
        }

        for handle in handles {
            let err = handle.await.expect("join").expect_err("should fail");
            assert!(err.to_string().contains("backend down"));
        }

        // One attempt served all four waiters.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.last_error().await.is_some());
    }

    #[tokio::test]
    async fn failed_attempt_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_loader = Arc::clone(&calls);
        let loader = loader_fn(move || {
            let attempt = calls_in_loader.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(LoadError::new("transient"))
                } else {
                    Ok(DataSet::default())
                }
            }
        });

        let cache = DatasetCache::new(loader);

        assert!(cache.ensure_loaded().await.is_err());
        assert!(cache.last_error().await.is_some());

        // The cache did not poison itself: the next call retries.
        assert!(cache.ensure_loaded().await.is_ok());
        assert!(cache.is_loaded().await);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
