use std::{
    collections::HashMap,
    fmt::Debug,
    hash::Hash,
    sync::{Mutex, MutexGuard, PoisonError},
};

use futures::future::{BoxFuture, FutureExt, Shared};
use log::trace;

pub type SharedFuture<V> = Shared<BoxFuture<'static, V>>;

/// Locks a mutex, ignoring poisoning. Nothing guarded here is left in an
/// inconsistent state by a panic.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Memoizes one future per key for the lifetime of a parse.
///
/// The stored future is inserted before it is polled, so every request for
/// a key made while it is still resolving awaits the same work.
pub struct DependencyCache<K, V: Clone> {
    entries: Mutex<HashMap<K, SharedFuture<V>>>,
}

impl<K, V: Clone> Default for DependencyCache<K, V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> DependencyCache<K, V>
where
    K: Eq + Hash + Debug,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the future stored for `key`, or stores the one built by
    /// `factory`.
    ///
    /// `factory` runs without the lock held, so it may request other keys
    /// of the same cache. It must not start work eagerly: when two callers
    /// race on a missing key, only the first stored future is kept.
    pub fn get_or_create<F>(&self, key: K, factory: F) -> SharedFuture<V>
    where
        F: FnOnce() -> BoxFuture<'static, V>,
    {
        if let Some(future) = lock(&self.entries).get(&key) {
            trace!("Dependency {:?} is cached", key);
            return future.clone();
        }
        let future = factory().shared();
        lock(&self.entries).entry(key).or_insert(future).clone()
    }

    pub fn contains(&self, key: &K) -> bool {
        lock(&self.entries).contains_key(key)
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }

    /// Drops every stored future.
    pub fn clear(&self) {
        lock(&self.entries).clear();
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use futures::{future::join, FutureExt};

    use super::DependencyCache;

    #[test]
    fn test_single_resolution() {
        let cache: DependencyCache<usize, usize> = DependencyCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let request = |key: usize| {
            let calls = calls.clone();
            cache.get_or_create(key, move || {
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    key * 10
                }
                .boxed()
            })
        };

        let first = request(1);
        let second = request(1);
        let (a, b) = pollster::block_on(join(first, second));
        assert_eq!((a, b), (10, 10));
        assert_eq!(pollster::block_on(request(1)), 10);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(pollster::block_on(request(2)), 20);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_requests() {
        let cache: Arc<DependencyCache<&'static str, usize>> = Arc::new(DependencyCache::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let runs = runs.clone();
                std::thread::spawn(move || {
                    let future = cache.get_or_create("key", move || {
                        async move {
                            runs.fetch_add(1, Ordering::SeqCst);
                            42
                        }
                        .boxed()
                    });
                    pollster::block_on(future)
                })
            })
            .collect();
        for thread in threads {
            assert_eq!(thread.join().unwrap(), 42);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_nested_request() {
        let cache: Arc<DependencyCache<usize, usize>> = Arc::new(DependencyCache::new());
        let inner = cache.clone();
        let future = cache.get_or_create(0, move || {
            let dependency = inner.get_or_create(1, || async { 5 }.boxed());
            async move { dependency.await + 1 }.boxed()
        });
        assert_eq!(pollster::block_on(future), 6);
        assert!(cache.contains(&1));
    }
}
