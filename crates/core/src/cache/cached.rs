//! Memoizing a pure function through a [hornet_api::Store].

use super::serial;
use hornet_api::{DynStore, HornetResult};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

type CachedFn<A, T> = Box<dyn Fn(&A) -> HornetResult<T> + Send + Sync>;
type KeyFn<A> = Box<dyn Fn(&A) -> String + Send + Sync>;

/// A pure function memoized in a [hornet_api::Store].
///
/// The store key of a call is `namespace + "-" + key_fn(args)`. On a miss
/// the function runs and its result is written to the store. The result
/// is then always read back from the store, so a hit and a miss return
/// identically decoded values.
///
/// With a memo layer, decoded values are also kept in a bounded in-memory
/// map in front of the store.
///
/// The has-key, compute, set sequence is not atomic. Two wrappers sharing
/// a store may both compute the same key; the later write wins.
pub struct Cached<A: ?Sized, T> {
    namespace: String,
    func: CachedFn<A, T>,
    key_fn: KeyFn<A>,
    store: DynStore,
    memo: Option<Mutex<LruCache<String, T>>>,
}

impl<A: ?Sized, T> std::fmt::Debug for Cached<A, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cached")
            .field("namespace", &self.namespace)
            .field("store", &self.store)
            .field("memo", &self.memo.is_some())
            .finish()
    }
}

impl<A, T> Cached<A, T>
where
    A: ?Sized,
    T: serde::Serialize + serde::de::DeserializeOwned + Clone,
{
    /// Wrap `func`.
    ///
    /// `memo_size` of `None` or zero disables the in-memory layer.
    pub fn new<F, K>(
        func: F,
        namespace: impl Into<String>,
        key_fn: K,
        store: DynStore,
        memo_size: Option<usize>,
    ) -> Self
    where
        F: Fn(&A) -> HornetResult<T> + 'static + Send + Sync,
        K: Fn(&A) -> String + 'static + Send + Sync,
    {
        Self {
            namespace: namespace.into(),
            func: Box::new(func),
            key_fn: Box::new(key_fn),
            store,
            memo: memo_size
                .and_then(NonZeroUsize::new)
                .map(|n| Mutex::new(LruCache::new(n))),
        }
    }

    /// The namespaced store key for `args`.
    pub fn key(&self, args: &A) -> String {
        format!("{}-{}", self.namespace, (self.key_fn)(args))
    }

    /// Call through the cache.
    pub fn call(&self, args: &A) -> HornetResult<T> {
        let key = self.key(args);

        if let Some(memo) = &self.memo {
            if let Some(v) = memo.lock().unwrap().get(&key) {
                return Ok(v.clone());
            }
        }

        if !self.store.has_key(&key) {
            let value = (self.func)(args)?;
            tracing::debug!(%key, "Writing into cache");
            self.store.set(&key, serial::to_bytes(&value)?)?;
        }

        tracing::debug!(%key, "Fetching from cache");
        let value: T = serial::from_bytes(&self.store.get(&key)?)?;

        if let Some(memo) = &self.memo {
            memo.lock().unwrap().put(key, value.clone());
        }

        Ok(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cache::PersistentLru;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(
        store: DynStore,
        memo: Option<usize>,
    ) -> (Cached<u32, Vec<u32>>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let c2 = calls.clone();
        let cached = Cached::new(
            move |n: &u32| {
                c2.fetch_add(1, Ordering::SeqCst);
                Ok((0..*n).collect())
            },
            "range",
            |n: &u32| n.to_string(),
            store,
            memo,
        );
        (cached, calls)
    }

    #[test]
    fn computes_once() {
        let store = PersistentLru::create_mem(8);
        let (cached, calls) = counting(store.clone(), None);
        assert_eq!(vec![0, 1, 2], cached.call(&3).unwrap());
        assert_eq!(vec![0, 1, 2], cached.call(&3).unwrap());
        assert_eq!(1, calls.load(Ordering::SeqCst));
        assert!(store.has_key("range-3"));
        assert_eq!("range-3", cached.key(&3));
    }

    #[test]
    fn shared_store_across_wrappers() {
        let store = PersistentLru::create_mem(8);
        let (a, a_calls) = counting(store.clone(), None);
        let (b, b_calls) = counting(store, Some(4));
        a.call(&5).unwrap();
        assert_eq!(vec![0, 1, 2, 3, 4], b.call(&5).unwrap());
        assert_eq!(1, a_calls.load(Ordering::SeqCst));
        assert_eq!(0, b_calls.load(Ordering::SeqCst));
    }

    #[test]
    fn memo_serves_after_store_eviction() {
        let store = PersistentLru::create_mem(1);
        let (cached, calls) = counting(store, Some(4));
        cached.call(&1).unwrap();
        cached.call(&2).unwrap();
        // "range-1" is gone from the store but still memoized
        cached.call(&1).unwrap();
        assert_eq!(2, calls.load(Ordering::SeqCst));
    }

    #[test]
    fn zero_memo_size_disables_memo() {
        let store = PersistentLru::create_mem(1);
        let (cached, calls) = counting(store, Some(0));
        cached.call(&1).unwrap();
        cached.call(&2).unwrap();
        cached.call(&1).unwrap();
        assert_eq!(3, calls.load(Ordering::SeqCst));
    }

    #[test]
    fn memo_evicts_least_recently_used() {
        let store = PersistentLru::create_mem(1);
        let (cached, calls) = counting(store, Some(2));
        cached.call(&1).unwrap();
        cached.call(&2).unwrap();
        // touch 1 so that 2 is the eviction candidate
        cached.call(&1).unwrap();
        cached.call(&3).unwrap();
        assert_eq!(3, calls.load(Ordering::SeqCst));
        cached.call(&1).unwrap();
        assert_eq!(3, calls.load(Ordering::SeqCst));
        cached.call(&2).unwrap();
        assert_eq!(4, calls.load(Ordering::SeqCst));
    }

    #[test]
    fn errors_are_not_cached() {
        let store = PersistentLru::create_mem(4);
        let calls = Arc::new(AtomicUsize::new(0));
        let c2 = calls.clone();
        let cached: Cached<u32, u32> = Cached::new(
            move |_: &u32| {
                c2.fetch_add(1, Ordering::SeqCst);
                Err(hornet_api::HornetError::other("unreachable"))
            },
            "fail",
            |n: &u32| n.to_string(),
            store.clone(),
            Some(4),
        );
        assert!(cached.call(&1).is_err());
        assert!(cached.call(&1).is_err());
        assert_eq!(2, calls.load(Ordering::SeqCst));
        assert!(!store.has_key("fail-1"));
    }
}
