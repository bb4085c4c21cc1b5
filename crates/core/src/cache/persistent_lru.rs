//! A recency-bounded [hornet_api::Store] over any [Backend].

use super::{Backend, LogFile, MemBackend};
use hornet_api::{DynStore, HornetError, HornetResult, Store};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// The reserved key under which the recency list itself is stored.
pub const LRU_LIST_KEY: &str = "_lru_list_key";

#[derive(Debug)]
struct Inner<B: Backend> {
    backend: B,
    // most recently set first
    lru_list: VecDeque<String>,
    max_size: usize,
    closed: bool,
}

impl<B: Backend> Inner<B> {
    fn check_open(&self) -> HornetResult<()> {
        if self.closed {
            return Err(HornetError::other("cache store is closed"));
        }
        Ok(())
    }

    fn evict(&mut self) -> HornetResult<()> {
        while self.lru_list.len() > self.max_size {
            if let Some(key) = self.lru_list.pop_back() {
                tracing::info!(%key, "Evicting");
                self.backend.delete(&key)?;
            }
        }
        Ok(())
    }

    fn read_lru_list(&mut self) -> HornetResult<()> {
        if let Some(raw) = self.backend.get(LRU_LIST_KEY)? {
            self.lru_list = serde_json::from_slice(&raw).map_err(|e| {
                HornetError::other_src("failed to decode cache recency list", e)
            })?;
        }
        Ok(())
    }

    fn write_lru_list(&mut self) -> HornetResult<()> {
        let raw = serde_json::to_vec(&self.lru_list).map_err(|e| {
            HornetError::other_src("failed to encode cache recency list", e)
        })?;
        self.backend.put(LRU_LIST_KEY, &raw)
    }

    fn check_integrity(&mut self) -> HornetResult<()> {
        let mut stored = self.backend.keys();
        stored.sort();
        for key in &stored {
            if key != LRU_LIST_KEY && !self.lru_list.contains(key) {
                tracing::error!(%key, "cache key missing from recency list");
                return Err(HornetError::cache_integrity(key));
            }
        }

        // listed but never written, e.g. a crash between list and value
        let before = self.lru_list.len();
        self.lru_list
            .retain(|k| stored.binary_search(k).is_ok());
        if self.lru_list.len() != before {
            tracing::warn!(
                dropped = before - self.lru_list.len(),
                "dropped recency entries with no stored value"
            );
        }
        Ok(())
    }

    fn close(&mut self) -> HornetResult<()> {
        self.write_lru_list()?;
        self.backend.compact()
    }
}

/// A durable key/value store bounded by recency.
///
/// Keeps a most-recently-set-first list of keys, persisted under
/// [LRU_LIST_KEY]. [Store::set] writes the value, then moves its key to
/// the front and evicts from the back until at most `max_size` keys
/// remain. A failed write leaves the list untouched. [Store::get] does
/// not reorder.
///
/// Each method locks internally, but callers combining
/// [Store::has_key] then [Store::set] get no atomicity across the pair.
/// Two processes must never share one backing file.
///
/// Dropping the store closes it.
#[derive(Debug)]
pub struct PersistentLru<B: Backend> {
    inner: Mutex<Inner<B>>,
}

/// The file-backed store used in production.
pub type FileStore = PersistentLru<LogFile>;

impl<B: Backend> PersistentLru<B> {
    /// Wrap an opened backend. Call [Store::load] before use.
    pub fn new(backend: B, max_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                backend,
                lru_list: VecDeque::new(),
                max_size,
                closed: false,
            }),
        }
    }

    /// The keys currently retained, most recently set first.
    pub fn recency_list(&self) -> Vec<String> {
        self.inner.lock().unwrap().lru_list.iter().cloned().collect()
    }
}

impl PersistentLru<LogFile> {
    /// Open the log at `path`, then load it, returning a shared handle.
    pub fn open_file(
        path: impl AsRef<Path>,
        max_size: usize,
    ) -> HornetResult<DynStore> {
        let store = Self::new(LogFile::open(path)?, max_size);
        store.load()?;
        let out: DynStore = Arc::new(store);
        Ok(out)
    }
}

impl PersistentLru<MemBackend> {
    /// An empty in-memory store. Loading it is a no-op.
    pub fn create_mem(max_size: usize) -> DynStore {
        let out: DynStore =
            Arc::new(Self::new(MemBackend::default(), max_size));
        out
    }
}

impl<B: Backend> Store for PersistentLru<B> {
    fn load(&self) -> HornetResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_open()?;
        inner.read_lru_list()?;
        inner.check_integrity()?;
        inner.evict()?;
        tracing::info!(entries = inner.lru_list.len(), "Loaded cache");
        Ok(())
    }

    fn has_key(&self, key: &str) -> bool {
        let inner = self.inner.lock().unwrap();
        !inner.closed && inner.lru_list.iter().any(|k| k == key)
    }

    fn get(&self, key: &str) -> HornetResult<bytes::Bytes> {
        let inner = self.inner.lock().unwrap();
        inner.check_open()?;
        inner.backend.get(key)?.ok_or_else(|| {
            HornetError::other(format!("no cache entry for {key:?}"))
        })
    }

    fn set(&self, key: &str, value: bytes::Bytes) -> HornetResult<()> {
        if key == LRU_LIST_KEY {
            return Err(HornetError::other("cache key is reserved"));
        }
        let mut inner = self.inner.lock().unwrap();
        inner.check_open()?;
        inner.backend.put(key, &value)?;
        if let Some(pos) = inner.lru_list.iter().position(|k| k == key) {
            inner.lru_list.remove(pos);
        }
        inner.lru_list.push_front(key.to_string());
        inner.evict()
    }

    fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return;
        }
        inner.closed = true;
        match inner.close() {
            Ok(()) => tracing::info!("Successfully closed cache"),
            Err(err) => tracing::warn!(?err, "Exception on cache close"),
        }
    }
}

impl<B: Backend> Drop for PersistentLru<B> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn mem(max: usize) -> PersistentLru<MemBackend> {
        let s = PersistentLru::new(MemBackend::default(), max);
        s.load().unwrap();
        s
    }

    #[test]
    fn set_then_get() {
        let s = mem(4);
        assert!(!s.has_key("a"));
        s.set("a", bytes::Bytes::from_static(b"1")).unwrap();
        assert!(s.has_key("a"));
        assert_eq!(b"1".as_slice(), s.get("a").unwrap());
        assert!(s.get("b").is_err());
    }

    #[test]
    fn evicts_least_recently_set() {
        const N: usize = 5;
        let s = mem(N);
        for i in 0..=N {
            s.set(&format!("k{i}"), bytes::Bytes::from(vec![i as u8]))
                .unwrap();
        }
        assert!(!s.has_key("k0"));
        for i in 1..=N {
            assert!(s.has_key(&format!("k{i}")));
        }
        assert_eq!(N, s.recency_list().len());
    }

    #[test]
    fn reset_refreshes_recency() {
        let s = mem(2);
        s.set("a", bytes::Bytes::new()).unwrap();
        s.set("b", bytes::Bytes::new()).unwrap();
        s.set("a", bytes::Bytes::new()).unwrap();
        s.set("c", bytes::Bytes::new()).unwrap();
        assert!(s.has_key("a"));
        assert!(!s.has_key("b"));
        assert_eq!(vec!["c", "a"], s.recency_list());
    }

    #[test]
    fn reserved_key_is_rejected() {
        let s = mem(2);
        assert!(s.set(LRU_LIST_KEY, bytes::Bytes::new()).is_err());
    }

    #[test]
    fn closed_store_refuses_work() {
        let s = mem(2);
        s.set("a", bytes::Bytes::new()).unwrap();
        s.close();
        s.close();
        assert!(!s.has_key("a"));
        assert!(s.set("b", bytes::Bytes::new()).is_err());
    }

    #[derive(Debug, Default)]
    struct RefusingBackend {
        inner: MemBackend,
        refuse: &'static str,
    }

    impl Backend for RefusingBackend {
        fn keys(&self) -> Vec<String> {
            self.inner.keys()
        }

        fn get(&self, key: &str) -> HornetResult<Option<bytes::Bytes>> {
            self.inner.get(key)
        }

        fn put(&mut self, key: &str, value: &[u8]) -> HornetResult<()> {
            if key == self.refuse {
                return Err(HornetError::other("disk full"));
            }
            self.inner.put(key, value)
        }

        fn delete(&mut self, key: &str) -> HornetResult<()> {
            self.inner.delete(key)
        }

        fn compact(&mut self) -> HornetResult<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_is_not_listed() {
        let s = PersistentLru::new(
            RefusingBackend {
                refuse: "bad",
                ..Default::default()
            },
            4,
        );
        s.load().unwrap();
        s.set("good", bytes::Bytes::from_static(b"1")).unwrap();

        let err = s.set("bad", bytes::Bytes::from_static(b"2")).unwrap_err();
        assert!(err.to_string().contains("disk full"));
        assert!(!s.has_key("bad"));
        assert_eq!(vec!["good"], s.recency_list());
        assert_eq!(b"1".as_slice(), s.get("good").unwrap());
    }

    #[test]
    fn unaccounted_key_fails_load() {
        let mut backend = MemBackend::default();
        backend.put("stray", b"x").unwrap();
        let s = PersistentLru::new(backend, 4);
        let err = s.load().unwrap_err();
        assert!(err.is_cache_integrity());
    }

    #[test]
    fn load_shrinks_to_smaller_bound() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.log");
        {
            let s = PersistentLru::new(LogFile::open(&path).unwrap(), 8);
            s.load().unwrap();
            for k in ["a", "b", "c", "d"] {
                s.set(k, bytes::Bytes::from_static(b"v")).unwrap();
            }
        }
        let s = PersistentLru::new(LogFile::open(&path).unwrap(), 2);
        s.load().unwrap();
        assert_eq!(vec!["d", "c"], s.recency_list());
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.log");
        {
            let s = FileStore::open_file(&path, 4).unwrap();
            s.set("paths-1 2", bytes::Bytes::from_static(b"abc")).unwrap();
            s.close();
        }
        let s = FileStore::open_file(&path, 4).unwrap();
        assert!(s.has_key("paths-1 2"));
        assert_eq!(b"abc".as_slice(), s.get("paths-1 2").unwrap());
    }
}
