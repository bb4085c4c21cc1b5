//! Raw key/value storage beneath the recency-bounded store.

use hornet_api::HornetResult;
use std::collections::HashMap;

/// Raw durable key/value storage underneath a [crate::cache::PersistentLru].
///
/// No eviction or recency tracking happens at this level.
pub trait Backend: 'static + Send + std::fmt::Debug {
    /// Every key currently stored.
    fn keys(&self) -> Vec<String>;

    /// Read the value at `key`.
    fn get(&self, key: &str) -> HornetResult<Option<bytes::Bytes>>;

    /// Write the value at `key`, replacing any previous value.
    fn put(&mut self, key: &str, value: &[u8]) -> HornetResult<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&mut self, key: &str) -> HornetResult<()>;

    /// Reclaim space held by overwritten and deleted values.
    fn compact(&mut self) -> HornetResult<()>;
}

/// An in-memory [Backend].
///
/// This is useful for testing, but the cache is supposed to outlive the
/// process in a real deployment.
#[derive(Debug, Default)]
pub struct MemBackend(HashMap<String, bytes::Bytes>);

impl Backend for MemBackend {
    fn keys(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    fn get(&self, key: &str) -> HornetResult<Option<bytes::Bytes>> {
        Ok(self.0.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &[u8]) -> HornetResult<()> {
        self.0
            .insert(key.to_string(), bytes::Bytes::copy_from_slice(value));
        Ok(())
    }

    fn delete(&mut self, key: &str) -> HornetResult<()> {
        self.0.remove(key);
        Ok(())
    }

    fn compact(&mut self) -> HornetResult<()> {
        Ok(())
    }
}
