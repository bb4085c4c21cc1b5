//! Hornet durable cache store types.

use crate::HornetResult;
use std::sync::Arc;

/// A durable, size-bounded key/value store underneath every expensive
/// deterministic lookup.
///
/// Keys are namespaced strings, values are opaque serialized bytes.
/// Implementations keep a recency list bounded by a configured maximum,
/// and that bound must hold after every [Store::set] and [Store::load].
///
/// The store is opened exactly once per process. [Store::load] must be
/// called before any other method, [Store::close] exactly once at
/// shutdown (extra calls are no-ops).
pub trait Store: 'static + Send + Sync + std::fmt::Debug {
    /// Read the store from durable storage, verifying integrity.
    ///
    /// A key not accounted for by the recency list yields
    /// [crate::HornetError::CacheIntegrity].
    fn load(&self) -> HornetResult<()>;

    /// Is `key` currently retained?
    fn has_key(&self, key: &str) -> bool;

    /// Get the value at `key`. Errors if absent.
    fn get(&self, key: &str) -> HornetResult<bytes::Bytes>;

    /// Set the value at `key`, marking it most recently used and evicting
    /// from the least recently used end as needed.
    fn set(&self, key: &str, value: bytes::Bytes) -> HornetResult<()>;

    /// Persist metadata and release the store.
    ///
    /// Failures are logged and swallowed: durability here is best-effort.
    fn close(&self);
}

/// Trait-object [Store].
pub type DynStore = Arc<dyn Store>;
